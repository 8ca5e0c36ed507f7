mod activity;
mod common;
mod job;
mod notification;
mod output;
mod session;
mod user;

pub use activity::*;
pub use common::*;
pub use job::*;
pub use notification::*;
pub use output::*;
pub use session::*;
pub use user::*;
