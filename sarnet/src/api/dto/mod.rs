mod activity;
mod common;
mod jobs;
mod notifications;
mod outputs;
mod predict;
mod sessions;
mod users;

pub use activity::*;
pub use jobs::*;
pub use notifications::*;
pub use outputs::*;
pub use predict::*;
pub use sessions::*;
pub use users::*;
