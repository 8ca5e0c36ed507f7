pub mod api;
pub mod auth;
pub mod colorize;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
