pub mod auth;
pub mod config;
pub mod constants;
pub mod photo;
