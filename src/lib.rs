pub mod app;
pub mod auth;
pub mod config;
pub mod seed;
pub mod state;
