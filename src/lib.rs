pub mod app;
pub mod audio;
pub mod config;
pub mod core;
pub mod display;
pub mod error;
pub mod library;
pub mod model;
pub mod store;
