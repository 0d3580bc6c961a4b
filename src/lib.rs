pub mod analytics;
pub mod api;
pub mod app;
pub mod config;
pub mod models;
pub mod redirect;
pub mod storage;

pub use app::create_app;
