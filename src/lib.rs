pub mod app;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod logging;
pub mod notice;
pub mod session;
pub mod store;
pub mod text;
pub mod ui;
