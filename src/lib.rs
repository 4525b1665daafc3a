//! Recettes library
//!
//! Exposes the HTTP surface and CLI for integration testing

pub mod app_settings;
pub mod cli;
pub mod metrics;
pub mod server;

pub use app_settings::Config;
pub use server::{build_router, ServeState};
