//! Core library surface for the Student Records TUI application.
//!
//! The `bin` target only wires configuration, logging and the terminal loop
//! together; everything it needs is re-exported here.
pub mod actions;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod ui;

pub use config::Config;
pub use db::Database;
pub use error::{ActionError, ActionResult};
pub use models::{NewStudent, Student};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
