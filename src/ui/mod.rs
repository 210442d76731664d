//! Ratatui front-end: a student form, the result table, a command bar, and
//! the modal dialogs each command opens.

mod app;
mod commands;
mod forms;
mod helpers;
mod terminal;

pub use app::App;
pub use commands::Command;
pub use terminal::run_app;
