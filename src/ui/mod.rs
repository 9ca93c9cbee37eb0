//! Ratatui front-end: one tab per catalog table, modal forms for editing.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
