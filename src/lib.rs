pub mod api;
pub mod app;
pub mod config;
pub mod logging;
pub mod prefs;
pub mod session;
pub mod state;
pub mod terminal;
pub mod types;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;
