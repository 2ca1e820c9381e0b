pub mod api;
pub mod app;
pub mod config;
pub mod state;
pub mod storage;
pub mod terminal;
pub mod types;
pub mod ui;
pub mod util;

#[cfg(test)]
mod test_support;
