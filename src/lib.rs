pub mod app;
pub mod calendar;
pub mod commands;
pub mod config;
pub mod filter;
pub mod keybindings;
pub mod layout;
pub mod logging;
pub mod provider;
pub mod realm;
pub mod scroll;
pub mod store;
pub mod theme;
pub mod types;
pub mod ui;
