//! ipatlas: look up where an IP address or domain lives and plot it on a
//! terminal world map, with the great-circle distance to your own position.

pub mod api;
pub mod app;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod geo;
pub mod history;
pub mod location;
pub mod logging;
pub mod models;
pub mod query;
pub mod resolve;
pub mod ui;
