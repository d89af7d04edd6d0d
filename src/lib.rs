pub mod app;
pub mod cluster;
pub mod config;
pub mod exec;
pub mod logging;
pub mod reconcile;
pub mod status;
