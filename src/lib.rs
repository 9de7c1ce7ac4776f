pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod migrate;
pub mod model;
pub mod tracker;
pub mod util;
