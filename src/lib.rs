pub mod arena;
pub mod battleground;
pub mod bot;
pub mod broadcast;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod participant;
pub mod rng;
pub mod score;
pub mod server_protocol;
pub mod server_utils;
pub mod stats_store;
pub mod types;
