pub mod config;
pub mod dataset;
pub mod engine;
pub mod output;
pub mod programme;
pub mod scores;
pub mod server;
