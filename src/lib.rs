pub mod config;
pub mod constants;
pub mod enrich;
pub mod error;
pub mod feeds;
pub mod fetch;
pub mod heuristics;
pub mod listing;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod reconciler;
pub mod server;
pub mod sources;
pub mod storage;
pub mod types;
