// Public API - only expose the runner module
pub mod runner;

// Internal modules - one per pipeline stage
mod client;
mod config;
mod error;
mod execution;
mod options;
mod results;
mod types;
