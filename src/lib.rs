pub mod config;
pub mod error;
pub mod export;
pub mod gemini;
pub mod generator;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod routes;
