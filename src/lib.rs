pub mod catalog;
pub mod config;
pub mod cycle;
pub mod error;
pub mod ingest;
pub mod models;
pub mod publish;
pub mod sheets;
pub mod store;
pub mod tacticus;
