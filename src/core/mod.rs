pub mod config;
pub mod dispatch;
pub mod ingest;
pub mod log_io;
pub mod model;
pub mod parser;
pub mod registry;
