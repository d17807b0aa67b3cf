pub mod analyzers;
pub mod attribution;
pub mod config;
pub mod districts;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod services;
