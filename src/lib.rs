pub mod config;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod roster;
pub mod scoring;
pub mod services;
pub mod standings;
pub mod workbook;
