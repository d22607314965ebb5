pub mod config;
pub mod db;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod util;
pub mod web;
