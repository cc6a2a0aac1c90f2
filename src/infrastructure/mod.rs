pub mod config;
pub mod conversion;
pub mod csv;
pub mod llm_clients;
pub mod response;
