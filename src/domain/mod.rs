pub mod column_role;
pub mod compound;
pub mod dataset;
pub mod error;
pub mod llm_config;
pub mod pipeline;
pub mod risk;
