pub mod column_classifier;
pub mod risk_analysis;
pub mod risk_engine;
pub mod risk_narrative;
