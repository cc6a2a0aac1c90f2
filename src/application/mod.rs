pub mod use_cases;

pub use use_cases::risk_analysis::RiskAnalysisUseCase;
pub use use_cases::risk_narrative::RiskNarrativeUseCase;
