// Veritas Core Services

pub mod config_store;
pub mod detection;
pub mod history_store;
pub mod local_store;
pub mod preferences;
pub mod providers;
pub mod request_builder;

pub use config_store::*;
pub use history_store::*;
pub use local_store::*;
pub use preferences::*;
pub use providers::*;
pub use request_builder::*;

// Re-export the detection contract
pub use detection::{
    parse_detection_result,
    AnalysisClient,
    AnalysisError,
    AnalysisOutcome,
    ResponseRules,
    ResultView,
    Verdict,
};
