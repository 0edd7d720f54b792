// Detection Module
// The analysis contract, organized into specialized submodules:
// - prompt: fixed detection policy, failure templates, output schema
// - analyzer: the analysis client (one provider call per request)
// - validation: strict payload parsing and invariant checks
// - language: Georgian/English summary script rules
// - verdict: three-state classification and presentation hints

pub mod analyzer;
pub mod language;
pub mod prompt;
pub mod validation;
pub mod verdict;

pub use analyzer::{AnalysisClient, AnalysisError, AnalysisOutcome, BUSY_MESSAGE};
pub use language::{check_summary_script, classify_script, contains_georgian, Script};
pub use prompt::{
    build_provider_request,
    failure_template,
    response_schema,
    system_instruction,
    FailureKind,
    FailureTemplate,
    FAILURE_TEMPLATES,
};
pub use validation::{parse_detection_result, ResponseRules};
pub use verdict::{ProbabilityBand, ResultView, Verdict};
