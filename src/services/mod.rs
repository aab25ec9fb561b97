pub mod artifact_writer;
pub mod benchmark_comparator;
pub mod narrative;
pub mod report_assembler;
pub mod scoring;
pub mod strategy_synthesizer;
pub mod validator;

pub use artifact_writer::ArtifactWriter;
pub use benchmark_comparator::{normalize_industry, BenchmarkComparator, CompanyMeta};
pub use narrative::{
    LlmNarrativeSource, NarrativeFetcher, NarrativeRequest, NarrativeSource, RetryPolicy,
    StaticNarrativeSource,
};
pub use report_assembler::ReportAssembler;
pub use scoring::ScoringEngine;
pub use strategy_synthesizer::StrategySynthesizer;
pub use validator::{AcceptedSubmission, Validator};
