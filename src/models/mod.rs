pub mod benchmark;
pub mod diagnosis;
pub mod loaders;
pub mod policy;
pub mod report;
pub mod strategy;
pub mod submission;
pub mod trends;
pub mod validation;

pub use benchmark::{
    BenchmarkComparison, BenchmarkConfidence, BenchmarkEntry, BenchmarkReference, BenchmarkTiers,
    CategoryBenchmark, Curve, CurvePoint,
};
pub use diagnosis::{CategoryScore, DiagnosisResult, MaturityLevel};
pub use loaders::{
    load_all_submissions, load_benchmark_reference, load_scoring_policy, load_trend_catalog,
    RawSubmission,
};
pub use policy::{CategoryDefinition, GradeBand, ScoringPolicy};
pub use report::{
    ChartSeries, ChartSpec, ChartType, NarrativeContent, NarrativeSlots, NarrativeStatus,
    QualityFlag, ReportArtifact, ReportMetadata, ReportSection, NARRATIVE_SLOTS,
};
pub use strategy::{InternalFactor, InternalKind, StrategyEntry, StrategyMatrix};
pub use submission::{SizeBand, SubmissionRecord};
pub use trends::{TrendCatalog, TrendTags};
pub use validation::{
    FieldError, MalformedKind, SecurityViolation, Severity, ThreatFamily, ValidationErrorKind,
    ValidationResult, ValidationWarning,
};
