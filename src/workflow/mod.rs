pub mod diagnosis_ctx;
pub mod diagnosis_flow;

pub use diagnosis_ctx::DiagnosisCtx;
pub use diagnosis_flow::{Diagnosis, DiagnosisFlow};
