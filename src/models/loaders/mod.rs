pub mod submission_loader;
pub mod toml_loader;

pub use submission_loader::{load_all_submissions, RawSubmission};
pub use toml_loader::{load_benchmark_reference, load_scoring_policy, load_trend_catalog};
