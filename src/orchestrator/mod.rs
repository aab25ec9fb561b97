//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和并发调度。
//!
//! ### `batch_processor` - 批量提交处理器
//! - 管理应用生命周期（加载策略 / 基准 / 趋势数据、运行、统计）
//! - 批量加载提交（`Vec<RawSubmission>`）
//! - 控制并发数量（Semaphore）
//! - 写出报告与失败记录，输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<RawSubmission>)
//!     ↓
//! workflow::DiagnosisFlow (处理单份提交)
//!     ↓
//! services (能力层：validator / scoring / benchmark / strategy / narrative / report)
//! ```
//!
//! 每份提交只读共享的策略数据，互不影响，因此可以完全并行。

pub mod batch_processor;

pub use batch_processor::{App, RunStats};
