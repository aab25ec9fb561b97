//! # Maturity Diagnosis
//!
//! 企业数字化 / AI 成熟度自评诊断：校验提交 → 评分 → 同行对标 → TOWS 战略 → 报告文档
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 提交、校验结果、评分策略、诊断结果、基准表、战略矩阵、报告文档
//! - `models/loaders` - 从 `config/*.toml` 加载版本化的策略数据，从目录加载提交
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单份提交
//! - `Validator` - 结构 / 字段 / 安全 / 编码校验
//! - `ScoringEngine` - 类别得分、权重重分配、等级
//! - `BenchmarkComparator` - 基准查表与百分位插值
//! - `StrategySynthesizer` - TOWS 矩阵
//! - `NarrativeFetcher` - 外部叙述文本（超时 / 重试 / 占位）
//! - `ReportAssembler` - 与渲染无关的报告文档
//! - `ArtifactWriter` - 写出报告与失败记录
//!
//! ### ③ 流程层（Workflow）
//! - `DiagnosisCtx` - 上下文封装（序号 + 来源）
//! - `DiagnosisFlow` - 单份提交的完整流程
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理，控制并发并汇总统计

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{ConfigError, PipelineError, ScoringError};
pub use models::{
    BenchmarkComparison, BenchmarkReference, DiagnosisResult, ReportArtifact, ScoringPolicy,
    StrategyMatrix, SubmissionRecord, TrendCatalog, ValidationResult,
};
pub use orchestrator::{App, RunStats};
pub use services::{
    BenchmarkComparator, ReportAssembler, ScoringEngine, StrategySynthesizer, Validator,
};
pub use workflow::{DiagnosisCtx, DiagnosisFlow};
