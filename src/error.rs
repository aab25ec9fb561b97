use thiserror::Error;

use crate::models::validation::{MalformedKind, SecurityViolation, ValidationResult};

/// 流水线失败类型
///
/// 调用方要么拿到完整的 `ReportArtifact`，要么拿到这里的某一种失败，不存在半成品结果。
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 载荷无法解析、嵌套过深或为空
    #[error("载荷格式错误: {0}")]
    Malformed(MalformedKind),

    /// 命中安全规则（注入 / 控制字符）
    #[error("检测到 {} 项安全违规", .0.len())]
    Security(Vec<SecurityViolation>),

    /// 字段级校验失败，调用方可修正后重新提交
    #[error("字段校验失败: {}", .0.error_summary())]
    Validation(Box<ValidationResult>),

    /// 所有类别的作答数量都不足，无法计算总分
    #[error(transparent)]
    InsufficientData(#[from] ScoringError),
}

impl PipelineError {
    /// 稳定的错误类型标签，用于失败记录和对外接口
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Malformed(_) => "malformed_input",
            PipelineError::Security(_) => "security_violation",
            PipelineError::Validation(_) => "validation_error",
            PipelineError::InsufficientData(_) => "insufficient_data",
        }
    }

    /// 安全违规与格式错误属于致命错误，不可原样重试
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Malformed(_) | PipelineError::Security(_)
        )
    }
}

/// 评分错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("没有任何类别达到最少作答数量 (共 {categories} 个类别)")]
    NoScorableCategory { categories: usize },
}

/// 配置 / 策略数据错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("评分策略没有定义任何类别")]
    NoCategories,

    #[error("类别 ID 重复: {0}")]
    DuplicateCategory(String),

    #[error("类别 {id} 的权重无效: {weight}")]
    InvalidWeight { id: String, weight: f64 },

    #[error("类别权重之和必须为 1，实际为 {sum}")]
    WeightSum { sum: f64 },

    #[error("类别 {id} 的目标值 {target} 超出 [0, 100]")]
    InvalidTarget { id: String, target: f64 },

    #[error("类别 {0} 没有任何题目")]
    EmptyCategory(String),

    #[error("等级区间必须按 min_score 严格递减: {grade}")]
    BandOrder { grade: String },

    #[error("最后一个等级区间必须从 0 开始，实际为 {min_score}")]
    BandFloor { min_score: f64 },

    #[error("没有定义任何等级区间")]
    NoBands,

    #[error("基准曲线无效 ({key}): {reason}")]
    InvalidCurve { key: String, reason: String },

    #[error("基准表缺少默认条目 (industry = \"all\")")]
    MissingDefaultBenchmark,

    #[error("趋势标签缺少默认条目 (industry = \"all\")")]
    MissingDefaultTrends,
}
