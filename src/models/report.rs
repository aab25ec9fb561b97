//! 报告文档结构（与渲染方式无关）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::benchmark::{BenchmarkComparison, BenchmarkConfidence};
use crate::models::diagnosis::{DiagnosisResult, MaturityLevel};
use crate::models::strategy::StrategyMatrix;

/// 报告元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub submission_id: String,
    pub company_name: String,
    /// 生成时间，是两次生成之间唯一允许不同的字段
    pub generated_at: DateTime<Utc>,
    pub total_score: f64,
    pub grade: String,
    pub maturity: MaturityLevel,
    pub percentile: f64,
    pub policy_version: String,
    pub benchmark_version: String,
    pub benchmark_confidence: BenchmarkConfidence,
    /// 存在降级内容（占位文本、回退基准等）
    pub degraded: bool,
}

/// 报告章节
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_slot: Option<String>,
}

/// 图表类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartType {
    Radar,
    Split,
    GroupedBar,
}

/// 一组数值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// 图表描述：只有标签与数值，不含任何样式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

/// 叙述文本的来源状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeStatus {
    Generated,
    Placeholder,
}

/// 已填入报告的叙述文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeContent {
    pub text: String,
    pub status: NarrativeStatus,
}

/// 报告中的叙述槽位，顺序即章节顺序
pub const NARRATIVE_SLOTS: [&str; 5] = [
    "executive_summary",
    "category_insights",
    "benchmark_commentary",
    "strategy_commentary",
    "roadmap",
];

/// 外部提供的叙述文本
///
/// 文本对报告来说是不透明的，只区分有无。获取失败的槽位在 `failures` 中记录原因。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeSlots {
    pub texts: BTreeMap<String, String>,
    pub failures: BTreeMap<String, String>,
}

impl NarrativeSlots {
    pub fn with_text(mut self, slot: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.insert(slot.into(), text.into());
        self
    }

    pub fn with_failure(mut self, slot: impl Into<String>, reason: impl Into<String>) -> Self {
        self.failures.insert(slot.into(), reason.into());
        self
    }

    /// 非空文本才算提供
    pub fn text(&self, slot: &str) -> Option<&str> {
        self.texts
            .get(slot)
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
    }
}

/// 报告质量提示（非致命问题）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityFlag {
    /// 类别作答不足，已从总分中排除
    InsufficientData { category_id: String },
    /// 未找到匹配的行业 / 规模，使用了默认基准
    BenchmarkFallback { matched_entry: String },
    /// 叙述文本获取失败，使用了占位文本
    NarrativeDegraded { slot: String, reason: String },
}

/// 报告文档
///
/// 每次生成都是新对象，不会原地修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportArtifact {
    pub metadata: ReportMetadata,
    pub sections: Vec<ReportSection>,
    pub chart_specs: Vec<ChartSpec>,
    /// 槽位 ID → 文本
    pub narratives: BTreeMap<String, NarrativeContent>,
    pub quality_flags: Vec<QualityFlag>,
    pub diagnosis: DiagnosisResult,
    pub benchmark: BenchmarkComparison,
    pub strategy: StrategyMatrix,
}

impl ReportArtifact {
    /// 忽略生成时间后是否一致
    pub fn same_content(&self, other: &ReportArtifact) -> bool {
        let mut normalized = other.clone();
        normalized.metadata.generated_at = self.metadata.generated_at;
        *self == normalized
    }

    pub fn section(&self, id: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn chart(&self, chart_type: ChartType) -> Option<&ChartSpec> {
        self.chart_specs.iter().find(|c| c.chart_type == chart_type)
    }
}
