//! 报告组装服务 - 业务能力层
//!
//! 把诊断结果、基准比较、战略矩阵和叙述文本合成为与渲染方式无关的报告文档。
//! 只输出章节结构、图表数据（标签 + 数值）和元数据，不含任何样式或标记。
//!
//! 相同输入多次组装，除 `generated_at` 外结果完全一致。

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::benchmark::{BenchmarkComparison, BenchmarkTiers};
use crate::models::diagnosis::DiagnosisResult;
use crate::models::report::{
    ChartSeries, ChartSpec, ChartType, NarrativeContent, NarrativeSlots, NarrativeStatus,
    QualityFlag, ReportArtifact, ReportMetadata, ReportSection,
};
use crate::models::strategy::StrategyMatrix;
use crate::services::scoring::round2;

/// 叙述文本缺失时的占位内容
pub const PLACEHOLDER_TEXT: &str = "（该部分分析暂时无法生成，请稍后重新生成报告。）";

/// 章节定义：(章节 ID, 标题, 叙述槽位)
const SECTIONS: [(&str, &str, Option<&str>); 6] = [
    ("summary", "诊断概览", Some("executive_summary")),
    ("category_analysis", "分领域分析", Some("category_insights")),
    ("benchmark", "同行对标", Some("benchmark_commentary")),
    ("tows_strategy", "TOWS 战略矩阵", Some("strategy_commentary")),
    ("roadmap", "改进路线图", Some("roadmap")),
    ("data_quality", "数据质量说明", None),
];

/// 报告组装服务
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    placeholder: String,
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self {
            placeholder: PLACEHOLDER_TEXT.to_string(),
        }
    }
}

impl ReportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以当前时间组装报告
    pub fn assemble(
        &self,
        diagnosis: &DiagnosisResult,
        benchmark: &BenchmarkComparison,
        strategy: &StrategyMatrix,
        narratives: &NarrativeSlots,
    ) -> ReportArtifact {
        self.assemble_at(diagnosis, benchmark, strategy, narratives, Utc::now())
    }

    /// 以指定时间组装报告
    pub fn assemble_at(
        &self,
        diagnosis: &DiagnosisResult,
        benchmark: &BenchmarkComparison,
        strategy: &StrategyMatrix,
        narratives: &NarrativeSlots,
        generated_at: DateTime<Utc>,
    ) -> ReportArtifact {
        let diagnosis = diagnosis
            .clone()
            .with_percentile(benchmark.total_percentile, &benchmark.benchmark_version);

        let sections: Vec<ReportSection> = SECTIONS
            .iter()
            .map(|(id, title, slot)| ReportSection {
                id: id.to_string(),
                title: title.to_string(),
                narrative_slot: slot.map(str::to_string),
            })
            .collect();

        let mut quality_flags: Vec<QualityFlag> = diagnosis
            .insufficient_categories()
            .map(|c| QualityFlag::InsufficientData {
                category_id: c.category_id.clone(),
            })
            .collect();
        if benchmark.confidence.is_low() {
            quality_flags.push(QualityFlag::BenchmarkFallback {
                matched_entry: benchmark.matched_entry.clone(),
            });
        }

        let mut filled = BTreeMap::new();
        for slot in sections.iter().filter_map(|s| s.narrative_slot.as_deref()) {
            let content = match narratives.text(slot) {
                Some(text) => NarrativeContent {
                    text: text.to_string(),
                    status: NarrativeStatus::Generated,
                },
                None => {
                    let reason = narratives
                        .failures
                        .get(slot)
                        .cloned()
                        .unwrap_or_else(|| "未提供叙述文本".to_string());
                    quality_flags.push(QualityFlag::NarrativeDegraded {
                        slot: slot.to_string(),
                        reason,
                    });
                    NarrativeContent {
                        text: self.placeholder.clone(),
                        status: NarrativeStatus::Placeholder,
                    }
                }
            };
            filled.insert(slot.to_string(), content);
        }

        let chart_specs = vec![
            radar_chart(&diagnosis, benchmark),
            split_chart(&diagnosis),
            grouped_bar_chart(&diagnosis, benchmark),
        ];

        debug!(
            "[{}] 报告组装完成: {} 个章节, {} 个图表, {} 条质量提示",
            diagnosis.submission_id,
            sections.len(),
            chart_specs.len(),
            quality_flags.len()
        );

        ReportArtifact {
            metadata: ReportMetadata {
                submission_id: diagnosis.submission_id.clone(),
                company_name: diagnosis.company_name.clone(),
                generated_at,
                total_score: diagnosis.total_score,
                grade: diagnosis.grade.clone(),
                maturity: diagnosis.maturity.clone(),
                percentile: benchmark.total_percentile,
                policy_version: diagnosis.policy_version.clone(),
                benchmark_version: benchmark.benchmark_version.clone(),
                benchmark_confidence: benchmark.confidence,
                degraded: !quality_flags.is_empty(),
            },
            sections,
            chart_specs,
            narratives: filled,
            quality_flags,
            diagnosis,
            benchmark: benchmark.clone(),
            strategy: strategy.clone(),
        }
    }
}

/// 雷达图：各类别得分 / 目标 / 同行中位数
///
/// 作答不足的类别不在图中出现。
fn radar_chart(diagnosis: &DiagnosisResult, benchmark: &BenchmarkComparison) -> ChartSpec {
    let included: Vec<_> = diagnosis.included_categories().collect();

    ChartSpec {
        id: "category_radar".to_string(),
        chart_type: ChartType::Radar,
        title: "各领域成熟度".to_string(),
        labels: included.iter().map(|c| c.name.clone()).collect(),
        series: vec![
            ChartSeries {
                name: "企业得分".to_string(),
                values: included.iter().map(|c| c.normalized.unwrap_or(0.0)).collect(),
            },
            ChartSeries {
                name: "目标".to_string(),
                values: included.iter().map(|c| c.target).collect(),
            },
            ChartSeries {
                name: "同行中位数".to_string(),
                values: included
                    .iter()
                    .map(|c| {
                        benchmark
                            .category(&c.category_id)
                            .map_or(benchmark.total_tiers.median, |b| b.tiers.median)
                    })
                    .collect(),
            },
        ],
    }
}

/// 总分构成：各类别加权贡献 + 距满分的差距，合计 100
fn split_chart(diagnosis: &DiagnosisResult) -> ChartSpec {
    let mut labels = Vec::new();
    let mut values = Vec::new();
    for category in diagnosis.included_categories() {
        labels.push(category.name.clone());
        values.push(round2(
            category.normalized.unwrap_or(0.0) * category.effective_weight,
        ));
    }
    let contributed: f64 = values.iter().sum();
    labels.push("距满分差距".to_string());
    values.push(round2((100.0 - contributed).max(0.0)));

    ChartSpec {
        id: "score_split".to_string(),
        chart_type: ChartType::Split,
        title: "总分构成".to_string(),
        labels,
        series: vec![ChartSeries {
            name: "得分贡献".to_string(),
            values,
        }],
    }
}

/// 分组柱状图：企业得分与同行 P25 / 中位数 / P75 / P90
///
/// 第一组为总分，之后按类别定义顺序。
fn grouped_bar_chart(diagnosis: &DiagnosisResult, benchmark: &BenchmarkComparison) -> ChartSpec {
    let mut labels = vec!["总分".to_string()];
    let mut rows = vec![(diagnosis.total_score, benchmark.total_tiers)];
    for category in diagnosis.included_categories() {
        if let Some(compared) = benchmark.category(&category.category_id) {
            labels.push(category.name.clone());
            rows.push((compared.score, compared.tiers));
        }
    }

    let series = |name: &str, pick: fn(&(f64, BenchmarkTiers)) -> f64| ChartSeries {
        name: name.to_string(),
        values: rows.iter().map(pick).collect(),
    };

    ChartSpec {
        id: "benchmark_tiers".to_string(),
        chart_type: ChartType::GroupedBar,
        title: "同行分层对比".to_string(),
        labels,
        series: vec![
            series("企业", |r: &(f64, BenchmarkTiers)| r.0),
            series("P25", |r: &(f64, BenchmarkTiers)| r.1.p25),
            series("中位数", |r: &(f64, BenchmarkTiers)| r.1.median),
            series("P75", |r: &(f64, BenchmarkTiers)| r.1.p75),
            series("P90", |r: &(f64, BenchmarkTiers)| r.1.p90),
        ],
    }
}
