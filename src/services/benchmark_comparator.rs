//! 基准比较服务 - 业务能力层
//!
//! 只做查表和插值，基准数据本身由外部维护。
//! 找不到 (行业, 规模) 时回退到全行业曲线，永远不会报错，只降低可信度。

use phf::phf_map;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::benchmark::{
    BenchmarkComparison, BenchmarkConfidence, BenchmarkEntry, BenchmarkReference, BenchmarkTiers,
    CategoryBenchmark, Curve, CurvePoint, DEFAULT_INDUSTRY,
};
use crate::models::diagnosis::DiagnosisResult;
use crate::models::submission::{SizeBand, SubmissionRecord};
use crate::services::scoring::round2;

/// 行业别名 → 基准表中的行业键
static INDUSTRY_ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "manufacturing" => "manufacturing",
    "manufacture" => "manufacturing",
    "制造" => "manufacturing",
    "制造业" => "manufacturing",
    "제조" => "manufacturing",
    "제조업" => "manufacturing",
    "retail" => "retail",
    "commerce" => "retail",
    "e-commerce" => "retail",
    "零售" => "retail",
    "零售业" => "retail",
    "유통" => "retail",
    "finance" => "finance",
    "financial" => "finance",
    "banking" => "finance",
    "insurance" => "finance",
    "金融" => "finance",
    "금융" => "finance",
    "it" => "it",
    "software" => "it",
    "internet" => "it",
    "信息技术" => "it",
    "软件" => "it",
    "소프트웨어" => "it",
};

/// 将行业标签规范化为基准表使用的键；未知标签转为小写原样返回
pub fn normalize_industry(tag: &str) -> String {
    let key = tag.trim().to_lowercase();
    match INDUSTRY_ALIASES.get(key.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => key,
    }
}

/// 基准比较所需的企业信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyMeta {
    /// 已规范化的行业键，保持提交中的顺序
    pub industries: Vec<String>,
    pub size_band: Option<SizeBand>,
}

impl CompanyMeta {
    pub fn new<S: AsRef<str>>(industries: &[S], size_band: Option<SizeBand>) -> Self {
        let mut normalized: Vec<String> = Vec::new();
        for tag in industries {
            let key = normalize_industry(tag.as_ref());
            if !key.is_empty() && !normalized.contains(&key) {
                normalized.push(key);
            }
        }
        Self {
            industries: normalized,
            size_band,
        }
    }
}

impl From<&SubmissionRecord> for CompanyMeta {
    fn from(record: &SubmissionRecord) -> Self {
        CompanyMeta::new(record.industry.as_slice(), record.employee_count)
    }
}

/// 基准比较服务
pub struct BenchmarkComparator {
    reference: Arc<BenchmarkReference>,
}

impl BenchmarkComparator {
    pub fn new(reference: Arc<BenchmarkReference>) -> Self {
        Self { reference }
    }

    /// 查找最匹配的条目
    ///
    /// 顺序：(行业, 规模) → (行业, 任意规模) → (全行业, 规模) → 全行业默认
    pub fn lookup(&self, meta: &CompanyMeta) -> Option<(&BenchmarkEntry, BenchmarkConfidence)> {
        let size = meta.size_band.map(SizeBand::label);

        if let Some(size) = size {
            for industry in &meta.industries {
                if let Some(entry) = self.reference.find(industry, Some(size)) {
                    return Some((entry, BenchmarkConfidence::Exact));
                }
            }
        }
        for industry in &meta.industries {
            if let Some(entry) = self.reference.find(industry, None) {
                return Some((entry, BenchmarkConfidence::IndustryOnly));
            }
        }
        if let Some(size) = size {
            if let Some(entry) = self.reference.find(DEFAULT_INDUSTRY, Some(size)) {
                return Some((entry, BenchmarkConfidence::SizeOnly));
            }
        }
        self.reference
            .default_entry()
            .map(|entry| (entry, BenchmarkConfidence::Fallback))
    }

    /// 计算总分与各类别的百分位
    pub fn compare(&self, diagnosis: &DiagnosisResult, meta: &CompanyMeta) -> BenchmarkComparison {
        let identity = identity_curve();
        let (entry, confidence) = match self.lookup(meta) {
            Some((entry, confidence)) => (Some(entry), confidence),
            None => (None, BenchmarkConfidence::Fallback),
        };
        let default_entry = self.reference.default_entry();

        let matched_entry = entry.map_or_else(
            || "identity".to_string(),
            |e| format!("{}/{}", e.industry, e.size_band.as_deref().unwrap_or("*")),
        );
        if confidence.is_low() {
            warn!(
                "[{}] ⚠️ 未找到匹配的基准 (行业: {:?}, 规模: {:?})，使用 {}",
                diagnosis.submission_id, meta.industries, meta.size_band, matched_entry
            );
        } else {
            debug!(
                "[{}] 基准匹配: {} ({:?})",
                diagnosis.submission_id, matched_entry, confidence
            );
        }

        let total_curve = entry.map_or(&identity, |e| &e.total);

        let categories = diagnosis
            .included_categories()
            .filter_map(|category| {
                let score = category.normalized?;
                let curve = entry
                    .and_then(|e| e.categories.get(&category.category_id))
                    .or_else(|| default_entry.and_then(|d| d.categories.get(&category.category_id)))
                    .unwrap_or(total_curve);
                let tiers = tiers(curve);
                Some(CategoryBenchmark {
                    category_id: category.category_id.clone(),
                    score,
                    percentile: round2(curve.percentile_at(score)),
                    gap_to_median: round2(score - tiers.median),
                    tiers,
                })
            })
            .collect();

        BenchmarkComparison {
            benchmark_version: self.reference.version.clone(),
            matched_entry,
            confidence,
            total_score: diagnosis.total_score,
            total_percentile: round2(total_curve.percentile_at(diagnosis.total_score)),
            total_tiers: tiers(total_curve),
            categories,
        }
    }
}

fn tiers(curve: &Curve) -> BenchmarkTiers {
    BenchmarkTiers {
        p25: round2(curve.score_at(25.0)),
        median: round2(curve.score_at(50.0)),
        p75: round2(curve.score_at(75.0)),
        p90: round2(curve.score_at(90.0)),
    }
}

/// 基准表缺少默认条目时使用：百分位等于得分
fn identity_curve() -> Curve {
    Curve(vec![
        CurvePoint {
            score: 0.0,
            percentile: 0.0,
        },
        CurvePoint {
            score: 100.0,
            percentile: 100.0,
        },
    ])
}
