//! 基准参考表与比较结果

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;

/// 默认（全行业）条目的行业键
pub const DEFAULT_INDUSTRY: &str = "all";

/// 分布曲线上的一个点：得分 → 百分位
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub score: f64,
    pub percentile: f64,
}

/// 累积分布曲线，按得分升序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Curve(pub Vec<CurvePoint>);

impl Curve {
    fn validate(&self, key: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidCurve {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if self.0.is_empty() {
            return Err(invalid("曲线没有任何点"));
        }
        for point in &self.0 {
            if !(0.0..=100.0).contains(&point.score) || !(0.0..=100.0).contains(&point.percentile)
            {
                return Err(invalid("得分和百分位必须在 [0, 100] 内"));
            }
        }
        for pair in self.0.windows(2) {
            if pair[1].score <= pair[0].score {
                return Err(invalid("得分必须严格递增"));
            }
            if pair[1].percentile < pair[0].percentile {
                return Err(invalid("百分位不能递减"));
            }
        }
        Ok(())
    }

    /// 补齐 (0, 0) 与 (100, 100) 两个端点
    fn anchored(&self) -> Vec<CurvePoint> {
        let mut points = Vec::with_capacity(self.0.len() + 2);
        if self.0.first().map_or(true, |p| p.score > 0.0) {
            points.push(CurvePoint {
                score: 0.0,
                percentile: 0.0,
            });
        }
        points.extend(self.0.iter().copied());
        if self.0.last().map_or(true, |p| p.score < 100.0) {
            points.push(CurvePoint {
                score: 100.0,
                percentile: 100.0,
            });
        }
        points
    }

    /// 线性插值求百分位
    pub fn percentile_at(&self, score: f64) -> f64 {
        let score = score.clamp(0.0, 100.0);
        let points = self.anchored();
        for pair in points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if score <= hi.score {
                let ratio = (score - lo.score) / (hi.score - lo.score);
                return (lo.percentile + ratio * (hi.percentile - lo.percentile)).clamp(0.0, 100.0);
            }
        }
        points.last().map_or(100.0, |p| p.percentile)
    }

    /// 反向插值：达到某百分位所需的得分
    pub fn score_at(&self, percentile: f64) -> f64 {
        let percentile = percentile.clamp(0.0, 100.0);
        let points = self.anchored();
        for pair in points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if percentile <= hi.percentile {
                if hi.percentile == lo.percentile {
                    return lo.score;
                }
                let ratio = (percentile - lo.percentile) / (hi.percentile - lo.percentile);
                return (lo.score + ratio * (hi.score - lo.score)).clamp(0.0, 100.0);
            }
        }
        points.last().map_or(100.0, |p| p.score)
    }

    pub fn median(&self) -> f64 {
        self.score_at(50.0)
    }
}

/// 一个 (行业, 规模) 条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub industry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_band: Option<String>,
    pub total: Curve,
    #[serde(default)]
    pub categories: BTreeMap<String, Curve>,
}

impl BenchmarkEntry {
    fn key(&self) -> String {
        format!(
            "{}/{}",
            self.industry,
            self.size_band.as_deref().unwrap_or("*")
        )
    }
}

/// 版本化的基准参考表（外部维护）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReference {
    pub version: String,
    pub entries: Vec<BenchmarkEntry>,
}

impl BenchmarkReference {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for entry in &self.entries {
            let key = entry.key();
            entry.total.validate(&key)?;
            for (category, curve) in &entry.categories {
                curve.validate(&format!("{}#{}", key, category))?;
            }
        }
        if self.default_entry().is_none() {
            return Err(ConfigError::MissingDefaultBenchmark);
        }
        Ok(())
    }

    /// 精确匹配 (行业, 规模)；`size_band` 为 None 时只匹配不区分规模的条目
    pub fn find(&self, industry: &str, size_band: Option<&str>) -> Option<&BenchmarkEntry> {
        self.entries
            .iter()
            .find(|e| e.industry == industry && e.size_band.as_deref() == size_band)
    }

    /// 全行业、不区分规模的默认条目
    pub fn default_entry(&self) -> Option<&BenchmarkEntry> {
        self.find(DEFAULT_INDUSTRY, None)
    }
}

/// 基准匹配的可信度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkConfidence {
    /// 行业和规模均匹配
    Exact,
    /// 仅行业匹配
    IndustryOnly,
    /// 仅规模匹配（全行业）
    SizeOnly,
    /// 使用全行业默认曲线
    Fallback,
}

impl BenchmarkConfidence {
    /// 行业未命中，使用的是全行业曲线
    pub fn is_low(self) -> bool {
        matches!(
            self,
            BenchmarkConfidence::SizeOnly | BenchmarkConfidence::Fallback
        )
    }
}

/// 基准分层得分
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTiers {
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub p90: f64,
}

/// 单个类别的比较结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBenchmark {
    pub category_id: String,
    pub score: f64,
    pub percentile: f64,
    pub tiers: BenchmarkTiers,
    /// score - median，正数表示高于同行
    pub gap_to_median: f64,
}

/// 基准比较结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub benchmark_version: String,
    /// 实际使用的条目，如 `manufacturing/50-299`
    pub matched_entry: String,
    pub confidence: BenchmarkConfidence,
    pub total_score: f64,
    pub total_percentile: f64,
    pub total_tiers: BenchmarkTiers,
    /// 仅包含作答充分的类别，顺序同类别定义
    pub categories: Vec<CategoryBenchmark>,
}

impl BenchmarkComparison {
    pub fn category(&self, id: &str) -> Option<&CategoryBenchmark> {
        self.categories.iter().find(|c| c.category_id == id)
    }
}
