//! 战略合成服务 - 业务能力层
//!
//! 根据各类别与同行中位数的差距划分优势 / 劣势，再与外部机会 / 威胁标签两两组合，
//! 得到 SO / WO / ST / WT 四个象限。外部标签原样使用，不做任何生成。

use std::cmp::Ordering;
use tracing::debug;

use crate::models::benchmark::BenchmarkComparison;
use crate::models::diagnosis::DiagnosisResult;
use crate::models::strategy::{InternalFactor, InternalKind, StrategyEntry, StrategyMatrix};
use crate::models::trends::TrendTags;

/// 默认阈值：与中位数相差超过 5 分才算优势或劣势
pub const DEFAULT_THRESHOLD: f64 = 5.0;
/// 默认每个象限最多保留的组合数
pub const DEFAULT_MAX_PAIRS: usize = 3;

/// 战略合成服务
#[derive(Debug, Clone, Copy)]
pub struct StrategySynthesizer {
    threshold: f64,
    max_pairs: usize,
}

impl Default for StrategySynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_MAX_PAIRS)
    }
}

impl StrategySynthesizer {
    pub fn new(threshold: f64, max_pairs: usize) -> Self {
        Self {
            threshold: threshold.abs(),
            max_pairs,
        }
    }

    pub fn synthesize(
        &self,
        diagnosis: &DiagnosisResult,
        benchmark: &BenchmarkComparison,
        trends: &TrendTags,
    ) -> StrategyMatrix {
        let (strengths, weaknesses) = self.classify(diagnosis, benchmark);

        let matrix = StrategyMatrix {
            so: self.pair(&strengths, &trends.opportunities),
            wo: self.pair(&weaknesses, &trends.opportunities),
            st: self.pair(&strengths, &trends.threats),
            wt: self.pair(&weaknesses, &trends.threats),
            strengths,
            weaknesses,
            opportunities: trends.opportunities.clone(),
            threats: trends.threats.clone(),
        };

        debug!(
            "[{}] 战略矩阵: S={} W={} O={} T={}",
            diagnosis.submission_id,
            matrix.strengths.len(),
            matrix.weaknesses.len(),
            matrix.opportunities.len(),
            matrix.threats.len()
        );
        matrix
    }

    /// 按差距划分优势与劣势，各自按差距绝对值降序排列
    ///
    /// 排序是稳定的，差距相同时保持类别定义顺序。
    fn classify(
        &self,
        diagnosis: &DiagnosisResult,
        benchmark: &BenchmarkComparison,
    ) -> (Vec<InternalFactor>, Vec<InternalFactor>) {
        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();

        for category in diagnosis.included_categories() {
            let Some(compared) = benchmark.category(&category.category_id) else {
                continue;
            };
            let gap = compared.gap_to_median;
            let kind = if gap > self.threshold {
                InternalKind::Strength
            } else if gap < -self.threshold {
                InternalKind::Weakness
            } else {
                continue;
            };

            let factor = InternalFactor {
                kind,
                category_id: category.category_id.clone(),
                name: category.name.clone(),
                gap,
            };
            match kind {
                InternalKind::Strength => strengths.push(factor),
                InternalKind::Weakness => weaknesses.push(factor),
            }
        }

        let by_magnitude = |a: &InternalFactor, b: &InternalFactor| {
            b.gap
                .abs()
                .partial_cmp(&a.gap.abs())
                .unwrap_or(Ordering::Equal)
        };
        strengths.sort_by(by_magnitude);
        weaknesses.sort_by(by_magnitude);
        (strengths, weaknesses)
    }

    /// 内部因素 × 外部标签，内部因素优先，外部标签按来源顺序，截取前 K 个
    fn pair(&self, internal: &[InternalFactor], external: &[String]) -> Vec<StrategyEntry> {
        internal
            .iter()
            .flat_map(|factor| external.iter().map(move |tag| (factor, tag)))
            .take(self.max_pairs)
            .enumerate()
            .map(|(index, (factor, tag))| StrategyEntry {
                priority: index + 1,
                internal: factor.clone(),
                external: tag.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::benchmark::{BenchmarkConfidence, BenchmarkTiers, CategoryBenchmark};
    use crate::models::diagnosis::{CategoryScore, MaturityLevel};

    const TIERS: BenchmarkTiers = BenchmarkTiers {
        p25: 40.0,
        median: 50.0,
        p75: 60.0,
        p90: 70.0,
    };

    fn fixture(gaps: &[(&str, f64)]) -> (DiagnosisResult, BenchmarkComparison) {
        let categories = gaps
            .iter()
            .map(|(id, gap)| CategoryScore {
                category_id: id.to_string(),
                name: format!("类别{}", id),
                answered: 5,
                total_items: 5,
                raw_average: Some((50.0 + gap) / 20.0),
                normalized: Some(50.0 + gap),
                configured_weight: 1.0 / gaps.len() as f64,
                effective_weight: 1.0 / gaps.len() as f64,
                target: 80.0,
                gap: Some(30.0 - gap),
                insufficient_data: false,
            })
            .collect();
        let diagnosis = DiagnosisResult {
            submission_id: "sub-s".to_string(),
            company_name: "测试科技".to_string(),
            policy_version: "p".to_string(),
            categories,
            total_score: 50.0,
            grade: "D".to_string(),
            grade_rank: 4,
            maturity: MaturityLevel {
                level: 1,
                label: "L1".to_string(),
            },
            percentile: None,
            benchmark_version: None,
        };
        let benchmark = BenchmarkComparison {
            benchmark_version: "b".to_string(),
            matched_entry: "all/*".to_string(),
            confidence: BenchmarkConfidence::Fallback,
            total_score: 50.0,
            total_percentile: 50.0,
            total_tiers: TIERS,
            categories: gaps
                .iter()
                .map(|(id, gap)| CategoryBenchmark {
                    category_id: id.to_string(),
                    score: 50.0 + gap,
                    percentile: 50.0,
                    tiers: TIERS,
                    gap_to_median: *gap,
                })
                .collect(),
        };
        (diagnosis, benchmark)
    }

    fn tags(opportunities: &[&str], threats: &[&str]) -> TrendTags {
        TrendTags {
            opportunities: opportunities.iter().map(|s| s.to_string()).collect(),
            threats: threats.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_classification_uses_threshold() {
        let (d, b) = fixture(&[("a", 12.0), ("b", 5.0), ("c", -5.0), ("d", -8.0), ("e", 0.0)]);
        let m = StrategySynthesizer::default().synthesize(&d, &b, &tags(&["O1"], &["T1"]));

        let ids = |factors: &[InternalFactor]| {
            factors
                .iter()
                .map(|f| f.category_id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&m.strengths), vec!["a"]);
        assert_eq!(ids(&m.weaknesses), vec!["d"]);
    }

    #[test]
    fn test_priority_by_gap_magnitude_then_definition_order() {
        let (d, b) = fixture(&[("a", -9.0), ("b", -20.0), ("c", -9.0), ("d", 30.0)]);
        let m = StrategySynthesizer::new(5.0, 10).synthesize(&d, &b, &tags(&["O1"], &[]));

        let order: Vec<_> = m
            .wo
            .iter()
            .map(|e| (e.priority, e.internal.category_id.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "b"), (2, "a"), (3, "c")]);
        assert_eq!(m.so.len(), 1);
        assert!(m.st.is_empty());
        assert!(m.wt.is_empty());
    }

    #[test]
    fn test_quadrants_are_capped() {
        let (d, b) = fixture(&[("a", 10.0), ("b", 20.0), ("c", 15.0)]);
        let m = StrategySynthesizer::new(5.0, 2).synthesize(
            &d,
            &b,
            &tags(&["O1", "O2", "O3"], &["T1", "T2"]),
        );
        assert_eq!(m.so.len(), 2);
        assert_eq!(m.st.len(), 2);
        assert_eq!(m.so[0].internal.category_id, "b");
        assert_eq!(m.so[0].external, "O1");
        assert_eq!(m.so[1].external, "O2");
        assert_eq!(m.so[1].priority, 2);
    }

    #[test]
    fn test_external_tags_are_passed_through_unchanged() {
        let (d, b) = fixture(&[("a", -10.0)]);
        let t = tags(&["供应链数字化 <新>"], &["인재 부족"]);
        let m = StrategySynthesizer::default().synthesize(&d, &b, &t);
        assert_eq!(m.opportunities, t.opportunities);
        assert_eq!(m.wt[0].external, "인재 부족");
    }

    #[test]
    fn test_no_external_tags_yields_empty_quadrants() {
        let (d, b) = fixture(&[("a", 10.0), ("b", -10.0)]);
        let m = StrategySynthesizer::default().synthesize(&d, &b, &TrendTags::default());
        assert!(m.is_empty());
        assert_eq!(m.strengths.len(), 1);
        assert_eq!(m.weaknesses.len(), 1);
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let (d, b) = fixture(&[("a", 10.0), ("b", -10.0), ("c", 10.0), ("d", -10.0)]);
        let t = tags(&["O1", "O2"], &["T1", "T2"]);
        let s = StrategySynthesizer::default();
        assert_eq!(s.synthesize(&d, &b, &t), s.synthesize(&d, &b, &t));
    }
}
