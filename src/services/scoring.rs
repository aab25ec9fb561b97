//! 评分引擎 - 业务能力层
//!
//! 纯函数：同一份提交 + 同一版本的评分策略，结果完全一致。
//!
//! 1. 每个类别只对实际作答的题目取平均（null 跳过，不补 0）
//! 2. 作答数量不足的类别排除在总分之外，其权重按比例分给其余类别
//! 3. 平均分换算到 0-100，总分为加权和，再查等级区间

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ScoringError;
use crate::models::diagnosis::{CategoryScore, DiagnosisResult, MaturityLevel};
use crate::models::policy::ScoringPolicy;
use crate::models::submission::SubmissionRecord;

/// 李克特量表满分
pub const LIKERT_MAX: f64 = 5.0;

/// 保留两位小数，避免浮点尾差影响等级边界
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 评分引擎
pub struct ScoringEngine {
    policy: Arc<ScoringPolicy>,
}

impl ScoringEngine {
    pub fn new(policy: Arc<ScoringPolicy>) -> Self {
        Self { policy }
    }

    pub fn score(&self, record: &SubmissionRecord) -> Result<DiagnosisResult, ScoringError> {
        score(record, &self.policy)
    }
}

/// 计算诊断结果
pub fn score(
    record: &SubmissionRecord,
    policy: &ScoringPolicy,
) -> Result<DiagnosisResult, ScoringError> {
    let mut categories: Vec<CategoryScore> = policy
        .categories
        .iter()
        .map(|definition| {
            let answered: Vec<u8> = record
                .answered_items(&definition.id)
                .filter(|(item_id, _)| definition.items.iter().any(|i| i.as_str() == *item_id))
                .map(|(_, value)| value)
                .collect();

            let min_answered = policy.min_answered_for(definition);
            let insufficient = answered.is_empty() || answered.len() < min_answered;

            let raw_average = (!insufficient).then(|| {
                answered.iter().map(|&v| f64::from(v)).sum::<f64>() / answered.len() as f64
            });
            let normalized = raw_average.map(|avg| round2(avg / LIKERT_MAX * 100.0));

            CategoryScore {
                category_id: definition.id.clone(),
                name: definition.name.clone(),
                answered: answered.len(),
                total_items: definition.items.len(),
                raw_average: raw_average.map(round2),
                normalized,
                configured_weight: definition.weight,
                effective_weight: 0.0,
                target: definition.target,
                gap: normalized.map(|n| round2(definition.target - n)),
                insufficient_data: insufficient,
            }
        })
        .collect();

    let included_weight: f64 = categories
        .iter()
        .filter(|c| c.is_included())
        .map(|c| c.configured_weight)
        .sum();

    if included_weight <= 0.0 {
        return Err(ScoringError::NoScorableCategory {
            categories: categories.len(),
        });
    }

    for category in categories.iter_mut() {
        if category.is_included() {
            category.effective_weight = category.configured_weight / included_weight;
        } else {
            warn!(
                "[{}] ⚠️ 类别 {} 作答不足 ({}/{})，已排除并重新分配权重",
                record.submission_id, category.category_id, category.answered, category.total_items
            );
        }
    }

    let weighted_sum: f64 = categories
        .iter()
        .filter_map(|c| c.normalized.map(|n| n * c.effective_weight))
        .sum();
    let total_score = round2(weighted_sum).clamp(0.0, 100.0);

    let band = policy.band_for(total_score);
    let grade_rank = policy.grade_rank(&band.grade).unwrap_or(0);

    debug!(
        "[{}] 总分 {:.2} → 等级 {} (成熟度 L{})",
        record.submission_id, total_score, band.grade, band.maturity_level
    );

    Ok(DiagnosisResult {
        submission_id: record.submission_id.clone(),
        company_name: record.company_name.clone(),
        policy_version: policy.version.clone(),
        categories,
        total_score,
        grade: band.grade.clone(),
        grade_rank,
        maturity: MaturityLevel {
            level: band.maturity_level,
            label: band.maturity_label.clone(),
        },
        percentile: None,
        benchmark_version: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::policy::{CategoryDefinition, GradeBand};
    use std::collections::BTreeMap;

    fn policy() -> ScoringPolicy {
        let category = |id: &str, weight: f64| CategoryDefinition {
            id: id.to_string(),
            name: id.to_uppercase(),
            weight,
            target: 80.0,
            items: (1..=5).map(|i| format!("{}_{}", id, i)).collect(),
            min_answered: None,
        };
        let band = |grade: &str, min_score: f64, level: u8| GradeBand {
            grade: grade.to_string(),
            min_score,
            maturity_level: level,
            maturity_label: format!("L{}", level),
        };
        ScoringPolicy {
            version: "test".to_string(),
            min_answered: 2,
            categories: vec![category("a", 0.5), category("b", 0.3), category("c", 0.2)],
            grade_bands: vec![
                band("A", 80.0, 3),
                band("B", 60.0, 2),
                band("C", 0.0, 1),
            ],
        }
    }

    fn record(scores: &[(&str, &[Option<u8>])]) -> SubmissionRecord {
        let mut map = BTreeMap::new();
        for (category, values) in scores {
            let items = values
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("{}_{}", category, i + 1), *v))
                .collect();
            map.insert(category.to_string(), items);
        }
        SubmissionRecord {
            submission_id: "sub-test".to_string(),
            company_name: "AB".to_string(),
            contact_name: "x".to_string(),
            email: "a@b.com".to_string(),
            consent: true,
            contact_phone: None,
            job_title: None,
            industry: vec![],
            employee_count: None,
            challenges: None,
            goals: None,
            submitted_at: None,
            scores: map,
        }
    }

    const ALL_THREE: &[Option<u8>] = &[Some(3), Some(3), Some(3), Some(3), Some(3)];

    #[test]
    fn test_uniform_answers() {
        let r = record(&[("a", ALL_THREE), ("b", ALL_THREE), ("c", ALL_THREE)]);
        let result = score(&r, &policy()).unwrap();
        assert_eq!(result.total_score, 60.0);
        assert_eq!(result.grade, "B");
        assert_eq!(result.maturity.level, 2);
        for c in &result.categories {
            assert_eq!(c.raw_average, Some(3.0));
            assert_eq!(c.normalized, Some(60.0));
            assert_eq!(c.gap, Some(20.0));
        }
    }

    #[test]
    fn test_null_items_are_skipped_not_zero() {
        let r = record(&[
            ("a", &[Some(5), None, Some(3), None, None][..]),
            ("b", ALL_THREE),
            ("c", ALL_THREE),
        ]);
        let result = score(&r, &policy()).unwrap();
        let a = result.category("a").unwrap();
        assert_eq!(a.answered, 2);
        assert_eq!(a.raw_average, Some(4.0));
        assert_eq!(a.normalized, Some(80.0));
    }

    #[test]
    fn test_insufficient_category_redistributes_weight() {
        let r = record(&[
            ("a", &[Some(5), None, None, None, None][..]),
            ("b", &[Some(4); 5][..]),
            ("c", &[Some(2); 5][..]),
        ]);
        let result = score(&r, &policy()).unwrap();
        let a = result.category("a").unwrap();
        assert!(a.insufficient_data);
        assert_eq!(a.effective_weight, 0.0);
        assert_eq!(a.normalized, None);

        assert!((result.effective_weight_sum() - 1.0).abs() < 1e-9);
        assert!((result.category("b").unwrap().effective_weight - 0.6).abs() < 1e-9);
        // 0.6 * 80 + 0.4 * 40
        assert_eq!(result.total_score, 64.0);
    }

    #[test]
    fn test_missing_category_counts_as_insufficient() {
        let r = record(&[("a", ALL_THREE)]);
        let result = score(&r, &policy()).unwrap();
        assert_eq!(result.insufficient_categories().count(), 2);
        assert_eq!(result.total_score, 60.0);
    }

    #[test]
    fn test_no_scorable_category() {
        let r = record(&[("a", &[Some(3)][..])]);
        assert_eq!(
            score(&r, &policy()),
            Err(ScoringError::NoScorableCategory { categories: 3 })
        );
    }

    #[test]
    fn test_unknown_items_are_ignored() {
        let mut r = record(&[("a", ALL_THREE), ("b", ALL_THREE), ("c", ALL_THREE)]);
        r.scores
            .get_mut("a")
            .unwrap()
            .insert("a_99".to_string(), Some(5));
        let result = score(&r, &policy()).unwrap();
        assert_eq!(result.category("a").unwrap().answered, 5);
        assert_eq!(result.total_score, 60.0);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let r = record(&[
            ("a", &[Some(1), Some(4), Some(5), None, Some(2)][..]),
            ("b", &[Some(3), Some(3), None, None, Some(5)][..]),
            ("c", &[Some(4); 5][..]),
        ]);
        let first = score(&r, &policy()).unwrap();
        let second = score(&r, &policy()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_grade_is_monotonic() {
        let p = policy();
        let mut previous_rank = usize::MAX;
        for step in 0..=1000 {
            let total = step as f64 / 10.0;
            let rank = p.grade_rank(&p.band_for(total).grade).unwrap();
            assert!(rank <= previous_rank, "grade got worse at {}", total);
            previous_rank = rank;
        }
    }
}
