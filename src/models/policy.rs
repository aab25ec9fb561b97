//! 评分策略：类别定义、权重与等级区间
//!
//! 这些都是业务策略数据，从 `config/scoring_policy.toml` 加载，带版本号。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ConfigError;

/// 权重之和允许的误差
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// 类别定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub id: String,
    pub name: String,
    pub weight: f64,
    /// 目标值（0-100）
    pub target: f64,
    /// 题目 ID，顺序即问卷顺序
    pub items: Vec<String>,
    /// 覆盖全局的最少作答数量
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_answered: Option<usize>,
}

/// 等级区间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub grade: String,
    /// 下限（含）
    pub min_score: f64,
    pub maturity_level: u8,
    pub maturity_label: String,
}

/// 版本化的评分策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub version: String,
    /// 每个类别至少需要作答的题目数
    pub min_answered: usize,
    pub categories: Vec<CategoryDefinition>,
    /// 按 min_score 严格递减
    pub grade_bands: Vec<GradeBand>,
}

impl ScoringPolicy {
    /// 检查策略数据的不变量
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }

        let mut seen = HashSet::new();
        let mut weight_sum = 0.0;
        for category in &self.categories {
            if !seen.insert(category.id.as_str()) {
                return Err(ConfigError::DuplicateCategory(category.id.clone()));
            }
            if !category.weight.is_finite() || category.weight <= 0.0 {
                return Err(ConfigError::InvalidWeight {
                    id: category.id.clone(),
                    weight: category.weight,
                });
            }
            if !(0.0..=100.0).contains(&category.target) {
                return Err(ConfigError::InvalidTarget {
                    id: category.id.clone(),
                    target: category.target,
                });
            }
            if category.items.is_empty() {
                return Err(ConfigError::EmptyCategory(category.id.clone()));
            }
            weight_sum += category.weight;
        }
        if (weight_sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(ConfigError::WeightSum { sum: weight_sum });
        }

        let Some(last) = self.grade_bands.last() else {
            return Err(ConfigError::NoBands);
        };
        for pair in self.grade_bands.windows(2) {
            if pair[1].min_score >= pair[0].min_score {
                return Err(ConfigError::BandOrder {
                    grade: pair[1].grade.clone(),
                });
            }
        }
        if last.min_score != 0.0 {
            return Err(ConfigError::BandFloor {
                min_score: last.min_score,
            });
        }

        Ok(())
    }

    pub fn category(&self, id: &str) -> Option<&CategoryDefinition> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn min_answered_for(&self, category: &CategoryDefinition) -> usize {
        category.min_answered.unwrap_or(self.min_answered)
    }

    /// 查找分数所在的等级区间，恰好落在边界时取较高的一档
    pub fn band_for(&self, score: f64) -> &GradeBand {
        self.grade_bands
            .iter()
            .find(|band| score >= band.min_score)
            .unwrap_or_else(|| &self.grade_bands[self.grade_bands.len() - 1])
    }

    /// 等级的序位，0 为最高档
    pub fn grade_rank(&self, grade: &str) -> Option<usize> {
        self.grade_bands.iter().position(|b| b.grade == grade)
    }
}
