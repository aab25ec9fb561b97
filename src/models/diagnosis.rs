use serde::{Deserialize, Serialize};

/// 类别得分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category_id: String,
    pub name: String,
    /// 已作答题目数 / 题目总数
    pub answered: usize,
    pub total_items: usize,
    /// 原始平均分（1-5），作答不足时为 None
    pub raw_average: Option<f64>,
    /// 标准化分数（0-100），作答不足时为 None
    pub normalized: Option<f64>,
    /// 配置中的权重
    pub configured_weight: f64,
    /// 实际参与计算的权重（重新分配后），排除的类别为 0
    pub effective_weight: f64,
    pub target: f64,
    /// target - normalized
    pub gap: Option<f64>,
    pub insufficient_data: bool,
}

impl CategoryScore {
    pub fn is_included(&self) -> bool {
        !self.insufficient_data
    }
}

/// 成熟度等级（由等级查表得到）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaturityLevel {
    pub level: u8,
    pub label: String,
}

/// 诊断结果
///
/// 同一份已校验提交 + 同一版本的策略 / 基准表，结果完全一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub submission_id: String,
    pub company_name: String,
    pub policy_version: String,
    /// 按类别定义顺序排列
    pub categories: Vec<CategoryScore>,
    pub total_score: f64,
    pub grade: String,
    /// 等级序位，0 为最高档
    pub grade_rank: usize,
    pub maturity: MaturityLevel,
    /// 基准比较后填入
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark_version: Option<String>,
}

impl DiagnosisResult {
    pub fn included_categories(&self) -> impl Iterator<Item = &CategoryScore> {
        self.categories.iter().filter(|c| c.is_included())
    }

    pub fn insufficient_categories(&self) -> impl Iterator<Item = &CategoryScore> {
        self.categories.iter().filter(|c| c.insufficient_data)
    }

    pub fn category(&self, id: &str) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.category_id == id)
    }

    /// 实际使用的权重之和
    pub fn effective_weight_sum(&self) -> f64 {
        self.included_categories().map(|c| c.effective_weight).sum()
    }

    /// 写入基准比较得到的百分位
    pub fn with_percentile(mut self, percentile: f64, benchmark_version: &str) -> Self {
        self.percentile = Some(percentile);
        self.benchmark_version = Some(benchmark_version.to_string());
        self
    }
}
