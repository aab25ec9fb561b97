//! 外部趋势标签（机会 / 威胁）
//!
//! 标签内容由外部维护，这里只负责按行业取出并合并。

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::benchmark::DEFAULT_INDUSTRY;

/// 某个行业的趋势标签
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryTrends {
    pub industry: String,
    #[serde(default)]
    pub opportunities: Vec<String>,
    #[serde(default)]
    pub threats: Vec<String>,
}

/// 趋势标签目录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendCatalog {
    pub version: String,
    pub industries: Vec<IndustryTrends>,
}

/// 传给战略合成的外部因素
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendTags {
    pub opportunities: Vec<String>,
    pub threats: Vec<String>,
}

impl TrendCatalog {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.find(DEFAULT_INDUSTRY).is_none() {
            return Err(ConfigError::MissingDefaultTrends);
        }
        Ok(())
    }

    pub fn find(&self, industry: &str) -> Option<&IndustryTrends> {
        self.industries.iter().find(|t| t.industry == industry)
    }

    /// 按给定行业顺序合并标签并去重；没有任何匹配时使用默认条目
    pub fn tags_for<'a>(&self, industries: impl IntoIterator<Item = &'a str>) -> TrendTags {
        let mut tags = TrendTags::default();
        let mut matched = false;

        for industry in industries {
            if let Some(trends) = self.find(industry) {
                matched = true;
                tags.merge(trends);
            }
        }
        if !matched {
            if let Some(default) = self.find(DEFAULT_INDUSTRY) {
                tags.merge(default);
            }
        }

        tags
    }
}

impl TrendTags {
    fn merge(&mut self, trends: &IndustryTrends) {
        for tag in &trends.opportunities {
            if !self.opportunities.contains(tag) {
                self.opportunities.push(tag.clone());
            }
        }
        for tag in &trends.threats {
            if !self.threats.contains(tag) {
                self.threats.push(tag.clone());
            }
        }
    }
}
