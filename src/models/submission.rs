use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// 企业规模档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SizeBand {
    #[serde(rename = "1-9")]
    Micro,
    #[serde(rename = "10-49")]
    Small,
    #[serde(rename = "50-299")]
    Medium,
    #[serde(rename = "300-999")]
    Large,
    #[serde(rename = "1000+")]
    Enterprise,
}

impl SizeBand {
    /// 允许的取值（与序列化格式一致）
    pub const LABELS: [&'static str; 5] = ["1-9", "10-49", "50-299", "300-999", "1000+"];

    pub fn label(self) -> &'static str {
        match self {
            SizeBand::Micro => "1-9",
            SizeBand::Small => "10-49",
            SizeBand::Medium => "50-299",
            SizeBand::Large => "300-999",
            SizeBand::Enterprise => "1000+",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "1-9" => Some(SizeBand::Micro),
            "10-49" => Some(SizeBand::Small),
            "50-299" => Some(SizeBand::Medium),
            "300-999" => Some(SizeBand::Large),
            "1000+" => Some(SizeBand::Enterprise),
            _ => None,
        }
    }
}

impl std::fmt::Display for SizeBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 类别 ID → 题目 ID → 评分（null 表示未作答）
pub type ItemScores = BTreeMap<String, BTreeMap<String, Option<u8>>>;

/// 已通过校验的提交记录，接受后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    #[serde(default)]
    pub submission_id: String,
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub consent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default)]
    pub industry: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<SizeBand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenges: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scores: ItemScores,
}

/// 不参与内容指纹计算的字段
const FINGERPRINT_EXCLUDED: [&str; 2] = ["submissionId", "submittedAt"];

impl SubmissionRecord {
    /// 从已校验的 JSON 构建提交记录
    ///
    /// 未提供 `submissionId` 时使用内容指纹，同一份答卷无论何时提交都得到相同的 ID。
    pub fn from_validated(raw: &JsonValue) -> serde_json::Result<Self> {
        let value = normalize(raw);
        let fingerprint = content_fingerprint(&value);

        let mut record: SubmissionRecord = serde_json::from_value(value)?;
        if record.submission_id.trim().is_empty() {
            record.submission_id = fingerprint;
        } else {
            record.submission_id = record.submission_id.trim().to_string();
        }
        Ok(record)
    }

    /// 某个类别中实际作答的评分（跳过 null）
    pub fn answered_items(&self, category_id: &str) -> impl Iterator<Item = (&str, u8)> {
        self.scores
            .get(category_id)
            .into_iter()
            .flat_map(|items| items.iter())
            .filter_map(|(id, score)| score.map(|s| (id.as_str(), s)))
    }
}

/// 值为 null 的字段与缺省等同，校验规则也是这样对待的
fn normalize(raw: &JsonValue) -> JsonValue {
    let mut value = raw.clone();
    if let JsonValue::Object(map) = &mut value {
        map.retain(|_, v| !v.is_null());
    }
    // 整个类别为 null 等同于未作答
    if let Some(JsonValue::Object(scores)) = value.get_mut("scores") {
        scores.retain(|_, items| !items.is_null());
    }
    if let Some(JsonValue::String(band)) = value.get_mut("employeeCount") {
        *band = band.trim().to_string();
    }
    value
}

/// 计算提交内容指纹：`sub-` + SHA-256 前 16 位十六进制
///
/// serde_json 的对象按键排序，序列化结果即规范形式。
pub fn content_fingerprint(raw: &JsonValue) -> String {
    let canonical = match raw {
        JsonValue::Object(map) => {
            let mut map = map.clone();
            for key in FINGERPRINT_EXCLUDED {
                map.remove(key);
            }
            JsonValue::Object(map).to_string()
        }
        other => other.to_string(),
    };

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("sub-{}", &digest[..16])
}
