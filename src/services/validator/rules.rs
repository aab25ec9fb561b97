//! 校验规则
//!
//! 每条规则只关心一件事，互不依赖，按固定顺序执行并把问题追加到同一个结果中。

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::submission::SizeBand;
use crate::models::validation::{
    FieldError, ValidationErrorKind, ValidationResult, ValidationWarning,
};
use crate::services::validator::schema::{
    json_type_name, spec_for, FieldShape, FIELD_SPECS, MAX_INDUSTRY_TAGS,
};

/// 评分允许的范围
pub const SCORE_MIN: i64 = 1;
pub const SCORE_MAX: i64 = 5;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)+$",
    )
    .expect("邮箱正则无效")
});

/// 规则执行时可见的上下文
pub struct RuleContext<'a> {
    pub payload: &'a Map<String, JsonValue>,
    /// 类别 ID → 题目 ID，来自评分策略；为 None 时不检查未知题目
    pub known_items: Option<&'a BTreeMap<String, BTreeSet<String>>>,
}

impl<'a> RuleContext<'a> {
    /// 字段存在且不为 null
    pub fn present(&self, name: &str) -> Option<&'a JsonValue> {
        self.payload.get(name).filter(|v| !v.is_null())
    }
}

/// 单条校验规则
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, ctx: &RuleContext<'_>, report: &mut ValidationResult);
}

fn push_error(
    report: &mut ValidationResult,
    field: impl Into<String>,
    kind: ValidationErrorKind,
    message: impl Into<String>,
) {
    report.errors.push(FieldError {
        field: field.into(),
        kind,
        message: message.into(),
    });
}

fn push_warning(
    report: &mut ValidationResult,
    field: impl Into<String>,
    message: impl Into<String>,
) {
    report.warnings.push(ValidationWarning {
        field: field.into(),
        message: message.into(),
    });
}

/// 必填字段必须存在且不为 null
pub struct PresenceRule;

impl ValidationRule for PresenceRule {
    fn name(&self) -> &'static str {
        "presence"
    }

    fn check(&self, ctx: &RuleContext<'_>, report: &mut ValidationResult) {
        for spec in FIELD_SPECS.iter().filter(|s| s.required) {
            if ctx.present(spec.name).is_none() {
                push_error(
                    report,
                    spec.name,
                    ValidationErrorKind::Missing,
                    "必填字段缺失",
                );
            }
        }
    }
}

/// 字段值必须符合声明的类型
pub struct TypeRule;

impl ValidationRule for TypeRule {
    fn name(&self) -> &'static str {
        "type"
    }

    fn check(&self, ctx: &RuleContext<'_>, report: &mut ValidationResult) {
        for spec in FIELD_SPECS {
            let Some(value) = ctx.present(spec.name) else {
                continue;
            };
            if !spec.shape.matches(value) {
                push_error(
                    report,
                    spec.name,
                    ValidationErrorKind::WrongType {
                        expected: spec.shape.name(),
                        found: json_type_name(value),
                    },
                    format!("应为 {}，实际为 {}", spec.shape.name(), json_type_name(value)),
                );
                continue;
            }
            if spec.shape == FieldShape::StringArray {
                for (i, element) in value.as_array().into_iter().flatten().enumerate() {
                    if !element.is_string() {
                        push_error(
                            report,
                            format!("{}[{}]", spec.name, i),
                            ValidationErrorKind::WrongType {
                                expected: "string",
                                found: json_type_name(element),
                            },
                            format!("数组元素应为 string，实际为 {}", json_type_name(element)),
                        );
                    }
                }
            }
        }
    }
}

/// 字符串长度（按字符计，首尾空白不计）与数组元素数量
pub struct LengthRule;

impl LengthRule {
    fn check_text(
        report: &mut ValidationResult,
        field: String,
        text: &str,
        min: usize,
        max: usize,
    ) {
        let actual = text.trim().chars().count();
        if actual < min || actual > max {
            push_error(
                report,
                field,
                ValidationErrorKind::Length { min, max, actual },
                format!("长度应在 {}-{} 个字符之间，实际为 {}", min, max, actual),
            );
        }
    }
}

impl ValidationRule for LengthRule {
    fn name(&self) -> &'static str {
        "length"
    }

    fn check(&self, ctx: &RuleContext<'_>, report: &mut ValidationResult) {
        for spec in FIELD_SPECS {
            match (spec.shape, ctx.present(spec.name)) {
                (FieldShape::String, Some(JsonValue::String(text))) => {
                    Self::check_text(
                        report,
                        spec.name.to_string(),
                        text,
                        spec.min_len,
                        spec.max_len,
                    );
                }
                (FieldShape::StringArray, Some(JsonValue::Array(elements))) => {
                    if elements.len() > MAX_INDUSTRY_TAGS {
                        push_error(
                            report,
                            spec.name,
                            ValidationErrorKind::Length {
                                min: 0,
                                max: MAX_INDUSTRY_TAGS,
                                actual: elements.len(),
                            },
                            format!("最多 {} 项，实际为 {}", MAX_INDUSTRY_TAGS, elements.len()),
                        );
                    }
                    for (i, element) in elements.iter().enumerate() {
                        if let JsonValue::String(text) = element {
                            Self::check_text(
                                report,
                                format!("{}[{}]", spec.name, i),
                                text,
                                spec.min_len,
                                spec.max_len,
                            );
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// 评分必须是 [1, 5] 内的整数，null 表示未作答
pub struct ScoreRangeRule;

impl ValidationRule for ScoreRangeRule {
    fn name(&self) -> &'static str {
        "score_range"
    }

    fn check(&self, ctx: &RuleContext<'_>, report: &mut ValidationResult) {
        let Some(JsonValue::Object(categories)) = ctx.present("scores") else {
            return;
        };

        for (category_id, items) in categories {
            let category_path = format!("scores.{}", category_id);
            let JsonValue::Object(items) = items else {
                if !items.is_null() {
                    push_error(
                        report,
                        category_path,
                        ValidationErrorKind::WrongType {
                            expected: "object",
                            found: json_type_name(items),
                        },
                        format!("类别评分应为 object，实际为 {}", json_type_name(items)),
                    );
                }
                continue;
            };

            for (item_id, score) in items {
                let path = format!("{}.{}", category_path, item_id);
                match score {
                    JsonValue::Null => {}
                    JsonValue::Number(n) if n.is_i64() || n.is_u64() => {
                        let value = n.as_i64().unwrap_or(i64::MAX);
                        if !(SCORE_MIN..=SCORE_MAX).contains(&value) {
                            push_error(
                                report,
                                path,
                                ValidationErrorKind::ScoreOutOfRange { value },
                                format!(
                                    "评分应在 {}-{} 之间，实际为 {}",
                                    SCORE_MIN, SCORE_MAX, value
                                ),
                            );
                        }
                    }
                    other => {
                        push_error(
                            report,
                            path,
                            ValidationErrorKind::WrongType {
                                expected: "integer",
                                found: json_type_name(other),
                            },
                            format!("评分应为整数，实际为 {}", json_type_name(other)),
                        );
                    }
                }
            }
        }
    }
}

/// 邮箱与时间戳格式
pub struct FormatRule;

impl ValidationRule for FormatRule {
    fn name(&self) -> &'static str {
        "format"
    }

    fn check(&self, ctx: &RuleContext<'_>, report: &mut ValidationResult) {
        if let Some(JsonValue::String(email)) = ctx.present("email") {
            if !EMAIL_PATTERN.is_match(email.trim()) {
                push_error(
                    report,
                    "email",
                    ValidationErrorKind::InvalidFormat {
                        expected: "email address",
                    },
                    "邮箱格式不正确",
                );
            }
        }

        if let Some(JsonValue::String(timestamp)) = ctx.present("submittedAt") {
            if timestamp.parse::<DateTime<Utc>>().is_err() {
                push_error(
                    report,
                    "submittedAt",
                    ValidationErrorKind::InvalidFormat {
                        expected: "RFC 3339 timestamp",
                    },
                    "提交时间必须是 RFC 3339 格式",
                );
            }
        }
    }
}

/// 企业规模必须是枚举值之一
pub struct ChoiceRule;

impl ValidationRule for ChoiceRule {
    fn name(&self) -> &'static str {
        "choice"
    }

    fn check(&self, ctx: &RuleContext<'_>, report: &mut ValidationResult) {
        if let Some(JsonValue::String(band)) = ctx.present("employeeCount") {
            if SizeBand::from_label(band).is_none() {
                push_error(
                    report,
                    "employeeCount",
                    ValidationErrorKind::InvalidChoice {
                        allowed: SizeBand::LABELS.to_vec(),
                    },
                    format!("企业规模 '{}' 不在允许范围内", band),
                );
            }
        }
    }
}

/// 必须同意信息使用条款
pub struct ConsentRule;

impl ValidationRule for ConsentRule {
    fn name(&self) -> &'static str {
        "consent"
    }

    fn check(&self, ctx: &RuleContext<'_>, report: &mut ValidationResult) {
        if let Some(JsonValue::Bool(false)) = ctx.present("consent") {
            push_error(
                report,
                "consent",
                ValidationErrorKind::ConsentRequired,
                "必须同意信息使用条款才能继续",
            );
        }
    }
}

/// 文本值不能包含损坏的字节序列
///
/// 载荷在进入校验前已解码为合法的 UTF-8，原始字节中的损坏只会以 U+FFFD 的形式出现，
/// 检查替换字符即是全部判断。CJK 与 emoji 不受影响。
pub struct EncodingRule;

impl EncodingRule {
    pub fn is_intact(text: &str) -> bool {
        !text.contains(char::REPLACEMENT_CHARACTER)
    }
}

impl ValidationRule for EncodingRule {
    fn name(&self) -> &'static str {
        "encoding"
    }

    fn check(&self, ctx: &RuleContext<'_>, report: &mut ValidationResult) {
        for (key, value) in ctx.payload {
            walk_strings(value, key, &mut |path, text, _is_key| {
                if !Self::is_intact(text) {
                    push_error(
                        report,
                        path,
                        ValidationErrorKind::Encoding,
                        "文本包含损坏的字节序列",
                    );
                }
            });
        }
    }
}

/// 未知字段、未知题目、缺少行业等非阻断问题
pub struct UnknownFieldRule;

impl ValidationRule for UnknownFieldRule {
    fn name(&self) -> &'static str {
        "unknown_field"
    }

    fn check(&self, ctx: &RuleContext<'_>, report: &mut ValidationResult) {
        for key in ctx.payload.keys() {
            if spec_for(key).is_none() {
                push_warning(report, key.as_str(), "未知字段，已忽略");
            }
        }

        let has_industry = matches!(
            ctx.present("industry"),
            Some(JsonValue::Array(tags)) if !tags.is_empty()
        );
        if !has_industry {
            push_warning(report, "industry", "未提供行业，基准比较将使用全行业数据");
        }

        let (Some(known), Some(JsonValue::Object(categories))) =
            (ctx.known_items, ctx.present("scores"))
        else {
            return;
        };
        for (category_id, items) in categories {
            let Some(known_items) = known.get(category_id) else {
                push_warning(
                    report,
                    format!("scores.{}", category_id),
                    "未知类别，已忽略",
                );
                continue;
            };
            if let JsonValue::Object(items) = items {
                for item_id in items.keys() {
                    if !known_items.contains(item_id) {
                        push_warning(
                            report,
                            format!("scores.{}.{}", category_id, item_id),
                            "未知题目，已忽略",
                        );
                    }
                }
            }
        }
    }
}

/// 遍历所有字符串（包括对象的键），回调参数为 (路径, 文本, 是否为键)
pub fn walk_strings(value: &JsonValue, path: &str, visit: &mut dyn FnMut(&str, &str, bool)) {
    match value {
        JsonValue::String(text) => visit(path, text, false),
        JsonValue::Array(elements) => {
            for (i, element) in elements.iter().enumerate() {
                walk_strings(element, &format!("{}[{}]", path, i), visit);
            }
        }
        JsonValue::Object(map) => {
            for (key, child) in map {
                let child_path = format!("{}.{}", path, key);
                visit(&format!("{}#key", child_path), key, true);
                walk_strings(child, &child_path, visit);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(rule: &dyn ValidationRule, payload: JsonValue) -> ValidationResult {
        let mut report = ValidationResult::default();
        let map = payload.as_object().cloned().unwrap_or_default();
        let ctx = RuleContext {
            payload: &map,
            known_items: None,
        };
        rule.check(&ctx, &mut report);
        report
    }

    #[test]
    fn test_presence_treats_null_as_missing() {
        let report = run(
            &PresenceRule,
            json!({ "companyName": null, "email": "a@b.com", "consent": true }),
        );
        assert_eq!(report.missing_fields(), vec!["companyName", "contactName"]);
    }

    #[test]
    fn test_type_is_distinct_from_missing() {
        let report = run(
            &TypeRule,
            json!({ "companyName": 42, "consent": "yes", "industry": ["it", 7] }),
        );
        let fields: Vec<_> = report.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["companyName", "consent", "industry[1]"]);
        assert!(report
            .errors
            .iter()
            .all(|e| matches!(e.kind, ValidationErrorKind::WrongType { .. })));
    }

    #[test]
    fn test_length_bounds() {
        let report = run(
            &LengthRule,
            json!({ "companyName": "A", "challenges": "x".repeat(20_001) }),
        );
        assert_eq!(report.errors.len(), 2);
        assert_eq!(
            report.errors[0].kind,
            ValidationErrorKind::Length {
                min: 2,
                max: 200,
                actual: 1
            }
        );

        let ok = run(&LengthRule, json!({ "companyName": "AB" }));
        assert!(ok.errors.is_empty());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let name = "数".repeat(200);
        let report = run(&LengthRule, json!({ "companyName": name }));
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_score_range() {
        let report = run(
            &ScoreRangeRule,
            json!({
                "scores": {
                    "data": { "d1": 0, "d2": 6, "d3": 3, "d4": null, "d5": 2.5, "d6": "4" }
                }
            }),
        );
        let kinds: Vec<_> = report.errors.iter().map(|e| e.kind.clone()).collect();
        assert_eq!(kinds.len(), 4);
        assert_eq!(kinds[0], ValidationErrorKind::ScoreOutOfRange { value: 0 });
        assert_eq!(kinds[1], ValidationErrorKind::ScoreOutOfRange { value: 6 });
        assert!(matches!(kinds[2], ValidationErrorKind::WrongType { .. }));
        assert!(matches!(kinds[3], ValidationErrorKind::WrongType { .. }));
    }

    #[test]
    fn test_email_format() {
        for good in ["a@b.com", "first.last+tag@sub.example.co"] {
            assert!(run(&FormatRule, json!({ "email": good })).errors.is_empty(), "{}", good);
        }
        for bad in ["a@b", "no-at.example.com", "a@@b.com", "a b@c.com"] {
            assert_eq!(run(&FormatRule, json!({ "email": bad })).errors.len(), 1, "{}", bad);
        }
    }

    #[test]
    fn test_submitted_at_format() {
        assert!(run(&FormatRule, json!({ "submittedAt": "2026-05-01T10:00:00+09:00" }))
            .errors
            .is_empty());
        assert_eq!(
            run(&FormatRule, json!({ "submittedAt": "yesterday" })).errors.len(),
            1
        );
    }

    #[test]
    fn test_choice_and_consent() {
        let report = run(&ChoiceRule, json!({ "employeeCount": "5000" }));
        assert_eq!(report.errors.len(), 1);

        let report = run(&ConsentRule, json!({ "consent": false }));
        assert_eq!(report.errors[0].kind, ValidationErrorKind::ConsentRequired);
    }

    #[test]
    fn test_encoding_accepts_cjk_and_emoji() {
        assert!(EncodingRule::is_intact("数字化转型 디지털 전환 🚀👩‍💻"));
        assert!(!EncodingRule::is_intact("broken \u{FFFD} bytes"));

        let report = run(&EncodingRule, json!({ "goals": "ok", "challenges": "bad\u{FFFD}" }));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field, "challenges");
    }

    #[test]
    fn test_unknown_fields_are_warnings() {
        let mut known = BTreeMap::new();
        known.insert(
            "data".to_string(),
            ["d1".to_string()].into_iter().collect::<BTreeSet<_>>(),
        );
        let map = json!({
            "favoriteColor": "blue",
            "industry": [],
            "scores": { "data": { "d1": 3, "d9": 2 }, "mystery": {} }
        });
        let map = map.as_object().cloned().unwrap();
        let ctx = RuleContext {
            payload: &map,
            known_items: Some(&known),
        };
        let mut report = ValidationResult::default();
        UnknownFieldRule.check(&ctx, &mut report);

        let fields: Vec<_> = report.warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["favoriteColor", "industry", "scores.data.d9", "scores.mystery"]
        );
        assert!(report.errors.is_empty());
    }
}
