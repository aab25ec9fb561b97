//! 提交校验服务 - 业务能力层
//!
//! 只负责"这份提交能否进入评分"，不关心后续流程。
//!
//! 校验分两步：
//! 1. 结构检查：空载荷、无法解析、顶层不是对象、嵌套过深，任何一项都立即返回
//! 2. 规则流水线：按固定顺序执行全部规则，汇总所有问题，方便调用方一次展示

pub mod rules;
pub mod schema;
pub mod security;

use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, warn};

use crate::error::PipelineError;
use crate::models::policy::ScoringPolicy;
use crate::models::submission::SubmissionRecord;
use crate::models::validation::{MalformedKind, ValidationResult};
use rules::{
    ChoiceRule, ConsentRule, EncodingRule, FormatRule, LengthRule, PresenceRule, RuleContext,
    ScoreRangeRule, TypeRule, UnknownFieldRule, ValidationRule,
};
use security::SecurityRule;

/// 允许的最大嵌套层级
pub const MAX_DEPTH: usize = 32;

/// 通过校验的提交
#[derive(Debug, Clone)]
pub struct AcceptedSubmission {
    pub record: SubmissionRecord,
    /// 可能带有警告
    pub validation: ValidationResult,
}

/// 提交校验服务
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
    known_items: Option<BTreeMap<String, BTreeSet<String>>>,
}

impl Validator {
    /// 使用默认规则创建，不检查未知题目
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
            known_items: None,
        }
    }

    /// 根据评分策略创建，未知类别 / 题目会产生警告
    pub fn with_policy(policy: &ScoringPolicy) -> Self {
        let known_items = policy
            .categories
            .iter()
            .map(|c| (c.id.clone(), c.items.iter().cloned().collect()))
            .collect();
        Self {
            rules: default_rules(),
            known_items: Some(known_items),
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// 解析文本载荷
    pub fn parse(payload: &str) -> Result<JsonValue, MalformedKind> {
        if payload.trim().is_empty() {
            return Err(MalformedKind::NullPayload);
        }
        serde_json::from_str(payload).map_err(|e| MalformedKind::Unparseable(e.to_string()))
    }

    /// 解析字节载荷，非法 UTF-8 有损解码，由编码规则在字段级别报告
    pub fn parse_bytes(bytes: &[u8]) -> Result<JsonValue, MalformedKind> {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::parse(text),
            Err(e) => {
                warn!("载荷包含非法 UTF-8 字节 (位置 {})，按有损方式解码", e.valid_up_to());
                Self::parse(&String::from_utf8_lossy(bytes))
            }
        }
    }

    /// 校验一份提交，`None` 表示载荷缺失
    pub fn validate(&self, raw: Option<&JsonValue>) -> ValidationResult {
        let payload = match raw {
            None | Some(JsonValue::Null) => {
                return ValidationResult::malformed(MalformedKind::NullPayload)
            }
            Some(JsonValue::Object(map)) => map,
            Some(_) => return ValidationResult::malformed(MalformedKind::NotAnObject),
        };

        if let Some(raw) = raw {
            if depth(raw) > MAX_DEPTH {
                return ValidationResult::malformed(MalformedKind::TooDeep {
                    max_depth: MAX_DEPTH,
                });
            }
        }

        let ctx = RuleContext {
            payload,
            known_items: self.known_items.as_ref(),
        };
        let mut report = ValidationResult::default();
        for rule in &self.rules {
            rule.check(&ctx, &mut report);
        }

        debug!(
            "校验完成: {} 个错误, {} 个警告, {} 个安全违规",
            report.errors.len(),
            report.warnings.len(),
            report.security_violations.len()
        );
        report
    }

    /// 校验字节载荷
    pub fn validate_bytes(&self, bytes: &[u8]) -> ValidationResult {
        match Self::parse_bytes(bytes) {
            Ok(value) => self.validate(Some(&value)),
            Err(kind) => ValidationResult::malformed(kind),
        }
    }

    /// 校验并转换为提交记录
    ///
    /// 结构错误与安全违规是致命错误；字段错误汇总后返回给调用方。
    pub fn accept(&self, raw: Option<&JsonValue>) -> Result<AcceptedSubmission, PipelineError> {
        let validation = self.validate(raw);

        if let Some(kind) = &validation.malformed {
            error!("❌ 载荷格式错误: {}", kind);
            return Err(PipelineError::Malformed(kind.clone()));
        }
        if let Some(highest) = validation.highest_severity() {
            error!(
                severity = highest.label(),
                "🛑 提交被拒绝: {} 项安全违规",
                validation.security_violations.len()
            );
            for violation in &validation.security_violations {
                error!(
                    severity = violation.severity.label(),
                    family = %violation.family,
                    field = %violation.field,
                    "🛑 检测到安全违规: {}",
                    violation.excerpt
                );
            }
            return Err(PipelineError::Security(validation.security_violations));
        }
        if !validation.errors.is_empty() {
            warn!(
                "⚠️ 字段校验失败 ({} 项): {}",
                validation.errors.len(),
                validation.error_summary()
            );
            return Err(PipelineError::Validation(Box::new(validation)));
        }

        let raw = raw.ok_or(PipelineError::Malformed(MalformedKind::NullPayload))?;
        let record = SubmissionRecord::from_validated(raw)
            .map_err(|e| PipelineError::Malformed(MalformedKind::Unparseable(e.to_string())))?;

        for warning in &validation.warnings {
            debug!(
                "[{}] 校验警告 {}: {}",
                record.submission_id, warning.field, warning.message
            );
        }

        Ok(AcceptedSubmission { record, validation })
    }

    /// 校验字节载荷并转换为提交记录
    pub fn accept_bytes(&self, bytes: &[u8]) -> Result<AcceptedSubmission, PipelineError> {
        let value = Self::parse_bytes(bytes).map_err(|kind| {
            error!("❌ 载荷格式错误: {}", kind);
            PipelineError::Malformed(kind)
        })?;
        self.accept(Some(&value))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// 规则执行顺序：存在 → 类型 → 长度 / 范围 → 格式 → 安全 → 编码 → 警告
fn default_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(PresenceRule),
        Box::new(TypeRule),
        Box::new(LengthRule),
        Box::new(ScoreRangeRule),
        Box::new(FormatRule),
        Box::new(ChoiceRule),
        Box::new(ConsentRule),
        Box::new(SecurityRule),
        Box::new(EncodingRule),
        Box::new(UnknownFieldRule),
    ]
}

/// 嵌套层级，标量为 0
fn depth(value: &JsonValue) -> usize {
    match value {
        JsonValue::Array(elements) => 1 + elements.iter().map(depth).max().unwrap_or(0),
        JsonValue::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::validation::{Severity, ThreatFamily, ValidationErrorKind};
    use serde_json::json;

    fn valid_payload() -> JsonValue {
        json!({
            "companyName": "AB",
            "contactName": "李娜",
            "email": "a@b.com",
            "consent": true,
            "industry": ["manufacturing"],
            "employeeCount": "50-299",
            "scores": { "data": { "data_1": 3, "data_2": 4 } }
        })
    }

    #[test]
    fn test_valid_submission_has_no_errors() {
        let result = Validator::new().validate(Some(&valid_payload()));
        assert!(!result.has_error(), "{:?}", result);
    }

    #[test]
    fn test_null_and_absent_payload() {
        let v = Validator::new();
        assert_eq!(v.validate(None).malformed, Some(MalformedKind::NullPayload));
        assert_eq!(
            v.validate(Some(&JsonValue::Null)).malformed,
            Some(MalformedKind::NullPayload)
        );
        assert_eq!(
            v.validate_bytes(b"   ").malformed,
            Some(MalformedKind::NullPayload)
        );
    }

    #[test]
    fn test_empty_object_is_not_null() {
        let result = Validator::new().validate(Some(&json!({})));
        assert!(result.malformed.is_none());
        assert_eq!(
            result.missing_fields(),
            vec!["companyName", "contactName", "email", "consent"]
        );
    }

    #[test]
    fn test_unparseable_and_non_object() {
        let v = Validator::new();
        assert!(matches!(
            v.validate_bytes(br#"{"companyName": "AB""#).malformed,
            Some(MalformedKind::Unparseable(_))
        ));
        assert_eq!(
            v.validate(Some(&json!([1, 2]))).malformed,
            Some(MalformedKind::NotAnObject)
        );
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let mut nested = json!("leaf");
        for _ in 0..40 {
            nested = json!({ "child": nested });
        }
        let mut payload = valid_payload();
        payload["extra"] = nested;
        let result = Validator::new().validate(Some(&payload));
        assert_eq!(
            result.malformed,
            Some(MalformedKind::TooDeep {
                max_depth: MAX_DEPTH
            })
        );
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_all_violations_are_aggregated() {
        let payload = json!({
            "companyName": "A",
            "email": "not-an-email",
            "consent": false,
            "scores": { "data": { "data_1": 9 } }
        });
        let result = Validator::new().validate(Some(&payload));
        assert_eq!(result.missing_fields(), vec!["contactName"]);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e.kind, ValidationErrorKind::Length { .. })));
        assert!(result
            .errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::ScoreOutOfRange { value: 9 }));
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e.kind, ValidationErrorKind::InvalidFormat { .. })));
        assert!(result
            .errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::ConsentRequired));
    }

    #[test]
    fn test_invalid_utf8_is_encoding_error_not_security() {
        let mut bytes =
            br#"{"companyName":"AB","contactName":"x","email":"a@b.com","consent":true,"goals":""#
                .to_vec();
        bytes.extend_from_slice(&[0xE4, 0xB8]);
        bytes.extend_from_slice(br#""}"#);

        let result = Validator::new().validate_bytes(&bytes);
        assert!(result.security_violations.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "goals");
        assert_eq!(result.errors[0].kind, ValidationErrorKind::Encoding);
    }

    #[test]
    fn test_accept_security_violation_is_fatal() {
        let mut payload = valid_payload();
        payload["contactName"] = json!("'; DROP TABLE x; --");
        let err = Validator::new().accept(Some(&payload)).unwrap_err();
        assert!(err.is_fatal());
        match err {
            PipelineError::Security(violations) => {
                assert_eq!(violations[0].family, ThreatFamily::SqlInjection);
                assert_eq!(violations[0].field, "contactName");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_highest_severity() {
        let mut payload = valid_payload();
        payload["goals"] = json!("第一行\u{0007}第二行");
        let result = Validator::new().validate(Some(&payload));
        assert_eq!(result.highest_severity(), Some(Severity::High));

        payload["challenges"] = json!("<script>alert(1)</script>");
        let result = Validator::new().validate(Some(&payload));
        assert_eq!(result.highest_severity(), Some(Severity::Critical));

        let clean = Validator::new().validate(Some(&valid_payload()));
        assert_eq!(clean.highest_severity(), None);
    }

    #[test]
    fn test_null_optional_fields_validate_and_accept_alike() {
        let optional = [
            "submissionId",
            "contactPhone",
            "jobTitle",
            "industry",
            "employeeCount",
            "challenges",
            "goals",
            "submittedAt",
            "scores",
        ];
        let validator = Validator::new();
        for field in optional {
            let mut payload = valid_payload();
            payload[field] = JsonValue::Null;

            let result = validator.validate(Some(&payload));
            assert!(!result.has_error(), "{} = null: {:?}", field, result);
            let accepted = validator
                .accept(Some(&payload))
                .unwrap_or_else(|e| panic!("{} = null 被拒绝: {}", field, e));
            assert!(accepted.record.submission_id.starts_with("sub-"));
        }
    }

    #[test]
    fn test_accept_field_errors_are_recoverable() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("companyName");
        let err = Validator::new().accept(Some(&payload)).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_accept_builds_record() {
        let accepted = Validator::new().accept(Some(&valid_payload())).unwrap();
        assert_eq!(accepted.record.company_name, "AB");
        assert_eq!(accepted.record.scores["data"]["data_1"], Some(3));
    }

    #[test]
    fn test_policy_aware_validator_warns_on_unknown_items() {
        let policy: ScoringPolicy =
            toml::from_str(include_str!("../../../config/scoring_policy.toml")).unwrap();
        let mut payload = valid_payload();
        payload["scores"]["data"]["data_99"] = json!(2);
        let accepted = Validator::with_policy(&policy).accept(Some(&payload)).unwrap();
        assert!(accepted
            .validation
            .warnings
            .iter()
            .any(|w| w.field == "scores.data.data_99"));
    }

    #[test]
    fn test_rule_order() {
        assert_eq!(
            Validator::new().rule_names(),
            vec![
                "presence",
                "type",
                "length",
                "score_range",
                "format",
                "choice",
                "consent",
                "security",
                "encoding",
                "unknown_field"
            ]
        );
    }
}
