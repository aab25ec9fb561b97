//! 校验结果数据结构

use serde::{Deserialize, Serialize};
use std::fmt;

/// 严重程度（仅用于分级处理，任何安全违规都会中止流水线）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 字段级错误类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// 必填字段缺失或为 null
    Missing,
    /// 类型不符（期望类型 / 实际类型）
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    /// 字符串长度超出范围（按字符计）
    Length { min: usize, max: usize, actual: usize },
    /// 评分不在 [1, 5] 内
    ScoreOutOfRange { value: i64 },
    /// 格式不符（邮箱、时间戳等）
    InvalidFormat { expected: &'static str },
    /// 枚举值不在允许范围内
    InvalidChoice { allowed: Vec<&'static str> },
    /// 未同意信息使用条款
    ConsentRequired,
    /// 编码往返失败（字节序列损坏）
    Encoding,
}

/// 字段级错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// 字段路径，如 `companyName`、`scores.data.data_1`
    pub field: String,
    #[serde(flatten)]
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// 非阻断警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

/// 安全规则族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatFamily {
    /// 标记 / 脚本注入
    MarkupInjection,
    /// SQL 元字符序列
    SqlInjection,
    /// 原始控制字符
    ControlCharacter,
}

impl ThreatFamily {
    pub fn severity(self) -> Severity {
        match self {
            ThreatFamily::MarkupInjection | ThreatFamily::SqlInjection => Severity::Critical,
            ThreatFamily::ControlCharacter => Severity::High,
        }
    }
}

impl fmt::Display for ThreatFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThreatFamily::MarkupInjection => "markup_injection",
            ThreatFamily::SqlInjection => "sql_injection",
            ThreatFamily::ControlCharacter => "control_character",
        };
        f.write_str(name)
    }
}

/// 安全违规
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityViolation {
    pub family: ThreatFamily,
    pub severity: Severity,
    /// 命中的字段路径（字段名本身命中时以 `#key` 结尾）
    pub field: String,
    /// 截断后的命中片段，控制字符已转义
    pub excerpt: String,
}

impl fmt::Display for SecurityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @ {}: {}",
            self.severity, self.family, self.field, self.excerpt
        )
    }
}

/// 结构性错误类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum MalformedKind {
    /// 载荷为 null 或缺失
    NullPayload,
    /// 无法解析
    Unparseable(String),
    /// 顶层不是对象
    NotAnObject,
    /// 嵌套层级超过上限（自引用结构在序列化后的表现）
    TooDeep { max_depth: usize },
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedKind::NullPayload => write!(f, "载荷为空 (null)"),
            MalformedKind::Unparseable(reason) => write!(f, "无法解析: {}", reason),
            MalformedKind::NotAnObject => write!(f, "顶层必须是对象"),
            MalformedKind::TooDeep { max_depth } => {
                write!(f, "嵌套层级超过 {} (疑似循环结构)", max_depth)
            }
        }
    }
}

/// 一次提交的完整校验结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<FieldError>,
    pub warnings: Vec<ValidationWarning>,
    pub security_violations: Vec<SecurityViolation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malformed: Option<MalformedKind>,
}

impl ValidationResult {
    pub fn malformed(kind: MalformedKind) -> Self {
        Self {
            malformed: Some(kind),
            ..Default::default()
        }
    }

    /// 是否存在任何阻断问题
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty() || self.is_fatal()
    }

    /// 安全违规或结构性错误
    pub fn is_fatal(&self) -> bool {
        self.malformed.is_some() || !self.security_violations.is_empty()
    }

    /// 缺失的必填字段列表
    pub fn missing_fields(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::Missing)
            .map(|e| e.field.as_str())
            .collect()
    }

    /// 最高的安全违规等级
    pub fn highest_severity(&self) -> Option<Severity> {
        self.security_violations.iter().map(|v| v.severity).min()
    }

    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
