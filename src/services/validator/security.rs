//! 安全模式检测
//!
//! 启发式匹配，宁可误报也不漏报。扫描范围是整份提交中的所有字符串，包括对象的键。

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::models::validation::{SecurityViolation, ThreatFamily, ValidationResult};
use crate::services::validator::rules::{walk_strings, RuleContext, ValidationRule};
use crate::utils::logging::truncate_text;

/// 命中片段在报告中保留的最大字符数
const EXCERPT_MAX: usize = 40;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("安全检测正则无效"))
        .collect()
}

static MARKUP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"<\s*/?\s*[A-Za-z!?]",
        r"(?i)javascript\s*:",
        r"(?i)vbscript\s*:",
        r"(?i)data\s*:\s*text/html",
        r"(?i)\bon[a-z]{3,}\s*=",
        r"(?i)&(lt|#0*60|#x0*3c);",
        r"(?i)\bexpression\s*\(",
    ])
});

static SQL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r#"['"`]\s*;"#,
        r"(?i);\s*(drop|delete|insert|update|alter|create|truncate|exec|execute|select|grant|shutdown)\b",
        r"(?i)\bunion\s+(all\s+)?select\b",
        r#"(?i)['"]\s*(or|and)\s+['"]?\w+['"]?\s*=\s*['"]?\w+"#,
        r"(?i)\b(drop|truncate)\s+(table|database)\b",
        r"(?i)\binsert\s+into\b.+\bvalues\b",
        r"(?i)\bdelete\s+from\b",
        r"/\*.*\*/",
        r"(?i)\bxp_cmdshell\b",
        r"(?i)\bwaitfor\s+delay\b",
        r"(?i)\bsleep\s*\(\s*\d+\s*\)",
        r"'\s*--",
    ])
});

/// 换行、回车、制表符之外的 C0 控制字符与 DEL
static CONTROL_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| compile(&[r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]"]));

fn families() -> [(ThreatFamily, &'static [Regex]); 3] {
    [
        (ThreatFamily::MarkupInjection, MARKUP_PATTERNS.as_slice()),
        (ThreatFamily::SqlInjection, SQL_PATTERNS.as_slice()),
        (ThreatFamily::ControlCharacter, CONTROL_PATTERNS.as_slice()),
    ]
}

/// 检测单段文本，返回命中的规则族与片段
pub fn scan_text(text: &str) -> Vec<(ThreatFamily, String)> {
    let mut hits = Vec::new();
    for (family, patterns) in families() {
        if let Some(found) = patterns.iter().find_map(|p| p.find(text)) {
            let excerpt: String = found.as_str().escape_debug().collect();
            hits.push((family, truncate_text(&excerpt, EXCERPT_MAX)));
        }
    }
    hits
}

/// 安全规则：每个 (字段, 规则族) 最多记录一条
pub struct SecurityRule;

impl ValidationRule for SecurityRule {
    fn name(&self) -> &'static str {
        "security"
    }

    fn check(&self, ctx: &RuleContext<'_>, report: &mut ValidationResult) {
        let mut seen = BTreeSet::new();
        for (key, value) in ctx.payload {
            let mut visit = |path: &str, text: &str, _is_key: bool| {
                for (family, excerpt) in scan_text(text) {
                    if seen.insert((path.to_string(), family.to_string())) {
                        report.security_violations.push(SecurityViolation {
                            family,
                            severity: family.severity(),
                            field: path.to_string(),
                            excerpt,
                        });
                    }
                }
            };
            visit(&format!("{}#key", key), key, true);
            walk_strings(value, key, &mut visit);
        }
    }
}
