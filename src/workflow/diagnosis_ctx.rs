//! 提交处理上下文
//!
//! 封装"我正在处理第几份提交、来自哪个文件"这一信息

use std::fmt::Display;

/// 提交处理上下文
#[derive(Debug, Clone)]
pub struct DiagnosisCtx {
    /// 提交序号（从 1 开始，仅用于日志显示）
    pub index: usize,

    /// 来源（文件名或调用方给出的标识）
    pub source: String,
}

impl DiagnosisCtx {
    pub fn new(index: usize, source: impl Into<String>) -> Self {
        Self {
            index,
            source: source.into(),
        }
    }
}

impl Display for DiagnosisCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[提交 #{} {}]", self.index, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ctx = DiagnosisCtx::new(3, "acme.json");
        assert_eq!(ctx.to_string(), "[提交 #3 acme.json]");
    }
}
