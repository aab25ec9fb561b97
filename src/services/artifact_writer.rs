//! 结果写入服务 - 业务能力层
//!
//! 只负责"把报告和失败记录写到输出目录"，不关心流程

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::PipelineError;
use crate::models::report::ReportArtifact;

/// 失败记录文件名
pub const FAILURE_LOG: &str = "failures.log";

/// 结果写入服务
///
/// 成功的报告写为 `<submission_id>.json`，失败的提交追加一行到 `failures.log`
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 写入报告，返回文件路径
    pub async fn write_report(&self, report: &ReportArtifact) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("无法创建输出目录: {:?}", self.output_dir))?;

        let path = self
            .output_dir
            .join(format!("{}.json", file_stem(&report.metadata.submission_id)));
        let json = serde_json::to_string_pretty(report).context("报告序列化失败")?;

        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("无法写入报告: {:?}", path))?;

        debug!("报告已写入: {:?}", path);
        Ok(path)
    }

    /// 追加一条失败记录
    ///
    /// 只记录错误类型和摘要，不写入提交的原始内容
    pub async fn write_failure(&self, source: &str, error: &PipelineError) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("无法创建输出目录: {:?}", self.output_dir))?;

        let path = self.output_dir.join(FAILURE_LOG);
        let line = format!(
            "{} | {} | {} | {}\n",
            Utc::now().to_rfc3339(),
            source,
            error.kind(),
            error.to_string().replace('\n', " ")
        );

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("无法打开失败记录: {:?}", path))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("失败记录已写入: {} ({})", source, error.kind());
        Ok(())
    }
}

/// 提交 ID 可能由用户提供，只保留适合做文件名的字符
fn file_stem(submission_id: &str) -> String {
    let stem: String = submission_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "submission".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::validation::MalformedKind;

    #[test]
    fn test_file_stem_is_safe() {
        assert_eq!(file_stem("sub-0123abcd"), "sub-0123abcd");
        assert_eq!(file_stem("../../etc/passwd"), "______etc_passwd");
        assert_eq!(file_stem("提交"), "__");
        assert_eq!(file_stem(""), "submission");
    }

    #[tokio::test]
    async fn test_failures_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("out"));

        writer
            .write_failure("a.json", &PipelineError::Malformed(MalformedKind::NullPayload))
            .await
            .unwrap();
        writer
            .write_failure(
                "b.json",
                &PipelineError::Malformed(MalformedKind::TooDeep { max_depth: 32 }),
            )
            .await
            .unwrap();

        let log = tokio::fs::read_to_string(dir.path().join("out").join(FAILURE_LOG))
            .await
            .unwrap();
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("| a.json | malformed_input |"));
        assert!(lines[1].contains("| b.json |"));
    }
}
