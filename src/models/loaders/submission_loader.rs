use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 一份待处理的原始提交
#[derive(Debug, Clone)]
pub struct RawSubmission {
    pub path: PathBuf,
    /// 原始字节，编码检查在校验阶段完成
    pub bytes: Vec<u8>,
}

impl RawSubmission {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

/// 从文件夹中加载所有 JSON 提交，按文件名排序
pub async fn load_all_submissions(folder_path: &Path) -> Result<Vec<RawSubmission>> {
    if !folder_path.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path.display());
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(folder_path)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut submissions = Vec::with_capacity(paths.len());
    for path in paths {
        match fs::read(&path).await {
            Ok(bytes) => {
                tracing::debug!("已读取提交: {} ({} 字节)", path.display(), bytes.len());
                submissions.push(RawSubmission { path, bytes });
            }
            Err(e) => {
                tracing::warn!("读取提交失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(submissions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loads_only_json_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("a.json"), b"null").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();

        let submissions = load_all_submissions(dir.path()).await.unwrap();
        let names: Vec<_> = submissions.iter().map(|s| s.file_name()).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
        assert_eq!(submissions[0].bytes, b"null");
    }

    #[tokio::test]
    async fn test_missing_folder() {
        assert!(load_all_submissions(Path::new("no/such/folder")).await.is_err());
    }
}
