use crate::models::benchmark::BenchmarkReference;
use crate::models::policy::ScoringPolicy;
use crate::models::trends::TrendCatalog;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;

/// 读取并解析 TOML 文件
async fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", path.display()))?;

    toml::from_str(&content).with_context(|| format!("无法解析TOML文件: {}", path.display()))
}

/// 加载评分策略并检查不变量
pub async fn load_scoring_policy(path: &Path) -> Result<ScoringPolicy> {
    let policy: ScoringPolicy = load_toml(path).await?;
    policy
        .validate()
        .with_context(|| format!("评分策略无效: {}", path.display()))?;

    tracing::info!(
        "已加载评分策略 v{}: {} 个类别, {} 个等级",
        policy.version,
        policy.categories.len(),
        policy.grade_bands.len()
    );
    Ok(policy)
}

/// 加载基准参考表
pub async fn load_benchmark_reference(path: &Path) -> Result<BenchmarkReference> {
    let reference: BenchmarkReference = load_toml(path).await?;
    reference
        .validate()
        .with_context(|| format!("基准参考表无效: {}", path.display()))?;

    tracing::info!(
        "已加载基准参考表 v{}: {} 个条目",
        reference.version,
        reference.entries.len()
    );
    Ok(reference)
}

/// 加载趋势标签目录
pub async fn load_trend_catalog(path: &Path) -> Result<TrendCatalog> {
    let catalog: TrendCatalog = load_toml(path).await?;
    catalog
        .validate()
        .with_context(|| format!("趋势标签无效: {}", path.display()))?;

    tracing::info!(
        "已加载趋势标签 v{}: {} 个行业",
        catalog.version,
        catalog.industries.len()
    );
    Ok(catalog)
}
