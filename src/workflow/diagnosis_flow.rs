//! 诊断流程 - 流程层
//!
//! 核心职责：定义"一份提交"的完整处理流程
//!
//! 流程顺序：
//! 1. 校验（结构 → 规则 → 安全），致命错误立即返回
//! 2. 评分 → 基准比较 → 战略合成（纯计算，不等待）
//! 3. 获取叙述文本（唯一的外部调用，失败则占位）
//! 4. 组装报告
//!
//! 调用方要么得到完整的报告，要么得到 `PipelineError`。

use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::PipelineError;
use crate::models::benchmark::{BenchmarkComparison, BenchmarkReference};
use crate::models::diagnosis::DiagnosisResult;
use crate::models::policy::ScoringPolicy;
use crate::models::report::ReportArtifact;
use crate::models::strategy::StrategyMatrix;
use crate::models::trends::TrendCatalog;
use crate::services::narrative::{build_requests, NarrativeContext};
use crate::services::{
    AcceptedSubmission, BenchmarkComparator, CompanyMeta, LlmNarrativeSource, NarrativeFetcher,
    ReportAssembler, RetryPolicy, ScoringEngine, StrategySynthesizer, Validator,
};
use crate::workflow::diagnosis_ctx::DiagnosisCtx;

/// 纯计算阶段的产物
#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub accepted: AcceptedSubmission,
    /// 已填入百分位
    pub result: DiagnosisResult,
    pub benchmark: BenchmarkComparison,
    pub strategy: StrategyMatrix,
}

/// 诊断流程
///
/// - 编排单份提交的完整处理
/// - 只依赖业务能力（services），不持有任何可变状态
/// - 多份提交可以共享同一个实例并发运行
pub struct DiagnosisFlow {
    validator: Validator,
    scoring: ScoringEngine,
    comparator: BenchmarkComparator,
    trends: Arc<TrendCatalog>,
    synthesizer: StrategySynthesizer,
    narrative: NarrativeFetcher,
    assembler: ReportAssembler,
}

impl DiagnosisFlow {
    pub fn new(
        policy: Arc<ScoringPolicy>,
        benchmark: Arc<BenchmarkReference>,
        trends: Arc<TrendCatalog>,
        narrative: NarrativeFetcher,
    ) -> Self {
        Self {
            validator: Validator::with_policy(&policy),
            scoring: ScoringEngine::new(policy),
            comparator: BenchmarkComparator::new(benchmark),
            trends,
            synthesizer: StrategySynthesizer::default(),
            narrative,
            assembler: ReportAssembler::new(),
        }
    }

    /// 按程序配置创建：LLM 叙述来源 + 配置中的重试策略和战略参数
    pub fn from_config(
        config: &Config,
        policy: Arc<ScoringPolicy>,
        benchmark: Arc<BenchmarkReference>,
        trends: Arc<TrendCatalog>,
    ) -> Self {
        let narrative = NarrativeFetcher::new(
            Arc::new(LlmNarrativeSource::new(config)),
            RetryPolicy::from_config(config),
        );
        Self::new(policy, benchmark, trends, narrative).with_synthesizer(StrategySynthesizer::new(
            config.strategy_threshold,
            config.strategy_max_pairs,
        ))
    }

    pub fn with_synthesizer(mut self, synthesizer: StrategySynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// 纯计算阶段：校验 → 评分 → 基准比较 → 战略合成
    pub fn diagnose(&self, raw: Option<&JsonValue>) -> Result<Diagnosis, PipelineError> {
        let accepted = self.validator.accept(raw)?;
        self.analyze(accepted)
    }

    /// 同 [`diagnose`](Self::diagnose)，输入为原始字节
    pub fn diagnose_bytes(&self, bytes: &[u8]) -> Result<Diagnosis, PipelineError> {
        let accepted = self.validator.accept_bytes(bytes)?;
        self.analyze(accepted)
    }

    fn analyze(&self, accepted: AcceptedSubmission) -> Result<Diagnosis, PipelineError> {
        let record = &accepted.record;

        let result = self.scoring.score(record).map_err(|e| {
            error!("[{}] ❌ 无法计算总分: {}", record.submission_id, e);
            PipelineError::from(e)
        })?;

        let meta = CompanyMeta::from(record);
        let benchmark = self.comparator.compare(&result, &meta);
        let result =
            result.with_percentile(benchmark.total_percentile, &benchmark.benchmark_version);

        let tags = self.trends.tags_for(meta.industries.iter().map(String::as_str));
        let strategy = self.synthesizer.synthesize(&result, &benchmark, &tags);

        Ok(Diagnosis {
            accepted,
            result,
            benchmark,
            strategy,
        })
    }

    /// 处理一份原始提交，生成报告
    pub async fn run(
        &self,
        bytes: &[u8],
        ctx: &DiagnosisCtx,
    ) -> Result<ReportArtifact, PipelineError> {
        info!("{} 🔍 开始诊断 ({} 字节)", ctx, bytes.len());
        let diagnosis = self.diagnose_bytes(bytes).map_err(|e| log_failure(ctx, e))?;
        Ok(self.report(diagnosis, ctx).await)
    }

    /// 处理一份已解析的提交，生成报告
    pub async fn run_value(
        &self,
        raw: Option<&JsonValue>,
        ctx: &DiagnosisCtx,
    ) -> Result<ReportArtifact, PipelineError> {
        info!("{} 🔍 开始诊断", ctx);
        let diagnosis = self.diagnose(raw).map_err(|e| log_failure(ctx, e))?;
        Ok(self.report(diagnosis, ctx).await)
    }

    /// 获取叙述文本并组装报告，不会失败
    pub async fn report(&self, diagnosis: Diagnosis, ctx: &DiagnosisCtx) -> ReportArtifact {
        let Diagnosis {
            accepted,
            result,
            benchmark,
            strategy,
        } = diagnosis;

        info!(
            "{} 📊 总分 {:.2} | 等级 {} | 百分位 {:.1} | 基准 {}",
            ctx,
            result.total_score,
            result.grade,
            benchmark.total_percentile,
            benchmark.matched_entry
        );

        let requests = build_requests(&NarrativeContext {
            record: &accepted.record,
            diagnosis: &result,
            benchmark: &benchmark,
            strategy: &strategy,
        });
        let narratives = self
            .narrative
            .fetch_all(&result.submission_id, &requests)
            .await;

        let report = self
            .assembler
            .assemble(&result, &benchmark, &strategy, &narratives);

        if report.metadata.degraded {
            warn!(
                "{} ⚠️ 报告已生成，但包含 {} 条质量提示",
                ctx,
                report.quality_flags.len()
            );
        } else {
            info!("{} ✓ 报告已生成", ctx);
        }
        report
    }
}

fn log_failure(ctx: &DiagnosisCtx, e: PipelineError) -> PipelineError {
    if e.is_fatal() {
        error!("{} ❌ 已终止 ({}): {}", ctx, e.kind(), e);
    } else {
        warn!("{} ⚠️ 未通过 ({}): {}", ctx, e.kind(), e);
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::{NarrativeStatus, NARRATIVE_SLOTS};
    use crate::services::StaticNarrativeSource;
    use serde_json::json;
    use std::time::Duration;

    fn flow() -> DiagnosisFlow {
        let policy: ScoringPolicy =
            toml::from_str(include_str!("../../config/scoring_policy.toml")).unwrap();
        let benchmark: BenchmarkReference =
            toml::from_str(include_str!("../../config/benchmark_reference.toml")).unwrap();
        let trends: TrendCatalog =
            toml::from_str(include_str!("../../config/trend_tags.toml")).unwrap();

        let source = NARRATIVE_SLOTS
            .iter()
            .fold(StaticNarrativeSource::new(), |s, slot| s.with_text(*slot, "文本"));
        let narrative = NarrativeFetcher::new(
            Arc::new(source),
            RetryPolicy {
                timeout: Duration::from_millis(100),
                max_retries: 0,
                backoff: Duration::from_millis(1),
            },
        );
        DiagnosisFlow::new(Arc::new(policy), Arc::new(benchmark), Arc::new(trends), narrative)
    }

    fn submission(score: u8) -> JsonValue {
        let categories = ["strategy", "data", "infrastructure", "talent", "process", "governance"];
        let mut scores = serde_json::Map::new();
        for category in categories {
            let items: serde_json::Map<_, _> = (1..=5)
                .map(|i| (format!("{}_{}", category, i), json!(score)))
                .collect();
            scores.insert(category.to_string(), JsonValue::Object(items));
        }
        json!({
            "companyName": "测试科技",
            "contactName": "王磊",
            "email": "wang@example.com",
            "consent": true,
            "industry": ["制造业"],
            "employeeCount": "50-299",
            "scores": scores
        })
    }

    #[tokio::test]
    async fn test_full_flow() {
        let report = flow()
            .run_value(Some(&submission(4)), &DiagnosisCtx::new(1, "test"))
            .await
            .unwrap();
        assert_eq!(report.metadata.total_score, 80.0);
        assert_eq!(report.metadata.grade, "A");
        assert_eq!(report.benchmark.matched_entry, "manufacturing/50-299");
        assert!(report
            .narratives
            .values()
            .all(|n| n.status == NarrativeStatus::Generated));
        assert!(!report.metadata.degraded);
    }

    #[test]
    fn test_security_violation_stops_before_scoring() {
        let mut raw = submission(3);
        raw["goals"] = json!("<script>alert(1)</script>");
        let err = flow().diagnose(Some(&raw)).unwrap_err();
        assert_eq!(err.kind(), "security_violation");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_nothing_scorable() {
        let mut raw = submission(3);
        raw["scores"] = json!({});
        let err = flow().diagnose(Some(&raw)).unwrap_err();
        assert_eq!(err.kind(), "insufficient_data");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_broken_bytes_are_malformed() {
        let err = flow().diagnose_bytes(br#"{"companyName": "AB""#).unwrap_err();
        assert_eq!(err.kind(), "malformed_input");
    }
}
