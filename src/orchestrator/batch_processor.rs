//! 批量提交处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量提交的处理和资源管理。
//!
//! 1. **应用初始化**：加载评分策略、基准表、趋势标签，创建诊断流程
//! 2. **批量加载**：扫描并加载所有待处理的提交
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：将提交分批次处理，每批完成后再开始下一批
//! 5. **全局统计**：汇总所有提交的处理结果
//!
//! 单份提交的细节全部委托给 `DiagnosisFlow`。

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{
    load_all_submissions, load_benchmark_reference, load_scoring_policy, load_trend_catalog,
    RawSubmission,
};
use crate::services::ArtifactWriter;
use crate::utils::logging;
use crate::workflow::{DiagnosisCtx, DiagnosisFlow};

/// 应用主结构
pub struct App {
    config: Config,
    flow: Arc<DiagnosisFlow>,
    writer: Arc<ArtifactWriter>,
}

/// 处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub success: usize,
    /// 成功但带有质量提示的报告
    pub degraded: usize,
    pub failed: usize,
}

/// 单份提交的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success { degraded: bool },
    Failed,
}

impl App {
    /// 初始化应用：加载并校验全部业务数据文件
    pub async fn initialize(config: Config) -> Result<Self> {
        let policy = load_scoring_policy(Path::new(&config.scoring_policy_file)).await?;
        let benchmark = load_benchmark_reference(Path::new(&config.benchmark_file)).await?;
        let trends = load_trend_catalog(Path::new(&config.trends_file)).await?;

        logging::log_startup(
            config.max_concurrent_submissions,
            &policy.version,
            &benchmark.version,
        );
        if !config.narrative_enabled() {
            warn!("⚠️ 未配置 LLM_API_KEY，报告中的叙述部分将使用占位文本");
        }

        let flow = DiagnosisFlow::from_config(
            &config,
            Arc::new(policy),
            Arc::new(benchmark),
            Arc::new(trends),
        );
        Ok(Self::with_flow(config, flow))
    }

    /// 使用已构建好的流程创建应用
    pub fn with_flow(config: Config, flow: DiagnosisFlow) -> Self {
        let writer = ArtifactWriter::new(&config.output_folder);
        Self {
            config,
            flow: Arc::new(flow),
            writer: Arc::new(writer),
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunStats> {
        info!("\n📁 正在扫描待处理的提交...");
        let submissions = load_all_submissions(Path::new(&self.config.submissions_folder))
            .await
            .context("加载提交失败")?;

        if submissions.is_empty() {
            warn!("⚠️ 没有找到待处理的提交文件，程序结束");
            return Ok(RunStats::default());
        }

        logging::log_submissions_loaded(submissions.len(), self.batch_size());

        let stats = self.process_all(submissions).await?;

        logging::print_final_stats(
            stats.success,
            stats.degraded,
            stats.failed,
            stats.total,
            &self.config.output_folder,
        );
        Ok(stats)
    }

    fn batch_size(&self) -> usize {
        self.config.max_concurrent_submissions.max(1)
    }

    /// 分批处理所有提交
    async fn process_all(&self, submissions: Vec<RawSubmission>) -> Result<RunStats> {
        let batch_size = self.batch_size();
        let semaphore = Arc::new(Semaphore::new(batch_size));
        let total = submissions.len();
        let total_batches = total.div_ceil(batch_size);
        let mut stats = RunStats {
            total,
            ..Default::default()
        };

        for (batch_idx, batch) in submissions.chunks(batch_size).enumerate() {
            let batch_start = batch_idx * batch_size;
            logging::log_batch_start(
                batch_idx + 1,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total,
            );

            let outcomes = self
                .process_batch(batch, batch_start, semaphore.clone())
                .await?;

            let mut batch_success = 0;
            for outcome in outcomes {
                match outcome {
                    Outcome::Success { degraded } => {
                        batch_success += 1;
                        stats.success += 1;
                        if degraded {
                            stats.degraded += 1;
                        }
                    }
                    Outcome::Failed => stats.failed += 1,
                }
            }

            logging::log_batch_complete(batch_idx + 1, batch_success, batch.len());
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch: &[RawSubmission],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<Vec<Outcome>> {
        let mut handles = Vec::with_capacity(batch.len());

        for (idx, submission) in batch.iter().enumerate() {
            let ctx = DiagnosisCtx::new(batch_start + idx + 1, submission.file_name());
            let permit = semaphore.clone().acquire_owned().await?;
            let flow = self.flow.clone();
            let writer = self.writer.clone();
            let bytes = submission.bytes.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                process_one(&flow, &writer, &bytes, &ctx).await
            });
            handles.push((batch_start + idx + 1, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (index, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!("[提交 #{}] 任务执行失败: {}", index, e);
                    outcomes.push(Outcome::Failed);
                }
            }
        }
        Ok(outcomes)
    }
}

/// 处理单份提交并写出结果
async fn process_one(
    flow: &DiagnosisFlow,
    writer: &ArtifactWriter,
    bytes: &[u8],
    ctx: &DiagnosisCtx,
) -> Outcome {
    match flow.run(bytes, ctx).await {
        Ok(report) => match writer.write_report(&report).await {
            Ok(path) => {
                info!("{} 💾 报告已保存: {}", ctx, path.display());
                Outcome::Success {
                    degraded: report.metadata.degraded,
                }
            }
            Err(e) => {
                error!("{} ❌ 报告写入失败: {:#}", ctx, e);
                Outcome::Failed
            }
        },
        Err(e) => {
            if let Err(write_err) = writer.write_failure(&ctx.source, &e).await {
                error!("{} ❌ 失败记录写入失败: {:#}", ctx, write_err);
            }
            Outcome::Failed
        }
    }
}
