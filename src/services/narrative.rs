//! 叙述文本服务 - 业务能力层
//!
//! 报告中的自由文本由外部服务（兼容 OpenAI API 的 LLM）生成，这里只负责：
//! 1. 为每个槽位准备提示词
//! 2. 带超时、重试、指数退避地获取文本
//! 3. 失败时记录原因，由报告组装使用占位文本
//!
//! 这是整条流水线中唯一需要等待外部调用的步骤。

use anyhow::{anyhow, Result};
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::benchmark::BenchmarkComparison;
use crate::models::diagnosis::DiagnosisResult;
use crate::models::report::{NarrativeSlots, NARRATIVE_SLOTS};
use crate::models::strategy::StrategyMatrix;
use crate::models::submission::SubmissionRecord;

const SYSTEM_PROMPT: &str = "你是一名企业数字化与 AI 转型顾问。请根据给定的诊断数据撰写简洁、专业的中文分析，\
                             只使用给出的数字，不要编造数据，不要输出 Markdown 标题。";

/// 单个槽位的生成请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeRequest {
    pub slot: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// 叙述文本来源
#[async_trait]
pub trait NarrativeSource: Send + Sync {
    /// 来源是否可用；不可用时直接使用占位文本，不做重试
    fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, request: &NarrativeRequest) -> Result<String>;
}

/// 兼容 OpenAI API 的 LLM 来源
pub struct LlmNarrativeSource {
    client: Client<OpenAIConfig>,
    model_name: String,
    enabled: bool,
}

impl LlmNarrativeSource {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            enabled: config.narrative_enabled(),
        }
    }
}

#[async_trait]
impl NarrativeSource for LlmNarrativeSource {
    fn is_available(&self) -> bool {
        self.enabled
    }

    async fn generate(&self, request: &NarrativeRequest) -> Result<String> {
        debug!(
            "调用 LLM 生成叙述，槽位: {}，模型: {}",
            request.slot, self.model_name
        );

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(request.system_prompt.as_str())
            .build()?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(request.user_prompt.as_str())
            .build()?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.3)
            .max_tokens(800u32)
            .build()?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| anyhow!("LLM API 调用失败: {}", e))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }
}

/// 固定文本来源，按槽位返回预先给定的文本
///
/// 用于离线运行和测试；未登记的槽位返回错误。
#[derive(Debug, Clone, Default)]
pub struct StaticNarrativeSource {
    texts: BTreeMap<String, String>,
}

impl StaticNarrativeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, slot: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.insert(slot.into(), text.into());
        self
    }
}

#[async_trait]
impl NarrativeSource for StaticNarrativeSource {
    async fn generate(&self, request: &NarrativeRequest) -> Result<String> {
        self.texts
            .get(&request.slot)
            .cloned()
            .ok_or_else(|| anyhow!("槽位 {} 没有预置文本", request.slot))
    }
}

/// 超时与重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 单次请求的超时
    pub timeout: Duration,
    /// 首次失败后的重试次数
    pub max_retries: u32,
    /// 首次重试前的等待，之后每次翻倍
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_millis(config.narrative_timeout_ms),
            max_retries: config.narrative_max_retries,
            backoff: Duration::from_millis(config.narrative_backoff_ms),
        }
    }

    /// 第 `retry` 次重试（从 0 开始）前的等待时间
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(retry))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// 叙述文本获取器
pub struct NarrativeFetcher {
    source: Arc<dyn NarrativeSource>,
    policy: RetryPolicy,
}

impl NarrativeFetcher {
    pub fn new(source: Arc<dyn NarrativeSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// 并发获取所有槽位；任何槽位失败都不会中断，只记录原因
    pub async fn fetch_all(
        &self,
        submission_id: &str,
        requests: &[NarrativeRequest],
    ) -> NarrativeSlots {
        let mut slots = NarrativeSlots::default();

        if !self.source.is_available() {
            debug!("[{}] 叙述来源不可用，全部使用占位文本", submission_id);
            for request in requests {
                slots
                    .failures
                    .insert(request.slot.clone(), "叙述服务未配置".to_string());
            }
            return slots;
        }

        let results = join_all(requests.iter().map(|request| self.fetch(request))).await;

        for (request, result) in requests.iter().zip(results) {
            match result {
                Ok(text) => {
                    slots.texts.insert(request.slot.clone(), text);
                }
                Err(e) => {
                    warn!(
                        "[{}] ⚠️ 叙述槽位 {} 获取失败，使用占位文本: {:#}",
                        submission_id, request.slot, e
                    );
                    slots.failures.insert(request.slot.clone(), format!("{:#}", e));
                }
            }
        }
        slots
    }

    /// 获取单个槽位：每次请求都有超时，失败后按指数退避重试
    pub async fn fetch(&self, request: &NarrativeRequest) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            let generate = self.source.generate(request);
            let outcome = match tokio::time::timeout(self.policy.timeout, generate).await {
                Ok(Ok(text)) if !text.trim().is_empty() => return Ok(text),
                Ok(Ok(_)) => anyhow!("返回内容为空"),
                Ok(Err(e)) => e,
                Err(_) => anyhow!("请求超时 ({}ms)", self.policy.timeout.as_millis()),
            };

            if attempt >= self.policy.max_retries {
                return Err(outcome.context(format!("已尝试 {} 次", attempt + 1)));
            }

            let delay = self.policy.delay_for(attempt);
            debug!(
                "槽位 {} 第 {} 次尝试失败: {}，{}ms 后重试",
                request.slot,
                attempt + 1,
                outcome,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// 生成叙述所需的全部数据
pub struct NarrativeContext<'a> {
    pub record: &'a SubmissionRecord,
    pub diagnosis: &'a DiagnosisResult,
    pub benchmark: &'a BenchmarkComparison,
    pub strategy: &'a StrategyMatrix,
}

/// 为每个槽位构建提示词，槽位顺序同报告章节
pub fn build_requests(ctx: &NarrativeContext<'_>) -> Vec<NarrativeRequest> {
    NARRATIVE_SLOTS
        .iter()
        .map(|slot| NarrativeRequest {
            slot: slot.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: user_prompt(slot, ctx),
        })
        .collect()
}

fn user_prompt(slot: &str, ctx: &NarrativeContext<'_>) -> String {
    let d = ctx.diagnosis;
    let header = format!(
        "企业：{}\n总分：{:.2}（等级 {}，{}）\n同行百分位：{:.1}\n",
        ctx.record.company_name,
        d.total_score,
        d.grade,
        d.maturity.label,
        ctx.benchmark.total_percentile
    );

    let categories = d
        .categories
        .iter()
        .map(|c| match c.normalized {
            Some(score) => format!("- {}：{:.2}（目标 {:.0}）", c.name, score, c.target),
            None => format!("- {}：作答不足，未计入总分", c.name),
        })
        .collect::<Vec<_>>()
        .join("\n");

    let task = match slot {
        "executive_summary" => "请用 3-4 句话概括该企业的整体成熟度与最突出的问题。".to_string(),
        "category_insights" => format!("各类别得分如下：\n{}\n请逐类给出一句点评。", categories),
        "benchmark_commentary" => {
            let tiers = &ctx.benchmark.total_tiers;
            format!(
                "同行分布：P25 {:.1} / 中位数 {:.1} / P75 {:.1} / P90 {:.1}（基准：{}）。\n请说明该企业在同行中的位置。",
                tiers.p25, tiers.median, tiers.p75, tiers.p90, ctx.benchmark.matched_entry
            )
        }
        "strategy_commentary" => {
            let pairs = ctx
                .strategy
                .quadrants()
                .iter()
                .flat_map(|(quadrant, entries)| {
                    entries.iter().map(move |e| {
                        format!("- {}：{} × {}", quadrant, e.internal.name, e.external)
                    })
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("TOWS 组合如下：\n{}\n请为每个象限给出一条行动建议。", pairs)
        }
        _ => format!(
            "各类别得分如下：\n{}\n请给出分三个阶段（3 个月 / 6 个月 / 12 个月）的改进路线图。",
            categories
        ),
    };

    format!("{}\n{}", header, task)
}
