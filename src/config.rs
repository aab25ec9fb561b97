/// 程序配置
///
/// 评分策略、基准表、趋势标签等业务数据放在 `config/*.toml` 中，这里只记录文件位置和运行参数。
#[derive(Clone, Debug)]
pub struct Config {
    /// 待诊断的提交（*.json）所在目录
    pub submissions_folder: String,
    /// 报告与失败记录的输出目录
    pub output_folder: String,
    // --- 业务数据文件 ---
    pub scoring_policy_file: String,
    pub benchmark_file: String,
    pub trends_file: String,
    /// 同时处理的提交数量
    pub max_concurrent_submissions: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置（叙述文本） ---
    /// 为空时不调用 LLM，所有叙述槽位使用占位文本
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单次请求超时（毫秒）
    pub narrative_timeout_ms: u64,
    /// 超时或失败后的重试次数
    pub narrative_max_retries: u32,
    /// 首次重试前的等待时间（毫秒），之后每次翻倍
    pub narrative_backoff_ms: u64,
    // --- 战略合成 ---
    pub strategy_threshold: f64,
    pub strategy_max_pairs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            submissions_folder: "submissions".to_string(),
            output_folder: "output".to_string(),
            scoring_policy_file: "config/scoring_policy.toml".to_string(),
            benchmark_file: "config/benchmark_reference.toml".to_string(),
            trends_file: "config/trend_tags.toml".to_string(),
            max_concurrent_submissions: 16,
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            narrative_timeout_ms: 20_000,
            narrative_max_retries: 2,
            narrative_backoff_ms: 500,
            strategy_threshold: 5.0,
            strategy_max_pairs: 3,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            submissions_folder: std::env::var("SUBMISSIONS_FOLDER")
                .unwrap_or(default.submissions_folder),
            output_folder: std::env::var("OUTPUT_FOLDER").unwrap_or(default.output_folder),
            scoring_policy_file: std::env::var("SCORING_POLICY_FILE")
                .unwrap_or(default.scoring_policy_file),
            benchmark_file: std::env::var("BENCHMARK_FILE").unwrap_or(default.benchmark_file),
            trends_file: std::env::var("TRENDS_FILE").unwrap_or(default.trends_file),
            max_concurrent_submissions: env_or(
                "MAX_CONCURRENT_SUBMISSIONS",
                default.max_concurrent_submissions,
            )
            .max(1),
            verbose_logging: env_or("VERBOSE_LOGGING", default.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL")
                .unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            narrative_timeout_ms: env_or("NARRATIVE_TIMEOUT_MS", default.narrative_timeout_ms),
            narrative_max_retries: env_or("NARRATIVE_MAX_RETRIES", default.narrative_max_retries),
            narrative_backoff_ms: env_or("NARRATIVE_BACKOFF_MS", default.narrative_backoff_ms),
            strategy_threshold: env_or("STRATEGY_THRESHOLD", default.strategy_threshold),
            strategy_max_pairs: env_or("STRATEGY_MAX_PAIRS", default.strategy_max_pairs),
        }
    }

    /// 是否配置了 LLM
    pub fn narrative_enabled(&self) -> bool {
        !self.llm_api_key.trim().is_empty()
    }
}
