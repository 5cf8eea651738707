use std::time::Duration;

use tracing::warn;

use crate::error::{AppError, AppResult, ConfigError};

/// 程序配置
///
/// 进程启动时构建一次，之后只读，按引用传入编排层和各服务。
#[derive(Clone, Debug)]
pub struct Config {
    // --- 目录服务 API 配置 ---
    pub api_base_url: String,
    pub auth_token: String,
    // --- LLM 配置 ---
    pub llm_api_key: Option<String>,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 每批同时处理的书本数量
    pub window_size: usize,
    /// 批次之间的等待时间
    pub inter_batch_delay: Duration,
    /// 单文件模式下两本书之间的等待时间
    pub single_item_delay: Duration,
    /// 查询检查模式下两次查询之间的等待时间
    pub lookup_delay: Duration,
    /// 同时在途的 HTTP 请求上限
    pub max_connections: usize,
    /// 每个目标主机的空闲连接上限
    pub max_connections_per_host: usize,
    /// 一次运行中全部网络活动的时限
    pub session_timeout: Duration,
    /// 报告输出目录
    pub results_dir: String,
    /// 多书文档路径
    pub input_file: String,
    /// 单文件模式的书本目录
    pub book_folder: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://ashlynprasad-backend.vercel.app/api/v1".to_string(),
            auth_token: String::new(),
            llm_api_key: None,
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4".to_string(),
            window_size: 3,
            inter_batch_delay: Duration::from_millis(2000),
            single_item_delay: Duration::from_millis(1000),
            lookup_delay: Duration::from_millis(500),
            max_connections: 10,
            max_connections_per_host: 5,
            session_timeout: Duration::from_secs(300),
            results_dir: "Results".to_string(),
            input_file: "Multiple books.txt".to_string(),
            book_folder: "Book".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 缺少 `AUTH_TOKEN` 时返回致命错误，其余数值解析失败时回退到默认值。
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意变量来源加载配置（便于测试）
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let auth_token = lookup("AUTH_TOKEN").ok_or_else(|| AppError::missing_env("AUTH_TOKEN"))?;
        if is_placeholder(&auth_token) {
            return Err(AppError::Config(ConfigError::EnvVarPlaceholder {
                var_name: "AUTH_TOKEN".to_string(),
            }));
        }

        let parse_ms = |name: &str, fallback: Duration| {
            lookup(name)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };
        let parse_usize = |name: &str, fallback: usize| {
            lookup(name)
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(fallback)
        };

        Ok(Self {
            api_base_url: lookup("API_BASE_URL").unwrap_or(default.api_base_url),
            auth_token,
            llm_api_key: lookup("LLM_API_KEY")
                .or_else(|| lookup("OPENAI_API_KEY"))
                .filter(|key| !is_placeholder(key)),
            llm_api_base_url: lookup("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: lookup("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            window_size: parse_usize("WINDOW_SIZE", default.window_size).max(1),
            inter_batch_delay: parse_ms("INTER_BATCH_DELAY_MS", default.inter_batch_delay),
            single_item_delay: parse_ms("SINGLE_ITEM_DELAY_MS", default.single_item_delay),
            lookup_delay: parse_ms("LOOKUP_DELAY_MS", default.lookup_delay),
            max_connections: parse_usize("MAX_CONNECTIONS", default.max_connections).max(1),
            max_connections_per_host: parse_usize(
                "MAX_CONNECTIONS_PER_HOST",
                default.max_connections_per_host,
            )
            .max(1),
            session_timeout: lookup("SESSION_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.session_timeout),
            results_dir: lookup("RESULTS_DIR").unwrap_or(default.results_dir),
            input_file: lookup("INPUT_FILE").unwrap_or(default.input_file),
            book_folder: lookup("BOOK_FOLDER").unwrap_or(default.book_folder),
        })
    }

    /// 需要调用 LLM 的模式必须有 API key
    pub fn require_llm_key(&self) -> AppResult<&str> {
        self.llm_api_key
            .as_deref()
            .ok_or_else(|| AppError::missing_env("LLM_API_KEY"))
    }

    /// 检查连接池上限是否大于窗口大小，否则同一窗口内的流程可能互相等待
    pub fn validate_pool(&self) -> bool {
        if self.max_connections <= self.window_size {
            warn!(
                "⚠️ MAX_CONNECTIONS ({}) 不大于 WINDOW_SIZE ({})，窗口内请求会排队",
                self.max_connections, self.window_size
            );
            return false;
        }
        true
    }
}

fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == "your_auth_token_here" || trimmed == "your_api_key_here"
}
