use std::fmt;

/// 应用程序错误类型
///
/// 只描述"整个运行无法继续"或基础设施层面的错误。
/// 单本书的失败使用 [`ItemError`]，在流程边界被转换为 `ItemOutcome`，不会向上传播。
#[derive(Debug)]
pub enum AppError {
    /// 配置错误（缺少凭证等）
    Config(ConfigError),
    /// 文件操作错误
    File(FileError),
    /// API 调用错误
    Api(ApiError),
    /// LLM 服务错误
    Llm(LlmError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "configuration error: {}", e),
            AppError::File(e) => write!(f, "file error: {}", e),
            AppError::Api(e) => write!(f, "API error: {}", e),
            AppError::Llm(e) => write!(f, "LLM error: {}", e),
            AppError::Other(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Api(e) => Some(e),
            AppError::Llm(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

impl AppError {
    /// 是否属于启动阶段的致命错误（缺少凭证、缺少输入）
    pub fn is_fatal_setup(&self) -> bool {
        matches!(
            self,
            AppError::Config(_)
                | AppError::File(FileError::NotFound { .. })
                | AppError::File(FileError::DirectoryNotFound { .. })
                | AppError::File(FileError::EmptyFile { .. })
                | AppError::File(FileError::NoInputFiles { .. })
                | AppError::File(FileError::ReadFailed { .. })
        )
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量不存在
    EnvVarNotFound { var_name: String },
    /// 环境变量存在但为空或仍是占位值
    EnvVarPlaceholder { var_name: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarNotFound { var_name } => {
                write!(f, "{} not found in environment variables", var_name)
            }
            ConfigError::EnvVarPlaceholder { var_name } => {
                write!(f, "{} is empty or still set to a placeholder value", var_name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 文件不存在
    NotFound { path: String },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 目录不存在
    DirectoryNotFound { path: String },
    /// 文件存在但没有可用文本
    EmptyFile { path: String },
    /// 目录中没有可处理的文件
    NoInputFiles { path: String, extension: String },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::NotFound { path } => write!(f, "file not found: {}", path),
            FileError::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path, source)
            }
            FileError::DirectoryNotFound { path } => write!(f, "folder not found: {}", path),
            FileError::EmptyFile { path } => write!(f, "no content extracted from {}", path),
            FileError::NoInputFiles { path, extension } => {
                write!(f, "no .{} files found in {}", extension, path)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. } | FileError::WriteFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// API 调用错误（传输层）
///
/// HTTP 状态码层面的失败不在这里表达，而是由 `LookupResponse` / `SubmitResponse` 的变体表达。
#[derive(Debug)]
pub enum ApiError {
    /// 网络请求失败
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// JSON 解析失败
    JsonParseFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 客户端构建失败
    ClientBuildFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::RequestFailed { endpoint, source } => {
                write!(f, "request to {} failed: {}", endpoint, source)
            }
            ApiError::JsonParseFailed { endpoint, source } => {
                write!(f, "invalid JSON from {}: {}", endpoint, source)
            }
            ApiError::ClientBuildFailed { source } => {
                write!(f, "failed to build HTTP client: {}", source)
            }
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::RequestFailed { source, .. }
            | ApiError::JsonParseFailed { source, .. }
            | ApiError::ClientBuildFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// LLM 服务错误
#[derive(Debug)]
pub enum LlmError {
    /// API 调用失败
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    EmptyContent { model: String },
    /// 请求构建失败
    RequestBuildFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ApiCallFailed { model, source } => {
                write!(f, "LLM call failed (model: {}): {}", model, source)
            }
            LlmError::EmptyContent { model } => {
                write!(f, "LLM returned empty content (model: {})", model)
            }
            LlmError::RequestBuildFailed { source } => {
                write!(f, "failed to build LLM request: {}", source)
            }
        }
    }
}

impl std::error::Error for LlmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LlmError::ApiCallFailed { source, .. } | LlmError::RequestBuildFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            LlmError::EmptyContent { .. } => None,
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        AppError::File(err)
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        AppError::Api(err)
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        AppError::Llm(err)
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建缺少环境变量错误
    pub fn missing_env(var_name: impl Into<String>) -> Self {
        AppError::Config(ConfigError::EnvVarNotFound {
            var_name: var_name.into(),
        })
    }
}

// ========== 单本书的错误分类 ==========

/// 格式化（LLM 生成）阶段的错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// 生成服务调用失败
    #[error("quiz generation failed: {0}")]
    Upstream(String),
    /// 返回内容不是预期结构的 JSON
    #[error("malformed quiz output: {0}")]
    Malformed(String),
    /// 结构可解析，但违反题目约束
    #[error("invalid quiz structure: {0}")]
    Invalid(String),
    /// 超出本次运行的网络时限
    #[error("quiz generation timed out")]
    Timeout,
}

/// 单本书流程中的终止性错误
///
/// 每一种都只终止当前这本书的流程。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error("{0}")]
    Resolution(String),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("{0}")]
    Submission(String),
    /// 任务 panic 或被取消
    #[error("pipeline task aborted: {0}")]
    Aborted(String),
}

impl ItemError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ItemError::Resolution(_) => FailureKind::ResolutionError,
            ItemError::Format(_) => FailureKind::FormatError,
            ItemError::Submission(_) => FailureKind::SubmissionError,
            ItemError::Aborted(_) => FailureKind::Aborted,
        }
    }
}

/// 失败类型标签，写入 `ItemOutcome`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    ResolutionError,
    FormatError,
    SubmissionError,
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::ResolutionError => "ResolutionError",
            FailureKind::FormatError => "FormatError",
            FailureKind::SubmissionError => "SubmissionError",
            FailureKind::Aborted => "Aborted",
        };
        f.write_str(name)
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
