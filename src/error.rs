use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 用户输入错误（在流程开始前拒绝）
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// 题目约束错误
    #[error("题目错误: {0}")]
    Question(#[from] QuestionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 流程结束但没有产出测验
    #[error("流程结束但未生成测验")]
    NoQuizProduced,
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 构建请求失败
    #[error("构建LLM请求失败: {source}")]
    RequestBuildFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回结果为空
    #[error("LLM返回结果为空 (模型: {model})")]
    EmptyResponse { model: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 响应中找不到 JSON 对象
    #[error("LLM响应中没有JSON对象 ({schema}): {response}")]
    NoJsonFound { schema: String, response: String },
    /// JSON 与要求的结构不符
    #[error("LLM响应不符合结构 {schema}: {source}")]
    MalformedResponse {
        schema: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 用户请求校验错误
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("至少需要一个有效主题")]
    NoTopics,
    #[error("每轮题目数量 {0} 超出范围 [1, 50]")]
    QuestionsPerRoundOutOfRange(u32),
    #[error("质量阈值 {0} 超出范围 [0, 1]")]
    ThresholdOutOfRange(f64),
    #[error("最大重试次数 {0} 超出范围 [0, 10]")]
    MaxAttemptsOutOfRange(u32),
}

/// 题目不变量被破坏
#[derive(Debug, Error, PartialEq)]
pub enum QuestionError {
    #[error("选项必须恰好为 A, B, C, D，实际为 {0:?}")]
    InvalidOptionLabels(Vec<String>),
    #[error("选项 {0} 不能为空")]
    EmptyOption(String),
    #[error("题干过短（至少 {min} 个字符，实际 {actual}）")]
    TextTooShort { min: usize, actual: usize },
    #[error("正确答案 '{0}' 不是 A-D 之一")]
    InvalidCorrectAnswer(String),
    #[error("质量分 {0} 超出范围 [0, 1]")]
    ScoreOutOfRange(f64),
    #[error("难度 '{0}' 无效")]
    InvalidDifficulty(String),
}

/// 配置错误
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// 数值超出允许范围
    #[error("配置项 {name} 的值 {value} 超出范围 [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("JSON序列化失败: {0}")]
    JsonSerializeFailed(#[source] serde_json::Error),
}

// ========== 从常见错误类型转换 ==========

impl From<async_openai::error::OpenAIError> for LlmError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        LlmError::RequestBuildFailed {
            source: Box::new(err),
        }
    }
}

// ========== 便捷构造函数 ==========

impl LlmError {
    /// 创建LLM API调用错误
    pub fn api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        }
    }

    /// 创建结构不符错误
    pub fn malformed(schema: impl Into<String>, source: serde_json::Error) -> Self {
        LlmError::MalformedResponse {
            schema: schema.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// LLM 调用结果类型
pub type LlmResult<T> = Result<T, LlmError>;
