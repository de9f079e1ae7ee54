use crate::error::ConfigError;

/// 程序配置
///
/// 启动时构建一次，以引用形式传入每个阶段的构造函数
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单次回复的最大 token 数
    pub llm_max_tokens: u32,
    // --- 采样温度 ---
    /// 规划与出题使用的温度（偏高，题目更有趣）
    pub default_temperature: f32,
    pub review_temperature: f32,
    pub validation_temperature: f32,
    // --- 质量控制 ---
    pub quality_threshold: f64,
    pub max_regeneration_attempts: u32,
    // --- 输入输出 ---
    /// 测验请求 TOML 文件
    pub request_file: String,
    /// 测验 JSON 输出路径
    pub output_path: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_max_tokens: 4096,
            default_temperature: 0.8,
            review_temperature: 0.3,
            validation_temperature: 0.1,
            quality_threshold: 0.7,
            max_regeneration_attempts: 3,
            request_file: "quiz.toml".to_string(),
            output_path: "quiz.json".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_max_tokens: std::env::var("LLM_MAX_TOKENS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_max_tokens),
            default_temperature: std::env::var("DEFAULT_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.default_temperature),
            review_temperature: std::env::var("REVIEW_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.review_temperature),
            validation_temperature: std::env::var("VALIDATION_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.validation_temperature),
            quality_threshold: std::env::var("QUALITY_THRESHOLD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.quality_threshold),
            max_regeneration_attempts: std::env::var("MAX_REGENERATIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_regeneration_attempts),
            request_file: std::env::var("QUIZ_REQUEST_FILE").unwrap_or(default.request_file),
            output_path: std::env::var("QUIZ_OUTPUT").unwrap_or(default.output_path),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 校验数值型配置项的范围
    pub fn check(&self) -> Result<(), ConfigError> {
        check_range("DEFAULT_TEMPERATURE", self.default_temperature as f64, 0.0, 1.0)?;
        check_range("REVIEW_TEMPERATURE", self.review_temperature as f64, 0.0, 1.0)?;
        check_range("VALIDATION_TEMPERATURE", self.validation_temperature as f64, 0.0, 1.0)?;
        check_range("QUALITY_THRESHOLD", self.quality_threshold, 0.0, 1.0)?;
        check_range("MAX_REGENERATIONS", self.max_regeneration_attempts as f64, 0.0, 10.0)?;
        Ok(())
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name: name.to_string(),
            value,
            min,
            max,
        })
    }
}
