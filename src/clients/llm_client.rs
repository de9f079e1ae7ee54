//! LLM 客户端 - 外部能力
//!
//! 整个流程只依赖一种外部能力："按给定 schema 向模型要一个结构化回复"。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（自定义 API 端点和模型）
//! - schema 由 `schemars` 从输出类型生成

use std::sync::LazyLock;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{LlmError, LlmResult};
use crate::models::responses::StructuredOutput;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").expect("valid regex"));

/// 一次结构化请求
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub schema_name: String,
    pub system: String,
    pub user: String,
    pub schema: JsonValue,
    pub temperature: f32,
}

/// 结构化输出能力
///
/// 返回符合 schema 的 JSON 对象，或者一个 `LlmError`
#[async_trait]
pub trait StructuredLlm: Send + Sync {
    /// 当前使用的模型
    fn model_name(&self) -> &str;

    async fn complete_structured(&self, request: &StructuredRequest) -> LlmResult<JsonValue>;
}

/// 请求类型为 `T` 的结构化回复
pub async fn ask_for<T: StructuredOutput>(
    llm: &dyn StructuredLlm,
    system: &str,
    user: &str,
    temperature: f32,
) -> LlmResult<T> {
    let schema = serde_json::to_value(schemars::schema_for!(T))
        .map_err(|e| LlmError::malformed(T::NAME, e))?;

    let request = StructuredRequest {
        schema_name: T::NAME.to_string(),
        system: system.to_string(),
        user: user.to_string(),
        schema,
        temperature,
    };

    let value = llm.complete_structured(&request).await?;
    serde_json::from_value(value).map_err(|e| LlmError::malformed(T::NAME, e))
}

/// 从模型回复中取出 JSON 对象
///
/// 支持 ```json 代码块，或者回复中第一个 `{` 到最后一个 `}` 的片段
pub fn extract_json(schema_name: &str, response: &str) -> LlmResult<JsonValue> {
    let candidate = if let Some(caps) = FENCED_JSON.captures(response) {
        caps.get(1).map(|m| m.as_str())
    } else {
        match (response.find('{'), response.rfind('}')) {
            (Some(start), Some(end)) if start < end => Some(&response[start..=end]),
            _ => None,
        }
    };

    let candidate = candidate.ok_or_else(|| LlmError::NoJsonFound {
        schema: schema_name.to_string(),
        response: crate::utils::logging::truncate_text(response, 200),
    })?;

    serde_json::from_str(candidate).map_err(|e| LlmError::malformed(schema_name, e))
}

/// OpenAI 兼容接口的客户端
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    max_tokens: u32,
}

impl OpenAiClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            max_tokens: config.llm_max_tokens,
        }
    }

    fn build_system_message(request: &StructuredRequest) -> String {
        let schema = serde_json::to_string_pretty(&request.schema).unwrap_or_default();
        format!(
            "{}\n\nRespond with a single JSON object that conforms to this JSON schema ({}):\n{}\n\nReturn only the JSON object, with no commentary.",
            request.system, request.schema_name, schema
        )
    }
}

#[async_trait]
impl StructuredLlm for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete_structured(&self, request: &StructuredRequest) -> LlmResult<JsonValue> {
        debug!(
            "调用 LLM API，模型: {}，结构: {}",
            self.model_name, request.schema_name
        );
        debug!("用户消息长度: {} 字符", request.user.len());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(Self::build_system_message(request))
            .build()?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(request.user.as_str())
            .build()?;

        let messages = vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(self.max_tokens)
            .build()?;

        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            LlmError::api_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let choice = response.choices.first().ok_or_else(|| LlmError::EmptyResponse {
            model: self.model_name.clone(),
        })?;

        let content = choice
            .message
            .content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        extract_json(&request.schema_name, content)
    }
}
