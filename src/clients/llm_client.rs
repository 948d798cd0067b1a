/// LLM API 客户端
///
/// 封装与 OpenAI 兼容接口的一次结构化输出调用，不认识题目
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, FinishReason,
        ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ExtractionError;

/// 一次调用的原始结果
#[derive(Debug, Clone, Default)]
pub struct StructuredReply {
    /// 模型返回的文本（应为 JSON）
    pub content: Option<String>,
    pub finish_reason: Option<FinishReason>,
    /// 模型主动拒绝时的说明
    pub refusal: Option<String>,
}

impl StructuredReply {
    /// 是否被内容风控拦截或被模型拒绝
    pub fn refusal_reason(&self) -> Option<String> {
        if let Some(refusal) = self.refusal.as_deref().filter(|r| !r.trim().is_empty()) {
            return Some(refusal.to_string());
        }
        match self.finish_reason {
            Some(FinishReason::ContentFilter) => Some("content_filter".to_string()),
            _ => None,
        }
    }
}

/// LLM 客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    verbose: bool,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    ///
    /// API Key 由会话提供，不取自配置。自动重试被关闭：一次解析只发一次请求。
    pub fn new(config: &Config, api_key: &str) -> Result<Self, ExtractionError> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.llm_api_base_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Request {
                model: config.llm_model_name.clone(),
                source: OpenAIError::Reqwest(e),
            })?;

        let no_retry = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::ZERO),
            ..Default::default()
        };

        let client = Client::with_config(openai_config)
            .with_http_client(http_client)
            .with_backoff(no_retry);

        Ok(Self {
            client,
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            verbose: config.verbose_logging,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 发送一次要求 JSON Schema 输出的聊天请求
    ///
    /// # 参数
    /// - `system_message`: 系统消息
    /// - `user_message`: 用户消息
    /// - `schema_name`: 输出结构名称
    /// - `schema`: 输出结构（JSON Schema）
    ///
    /// # 返回
    /// 第一个候选结果；没有候选时返回空结果
    pub async fn chat_structured(
        &self,
        system_message: &str,
        user_message: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<StructuredReply, ExtractionError> {
        self.send(system_message, user_message, schema_name, schema)
            .await
            .map_err(|source| {
                warn!("LLM API 调用失败: {}", source);
                ExtractionError::Request {
                    model: self.model_name().to_string(),
                    source,
                }
            })
    }

    async fn send(
        &self,
        system_message: &str,
        user_message: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<StructuredReply, OpenAIError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.chars().count());
        if self.verbose {
            debug!("用户消息: {}", user_message);
        }

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_message)
                    .build()?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_message)
                    .build()?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: schema_name.to_string(),
                    schema: Some(schema),
                    strict: Some(false),
                },
            })
            .build()?;

        let response = self.client.chat().create(request).await?;

        debug!("LLM API 调用成功，候选数量: {}", response.choices.len());

        let reply = response
            .choices
            .into_iter()
            .next()
            .map(|choice| StructuredReply {
                content: choice.message.content,
                finish_reason: choice.finish_reason,
                refusal: choice.message.refusal,
            })
            .unwrap_or_default();

        if self.verbose {
            debug!("LLM 原始返回: {:?}", reply.content);
        }

        Ok(reply)
    }
}
