//! AI 解析服务 - 业务能力层
//!
//! 只负责"题目原文 → 题目记录列表"的能力，不关心流程
//!
//! ## 技术栈
//! - 通过 `LlmClient`（`async-openai`）调用 OpenAI 兼容接口
//! - 使用 JSON Schema 约束输出，返回内容在边界处用 serde 校验
//! - 默认指向 Gemini 的 OpenAI 兼容端点

use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::clients::LlmClient;
use crate::config::Config;
use crate::error::{AppResult, ExtractionError, ValidationError};
use crate::models::{Difficulty, QuestionRecord, QuestionType, DEFAULT_OPTION_COUNT};
use crate::utils::log_extraction_summary;

const SCHEMA_NAME: &str = "question_list";

/// 模型最多可填写的选项字段（optionA..optionF）
const SCHEMA_OPTION_FIELDS: [&str; 6] = [
    "optionA", "optionB", "optionC", "optionD", "optionE", "optionF",
];

const SYSTEM_PROMPT: &str = "你是一个从文本中提取考试题目的助手。只输出符合给定 JSON 结构的数据，不要输出任何解释。";

/// AI 解析服务
///
/// 职责：
/// - 请求前校验输入
/// - 构造提示词和输出结构
/// - 把模型返回映射为带默认值的题目记录
/// - 不接触记录集合
pub struct ExtractionService {
    config: Config,
}

impl ExtractionService {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// 把题目原文解析为题目记录
    ///
    /// # 参数
    /// - `text`: 题目原文
    /// - `api_key`: 会话中的 API Key
    ///
    /// # 返回
    /// 按原文顺序排列的题目；模型返回空内容时为空列表
    pub async fn extract(&self, text: &str, api_key: &str) -> AppResult<Vec<QuestionRecord>> {
        validate_request(text, api_key)?;

        let client = LlmClient::new(&self.config, api_key.trim())?;
        info!(
            "🤖 开始 AI 解析，文本 {} 个字符，模型: {}",
            text.chars().count(),
            client.model_name()
        );
        let started = Instant::now();

        let reply = client
            .chat_structured(SYSTEM_PROMPT, &build_user_message(text), SCHEMA_NAME, response_schema())
            .await?;

        if let Some(reason) = reply.refusal_reason() {
            warn!("LLM 拒绝了请求: {}", reason);
            return Err(ExtractionError::Refused { reason }.into());
        }

        let batch_millis = chrono::Utc::now().timestamp_millis();
        let records = match reply.content.as_deref() {
            Some(content) if !content.trim().is_empty() => parse_response(content, batch_millis)?,
            _ => {
                info!("LLM 返回内容为空，视为没有题目");
                Vec::new()
            }
        };

        log_extraction_summary(&records, started.elapsed().as_millis());
        Ok(records)
    }
}

/// 请求前校验（不发起任何网络请求）
pub fn validate_request(text: &str, api_key: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    if api_key.trim().is_empty() {
        return Err(ValidationError::MissingCredential);
    }
    Ok(())
}

/// 构建用户消息
fn build_user_message(text: &str) -> String {
    format!(
        r#"请分析下面的文本，提取其中的考试题目。

规则：
1. 题型：'单选题'、'多选题' 或 '开放式问题'。
2. 选项：依次填入 optionA、optionB、optionC、optionD，超过四个时继续使用 optionE、optionF。开放式问题不填选项。
3. 正确答案：
   - 单选题：一个字母（例如 'A'），不区分大小写
   - 多选题：字母直接连写（例如 'ABC'），不区分大小写
   - 开放式问题：答案文本，有多个答案时用反斜杠 \ 分隔（例如 '答案1\答案2'）
4. 难度：'易'、'中'、'难'，未注明时为 '中'。
5. 分值：未注明时单选题 10 分，多选题 20 分，开放式问题 10 分。
6. 答案说明：原文有解析时提取，否则为空字符串。

待解析文本：
{}"#,
        text
    )
}

/// 模型输出结构
pub fn response_schema() -> Value {
    let mut item_properties = json!({
        "description": { "type": "string", "description": "题目内容" },
        "type": {
            "type": "string",
            "enum": QuestionType::ALL.iter().map(|t| t.label()).collect::<Vec<_>>()
        },
        "correctAnswer": {
            "type": "string",
            "description": "单选题为一个选项字母；多选题为连写字母如 ABC，字母不区分大小写；开放式问题为答案文本，多个答案用反斜杠 \\ 分隔"
        },
        "score": { "type": "number" },
        "difficulty": {
            "type": "string",
            "enum": Difficulty::ALL.iter().map(|d| d.label()).collect::<Vec<_>>()
        },
        "explanation": { "type": "string" }
    });
    if let Some(map) = item_properties.as_object_mut() {
        for field in SCHEMA_OPTION_FIELDS {
            map.insert(field.to_string(), json!({ "type": "string" }));
        }
    }

    json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": item_properties,
                    "required": ["description", "type", "correctAnswer"]
                }
            }
        },
        "required": ["questions"]
    })
}

// ========== 返回内容映射 ==========

#[derive(Debug, Deserialize)]
struct RawResponse {
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    description: String,
    #[serde(rename = "type")]
    question_type: QuestionType,
    correct_answer: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    difficulty: Option<Difficulty>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    option_a: Option<String>,
    #[serde(default)]
    option_b: Option<String>,
    #[serde(default)]
    option_c: Option<String>,
    #[serde(default)]
    option_d: Option<String>,
    #[serde(default)]
    option_e: Option<String>,
    #[serde(default)]
    option_f: Option<String>,
}

impl RawQuestion {
    fn into_record(self, id: String) -> QuestionRecord {
        let score = match self.score {
            Some(s) if s.is_finite() && s > 0.0 => s,
            _ => self.question_type.default_score(),
        };

        let mut options: Vec<String> = [
            self.option_a,
            self.option_b,
            self.option_c,
            self.option_d,
            self.option_e,
            self.option_f,
        ]
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect();
        while options.len() > DEFAULT_OPTION_COUNT
            && options.last().is_some_and(|o| o.trim().is_empty())
        {
            options.pop();
        }

        QuestionRecord {
            id,
            description: self.description,
            question_type: self.question_type,
            correct_answer: self.correct_answer,
            score,
            difficulty: self.difficulty.unwrap_or_default(),
            explanation: self.explanation.unwrap_or_default(),
            options,
        }
    }
}

/// 去掉部分兼容网关会包上的 Markdown 代码块
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if let Ok(re) = Regex::new(r"(?s)^```[a-zA-Z]*\s*\n?(.*?)\s*```$") {
        if let Some(inner) = re.captures(trimmed).and_then(|c| c.get(1)) {
            return inner.as_str();
        }
    }
    trimmed
}

/// 解析模型返回的 JSON 文本
///
/// # 参数
/// - `content`: 模型返回的非空文本
/// - `batch_millis`: 本批次的时间戳，用于生成 `q-<毫秒>-<序号>` 形式的 id
pub fn parse_response(
    content: &str,
    batch_millis: i64,
) -> Result<Vec<QuestionRecord>, ExtractionError> {
    let json_text = strip_code_fence(content);
    let parsed: RawResponse =
        serde_json::from_str(json_text).map_err(|e| {
            warn!("LLM 返回内容无法解析: {}", e);
            debug!("无法解析的内容: {}", json_text);
            ExtractionError::NonConforming {
                message: e.to_string(),
            }
        })?;

    Ok(parsed
        .questions
        .into_iter()
        .enumerate()
        .map(|(index, raw)| raw.into_record(format!("q-{}-{}", batch_millis, index)))
        .collect())
}
