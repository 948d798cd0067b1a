//! 会话状态与状态转换
//!
//! 所有界面事件都表示为 [`Action`]，由 [`AppState::dispatch`] 统一处理。
//! 需要异步完成的工作（AI 解析、导出）以 [`Effect`] 的形式交还给调用方，
//! 完成后再以 `*Finished` 事件回到这里。

use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, ExportError, FileReadError};
use crate::models::{option_label, FieldEdit, QuestionRecord, MAX_OPTION_COUNT};
use crate::services::exporter::MAX_IMPORT_ROWS;
use crate::services::validate_request;
use crate::workflow::store::RecordStore;

/// 横幅级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerLevel {
    Info,
    Error,
}

/// 界面上唯一的一条提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub level: BannerLevel,
    pub message: String,
}

impl Banner {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: BannerLevel::Info,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: BannerLevel::Error,
            message: message.into(),
        }
    }
}

/// 界面事件
#[derive(Debug)]
pub enum Action {
    /// 用新文本替换输入框内容
    SetText(String),
    /// 在输入框末尾追加一段文本
    AppendText(String),
    SetCredential(String),
    /// 文件读取完成
    FileLoaded(Result<String, FileReadError>),
    RequestExtraction,
    /// AI 解析完成
    ExtractionFinished(AppResult<Vec<QuestionRecord>>),
    /// 用暂存的解析结果覆盖当前题目
    ConfirmOverwrite,
    /// 放弃暂存的解析结果
    DiscardPending,
    AddRecord,
    EditRecord { id: String, edit: FieldEdit },
    RemoveRecord { id: String },
    RequestExport,
    ExportFinished(Result<PathBuf, ExportError>),
    DismissBanner,
}

/// 需要调用方执行的副作用
#[derive(Debug, PartialEq)]
pub enum Effect {
    None,
    /// 发起一次 AI 解析
    StartExtraction {
        text: String,
        api_key: String,
        base_revision: u64,
    },
    /// 按当前顺序导出这些题目
    Export(Vec<QuestionRecord>),
}

/// 会话状态
#[derive(Debug, Default)]
pub struct AppState {
    /// 输入框中的题目原文
    pub text: String,
    /// 仅保存在内存中
    pub api_key: String,
    pub store: RecordStore,
    /// 是否有解析请求在进行中
    pub busy: bool,
    pub banner: Option<Banner>,
    /// 解析期间题目被修改时暂存的结果，等待确认
    pub pending: Option<Vec<QuestionRecord>>,
    /// 发起解析时的集合版本
    base_revision: Option<u64>,
}

impl AppState {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// 处理一个事件
    ///
    /// # 返回
    /// 需要调用方执行的副作用
    pub fn dispatch(&mut self, action: Action) -> Effect {
        match action {
            Action::SetText(text) => {
                self.text = text;
                Effect::None
            }
            Action::AppendText(text) => {
                if !self.text.is_empty() && !self.text.ends_with('\n') {
                    self.text.push('\n');
                }
                self.text.push_str(&text);
                Effect::None
            }
            Action::SetCredential(key) => {
                self.api_key = key.trim().to_string();
                self.banner = Some(Banner::info("API Key 已设置"));
                Effect::None
            }
            Action::FileLoaded(Ok(text)) => {
                self.banner = Some(Banner::info(format!(
                    "已读取文件，共 {} 个字符",
                    text.chars().count()
                )));
                self.text = text;
                Effect::None
            }
            Action::FileLoaded(Err(e)) => {
                self.fail(e.into());
                Effect::None
            }
            Action::RequestExtraction => self.request_extraction(),
            Action::ExtractionFinished(result) => {
                self.finish_extraction(result);
                Effect::None
            }
            Action::ConfirmOverwrite => {
                match self.pending.take() {
                    Some(records) => self.apply_extraction(records),
                    None => self.banner = Some(Banner::info("没有待确认的解析结果")),
                }
                Effect::None
            }
            Action::DiscardPending => {
                if self.pending.take().is_some() {
                    self.banner = Some(Banner::info("已放弃本次解析结果"));
                }
                Effect::None
            }
            Action::AddRecord => {
                let id = self.store.add();
                info!("➕ 新增题目 {}", id);
                Effect::None
            }
            Action::EditRecord { id, edit } => {
                let options_locked = matches!(edit, FieldEdit::Option(..))
                    && self.store.get(&id).is_some_and(|r| !r.options_active());
                if options_locked {
                    self.banner = Some(Banner::error("开放式问题没有选项"));
                } else if matches!(edit, FieldEdit::Option(index, _) if index >= MAX_OPTION_COUNT) {
                    self.banner = Some(Banner::error(format!(
                        "选项最多到 {}",
                        option_label(MAX_OPTION_COUNT - 1)
                    )));
                } else if !self.store.update(&id, edit) {
                    warn!("修改失败，题目不存在: {}", id);
                    self.banner = Some(Banner::error("题目不存在"));
                }
                Effect::None
            }
            Action::RemoveRecord { id } => {
                if self.store.remove(&id) {
                    info!("🗑️ 删除题目 {}", id);
                } else {
                    self.banner = Some(Banner::error("题目不存在"));
                }
                Effect::None
            }
            Action::RequestExport => {
                if self.store.is_empty() {
                    self.banner = Some(Banner::info("没有可导出的题目"));
                    return Effect::None;
                }
                Effect::Export(self.store.records().to_vec())
            }
            Action::ExportFinished(Ok(path)) => {
                let mut message = format!("已导出到 {}", path.display());
                let flagged = self
                    .store
                    .records()
                    .iter()
                    .filter(|r| !r.export_problems().is_empty())
                    .count();
                if flagged > 0 {
                    message.push_str(&format!("（{} 道题不满足模板要求，详见日志）", flagged));
                }
                if self.store.len() > MAX_IMPORT_ROWS {
                    message.push_str(&format!(
                        "（超过 {} 条，导入时请分批上传）",
                        MAX_IMPORT_ROWS
                    ));
                }
                self.banner = Some(Banner::info(message));
                Effect::None
            }
            Action::ExportFinished(Err(e)) => {
                self.fail(e.into());
                Effect::None
            }
            Action::DismissBanner => {
                self.banner = None;
                Effect::None
            }
        }
    }

    fn request_extraction(&mut self) -> Effect {
        if self.busy {
            self.banner = Some(Banner::info("正在解析，请稍候"));
            return Effect::None;
        }
        if let Err(e) = validate_request(&self.text, &self.api_key) {
            self.fail(e.into());
            return Effect::None;
        }

        let base_revision = self.store.revision();
        self.busy = true;
        self.base_revision = Some(base_revision);
        self.pending = None;
        self.banner = None;

        Effect::StartExtraction {
            text: self.text.clone(),
            api_key: self.api_key.clone(),
            base_revision,
        }
    }

    fn finish_extraction(&mut self, result: AppResult<Vec<QuestionRecord>>) {
        self.busy = false;
        let base_revision = self.base_revision.take();

        let records = match result {
            Ok(records) => records,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        if base_revision.is_some_and(|base| base != self.store.revision()) {
            warn!(
                "⚠️ 解析期间题目已被修改，{} 道新题暂存等待确认",
                records.len()
            );
            self.banner = Some(Banner::info(format!(
                "解析得到 {} 道题，但期间题目已被修改：输入 confirm 覆盖，或 discard 放弃",
                records.len()
            )));
            self.pending = Some(records);
            return;
        }

        self.apply_extraction(records);
    }

    fn apply_extraction(&mut self, records: Vec<QuestionRecord>) {
        let count = records.len();
        self.store.replace_all(records);
        self.banner = Some(if count == 0 {
            Banner::info("没有识别到题目，题目列表已清空")
        } else {
            Banner::info(format!("已解析 {} 道题", count))
        });
    }

    fn fail(&mut self, err: AppError) {
        error!("❌ {}", err);
        self.banner = Some(Banner::error(err.user_message()));
    }
}
