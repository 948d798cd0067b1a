use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppResult, ValidationError};
use crate::models::QuestionRecord;
use crate::orchestrator::commands::{parse_command, Command, HELP_TEXT, PASTE_END};
use crate::orchestrator::table_view::{render_record, render_table};
use crate::services::{read_text_file, ExtractionService, TemplateExporter};
use crate::workflow::{Action, AppState, BannerLevel, Effect};

type ExtractionResult = AppResult<Vec<QuestionRecord>>;

/// 交互式会话
///
/// 持有会话状态和各项服务；只做调度，具体判断都在 `AppState` 中。
pub struct App {
    state: AppState,
    extraction: Arc<ExtractionService>,
    exporter: TemplateExporter,
    /// 粘贴模式下累积的行
    paste_buffer: Option<Vec<String>>,
    task: Option<JoinHandle<()>>,
    results_tx: mpsc::UnboundedSender<ExtractionResult>,
    results_rx: mpsc::UnboundedReceiver<ExtractionResult>,
}

/// 一行输入处理完之后是否继续
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl App {
    pub fn new(config: Config) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            state: AppState::new(config.llm_api_key.clone()),
            extraction: Arc::new(ExtractionService::new(&config)),
            exporter: TemplateExporter::new(&config),
            paste_buffer: None,
            task: None,
            results_tx,
            results_rx,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// 运行交互循环，直到 `quit` 或输入结束
    pub async fn run(mut self) -> Result<()> {
        println!("{}", HELP_TEXT);
        if self.state.api_key.is_empty() {
            println!("\n提示: 尚未设置 API Key，请先输入 key <API Key>");
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        prompt(self.paste_buffer.is_some());

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("输入结束，退出");
                        break;
                    };
                    if self.handle_line(&line).await == Flow::Quit {
                        break;
                    }
                    prompt(self.paste_buffer.is_some());
                }
                Some(result) = self.results_rx.recv() => {
                    self.task = None;
                    self.finish_extraction(result);
                    prompt(self.paste_buffer.is_some());
                }
            }
        }

        if let Some(task) = self.task.take() {
            debug!("退出时取消进行中的解析请求");
            task.abort();
        }
        info!("👋 会话结束");
        Ok(())
    }

    /// 处理一行输入
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        if let Some(buffer) = self.paste_buffer.as_mut() {
            if line.trim() == PASTE_END {
                let text = buffer.join("\n");
                self.paste_buffer = None;
                self.dispatch(Action::AppendText(text)).await;
                println!("已粘贴，当前文本共 {} 个字符", self.state.text.chars().count());
            } else {
                buffer.push(line.to_string());
            }
            return Flow::Continue;
        }

        let command = match parse_command(line) {
            None => return Flow::Continue,
            Some(Ok(command)) => command,
            Some(Err(e)) => {
                println!("{}", e);
                return Flow::Continue;
            }
        };

        match command {
            Command::Help => println!("{}", HELP_TEXT),
            Command::Key(key) => self.dispatch(Action::SetCredential(key)).await,
            Command::Load(path) => {
                let result = read_text_file(&path).await;
                self.dispatch(Action::FileLoaded(result)).await;
            }
            Command::Paste => {
                println!("请粘贴题目文本，单独一行 {} 结束", PASTE_END);
                self.paste_buffer = Some(Vec::new());
            }
            Command::Text => {
                if self.state.text.is_empty() {
                    println!("（文本为空）");
                } else {
                    println!("{}", self.state.text);
                }
            }
            Command::Clear => self.dispatch(Action::SetText(String::new())).await,
            Command::Extract => self.dispatch(Action::RequestExtraction).await,
            Command::List => println!("{}", render_table(self.state.store.records())),
            Command::Show(row) => match self.row_id(row) {
                Ok(id) => {
                    if let Some(record) = self.state.store.get(&id) {
                        println!("{}", render_record(row, record));
                    }
                }
                Err(e) => println!("{}", e),
            },
            Command::Set { row, field, value } => {
                let target = self.row_id(row).and_then(|id| Ok((id, field.edit(&value)?)));
                match target {
                    Ok((id, edit)) => self.dispatch(Action::EditRecord { id, edit }).await,
                    Err(e) => println!("{}", e),
                }
            }
            Command::Add => {
                self.dispatch(Action::AddRecord).await;
                println!("已新增第 {} 题", self.state.store.len());
            }
            Command::Del(row) => match self.row_id(row) {
                Ok(id) => self.dispatch(Action::RemoveRecord { id }).await,
                Err(e) => println!("{}", e),
            },
            Command::Confirm => self.dispatch(Action::ConfirmOverwrite).await,
            Command::Discard => self.dispatch(Action::DiscardPending).await,
            Command::Export => self.dispatch(Action::RequestExport).await,
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// 把解析结果交回状态
    pub fn finish_extraction(&mut self, result: ExtractionResult) {
        self.state.dispatch(Action::ExtractionFinished(result));
        self.show_banner();
    }

    /// 等待进行中的解析完成（用于脚本化驱动）
    pub async fn wait_for_extraction(&mut self) {
        if self.task.is_none() {
            return;
        }
        if let Some(result) = self.results_rx.recv().await {
            self.task = None;
            self.finish_extraction(result);
        }
    }

    fn row_id(&self, row: usize) -> Result<String, ValidationError> {
        self.state
            .store
            .id_at(row)
            .map(str::to_string)
            .ok_or(ValidationError::RowOutOfRange {
                row,
                len: self.state.store.len(),
            })
    }

    // ========== 副作用执行 ==========

    async fn dispatch(&mut self, action: Action) {
        let effect = self.state.dispatch(action);
        self.run_effect(effect).await;
        self.show_banner();
    }

    async fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::StartExtraction {
                text,
                api_key,
                base_revision,
            } => {
                debug!("启动解析任务，当前版本 {}", base_revision);
                println!("⏳ 正在解析，期间可以继续操作……");
                let service = Arc::clone(&self.extraction);
                let tx = self.results_tx.clone();
                self.task = Some(tokio::spawn(async move {
                    let result = service.extract(&text, &api_key).await;
                    let _ = tx.send(result);
                }));
            }
            Effect::Export(records) => {
                let result = self.exporter.export(&records).await;
                self.state.dispatch(Action::ExportFinished(result));
            }
        }
    }

    fn show_banner(&mut self) {
        if let Some(banner) = self.state.banner.as_ref() {
            match banner.level {
                BannerLevel::Info => println!("ℹ️  {}", banner.message),
                BannerLevel::Error => println!("❌ {}", banner.message),
            }
            self.state.dispatch(Action::DismissBanner);
        }
    }
}

fn prompt(pasting: bool) {
    if pasting {
        return;
    }
    print!("> ");
    let _ = std::io::stdout().flush();
}
