//! # Question Sheet
//!
//! 把考试题目文本解析为结构化题目，并导出为题库导入模板 Excel 的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 只暴露能力，不认识题目
//! - `docx` - 从 Word 文档提取纯文本
//! - `clients/` - OpenAI 兼容接口的结构化输出调用
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `text_source` - 读取上传文件的文本
//! - `ExtractionService` - AI 解析能力
//! - `TemplateExporter` - 导出导入模板能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 会话状态与题目集合
//! - `RecordStore` - 有序、可编辑的题目集合
//! - `AppState` - 事件驱动的状态转换
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 交互会话，执行后台解析与导出
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Difficulty, FieldEdit, QuestionRecord, QuestionType};
pub use orchestrator::App;
pub use services::{ExtractionService, TemplateExporter};
pub use workflow::{Action, AppState, Effect, RecordStore};
