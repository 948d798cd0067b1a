//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责交互会话的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 交互会话
//! - 读取终端输入，把命令转换为状态事件
//! - 执行状态返回的副作用（后台解析、导出）
//! - 解析进行中仍然接受命令（`tokio::select!`）
//!
//! ### `commands` - 命令解析
//! - 行号、字段名、字段值的解析
//!
//! ### `table_view` - 列表展示
//! - 题目列表与单题详情的文本渲染
//!
//! ## 层次关系
//!
//! ```text
//! app (处理一行输入)
//!     ↓
//! workflow::AppState (状态转换，产生副作用)
//!     ↓
//! services (能力层：text_source / extraction / exporter)
//!     ↓
//! clients / infrastructure (LLM 客户端、DOCX 文本提取)
//! ```

pub mod app;
pub mod commands;
pub mod table_view;

pub use app::{App, Flow};
pub use commands::{parse_command, Command, CommandError, Field};
