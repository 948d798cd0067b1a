//! 基础设施层
//!
//! 只暴露能力，不认识题目记录，也不处理业务流程

pub mod docx;

pub use docx::{extract_docx_text, DocumentError};
