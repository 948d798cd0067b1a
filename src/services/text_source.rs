//! 文本获取 - 业务能力层
//!
//! 只负责"上传文件 → 题目原文"的能力：
//! `.docx` 交给文档文本提取，其他文件按纯文本读取。

use encoding_rs::{Encoding, GBK};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::error::FileReadError;
use crate::infrastructure::extract_docx_text;

/// 是否按 Word 文档处理（扩展名不区分大小写）
pub fn is_docx(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("docx"))
        .unwrap_or(false)
}

/// 读取上传文件的文本内容
///
/// # 参数
/// - `path`: 文件路径
///
/// # 返回
/// 成功时返回完整文本；失败时不返回任何部分内容
pub async fn read_text_file(path: &Path) -> Result<String, FileReadError> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| FileReadError::io(path, e))?;

    debug!("读取文件 {}，{} 字节", path.display(), bytes.len());

    let text = if is_docx(path) {
        extract_docx_text(&bytes).map_err(|e| FileReadError::document(path, e.to_string()))?
    } else {
        decode_text(&bytes).ok_or_else(|| FileReadError::Encoding {
            path: path.to_path_buf(),
        })?
    };

    info!(
        "📄 已读取 {}，共 {} 个字符",
        path.file_name().unwrap_or_default().to_string_lossy(),
        text.chars().count()
    );

    Ok(text)
}

/// 按默认编码解码纯文本
///
/// 带 BOM 时按 BOM 指示的编码解码；否则先尝试 UTF-8，失败后回退到 GBK。
/// 两种编码都无法无损解码时返回 `None`。
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return encoding
            .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
            .map(|s| s.into_owned());
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.to_string());
    }

    debug!("文件不是有效的 UTF-8，尝试按 GBK 解码");
    GBK.decode_without_bom_handling_and_without_replacement(bytes)
        .map(|s| s.into_owned())
}
