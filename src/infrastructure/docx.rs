//! Word 文档文本提取 - 基础设施层
//!
//! 只负责"docx 字节 → 纯文本"这一个能力：
//! 解压 `word/document.xml`，按段落拼接可见文本。表格按行输出，单元格之间用制表符分隔。

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use thiserror::Error;

const DOCUMENT_PART: &str = "word/document.xml";

/// 文档解析错误
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("不是有效的 DOCX 压缩包: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("缺少文档正文 {DOCUMENT_PART}")]
    MissingBody,
    #[error("读取文档正文失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("文档 XML 格式错误: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// 从 DOCX 字节流提取纯文本
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let mut xml = String::new();
    match archive.by_name(DOCUMENT_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml)?;
        }
        Err(zip::result::ZipError::FileNotFound) => return Err(DocumentError::MissingBody),
        Err(e) => return Err(e.into()),
    }

    extract_document_xml(&xml)
}

/// 从 `word/document.xml` 内容提取纯文本
pub fn extract_document_xml(xml: &str) -> Result<String, DocumentError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut text = TextCollector::default();
    let mut in_text_run = false;
    // 段落属性里的 w:tabs/w:tab 是制表位定义，只有 w:r 内的才是字符
    let mut run_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"r" => run_depth += 1,
                b"t" => in_text_run = true,
                b"tab" if run_depth > 0 => text.push_char('\t'),
                b"br" | b"cr" if run_depth > 0 => text.push_char('\n'),
                b"tc" => text.start_cell(),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if run_depth > 0 => text.push_char('\t'),
                b"br" | b"cr" if run_depth > 0 => text.push_char('\n'),
                b"p" => text.end_paragraph(),
                _ => {}
            },
            Event::Text(t) if in_text_run => text.push_str(&t.unescape()?),
            Event::CData(c) if in_text_run => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) => match e.local_name().as_ref() {
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => in_text_run = false,
                b"p" => text.end_paragraph(),
                b"tc" => text.end_cell(),
                b"tr" => text.end_row(),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text.finish())
}

/// 按段落/表格结构累积文本
#[derive(Default)]
struct TextCollector {
    out: String,
    line: String,
    cell_depth: usize,
    cell: String,
    row: Vec<String>,
}

impl TextCollector {
    fn push_str(&mut self, s: &str) {
        self.line.push_str(s);
    }

    fn push_char(&mut self, c: char) {
        self.line.push(c);
    }

    fn end_paragraph(&mut self) {
        let line = std::mem::take(&mut self.line);
        if line.trim().is_empty() {
            return;
        }
        if self.cell_depth > 0 {
            if !self.cell.is_empty() {
                self.cell.push(' ');
            }
            self.cell.push_str(line.trim());
        } else {
            self.out.push_str(&line);
            self.out.push('\n');
        }
    }

    fn start_cell(&mut self) {
        self.cell_depth += 1;
    }

    fn end_cell(&mut self) {
        // 嵌套表格的内容并入外层单元格
        if self.cell_depth == 1 {
            let cell = std::mem::take(&mut self.cell);
            self.row.push(cell);
        }
        self.cell_depth = self.cell_depth.saturating_sub(1);
    }

    fn end_row(&mut self) {
        if self.cell_depth > 0 {
            return;
        }
        let row = std::mem::take(&mut self.row);
        if row.iter().any(|c| !c.is_empty()) {
            self.out.push_str(&row.join("\t"));
            self.out.push('\n');
        }
    }

    fn finish(mut self) -> String {
        self.end_paragraph();
        self.out.trim().to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    /// 构造只包含正文的最小 DOCX
    pub(crate) fn build_docx(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCUMENT_PART, FileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_paragraphs_and_runs() {
        let bytes = build_docx(
            r#"<w:p><w:r><w:t>1. 请问UMU互动是一款</w:t></w:r><w:r><w:t xml:space="preserve">什么样的产品？</w:t></w:r></w:p>
<w:p><w:r><w:t>A. 体育产品</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>答案：B</w:t><w:tab/><w:t>&lt;单选&gt;</w:t></w:r></w:p>"#,
        );
        let text = extract_docx_text(&bytes).unwrap();
        assert_eq!(
            text,
            "1. 请问UMU互动是一款什么样的产品？\nA. 体育产品\n答案：B\t<单选>"
        );
    }

    #[test]
    fn test_line_break_inside_paragraph() {
        let text = extract_document_xml(
            r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>第一行</w:t><w:br/><w:t>第二行</w:t></w:r></w:p></w:body></w:document>"#,
        )
        .unwrap();
        assert_eq!(text, "第一行\n第二行");
    }

    #[test]
    fn test_tab_stop_definitions_are_not_text() {
        let text = extract_document_xml(
            r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>前言</w:t></w:r></w:p><w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="420"/></w:tabs></w:pPr><w:r><w:t>1. 题目</w:t><w:tab/><w:t>(5分)</w:t></w:r></w:p></w:body></w:document>"#,
        )
        .unwrap();
        assert_eq!(text, "前言\n1. 题目\t(5分)");
    }

    #[test]
    fn test_table_rows() {
        let text = extract_document_xml(
            r#"<w:document xmlns:w="x"><w:body>
<w:p><w:r><w:t>选项表</w:t></w:r></w:p>
<w:tbl><w:tr>
<w:tc><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc>
<w:tc><w:p><w:r><w:t>体育产品</w:t></w:r></w:p><w:p><w:r><w:t>(备注)</w:t></w:r></w:p></w:tc>
</w:tr><w:tr>
<w:tc><w:p><w:r><w:t>B</w:t></w:r></w:p></w:tc>
<w:tc><w:p><w:r><w:t>教育培训产品</w:t></w:r></w:p></w:tc>
</w:tr></w:tbl></w:body></w:document>"#,
        )
        .unwrap();
        assert_eq!(text, "选项表\nA\t体育产品 (备注)\nB\t教育培训产品");
    }

    #[test]
    fn test_not_a_zip() {
        let result = extract_docx_text(b"plain text pretending to be docx");
        assert!(matches!(result, Err(DocumentError::Archive(_))));
    }

    #[test]
    fn test_missing_document_part() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", FileOptions::default())
            .unwrap();
        writer.write_all(b"<styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let result = extract_docx_text(&bytes);
        assert!(matches!(result, Err(DocumentError::MissingBody)));
    }

    #[test]
    fn test_malformed_xml() {
        let result = extract_document_xml("<w:document><w:body><w:p></w:body>");
        assert!(matches!(result, Err(DocumentError::Xml(_))));
    }
}
