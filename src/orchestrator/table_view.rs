//! 题目列表的终端展示

use crate::models::{option_label, QuestionRecord, DEFAULT_OPTION_COUNT};
use crate::services::exporter::option_column_count;
use crate::utils::truncate_text;

/// 开放式问题的选项列显示为禁用
const DISABLED_CELL: &str = "—";

const DESCRIPTION_WIDTH: usize = 24;
const OPTION_WIDTH: usize = 10;

/// 分值显示：整数不带小数点
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 && score.abs() < 1e15 {
        format!("{}", score as i64)
    } else {
        format!("{}", score)
    }
}

/// 渲染题目列表，每题一行，行号从 1 开始
pub fn render_table(records: &[QuestionRecord]) -> String {
    if records.is_empty() {
        return "（暂无题目，使用 extract 解析或 add 新增）".to_string();
    }

    let options = option_column_count(records);
    let mut header = vec![
        "#".to_string(),
        "问题描述".to_string(),
        "题型".to_string(),
        "正确答案".to_string(),
        "分值".to_string(),
        "难度".to_string(),
    ];
    header.extend((0..options).map(|i| format!("选项{}", option_label(i))));

    let mut lines = vec![header.join(" | ")];
    for (idx, record) in records.iter().enumerate() {
        let mut cells = vec![
            (idx + 1).to_string(),
            truncate_text(&record.description, DESCRIPTION_WIDTH),
            record.question_type.label().to_string(),
            record.correct_answer.clone(),
            format_score(record.score),
            record.difficulty.label().to_string(),
        ];
        cells.extend((0..options).map(|i| {
            if record.options_active() {
                truncate_text(record.option(i), OPTION_WIDTH)
            } else {
                DISABLED_CELL.to_string()
            }
        }));
        lines.push(cells.join(" | "));
    }
    lines.join("\n")
}

/// 渲染一道题的全部字段
pub fn render_record(row: usize, record: &QuestionRecord) -> String {
    let mut lines = vec![
        format!("第 {} 题 ({})", row, record.id),
        format!("  问题描述: {}", record.description),
        format!("  题型:     {}", record.question_type),
        format!("  正确答案: {}", record.correct_answer),
        format!("  分值:     {}", format_score(record.score)),
        format!("  难度:     {}", record.difficulty),
        format!("  答案说明: {}", record.explanation),
    ];
    let shown = record.used_option_count().max(DEFAULT_OPTION_COUNT);
    for i in 0..shown {
        let value = if record.options_active() {
            record.option(i)
        } else {
            DISABLED_CELL
        };
        lines.push(format!("  选项{}:    {}", option_label(i), value));
    }
    lines.join("\n")
}
