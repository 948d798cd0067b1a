/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::{info, warn};

use crate::config::Config;
use crate::models::QuestionRecord;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - Excel 题库生成器");
    info!("🤖 模型: {} @ {}", config.llm_model_name, config.llm_api_base_url);
    info!("📁 导出目录: {}", config.export_dir);
    if config.llm_api_key.is_empty() {
        info!("🔑 未配置 API Key，请使用 key 命令设置");
    }
    info!("{}", "=".repeat(60));
}

/// 记录解析结果概要
///
/// # 参数
/// - `records`: 解析得到的题目
/// - `elapsed_ms`: 请求耗时（毫秒）
pub fn log_extraction_summary(records: &[QuestionRecord], elapsed_ms: u128) {
    info!("✓ AI 解析完成，共 {} 道题，耗时 {} ms", records.len(), elapsed_ms);
    for (idx, record) in records.iter().enumerate() {
        info!(
            "  {}. [{}] {}",
            idx + 1,
            record.question_type,
            truncate_text(&record.description, 40)
        );
    }
}

/// 导出前逐条记录模板校验提示
///
/// # 返回
/// 返回存在问题的题目数量
pub fn log_export_problems(records: &[QuestionRecord]) -> usize {
    let mut flagged = 0;
    for (idx, record) in records.iter().enumerate() {
        let problems = record.export_problems();
        if !problems.is_empty() {
            flagged += 1;
            warn!("⚠️ 第 {} 题: {}", idx + 1, problems.join("；"));
        }
    }
    flagged
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
