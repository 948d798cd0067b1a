//! 模板导出服务 - 业务能力层
//!
//! 只负责"题目记录 → 导入模板 xlsx"的能力：
//! 第 1 行为合并的填写须知，第 2 行为表头，第 3 行起每题一行。

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern, Workbook, Worksheet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ExportError;
use crate::models::{option_label, QuestionRecord, DEFAULT_OPTION_COUNT};
use crate::utils::log_export_problems;

/// 工作表名称
pub const SHEET_NAME: &str = "Question Import";

/// 下游导入单批次的最大题目数
pub const MAX_IMPORT_ROWS: usize = 300;

const FONT_NAME: &str = "SimSun";
const FONT_SIZE: f64 = 11.0;
const EMPHASIS_COLOR: u32 = 0xFF0000;
const HEADER_FILL: u32 = 0x006400;

/// 选项列之前的固定列
const FIXED_HEADERS: [&str; 6] = ["问题描述*", "题型*", "正确答案", "分值", "难度", "答案说明"];
const FIXED_WIDTHS: [f64; 6] = [40.0, 15.0, 15.0, 10.0, 10.0, 30.0];
const OPTION_WIDTH: f64 = 25.0;

/// 工作表列数上限（XFD）
const MAX_COLUMNS: u16 = 16_384;

const BANNER_HEIGHT: f64 = 160.0;
const HEADER_HEIGHT: f64 = 30.0;

/// 填写须知，`true` 为红色加粗强调
const BANNER_RUNS: &[(bool, &str)] = &[
    (true, "填写须知：\n"),
    (false, "1.问题描述、题型为必填，其中题型请选择“单选题、多选题、开放式问题”中的一种；\n"),
    (false, "2.正确答案：\n"),
    (false, "   1) 单选题请输入1个选项字母，多选题答案多于1个时，"),
    (true, "多个选项字母之间无需任何符号分隔"),
    (false, "，大小写字母均可；\n"),
    (false, "   2) 开放式问题，如果有标准答案，请输入答案，答案有多个时，答案之间用“\\”（反斜杠）分隔；\n"),
    (false, "3.分值：请输入正整数（不超过五位）或小数（小数点后不超过两位），如果不输入或输入其他非法值，则默认设置为10分；\n"),
    (false, "4.难度：请选择“易、中、难”中的一种，如果不选择，则默认设置为“中”；\n"),
    (false, "5.选项：单选题和多选题的选项，请"),
    (true, "至少输入2个"),
    (false, "，默认有4个选项，如需更多选项，请直接在“选项D”右列添加“选项E”、“选项F”等，如果不需要选项，则选项留空即可；\n"),
    (false, "6.添加问题时请先删除第3-6行的示例数据，"),
    (true, "填写须知（本栏）不需要删除"),
    (false, "；\n"),
    (false, "7.每次批量导入数量"),
    (true, "不超过300条"),
    (false, "，超过请分批次上传。"),
];

/// 模板导出器
pub struct TemplateExporter {
    export_dir: PathBuf,
}

impl TemplateExporter {
    pub fn new(config: &Config) -> Self {
        Self {
            export_dir: PathBuf::from(&config.export_dir),
        }
    }

    /// 生成工作簿并保存到导出目录
    ///
    /// # 参数
    /// - `records`: 按显示顺序排列的题目
    ///
    /// # 返回
    /// 保存后的文件路径 `<导出目录>/question_bank_export_<毫秒>.xlsx`，不覆盖已有文件
    pub async fn export(&self, records: &[QuestionRecord]) -> Result<PathBuf, ExportError> {
        let bytes = self.render(records)?;

        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .map_err(|source| ExportError::Write {
                path: self.export_dir.clone(),
                source,
            })?;

        let millis = chrono::Utc::now().timestamp_millis();
        let (path, mut file) = create_export_file(&self.export_dir, millis).await?;

        let written = async {
            file.write_all(&bytes).await?;
            file.flush().await
        };
        written
            .await
            .map_err(|source| ExportError::Write {
                path: path.clone(),
                source,
            })?;

        info!("💾 已导出 {} 道题到 {}", records.len(), path.display());
        Ok(path)
    }

    /// 生成工作簿字节，不落盘
    pub fn render(&self, records: &[QuestionRecord]) -> Result<Vec<u8>, ExportError> {
        if records.len() > MAX_IMPORT_ROWS {
            warn!(
                "⚠️ 共 {} 道题，超过单次导入上限 {} 条，导入时请分批上传",
                records.len(),
                MAX_IMPORT_ROWS
            );
        }
        let flagged = log_export_problems(records);
        if flagged > 0 {
            warn!("⚠️ {} 道题不满足导入模板要求，仍按原样导出", flagged);
        }

        let option_columns = option_column_count(records);

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        write_layout(worksheet, option_columns)?;
        write_banner(worksheet, option_columns)?;
        write_header(worksheet, option_columns)?;

        let data_format = data_format();
        for (idx, record) in records.iter().enumerate() {
            write_record(worksheet, 2 + idx as u32, record, option_columns, &data_format)?;
        }

        Ok(workbook.save_to_buffer()?)
    }
}

/// 在导出目录下新建文件，同一毫秒内重名时追加序号
///
/// # 返回
/// `question_bank_export_<毫秒>.xlsx`，或 `question_bank_export_<毫秒>_<n>.xlsx`
async fn create_export_file(dir: &Path, millis: i64) -> Result<(PathBuf, File), ExportError> {
    let mut attempt = 0u32;
    loop {
        let file_name = if attempt == 0 {
            format!("question_bank_export_{}.xlsx", millis)
        } else {
            format!("question_bank_export_{}_{}.xlsx", millis, attempt)
        };
        let path = dir.join(file_name);

        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} 已存在，换一个文件名", path.display());
                attempt += 1;
            }
            Err(source) => return Err(ExportError::Write { path, source }),
        }
    }
}

/// 选项列数：至少 A-D，有非空的超出选项时向右扩展
pub fn option_column_count(records: &[QuestionRecord]) -> usize {
    records
        .iter()
        .map(QuestionRecord::used_option_count)
        .max()
        .unwrap_or(0)
        .max(DEFAULT_OPTION_COUNT)
}

/// 表头文字
pub fn header_labels(option_columns: usize) -> Vec<String> {
    FIXED_HEADERS
        .iter()
        .map(|h| h.to_string())
        .chain((0..option_columns).map(|i| format!("选项{}", option_label(i))))
        .collect()
}

fn column(index: usize) -> Result<u16, ExportError> {
    u16::try_from(index)
        .ok()
        .filter(|col| *col < MAX_COLUMNS)
        .ok_or(ExportError::ColumnOutOfRange(index))
}

fn last_col(option_columns: usize) -> Result<u16, ExportError> {
    column(FIXED_HEADERS.len() + option_columns - 1)
}

fn base_font(format: Format) -> Format {
    format.set_font_name(FONT_NAME).set_font_size(FONT_SIZE)
}

fn data_format() -> Format {
    base_font(Format::new())
        .set_border(FormatBorder::Thin)
        .set_text_wrap()
        .set_align(FormatAlign::VerticalCenter)
}

fn write_layout(worksheet: &mut Worksheet, option_columns: usize) -> Result<(), ExportError> {
    for (col, width) in FIXED_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(column(col)?, *width)?;
    }
    for i in 0..option_columns {
        worksheet.set_column_width(column(FIXED_HEADERS.len() + i)?, OPTION_WIDTH)?;
    }
    worksheet.set_row_height(0, BANNER_HEIGHT)?;
    worksheet.set_row_height(1, HEADER_HEIGHT)?;
    Ok(())
}

// ========== 第 1 行：填写须知 ==========

fn write_banner(worksheet: &mut Worksheet, option_columns: usize) -> Result<(), ExportError> {
    let cell_format = base_font(Format::new())
        .set_align(FormatAlign::Top)
        .set_text_wrap();
    let emphasis = base_font(Format::new())
        .set_bold()
        .set_font_color(Color::RGB(EMPHASIS_COLOR));
    let plain = base_font(Format::new()).set_font_color(Color::Black);

    let runs: Vec<(&Format, &str)> = BANNER_RUNS
        .iter()
        .map(|(strong, text)| (if *strong { &emphasis } else { &plain }, *text))
        .collect();

    worksheet.merge_range(0, 0, 0, last_col(option_columns)?, "", &cell_format)?;
    worksheet.write_rich_string_with_format(0, 0, &runs, &cell_format)?;
    Ok(())
}

// ========== 第 2 行：表头 ==========

fn write_header(worksheet: &mut Worksheet, option_columns: usize) -> Result<(), ExportError> {
    let format = base_font(Format::new())
        .set_bold()
        .set_font_color(Color::White)
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::VerticalCenter)
        .set_align(FormatAlign::Left)
        .set_border(FormatBorder::Thin);

    for (col, label) in header_labels(option_columns).iter().enumerate() {
        worksheet.write_string_with_format(1, column(col)?, label, &format)?;
    }
    Ok(())
}

// ========== 第 3 行起：题目 ==========

fn write_record(
    worksheet: &mut Worksheet,
    row: u32,
    record: &QuestionRecord,
    option_columns: usize,
    format: &Format,
) -> Result<(), ExportError> {
    worksheet.write_string_with_format(row, 0, &record.description, format)?;
    worksheet.write_string_with_format(row, 1, record.question_type.label(), format)?;
    worksheet.write_string_with_format(row, 2, &record.correct_answer, format)?;
    worksheet.write_number_with_format(row, 3, record.score, format)?;
    worksheet.write_string_with_format(row, 4, record.difficulty.label(), format)?;
    worksheet.write_string_with_format(row, 5, &record.explanation, format)?;
    for i in 0..option_columns {
        let col = column(FIXED_HEADERS.len() + i)?;
        worksheet.write_string_with_format(row, col, record.option(i), format)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, QuestionType};
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use std::io::Cursor;

    fn sample_records() -> Vec<QuestionRecord> {
        let mut single = QuestionRecord::new_blank("q-1-0");
        single.description = "请问UMU互动是一款什么样的产品？".to_string();
        single.correct_answer = "B".to_string();
        for (i, text) in ["体育产品", "教育培训产品", "金融产品", "医疗产品"].iter().enumerate() {
            single.set_option(i, *text);
        }

        let mut open = QuestionRecord::new_blank("q-1-1");
        open.description = "使用UMU互动的感受？".to_string();
        open.question_type = QuestionType::Open;
        open.score = 12.5;
        open.difficulty = Difficulty::Easy;

        vec![single, open]
    }

    fn read_back(bytes: Vec<u8>) -> calamine::Range<Data> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        workbook.worksheet_range(SHEET_NAME).unwrap()
    }

    fn exporter() -> TemplateExporter {
        TemplateExporter::new(&Config::default())
    }

    #[test]
    fn test_render_layout() {
        let range = read_back(exporter().render(&sample_records()).unwrap());

        assert_eq!(range.height(), 4);
        assert_eq!(range.width(), 10);

        let banner = range.get_value((0, 0)).unwrap().to_string();
        assert!(banner.starts_with("填写须知："));
        assert!(banner.contains("不超过300条"));

        let header: Vec<String> = (0..10)
            .map(|c| range.get_value((1, c)).unwrap().to_string())
            .collect();
        assert_eq!(header, header_labels(4));
        assert_eq!(header[0], "问题描述*");
        assert_eq!(header[9], "选项D");
    }

    #[test]
    fn test_render_rows_in_order() {
        let range = read_back(exporter().render(&sample_records()).unwrap());

        assert_eq!(
            range.get_value((2, 0)),
            Some(&Data::String("请问UMU互动是一款什么样的产品？".to_string()))
        );
        assert_eq!(range.get_value((2, 1)), Some(&Data::String("单选题".to_string())));
        assert_eq!(range.get_value((2, 2)), Some(&Data::String("B".to_string())));
        assert_eq!(range.get_value((2, 3)), Some(&Data::Float(10.0)));
        assert_eq!(range.get_value((2, 4)), Some(&Data::String("中".to_string())));
        assert_eq!(range.get_value((2, 7)), Some(&Data::String("教育培训产品".to_string())));

        assert_eq!(range.get_value((3, 1)), Some(&Data::String("开放式问题".to_string())));
        assert_eq!(range.get_value((3, 3)), Some(&Data::Float(12.5)));
        assert_eq!(range.get_value((3, 4)), Some(&Data::String("易".to_string())));
        assert!(matches!(range.get_value((3, 6)), None | Some(Data::Empty)));
    }

    #[test]
    fn test_render_overflow_columns() {
        let mut records = sample_records();
        records[0].set_option(4, "游戏产品");

        assert_eq!(option_column_count(&records), 5);
        let range = read_back(exporter().render(&records).unwrap());
        assert_eq!(range.width(), 11);
        assert_eq!(range.get_value((1, 10)), Some(&Data::String("选项E".to_string())));
        assert_eq!(range.get_value((2, 10)), Some(&Data::String("游戏产品".to_string())));
    }

    #[test]
    fn test_empty_overflow_does_not_add_columns() {
        let mut records = sample_records();
        records[1].options = vec![String::new(); 6];
        assert_eq!(option_column_count(&records), 4);
    }

    #[test]
    fn test_render_many_records_still_succeeds() {
        let records: Vec<QuestionRecord> = (0..MAX_IMPORT_ROWS + 1)
            .map(|i| {
                let mut q = QuestionRecord::new_blank(format!("new-{}", i));
                q.description = format!("第 {} 题", i + 1);
                q
            })
            .collect();
        let range = read_back(exporter().render(&records).unwrap());
        assert_eq!(range.height(), MAX_IMPORT_ROWS + 3);
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.export_dir = dir.path().join("out").to_string_lossy().into_owned();

        let path = TemplateExporter::new(&config)
            .export(&sample_records())
            .await
            .unwrap();

        assert!(path.starts_with(dir.path().join("out")));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("question_bank_export_"));
        assert!(name.ends_with(".xlsx"));

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(read_back(bytes).height(), 4);
    }

    #[tokio::test]
    async fn test_same_millisecond_exports_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let (first, _) = create_export_file(dir.path(), 1700000000000).await.unwrap();
        let (second, _) = create_export_file(dir.path(), 1700000000000).await.unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with("question_bank_export_1700000000000.xlsx"));
        assert!(second.ends_with("question_bank_export_1700000000000_1.xlsx"));
    }

    #[test]
    fn test_too_many_option_columns_is_error() {
        let mut records = sample_records();
        records[0].options = vec!["x".to_string(); usize::from(MAX_COLUMNS)];
        let err = exporter().render(&records).unwrap_err();
        assert!(matches!(err, ExportError::ColumnOutOfRange(_)));
    }
}
