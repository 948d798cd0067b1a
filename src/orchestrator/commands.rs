//! 交互命令解析
//!
//! 把一行输入解析为 [`Command`]。行号从 1 开始，与 `list` 的显示一致。

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::error::ValidationError;
use crate::models::{option_index, option_label, FieldEdit, MAX_OPTION_COUNT};

/// 命令解析错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("未知命令: {0}，输入 help 查看帮助")]
    Unknown(String),
    #[error("用法: {0}")]
    Usage(&'static str),
    #[error("行号必须是正整数: {0}")]
    BadRow(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// 一条交互命令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Key(String),
    Load(PathBuf),
    /// 进入多行粘贴模式
    Paste,
    Text,
    Clear,
    Extract,
    List,
    Show(usize),
    Set {
        row: usize,
        field: Field,
        value: String,
    },
    Add,
    Del(usize),
    Confirm,
    Discard,
    Export,
    Quit,
}

/// 粘贴模式的结束标记
pub const PASTE_END: &str = ".";

pub const HELP_TEXT: &str = "\
命令:
  key <API Key>                设置 API Key（只保存在内存中）
  load <路径>                  读取 .txt / .docx 文件作为题目文本
  paste                        粘贴多行文本，单独一行 . 结束
  text                         查看当前题目文本
  clear                        清空题目文本
  extract                      AI 解析题目文本
  list                         查看题目列表
  show <行号>                  查看一道题的全部字段
  set <行号> <字段> <值>        修改字段
                               字段: description/问题描述, type/题型, answer/正确答案,
                                     score/分值, difficulty/难度, explanation/答案说明,
                                     a..f / optionA.. / 选项A..
  add                          新增一道空白题
  del <行号>                   删除一道题
  confirm / discard            覆盖或放弃解析期间暂存的结果
  export                       导出导入模板 Excel
  quit                         退出";

/// 可编辑字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Description,
    Type,
    CorrectAnswer,
    Score,
    Difficulty,
    Explanation,
    /// 选项下标，0 为 A
    Option(usize),
}

impl Field {
    /// 把输入的值转换为字段修改
    pub fn edit(self, value: &str) -> Result<FieldEdit, ValidationError> {
        Ok(match self {
            Field::Description => FieldEdit::Description(value.to_string()),
            Field::Type => FieldEdit::Type(value.parse()?),
            Field::CorrectAnswer => FieldEdit::CorrectAnswer(value.to_string()),
            Field::Score => FieldEdit::Score(parse_score(value)?),
            Field::Difficulty => FieldEdit::Difficulty(value.parse()?),
            Field::Explanation => FieldEdit::Explanation(value.to_string()),
            Field::Option(index) => FieldEdit::Option(index, value.to_string()),
        })
    }
}

impl FromStr for Field {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_end_matches('*').to_lowercase();
        let field = match name.as_str() {
            "description" | "desc" | "问题描述" => Field::Description,
            "type" | "题型" => Field::Type,
            "answer" | "correctanswer" | "正确答案" => Field::CorrectAnswer,
            "score" | "分值" => Field::Score,
            "difficulty" | "难度" => Field::Difficulty,
            "explanation" | "答案说明" => Field::Explanation,
            other => {
                let label = other
                    .strip_prefix("option")
                    .or_else(|| other.strip_prefix("选项"));
                let index = match label {
                    Some(label) => option_index(label),
                    None if other.chars().count() == 1 => option_index(other),
                    None => None,
                };
                match index {
                    Some(index) if index >= MAX_OPTION_COUNT => {
                        return Err(ValidationError::InvalidValue {
                            field: format!("选项(A-{})", option_label(MAX_OPTION_COUNT - 1)),
                            value: s.trim().to_string(),
                        })
                    }
                    Some(index) => Field::Option(index),
                    None => return Err(ValidationError::UnknownField(s.trim().to_string())),
                }
            }
        };
        Ok(field)
    }
}

fn parse_score(value: &str) -> Result<f64, ValidationError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "分值".to_string(),
            value: value.trim().to_string(),
        })
}

/// 取出第一个词，返回 (词, 剩余部分)
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim_start()),
        None => (s, ""),
    }
}

fn parse_row(raw: &str, usage: &'static str) -> Result<usize, CommandError> {
    if raw.is_empty() {
        return Err(CommandError::Usage(usage));
    }
    match raw.parse::<usize>() {
        Ok(row) if row > 0 => Ok(row),
        _ => Err(CommandError::BadRow(raw.to_string())),
    }
}

/// 解析一行输入，空行返回 `None`
pub fn parse_command(line: &str) -> Option<Result<Command, CommandError>> {
    let (word, rest) = split_word(line);
    if word.is_empty() {
        return None;
    }
    let rest = rest.trim_end();

    let command = match word.to_lowercase().as_str() {
        "help" | "h" | "?" | "帮助" => Ok(Command::Help),
        "key" => {
            if rest.is_empty() {
                Err(CommandError::Usage("key <API Key>"))
            } else {
                Ok(Command::Key(rest.to_string()))
            }
        }
        "load" => {
            let path = rest.trim_matches(|c| c == '"' || c == '\'');
            if path.is_empty() {
                Err(CommandError::Usage("load <路径>"))
            } else {
                Ok(Command::Load(PathBuf::from(path)))
            }
        }
        "paste" => Ok(Command::Paste),
        "text" => Ok(Command::Text),
        "clear" => Ok(Command::Clear),
        "extract" | "parse" => Ok(Command::Extract),
        "list" | "ls" => Ok(Command::List),
        "show" => parse_row(rest, "show <行号>").map(Command::Show),
        "set" => parse_set(rest),
        "add" => Ok(Command::Add),
        "del" | "rm" => parse_row(rest, "del <行号>").map(Command::Del),
        "confirm" => Ok(Command::Confirm),
        "discard" => Ok(Command::Discard),
        "export" => Ok(Command::Export),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        _ => Err(CommandError::Unknown(word.to_string())),
    };
    Some(command)
}

fn parse_set(rest: &str) -> Result<Command, CommandError> {
    const USAGE: &str = "set <行号> <字段> <值>";
    let (row, rest) = split_word(rest);
    let (field, value) = split_word(rest);
    if field.is_empty() {
        return Err(CommandError::Usage(USAGE));
    }
    Ok(Command::Set {
        row: parse_row(row, USAGE)?,
        field: field.parse()?,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, QuestionType};

    fn parse(line: &str) -> Result<Command, CommandError> {
        parse_command(line).expect("non-empty line")
    }

    #[test]
    fn test_blank_line() {
        assert!(parse_command("   ").is_none());
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("help").unwrap(), Command::Help);
        assert_eq!(parse(" EXTRACT ").unwrap(), Command::Extract);
        assert_eq!(parse("quit").unwrap(), Command::Quit);
        assert_eq!(parse("del 2").unwrap(), Command::Del(2));
        assert_eq!(parse("show 1").unwrap(), Command::Show(1));
        assert!(matches!(parse("dance"), Err(CommandError::Unknown(_))));
    }

    #[test]
    fn test_load_keeps_spaces_in_path() {
        assert_eq!(
            parse("load \"my exam.docx\"").unwrap(),
            Command::Load(PathBuf::from("my exam.docx"))
        );
        assert!(matches!(parse("load"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_set_value_keeps_inner_spacing() {
        assert_eq!(
            parse("set 3 description 请问  UMU 是什么？").unwrap(),
            Command::Set {
                row: 3,
                field: Field::Description,
                value: "请问  UMU 是什么？".to_string(),
            }
        );
    }

    #[test]
    fn test_set_clears_with_empty_value() {
        assert_eq!(
            parse("set 1 答案说明").unwrap(),
            Command::Set {
                row: 1,
                field: Field::Explanation,
                value: String::new(),
            }
        );
    }

    #[test]
    fn test_bad_rows() {
        assert!(matches!(parse("del 0"), Err(CommandError::BadRow(_))));
        assert!(matches!(parse("del x"), Err(CommandError::BadRow(_))));
        assert!(matches!(parse("set"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_field_names() {
        assert_eq!("题型*".parse::<Field>().unwrap(), Field::Type);
        assert_eq!("Score".parse::<Field>().unwrap(), Field::Score);
        assert_eq!("b".parse::<Field>().unwrap(), Field::Option(1));
        assert_eq!("optionE".parse::<Field>().unwrap(), Field::Option(4));
        assert_eq!("选项F".parse::<Field>().unwrap(), Field::Option(5));
        assert!(matches!(
            "weight".parse::<Field>(),
            Err(ValidationError::UnknownField(_))
        ));
    }

    #[test]
    fn test_field_edit_values() {
        assert_eq!(
            Field::Type.edit("多选题").unwrap(),
            FieldEdit::Type(QuestionType::Multiple)
        );
        assert_eq!(
            Field::Difficulty.edit("易").unwrap(),
            FieldEdit::Difficulty(Difficulty::Easy)
        );
        assert_eq!(Field::Score.edit("12.5").unwrap(), FieldEdit::Score(12.5));
        assert!(Field::Score.edit("abc").is_err());
        assert!(Field::Score.edit("NaN").is_err());
        assert!(Field::Type.edit("判断题").is_err());
    }

    #[test]
    fn test_invalid_field_in_set() {
        assert!(matches!(
            parse("set 1 weight 3"),
            Err(CommandError::Invalid(ValidationError::UnknownField(_)))
        ));
    }

    #[test]
    fn test_option_letters_stop_at_z() {
        assert_eq!("optionZ".parse::<Field>().unwrap(), Field::Option(25));
        assert!(matches!(
            "optionAA".parse::<Field>(),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse("set 1 optionZZZZZZZZZZZZZ x"),
            Err(CommandError::Invalid(ValidationError::InvalidValue { .. }))
        ));
    }
}
