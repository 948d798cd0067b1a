//! 题目记录模型
//!
//! 一条 `QuestionRecord` 对应导入模板中的一行。选项是一个有序、可扩展的序列，
//! 下标 0 为选项A，超出 D 的部分即模板中的“选项E”、“选项F”等。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// 新建记录默认携带的选项数量（A-D）
pub const DEFAULT_OPTION_COUNT: usize = 4;

/// 选项数量上限（A-Z）
pub const MAX_OPTION_COUNT: usize = 26;

/// 选择题至少需要的非空选项数
pub const MIN_CHOICE_OPTIONS: usize = 2;

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuestionType {
    /// 单选题
    #[default]
    #[serde(rename = "单选题")]
    Single,
    /// 多选题
    #[serde(rename = "多选题")]
    Multiple,
    /// 开放式问题
    #[serde(rename = "开放式问题")]
    Open,
}

impl QuestionType {
    pub const ALL: [QuestionType; 3] = [Self::Single, Self::Multiple, Self::Open];

    /// 模板中使用的中文名称
    pub fn label(self) -> &'static str {
        match self {
            QuestionType::Single => "单选题",
            QuestionType::Multiple => "多选题",
            QuestionType::Open => "开放式问题",
        }
    }

    /// 创建记录时使用的默认分值
    pub fn default_score(self) -> f64 {
        match self {
            QuestionType::Multiple => 20.0,
            QuestionType::Single | QuestionType::Open => 10.0,
        }
    }

    /// 是否为选择题（单选/多选）
    pub fn has_options(self) -> bool {
        !matches!(self, QuestionType::Open)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QuestionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "单选题" | "单选" | "single" => Ok(QuestionType::Single),
            "多选题" | "多选" | "multiple" | "multi" => Ok(QuestionType::Multiple),
            "开放式问题" | "开放题" | "简答题" | "open" => Ok(QuestionType::Open),
            _ => Err(ValidationError::InvalidValue {
                field: "题型".to_string(),
                value: trimmed.to_string(),
            }),
        }
    }
}

/// 难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "易")]
    Easy,
    #[default]
    #[serde(rename = "中")]
    Medium,
    #[serde(rename = "难")]
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "易",
            Difficulty::Medium => "中",
            Difficulty::Hard => "难",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "易" | "easy" => Ok(Difficulty::Easy),
            "中" | "medium" => Ok(Difficulty::Medium),
            "难" | "hard" => Ok(Difficulty::Hard),
            _ => Err(ValidationError::InvalidValue {
                field: "难度".to_string(),
                value: trimmed.to_string(),
            }),
        }
    }
}

/// 选项的字母标签（0 -> A, 1 -> B ...）
pub fn option_label(index: usize) -> String {
    let mut n = index;
    let mut label = Vec::new();
    loop {
        label.push((b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    label.iter().rev().collect()
}

/// 把选项字母（A、b、AA…）解析回下标
pub fn option_index(label: &str) -> Option<usize> {
    let label = label.trim();
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut index = 0usize;
    for c in label.chars() {
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize;
        index = index.checked_mul(26)?.checked_add(digit + 1)?;
    }
    Some(index - 1)
}

/// 一道题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    /// 由记录集合分配，用户不可编辑
    pub id: String,
    pub description: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub correct_answer: String,
    pub score: f64,
    pub difficulty: Difficulty,
    pub explanation: String,
    pub options: Vec<String>,
}

impl QuestionRecord {
    /// 全默认值的空白题目
    pub fn new_blank(id: impl Into<String>) -> Self {
        let question_type = QuestionType::default();
        Self {
            id: id.into(),
            description: String::new(),
            question_type,
            correct_answer: String::new(),
            score: question_type.default_score(),
            difficulty: Difficulty::default(),
            explanation: String::new(),
            options: vec![String::new(); DEFAULT_OPTION_COUNT],
        }
    }

    /// 读取第 `index` 个选项，越界时视为空
    pub fn option(&self, index: usize) -> &str {
        self.options.get(index).map(String::as_str).unwrap_or("")
    }

    /// 写入第 `index` 个选项，中间缺失的位置补空串
    ///
    /// 下标不小于 `MAX_OPTION_COUNT` 时不写入，返回 `false`
    pub fn set_option(&mut self, index: usize, text: impl Into<String>) -> bool {
        if index >= MAX_OPTION_COUNT {
            return false;
        }
        if self.options.len() <= index {
            self.options.resize(index + 1, String::new());
        }
        self.options[index] = text.into();
        true
    }

    /// 选项列在界面上是否可编辑（开放式问题禁用）
    pub fn options_active(&self) -> bool {
        self.question_type.has_options()
    }

    /// 最后一个非空选项之后的长度
    pub fn used_option_count(&self) -> usize {
        self.options
            .iter()
            .rposition(|o| !o.trim().is_empty())
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// 按字段替换一个值，不做任何校验
    pub fn apply(&mut self, edit: FieldEdit) {
        match edit {
            FieldEdit::Description(v) => self.description = v,
            FieldEdit::Type(t) => self.question_type = t,
            FieldEdit::CorrectAnswer(v) => self.correct_answer = v,
            FieldEdit::Score(s) => self.score = s,
            FieldEdit::Difficulty(d) => self.difficulty = d,
            FieldEdit::Explanation(v) => self.explanation = v,
            FieldEdit::Option(index, v) => {
                self.set_option(index, v);
            }
        }
    }

    /// 导入模板的填写须知里能检查出的问题（仅提示，不阻止导出）
    pub fn export_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.description.trim().is_empty() {
            problems.push("问题描述为空".to_string());
        }
        if self.question_type.has_options() {
            let filled = self.options.iter().filter(|o| !o.trim().is_empty()).count();
            if filled < MIN_CHOICE_OPTIONS {
                problems.push(format!(
                    "{}至少需要 {} 个选项，当前 {} 个",
                    self.question_type, MIN_CHOICE_OPTIONS, filled
                ));
            }
        }
        if !self.score.is_finite() || self.score <= 0.0 {
            problems.push(format!("分值 {} 非法，导入时将按 10 分处理", self.score));
        }
        problems
    }
}

/// 单个字段的替换
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    Description(String),
    Type(QuestionType),
    CorrectAnswer(String),
    Score(f64),
    Difficulty(Difficulty),
    Explanation(String),
    /// 选项下标（0 为 A）与内容
    Option(usize, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_record_defaults() {
        let q = QuestionRecord::new_blank("new-1");
        assert_eq!(q.question_type, QuestionType::Single);
        assert_eq!(q.difficulty, Difficulty::Medium);
        assert_eq!(q.score, 10.0);
        assert_eq!(q.options.len(), DEFAULT_OPTION_COUNT);
        assert!(q.options.iter().all(String::is_empty));
    }

    #[test]
    fn test_default_score_by_type() {
        assert_eq!(QuestionType::Single.default_score(), 10.0);
        assert_eq!(QuestionType::Multiple.default_score(), 20.0);
        assert_eq!(QuestionType::Open.default_score(), 10.0);
    }

    #[test]
    fn test_option_labels() {
        assert_eq!(option_label(0), "A");
        assert_eq!(option_label(3), "D");
        assert_eq!(option_label(5), "F");
        assert_eq!(option_label(25), "Z");
        assert_eq!(option_label(26), "AA");
        assert_eq!(option_index("a"), Some(0));
        assert_eq!(option_index("F"), Some(5));
        assert_eq!(option_index("AA"), Some(26));
        assert_eq!(option_index("1"), None);
        assert_eq!(option_index(""), None);
    }

    #[test]
    fn test_set_option_pads_gap() {
        let mut q = QuestionRecord::new_blank("x");
        q.set_option(5, "选项F内容");
        assert_eq!(q.options.len(), 6);
        assert_eq!(q.option(4), "");
        assert_eq!(q.option(5), "选项F内容");
        assert_eq!(q.option(9), "");
        assert_eq!(q.used_option_count(), 6);
    }

    #[test]
    fn test_set_option_rejects_index_past_z() {
        let mut q = QuestionRecord::new_blank("x");
        assert!(q.set_option(MAX_OPTION_COUNT - 1, "选项Z"));
        assert_eq!(q.options.len(), MAX_OPTION_COUNT);

        let huge = option_index("ZZZZZZZZZZZZZ").unwrap();
        assert!(!q.set_option(huge, "x"));
        q.apply(FieldEdit::Option(MAX_OPTION_COUNT, "x".to_string()));
        assert_eq!(q.options.len(), MAX_OPTION_COUNT);
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!("多选题".parse::<QuestionType>().unwrap(), QuestionType::Multiple);
        assert_eq!(" Open ".parse::<QuestionType>().unwrap(), QuestionType::Open);
        assert_eq!("难".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("判断题".parse::<QuestionType>().is_err());
        assert!("很难".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_serde_uses_template_labels() {
        let mut q = QuestionRecord::new_blank("q-1");
        q.question_type = QuestionType::Open;
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["type"], "开放式问题");
        assert_eq!(json["difficulty"], "中");
        assert_eq!(json["correctAnswer"], "");
    }

    #[test]
    fn test_export_problems() {
        let mut q = QuestionRecord::new_blank("x");
        let problems = q.export_problems();
        assert_eq!(problems.len(), 2);

        q.description = "1+1=?".to_string();
        q.set_option(0, "1");
        q.set_option(1, "2");
        assert!(q.export_problems().is_empty());

        q.question_type = QuestionType::Open;
        q.options = vec![String::new(); 4];
        q.score = 0.0;
        assert_eq!(q.export_problems().len(), 1);
    }

    #[test]
    fn test_options_inactive_for_open() {
        let mut q = QuestionRecord::new_blank("x");
        assert!(q.options_active());
        q.apply(FieldEdit::Type(QuestionType::Open));
        assert!(!q.options_active());
    }
}
