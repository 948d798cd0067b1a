pub mod question;

pub use question::{
    option_index, option_label, Difficulty, FieldEdit, QuestionRecord, QuestionType,
    DEFAULT_OPTION_COUNT, MAX_OPTION_COUNT, MIN_CHOICE_OPTIONS,
};
