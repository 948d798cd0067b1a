use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
///
/// 所有错误都在最上层的交互处理中被捕获，并渲染为一条横幅提示；
/// 详细信息（`Display`）只进日志，横幅使用 [`AppError::user_message`]。
#[derive(Debug, Error)]
pub enum AppError {
    /// 读取上传文件失败
    #[error("文件错误: {0}")]
    FileRead(#[from] FileReadError),
    /// 请求前的输入校验失败
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// AI 解析失败
    #[error("解析错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 导出 Excel 失败
    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    /// 横幅上展示给用户的简短提示
    pub fn user_message(&self) -> String {
        match self {
            AppError::FileRead(_) => "读取文件失败，请重试".to_string(),
            AppError::Validation(e) => e.to_string(),
            AppError::Extraction(e) => e.user_message().to_string(),
            AppError::Export(_) => "导出 Excel 失败，请检查导出目录后重试".to_string(),
            AppError::Config(e) => e.to_string(),
        }
    }
}

/// 文件读取错误
#[derive(Debug, Error)]
pub enum FileReadError {
    /// 文件不存在
    #[error("文件不存在: {}", path.display())]
    NotFound { path: PathBuf },
    /// 读取文件失败
    #[error("读取文件失败 ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Word 文档损坏或格式不支持
    #[error("DOCX解析错误 ({}): {message}", path.display())]
    DocumentParse { path: PathBuf, message: String },
    /// 文本编码无法识别
    #[error("无法识别文件编码 ({})，请另存为 UTF-8 后重试", path.display())]
    Encoding { path: PathBuf },
}

impl FileReadError {
    /// 创建文件读取错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            FileReadError::NotFound { path }
        } else {
            FileReadError::Io { path, source }
        }
    }

    /// 创建文档解析错误
    pub fn document(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        FileReadError::DocumentParse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// 输入校验错误（在任何网络请求之前检查）
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// 题目文本为空
    #[error("请输入题目文本或上传文件")]
    EmptyText,
    /// 未设置 API Key
    #[error("请先设置 API Key")]
    MissingCredential,
    /// 字段名无法识别
    #[error("未知字段: {0}")]
    UnknownField(String),
    /// 字段值非法
    #[error("{field} 的值非法: {value}")]
    InvalidValue { field: String, value: String },
    /// 行号超出范围
    #[error("行号 {row} 超出范围 [1, {len}]")]
    RowOutOfRange { row: usize, len: usize },
}

/// AI 解析错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 网络或服务调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    Request {
        model: String,
        #[source]
        source: async_openai::error::OpenAIError,
    },
    /// 返回内容不符合输出结构
    #[error("LLM返回内容不符合题目结构: {message}")]
    NonConforming { message: String },
    /// 请求被内容风控拦截或模型拒绝回答
    #[error("LLM拒绝了请求: {reason}")]
    Refused { reason: String },
}

impl ExtractionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ExtractionError::Refused { .. } => "请求被 AI 内容风控拦截，请调整文本后重试",
            _ => "AI 解析失败，请检查内容后重试",
        }
    }
}

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    /// 生成工作簿失败
    #[error("XLSX 生成失败: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    /// 列数超出工作表上限
    #[error("第 {0} 列超出工作表列数上限")]
    ColumnOutOfRange(usize),
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({}): {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件格式错误
    #[error("TOML解析失败 ({}): {source}", path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
