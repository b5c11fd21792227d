use thiserror::Error;

use crate::models::Stage;

/// 应用程序错误类型
///
/// 四类错误：
/// - `Validation`：提交阶段即被拒绝，不会创建报告
/// - `Extraction`：无法从任何策略中恢复可靠的价格/地址
/// - `Analysis`：处理中下游服务出错或超时
/// - `Internal`：程序缺陷
#[derive(Debug, Error)]
pub enum AppError {
    /// 提交校验失败（不支持的域名、格式错误的提交）
    #[error("校验失败: {0}")]
    Validation(String),

    /// 结构化数据提取失败
    #[error("提取失败: {0}")]
    Extraction(String),

    /// 分析阶段失败
    #[error("分析失败: {0}")]
    Analysis(#[from] AnalysisError),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 分析阶段错误（外部协作方出错或超时）
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// 页面渲染失败
    #[error("页面渲染失败 ({url}): {message}")]
    Render { url: String, message: String },

    /// LLM 调用失败
    #[error("AI 服务调用失败 (模型: {model}): {message}")]
    Llm { model: String, message: String },

    /// 协作方返回了无法使用的结果
    #[error("{stage} 阶段返回无效结果: {message}")]
    BadResponse { stage: Stage, message: String },

    /// 调用超时
    #[error("{stage} 阶段超时 ({secs}s)")]
    Timeout { stage: Stage, secs: u64 },

    /// 图像服务失败（只降级，不会让报告失败）
    #[error("图像服务失败: {0}")]
    Imagery(String),
}

impl AppError {
    /// 写入报告 `failureReason` 的可读信息
    pub fn failure_reason(&self) -> String {
        match self {
            AppError::Validation(msg) => format!("validation failed: {}", msg),
            AppError::Extraction(msg) => format!("extraction failed: {}", msg),
            AppError::Analysis(e) => format!("analysis failed: {}", e.reason()),
            AppError::Internal(msg) => format!("internal error: {}", msg),
        }
    }

    /// 创建渲染错误
    pub fn render_failed(url: impl Into<String>, message: impl ToString) -> Self {
        AppError::Analysis(AnalysisError::Render {
            url: url.into(),
            message: message.to_string(),
        })
    }

    /// 创建 LLM 调用错误
    pub fn llm_failed(model: impl Into<String>, message: impl ToString) -> Self {
        AppError::Analysis(AnalysisError::Llm {
            model: model.into(),
            message: message.to_string(),
        })
    }

    /// 创建无效响应错误
    pub fn bad_response(stage: Stage, message: impl Into<String>) -> Self {
        AppError::Analysis(AnalysisError::BadResponse {
            stage,
            message: message.into(),
        })
    }
}

impl AnalysisError {
    fn reason(&self) -> String {
        match self {
            AnalysisError::Render { url, message } => {
                format!("could not render {}: {}", url, message)
            }
            AnalysisError::Llm { model, message } => {
                format!("research service error (model {}): {}", model, message)
            }
            AnalysisError::BadResponse { stage, message } => {
                format!("{} returned an unusable result: {}", stage, message)
            }
            AnalysisError::Timeout { stage, secs } => {
                format!("{} timed out after {}s", stage, secs)
            }
            AnalysisError::Imagery(msg) => format!("imagery service error: {}", msg),
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Analysis(AnalysisError::Render {
            url: String::new(),
            message: err.to_string(),
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Analysis(AnalysisError::Render {
            url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            message: err.to_string(),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON 处理失败: {}", err))
    }
}

impl From<async_openai::error::OpenAIError> for AppError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        AppError::Analysis(AnalysisError::Llm {
            model: String::new(),
            message: err.to_string(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
