/// 协作方（OData model / metadata / router）报告的失败。
///
/// `status` 是后端返回的 HTTP 状态码（如果有），
/// 用来在错误页上区分 503 / 400 / 其他。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ModelError {
    pub status: Option<u16>,
    pub message: String,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// 导航过程中的错误。
///
/// 封闭集合，调用方按种类 match，而不是比较字符串。
#[derive(Debug, Clone, thiserror::Error)]
pub enum NavigationError {
    /// 不支持的导航形式（例如直接导航到一个 list binding）。
    #[error("{0}")]
    Unsupported(String),

    /// model 无法为该路径提供 keep-alive context。
    #[error("no keep-alive context available for `{path}`")]
    KeepAliveUnavailable {
        path: String,
        #[source]
        source: ModelError,
    },

    /// semantic path 解析失败（metadata 或查询出错）。
    #[error("semantic path `{path}` could not be resolved")]
    ResolutionFailed {
        path: String,
        #[source]
        source: ModelError,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl NavigationError {
    /// 底层 model 错误（如果有）。
    pub fn model_error(&self) -> Option<&ModelError> {
        match self {
            Self::Unsupported(_) => None,
            Self::KeepAliveUnavailable { source, .. } | Self::ResolutionFailed { source, .. } => {
                Some(source)
            }
            Self::Model(source) => Some(source),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.model_error().and_then(|e| e.status)
    }
}
