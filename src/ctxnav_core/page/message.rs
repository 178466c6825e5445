use crate::ctxnav_core::error::NavigationError;

/// 错误页的种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePageKind {
    /// 服务不可用（503），初始加载失败。
    InitialLoad,
    /// 数据请求被拒绝（400）。
    DataReceived,
    /// 其他错误，直接展示原始描述。
    Generic,
}

/// 展示给用户的错误页。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePage {
    pub kind: MessagePageKind,
    pub title: String,
    pub description: String,

    /// 是否显示 shell 的返回按钮。
    pub show_shell_back: bool,
}

impl MessagePage {
    /// 按错误的 HTTP 状态选择错误页变体。
    pub fn from_error(error: &NavigationError) -> Self {
        match error.status() {
            Some(503) => Self {
                kind: MessagePageKind::InitialLoad,
                title: "Service Unavailable".to_string(),
                description: "The application could not be loaded. Try again later.".to_string(),
                show_shell_back: true,
            },
            Some(400) => Self {
                kind: MessagePageKind::DataReceived,
                title: "Error".to_string(),
                description: "The data could not be loaded.".to_string(),
                show_shell_back: false,
            },
            _ => Self {
                kind: MessagePageKind::Generic,
                title: "Error".to_string(),
                description: error
                    .model_error()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| error.to_string()),
                show_shell_back: false,
            },
        }
    }
}

/// 负责把错误页展示出来（通常是 app 组件）。
pub trait MessagePresenter: Send + Sync {
    fn show_message_page(&self, page: &MessagePage);
}
