use async_trait::async_trait;

use crate::ctxnav_core::model::ContextHandle;

/// FCL 动作按钮的布局信息。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionButtonsInfo {
    pub is_full_screen: bool,

    /// 进入全屏时的目标布局。
    pub full_screen: Option<String>,

    /// 退出全屏时的目标布局。
    pub exit_full_screen: Option<String>,

    /// 关闭当前列后的目标布局。
    pub close_column: Option<String>,
}

/// Flexible Column Layout 的根视图控制器。
pub trait FlexibleColumnLayout: Send + Sync {
    fn action_buttons_info(&self) -> ActionButtonsInfo;

    /// 最右一列绑定的 context。
    fn rightmost_context(&self) -> Option<ContextHandle>;

    /// 按页面所在列刷新布局相关的 UI 状态。
    fn update_ui_state_for_view(&self, view_level: u32);
}

/// 离开带未保存草稿的页面前的确认流程。
#[async_trait]
pub trait DraftConfirmation: Send + Sync {
    /// 返回 `true` 表示用户同意继续（丢弃或保留草稿），可以离开。
    async fn confirm_leave(&self, context: &ContextHandle) -> bool;
}
