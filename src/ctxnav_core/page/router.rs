use async_trait::async_trait;

use crate::ctxnav_core::error::NavigationError;
use crate::ctxnav_core::lifecycle::{NavigationParameters, NavigationTarget};
use crate::ctxnav_core::model::ContextHandle;
use crate::ctxnav_core::route::TargetInformation;

/// 应用级 router 的代理。
///
/// hash 解析、浏览器历史都在它后面；这里只用到导航相关的几个动作。
#[async_trait]
pub trait RouterProxy: Send + Sync {
    /// 导航到 context（或创建场景下的 list binding）。
    ///
    /// 返回值表示是否真的发生了导航。
    async fn navigate_to_context(
        &self,
        target: &NavigationTarget,
        params: &NavigationParameters,
        target_information: &TargetInformation,
    ) -> Result<bool, NavigationError>;

    fn current_hash(&self) -> String;

    /// 浏览器历史后退。
    async fn nav_back(&self);

    /// 当前显示的页面栈是否引用了该 context。
    fn is_current_state_impacted_by(&self, context: &ContextHandle) -> bool;

    /// 让后续的 route match 与正在进行的异步导航串行化。
    fn activate_route_match_synchronization(&self);
}
