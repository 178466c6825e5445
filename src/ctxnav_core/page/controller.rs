use std::fmt;
use std::sync::Arc;

use crate::ctxnav_core::lifecycle::{BeforeBindingParameters, NavigationTarget};
use crate::ctxnav_core::model::{BindingHandle, ContextHandle};
use crate::ctxnav_core::types::EditState;

/// 页面控制器：导航引擎的消费方。
///
/// 持有页面当前绑定的 context，并接收绑定生命周期回调。
/// bound context 只由 NavigationCoordinator 写入。
pub trait PageController: Send + Sync {
    fn on_before_binding(&self, context: Option<&ContextHandle>, params: &BeforeBindingParameters);

    fn on_after_binding(&self, context: Option<&ContextHandle>);

    /// 路由命中本页面、绑定开始之前。
    fn on_route_matched(&self);

    /// 绑定结束（无论成败）之后。
    fn on_route_matched_finished(&self);

    fn bound_context(&self) -> Option<ContextHandle>;

    fn set_bound_context(&self, context: Option<ContextHandle>);

    fn edit_state(&self) -> EditState;

    fn set_busy(&self, busy: bool);

    /// 页脚消息区域是否报告了校验错误。
    fn footer_contains_errors(&self) -> bool;

    /// 页面是否已接入协同编辑会话。
    fn is_connected_to_collaboration(&self) -> bool;
}

pub type PatternFn = Arc<dyn Fn() -> Option<String> + Send + Sync>;
pub type DeferredContextFn = Arc<dyn Fn(&str, Option<&BindingHandle>, bool) + Send + Sync>;
pub type NameFn = Arc<dyn Fn() -> String + Send + Sync>;
pub type BeforeNavigationFn = Arc<dyn Fn(&NavigationTarget) -> bool + Send + Sync>;

/// 页面组件的可选能力。
///
/// 每一项都是显式的 `Option`，没有提供就是不具备该能力。
#[derive(Clone, Default)]
pub struct PageComponentCapabilities {
    /// 覆盖静态 binding pattern。
    pub binding_context_pattern: Option<PatternFn>,

    /// 在目标页面里创建延迟 context（路径、所在 list binding、是否 action create）。
    pub create_deferred_context: Option<DeferredContextFn>,

    pub entity_set: Option<NameFn>,

    /// 页面的 meta context path，例如 `/Orders/_Item`。
    pub context_path: Option<NameFn>,

    /// 应用的 before-navigation 扩展；返回 `true` 表示接管导航。
    pub before_navigation: Option<BeforeNavigationFn>,
}

impl PageComponentCapabilities {
    pub fn binding_context_pattern(&self) -> Option<String> {
        self.binding_context_pattern.as_ref().and_then(|f| f())
    }

    /// 页面自身声明的 meta path。
    pub fn meta_path(&self) -> Option<String> {
        if let Some(context_path) = &self.context_path {
            return Some(context_path());
        }
        self.entity_set.as_ref().map(|f| format!("/{}", f()))
    }
}

impl fmt::Debug for PageComponentCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageComponentCapabilities")
            .field(
                "binding_context_pattern",
                &self.binding_context_pattern.is_some(),
            )
            .field(
                "create_deferred_context",
                &self.create_deferred_context.is_some(),
            )
            .field("entity_set", &self.entity_set.is_some())
            .field("context_path", &self.context_path.is_some())
            .field("before_navigation", &self.before_navigation.is_some())
            .finish()
    }
}
