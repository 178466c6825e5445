use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;

use crate::ctxnav_core::error::NavigationError;
use crate::ctxnav_core::model::{BindingHandle, ContextHandle};
use crate::ctxnav_core::types::NavigationReason;

/// 导航的目标：一个具体的 context，或（创建场景下的）list binding。
#[derive(Clone)]
pub enum NavigationTarget {
    Context(ContextHandle),
    ListBinding(BindingHandle),
}

impl NavigationTarget {
    pub fn context(&self) -> Option<&ContextHandle> {
        match self {
            NavigationTarget::Context(context) => Some(context),
            NavigationTarget::ListBinding(_) => None,
        }
    }
}

impl fmt::Debug for NavigationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationTarget::Context(context) => {
                f.debug_tuple("Context").field(&context.path()).finish()
            }
            NavigationTarget::ListBinding(binding) => {
                f.debug_tuple("ListBinding").field(&binding.path()).finish()
            }
        }
    }
}

/// 乐观创建流程中"稍后才会产生的 context"。
///
/// 只能被取用一次。
pub struct AsyncContext {
    inner: Mutex<Option<BoxFuture<'static, Result<ContextHandle, NavigationError>>>>,
}

impl AsyncContext {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<ContextHandle, NavigationError>> + Send + 'static,
    {
        Self {
            inner: Mutex::new(Some(future.boxed())),
        }
    }

    /// 等待 context 产生。
    pub async fn resolve(self) -> Result<ContextHandle, NavigationError> {
        match self.inner.into_inner() {
            Some(future) => future.await,
            None => Err(NavigationError::Unsupported(
                "async context was already consumed".to_string(),
            )),
        }
    }
}

/// 单次导航调用携带的参数。
///
/// 可序列化字段来自 router 的 navigation info 载荷（沿用其字段名），
/// context / binding 句柄只能由调用方直接设置。
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct NavigationParameters {
    pub editable: Option<bool>,

    /// 由路径解析得出：目标正在创建，页面必须以可编辑状态渲染。
    #[serde(rename = "bTargetEditable")]
    pub target_editable: bool,

    #[serde(rename = "FCLLevel")]
    pub fcl_level: Option<u32>,

    /// FCL 列层级的相对变化（后退 -1，前进 +1）。
    #[serde(rename = "updateFCLLevel")]
    pub fcl_level_delta: i32,

    pub reason: Option<NavigationReason>,

    #[serde(rename = "bPersistOPScroll")]
    pub persist_op_scroll: bool,

    #[serde(rename = "bDraftNavigation")]
    pub draft_navigation: bool,

    #[serde(rename = "bShowPlaceholder")]
    pub show_placeholder: bool,

    #[serde(rename = "bActionCreate")]
    pub action_create: bool,

    #[serde(rename = "bDeferredContext")]
    pub deferred_context: bool,

    /// 目标布局（FCL 全屏 / 关闭列时使用）。
    #[serde(rename = "sLayout")]
    pub layout: Option<String>,

    #[serde(rename = "noPreservationCache")]
    pub no_preservation_cache: bool,

    /// 导航前询问应用的 before-navigation 扩展。
    #[serde(rename = "callExtension")]
    pub call_extension: bool,

    #[serde(rename = "checkNoHashChange")]
    pub check_no_hash_change: bool,

    /// 调用方已经持有的目标 context，路径一致时直接复用。
    #[serde(skip)]
    pub use_context: Option<ContextHandle>,

    /// 创建场景下新对象所在的 list binding。
    #[serde(skip)]
    pub list_binding: Option<BindingHandle>,

    #[serde(skip)]
    pub async_context: Option<AsyncContext>,
}

impl NavigationParameters {
    /// 从 router 的原始 navigation info 载荷解析。
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn is_editable(&self) -> bool {
        self.target_editable || self.editable.unwrap_or(false)
    }

    /// 异步 context 就绪后，继续导航时沿用的参数子集。
    pub fn forwarded(&self) -> Self {
        Self {
            check_no_hash_change: self.check_no_hash_change,
            editable: self.editable,
            persist_op_scroll: self.persist_op_scroll,
            fcl_level_delta: self.fcl_level_delta,
            ..Default::default()
        }
    }
}

impl fmt::Debug for NavigationParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationParameters")
            .field("editable", &self.editable)
            .field("target_editable", &self.target_editable)
            .field("fcl_level", &self.fcl_level)
            .field("fcl_level_delta", &self.fcl_level_delta)
            .field("reason", &self.reason)
            .field("persist_op_scroll", &self.persist_op_scroll)
            .field("draft_navigation", &self.draft_navigation)
            .field("show_placeholder", &self.show_placeholder)
            .field("action_create", &self.action_create)
            .field("deferred_context", &self.deferred_context)
            .field("layout", &self.layout)
            .field("use_context", &self.use_context.as_ref().map(|c| c.path()))
            .field("list_binding", &self.list_binding.as_ref().map(|b| b.path()))
            .field("async_context", &self.async_context.is_some())
            .finish()
    }
}

/// 传给页面 `on_before_binding` 的参数。
#[derive(Clone, Default)]
pub struct BeforeBindingParameters {
    pub editable: bool,

    /// 目标 context 原本所在的 list binding。
    pub list_binding: Option<BindingHandle>,

    pub persist_op_scroll: bool,
    pub draft_navigation: bool,
    pub show_placeholder: bool,
}

impl BeforeBindingParameters {
    pub fn from_navigation(params: &NavigationParameters) -> Self {
        Self {
            editable: params.is_editable(),
            list_binding: None,
            persist_op_scroll: params.persist_op_scroll,
            draft_navigation: params.draft_navigation,
            show_placeholder: params.show_placeholder,
        }
    }
}

impl fmt::Debug for BeforeBindingParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeforeBindingParameters")
            .field("editable", &self.editable)
            .field("list_binding", &self.list_binding.as_ref().map(|b| b.path()))
            .field("persist_op_scroll", &self.persist_op_scroll)
            .field("draft_navigation", &self.draft_navigation)
            .field("show_placeholder", &self.show_placeholder)
            .finish()
    }
}
