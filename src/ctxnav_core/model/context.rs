use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::ctxnav_core::error::ModelError;
use crate::ctxnav_core::types::BindingKind;

/// 页面绑定的数据对象（共享句柄）。
///
/// 同一个对象的两个句柄用 `Arc::ptr_eq` 判等。
pub type ContextHandle = Arc<dyn DataContext>;

/// 数据绑定的共享句柄。
pub type BindingHandle = Arc<dyn DataBinding>;

/// keep-alive context 被 model 逐出时调用的回调。
pub type EvictionCallback = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// `dataRequested` 一次性监听器。
pub type DataRequestedListener = Box<dyn FnOnce() + Send>;

/// `dataReceived` 一次性监听器；请求失败时携带错误。
pub type DataReceivedListener = Box<dyn FnOnce(Option<ModelError>) + Send>;

/// side effects 请求的目标。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SideEffectTarget {
    /// 整个导航属性（子列表 / 子对象）重新加载。
    NavigationProperty(String),

    /// 单个结构属性重新加载。
    Property(String),
}

/// 页面所绑定的数据对象。
///
/// 由 OData model 实现；本 crate 只通过这个窄接口观察和驱动它。
#[async_trait]
pub trait DataContext: Send + Sync {
    /// 绝对资源路径，例如 `/Orders(ID=1,IsActiveEntity=true)`。
    fn path(&self) -> String;

    /// 该 context 所属的父 binding。
    fn binding(&self) -> Option<BindingHandle>;

    fn is_keep_alive(&self) -> bool;

    /// 设置 / 取消 keep-alive。
    ///
    /// 父 list binding 缺少 `$$ownRequest` 时 model 会拒绝。
    fn set_keep_alive(
        &self,
        keep_alive: bool,
        on_evicted: Option<EvictionCallback>,
        request_messages: bool,
    ) -> Result<(), ModelError>;

    fn has_pending_changes(&self) -> bool;

    /// 丢弃尚未提交的修改。
    async fn reset_changes(&self) -> Result<(), ModelError>;

    /// 缓存中的属性值；没有加载过时为 `None`。
    fn property(&self, name: &str) -> Option<Value>;

    async fn request_side_effects(&self, targets: &[SideEffectTarget]) -> Result<(), ModelError>;

    /// 触发后台刷新，不等待结果。
    fn refresh(&self);
}

/// 一个数据绑定（list / context / property）。
#[async_trait]
pub trait DataBinding: Send + Sync {
    fn kind(&self) -> BindingKind;

    /// 相对（或绝对）绑定路径。
    fn path(&self) -> String;

    /// 该 binding 解析时所用 context 的路径。
    fn context_path(&self) -> Option<String>;

    /// 是否声明了 `$$ownRequest`（独立请求作用域）。
    fn has_own_request(&self) -> bool;

    /// 依赖于该 binding 的子 binding。
    fn dependent_bindings(&self) -> Vec<BindingHandle>;

    fn has_pending_changes(&self) -> bool;

    async fn reset_changes(&self) -> Result<(), ModelError>;
}

/// 由 model 为某个路径单独创建的 context binding（非 FCL 模式下使用）。
pub trait ContextBinding: DataBinding {
    fn bound_context(&self) -> ContextHandle;

    fn on_data_requested_once(&self, listener: DataRequestedListener);

    fn on_data_received_once(&self, listener: DataReceivedListener);

    fn destroy(&self);
}
