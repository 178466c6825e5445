use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::ctxnav_core::config::NavigationConfig;
use crate::ctxnav_core::error::NavigationError;
use crate::ctxnav_core::lifecycle::{
    ContextLifecycleManager, EvictionHandler, NavigationParameters, NavigationTarget,
};
use crate::ctxnav_core::model::{ContextHandle, ODataModel, IS_ACTIVE_ENTITY};
use crate::ctxnav_core::page::{
    DraftConfirmation, FlexibleColumnLayout, MessagePage, MessagePresenter,
    PageComponentCapabilities, PageController, RouterProxy,
};
use crate::ctxnav_core::route::{
    build_binding_path, ResolvedBindingPath, RouteMatchedEvent, TargetInformation,
};
use crate::ctxnav_core::types::TRANSIENT_HASH_MARKER;

//
// ========== route match 任务 ==========
//

/// 一次 route match 的后续绑定任务。
///
/// 丢弃它不会取消任务（fire-and-forget）；需要等待时调用 [`RouteMatchTask::join`]。
#[derive(Debug)]
pub struct RouteMatchTask {
    handle: Option<JoinHandle<()>>,
}

impl RouteMatchTask {
    fn skipped() -> Self {
        Self { handle: None }
    }

    /// 本页面不是这次路由的目标，没有启动绑定。
    pub fn is_skipped(&self) -> bool {
        self.handle.is_none()
    }

    /// 等待绑定结束（包括 finished 回调）。
    pub async fn join(self) {
        if let Some(handle) = self.handle {
            if let Err(err) = handle.await {
                error!(error = %err, "route match task aborted");
            }
        }
    }
}

//
// ========== NavigationCoordinator ==========
//

/// 单个页面的导航协调器。
///
/// - 处理 route matched 事件：算出 binding path，交给 lifecycle 绑定
/// - 对外提供 navigate / back / forward / 全屏 / 关闭列等操作
///
/// 每个页面一个实例，页面的 bound context 只经由它修改。
pub struct NavigationCoordinator {
    config: NavigationConfig,
    target: TargetInformation,
    capabilities: PageComponentCapabilities,

    page: Arc<dyn PageController>,
    router: Arc<dyn RouterProxy>,
    model: Arc<dyn ODataModel>,
    presenter: Arc<dyn MessagePresenter>,
    layout: Option<Arc<dyn FlexibleColumnLayout>>,
    confirmation: Option<Arc<dyn DraftConfirmation>>,

    lifecycle: ContextLifecycleManager,

    /// before-navigation 扩展接管导航时保存的目标。
    stored_context: Mutex<Option<NavigationTarget>>,
}

/// [`NavigationCoordinator`] 的构建器。
pub struct NavigationCoordinatorBuilder {
    config: NavigationConfig,
    target: TargetInformation,
    capabilities: PageComponentCapabilities,
    page: Arc<dyn PageController>,
    router: Arc<dyn RouterProxy>,
    model: Arc<dyn ODataModel>,
    presenter: Arc<dyn MessagePresenter>,
    layout: Option<Arc<dyn FlexibleColumnLayout>>,
    confirmation: Option<Arc<dyn DraftConfirmation>>,
}

impl NavigationCoordinatorBuilder {
    pub fn config(mut self, config: NavigationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn capabilities(mut self, capabilities: PageComponentCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn layout(mut self, layout: Arc<dyn FlexibleColumnLayout>) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn confirmation(mut self, confirmation: Arc<dyn DraftConfirmation>) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    pub fn build(self) -> Arc<NavigationCoordinator> {
        Arc::new_cyclic(|weak: &Weak<NavigationCoordinator>| {
            let weak = weak.clone();
            let on_evicted: EvictionHandler = Arc::new(move |context: ContextHandle| {
                let weak = weak.clone();
                async move {
                    if let Some(coordinator) = weak.upgrade() {
                        coordinator.on_context_evicted(context).await;
                    }
                }
                .boxed()
            });

            let lifecycle = ContextLifecycleManager::new(
                self.config.clone(),
                Arc::clone(&self.page),
                self.capabilities.clone(),
                Arc::clone(&self.presenter),
            )
            .with_eviction_handler(on_evicted);

            NavigationCoordinator {
                config: self.config,
                target: self.target,
                capabilities: self.capabilities,
                page: self.page,
                router: self.router,
                model: self.model,
                presenter: self.presenter,
                layout: self.layout,
                confirmation: self.confirmation,
                lifecycle,
                stored_context: Mutex::new(None),
            }
        })
    }
}

impl NavigationCoordinator {
    pub fn builder(
        target: TargetInformation,
        page: Arc<dyn PageController>,
        router: Arc<dyn RouterProxy>,
        model: Arc<dyn ODataModel>,
        presenter: Arc<dyn MessagePresenter>,
    ) -> NavigationCoordinatorBuilder {
        NavigationCoordinatorBuilder {
            config: NavigationConfig::default(),
            target,
            capabilities: PageComponentCapabilities::default(),
            page,
            router,
            model,
            presenter,
            layout: None,
            confirmation: None,
        }
    }

    pub fn target_information(&self) -> &TargetInformation {
        &self.target
    }

    pub fn lifecycle(&self) -> &ContextLifecycleManager {
        &self.lifecycle
    }

    pub fn stored_context(&self) -> Option<NavigationTarget> {
        self.stored_context.lock().clone()
    }

    pub fn is_current_state_impacted_by(&self, context: &ContextHandle) -> bool {
        self.router.is_current_state_impacted_by(context)
    }

    //
    // ========== route matched ==========
    //

    /// 处理 router 的 route matched 事件。
    ///
    /// 前四步同步完成（目标判断、pattern、路径、`on_route_matched`），
    /// 绑定与收尾在 tokio 任务中进行。必须在 tokio runtime 内调用。
    pub fn on_route_matched(self: &Arc<Self>, event: RouteMatchedEvent) -> RouteMatchTask {
        let RouteMatchedEvent {
            route_name,
            route_information,
            arguments,
            navigation_info: mut params,
            route_pattern,
        } = event;

        if !self.target.is_target_of(&route_name, &route_information) {
            if self.target.view_level >= route_information.route_level {
                debug!(
                    page = %self.target.target_name,
                    route = %route_name,
                    "page is not a target of the matched route, clearing its context"
                );
                self.lifecycle.clear_bound_context();
            }
            return RouteMatchTask::skipped();
        }

        let pattern = self
            .capabilities
            .binding_context_pattern()
            .or_else(|| self.target.context_pattern.clone())
            .or(route_pattern)
            .unwrap_or_default();
        let resolved = build_binding_path(&arguments, &pattern, &mut params);
        debug!(
            page = %self.target.target_name,
            path = %resolved.path,
            deferred = resolved.deferred,
            "route matched"
        );

        self.page.on_route_matched();

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.bind_page(resolved, params).await });
        RouteMatchTask {
            handle: Some(handle),
        }
    }

    async fn bind_page(&self, resolved: ResolvedBindingPath, params: NavigationParameters) {
        let outcome = if resolved.deferred {
            self.lifecycle.bind_deferred(&resolved.path, &params).await;
            Ok(())
        } else {
            self.lifecycle
                .bind_to_path(&resolved.path, self.model.as_ref(), &params)
                .await
        };
        if let Err(err) = outcome {
            self.navigate_to_message_page(&err);
        }

        self.page.on_route_matched_finished();
        if self.config.fcl_enabled {
            if let Some(layout) = &self.layout {
                layout.update_ui_state_for_view(self.target.view_level);
            }
        }
    }

    /// 按错误状态码展示错误页。
    pub fn navigate_to_message_page(&self, error: &NavigationError) {
        error!(page = %self.target.target_name, error = %error, "navigation failed");
        self.presenter
            .show_message_page(&MessagePage::from_error(error));
    }

    //
    // ========== 导航操作 ==========
    //

    /// 导航到 context。
    ///
    /// 目标是 list binding 时只支持两种创建场景：
    /// 带 async context（等待后导航到产生的 context），或标记为 deferred。
    pub async fn navigate_to_context(
        &self,
        target: NavigationTarget,
        mut params: NavigationParameters,
    ) -> Result<bool, NavigationError> {
        let target = match target {
            NavigationTarget::ListBinding(binding) => {
                if let Some(pending) = params.async_context.take() {
                    self.router.activate_route_match_synchronization();
                    let context = pending.resolve().await?;
                    params = params.forwarded();
                    NavigationTarget::Context(context)
                } else if params.deferred_context {
                    NavigationTarget::ListBinding(binding)
                } else {
                    return Err(NavigationError::Unsupported(
                        "navigation to a list binding is not yet supported".to_string(),
                    ));
                }
            }
            context => context,
        };

        if params.call_extension {
            if let Some(before_navigation) = &self.capabilities.before_navigation {
                self.stored_context.lock().take();
                if before_navigation(&target) {
                    debug!(destination = ?target, "navigation taken over by extension");
                    *self.stored_context.lock() = Some(target);
                    return Ok(true);
                }
            }
        }

        params.fcl_level = Some(self.target.view_level);
        debug!(destination = ?target, delta = params.fcl_level_delta, "navigating to context");
        self.router
            .navigate_to_context(&target, &params, &self.target)
            .await
    }

    pub async fn navigate_back_from_context(
        &self,
        context: ContextHandle,
        mut params: NavigationParameters,
    ) -> Result<bool, NavigationError> {
        params.fcl_level_delta = -1;
        self.navigate_to_context(NavigationTarget::Context(context), params)
            .await
    }

    /// 前进到 context；页脚有校验错误时不导航（仍返回 `Ok(true)`）。
    pub async fn navigate_forward_to_context(
        &self,
        context: ContextHandle,
        mut params: NavigationParameters,
    ) -> Result<bool, NavigationError> {
        if self.page.footer_contains_errors() {
            debug!(path = %context.path(), "footer reports errors, staying on page");
            return Ok(true);
        }
        params.fcl_level_delta = 1;
        self.navigate_to_context(NavigationTarget::Context(context), params)
            .await
    }

    /// 当前 hash 是创建中的对象时，改为浏览器后退。返回是否后退了。
    pub async fn navigate_back_from_transient_state(&self) -> bool {
        let hash = self.router.current_hash();
        if !hash.contains(TRANSIENT_HASH_MARKER) {
            return false;
        }
        debug!(%hash, "leaving transient state");
        self.router.nav_back().await;
        true
    }

    /// 切换全屏 / 退出全屏。返回是否发生了导航。
    pub async fn switch_full_screen(&self) -> bool {
        let Some(layout) = &self.layout else {
            warn!("full screen requires a flexible column layout");
            return false;
        };
        let info = layout.action_buttons_info();
        let Some(context) = layout
            .rightmost_context()
            .or_else(|| self.page.bound_context())
        else {
            warn!("no context to show in full screen");
            return false;
        };

        let params = NavigationParameters {
            layout: if info.is_full_screen {
                info.exit_full_screen
            } else {
                info.full_screen
            },
            ..Default::default()
        };
        match self
            .navigate_to_context(NavigationTarget::Context(context), params)
            .await
        {
            Ok(navigated) => navigated,
            Err(err) => {
                warn!(error = %err, "could not switch full screen");
                false
            }
        }
    }

    /// 关闭当前列。
    ///
    /// 第一列对象页上是草稿时，先走草稿确认；用户取消则不离开。
    pub async fn close_column(&self) -> bool {
        let Some(layout) = &self.layout else {
            warn!("closing a column requires a flexible column layout");
            return false;
        };
        let Some(context) = self.page.bound_context() else {
            return false;
        };

        if self.target.view_level == 1 && self.is_draft(&context).await {
            if let Some(confirmation) = &self.confirmation {
                if !confirmation.confirm_leave(&context).await {
                    debug!(path = %context.path(), "close column cancelled");
                    return false;
                }
            }
        }

        let params = NavigationParameters {
            no_preservation_cache: true,
            layout: layout.action_buttons_info().close_column,
            ..Default::default()
        };
        match self.navigate_back_from_context(context, params).await {
            Ok(navigated) => navigated,
            Err(err) => {
                warn!(error = %err, "could not close column");
                false
            }
        }
    }

    /// context 是否是草稿：缓存的 `IsActiveEntity` 为 false，
    /// 或实体集支持草稿而激活标志尚未确认为 true。
    async fn is_draft(&self, context: &ContextHandle) -> bool {
        if let Some(Value::Bool(active)) = context.property(IS_ACTIVE_ENTITY) {
            return !active;
        }
        let meta_path = self.lifecycle.meta_path_for(&context.path());
        match self.model.meta_model().draft_kind(&meta_path).await {
            Ok(kind) => kind.is_some(),
            Err(err) => {
                warn!(path = %context.path(), error = %err, "could not read draft annotation");
                false
            }
        }
    }

    /// keep-alive context 被 model 逐出：当前页面栈还用着它就后退。
    async fn on_context_evicted(&self, context: ContextHandle) {
        if !self.router.is_current_state_impacted_by(&context) {
            debug!(path = %context.path(), "evicted context is not displayed");
            return;
        }
        if let Err(err) = self
            .navigate_back_from_context(context, NavigationParameters::default())
            .await
        {
            warn!(error = %err, "could not leave evicted context");
        }
    }

    /// 扩展销毁。
    pub async fn exit(&self) {
        self.stored_context.lock().take();
        self.lifecycle.release().await;
    }
}
