use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::params::{BeforeBindingParameters, NavigationParameters};
use super::side_effects::SideEffectsCollector;
use crate::ctxnav_core::config::NavigationConfig;
use crate::ctxnav_core::error::NavigationError;
use crate::ctxnav_core::model::{
    meta_path, ContextBinding, ContextHandle, DraftKind, EvictionCallback, ODataModel,
    QueryParameters, SideEffectTarget, HAS_ACTIVE_ENTITY, HAS_DRAFT_ENTITY, IS_ACTIVE_ENTITY,
};
use crate::ctxnav_core::page::{
    MessagePage, MessagePresenter, PageComponentCapabilities, PageController,
};
use crate::ctxnav_core::semantic::SemanticPathResolver;
use crate::ctxnav_core::types::{BindingKind, EditState, NavigationReason};

const DRAFT_STATE_PROPERTIES: [&str; 3] = [HAS_ACTIVE_ENTITY, HAS_DRAFT_ENTITY, IS_ACTIVE_ENTITY];
const DRAFT_ADMINISTRATIVE_DATA: &str = "DraftAdministrativeData";

/// keep-alive context 被逐出时的处理（由 coordinator 提供）。
pub type EvictionHandler = Arc<dyn Fn(ContextHandle) -> BoxFuture<'static, ()> + Send + Sync>;

/// 管理单个页面的 bound context：创建、复用、刷新、释放。
///
/// 状态：`Unbound -> Bound(context) -> {Refreshing, Rebinding, Released}`。
/// 页面上的 context 只经由这里写入。
pub struct ContextLifecycleManager {
    config: NavigationConfig,
    page: Arc<dyn PageController>,
    capabilities: PageComponentCapabilities,
    presenter: Arc<dyn MessagePresenter>,
    semantic: SemanticPathResolver,

    /// 非 FCL 模式下为当前页面单独创建的 context binding。
    hidden_binding: Mutex<Option<Arc<dyn ContextBinding>>>,

    on_evicted: Option<EvictionHandler>,
}

impl ContextLifecycleManager {
    pub fn new(
        config: NavigationConfig,
        page: Arc<dyn PageController>,
        capabilities: PageComponentCapabilities,
        presenter: Arc<dyn MessagePresenter>,
    ) -> Self {
        Self {
            config,
            page,
            capabilities,
            presenter,
            semantic: SemanticPathResolver::new(),
            hidden_binding: Mutex::new(None),
            on_evicted: None,
        }
    }

    pub fn with_eviction_handler(mut self, handler: EvictionHandler) -> Self {
        self.on_evicted = Some(handler);
        self
    }

    pub fn semantic_resolver(&self) -> &SemanticPathResolver {
        &self.semantic
    }

    pub fn bound_context(&self) -> Option<ContextHandle> {
        self.page.bound_context()
    }

    /// 组件声明的 meta path；没有则从 `path` 推导。
    pub fn meta_path_for(&self, path: &str) -> String {
        self.capabilities
            .meta_path()
            .unwrap_or_else(|| meta_path(path))
    }

    //
    // ========== 绑定入口 ==========
    //

    /// 把页面绑定到 `path`。
    ///
    /// 空路径表示根 / 列表页面，绑定 `None`。
    /// 其余路径先经过 semantic key 解析；解析不到对象时同样绑定 `None`。
    pub async fn bind_to_path(
        &self,
        path: &str,
        model: &dyn ODataModel,
        params: &NavigationParameters,
    ) -> Result<(), NavigationError> {
        if path.is_empty() {
            return self.bind_to_context(None, model, params).await;
        }
        match self.semantic.resolve(path, model).await? {
            Some(technical_path) => {
                self.bind_to_technical_path(&technical_path, model, params)
                    .await
            }
            None => {
                warn!(%path, "no object found for path, binding an empty page");
                self.bind_to_context(None, model, params).await
            }
        }
    }

    /// 技术 key 路径上的复用 / 新建 / 刷新决策。
    pub async fn bind_to_technical_path(
        &self,
        path: &str,
        model: &dyn ODataModel,
        params: &NavigationParameters,
    ) -> Result<(), NavigationError> {
        let current = self.page.bound_context();

        if let Some(reused) = params.use_context.as_ref().filter(|c| c.path() == path) {
            if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, reused)) {
                debug!(%path, "supplied context is already bound");
                return Ok(());
            }
            if self.config.fcl_enabled && params.reason == Some(NavigationReason::RowPress) {
                self.refresh_reused_context(reused, model).await;
            }
            return self
                .bind_to_context(Some(Arc::clone(reused)), model, params)
                .await;
        }

        match current {
            Some(current) if current.path() == path => {
                if params.reason != Some(NavigationReason::AppStateChanged)
                    && self.page.edit_state() == EditState::Dirty
                {
                    self.refresh_via_side_effects(&current, model).await
                } else {
                    debug!(%path, "context already bound");
                    Ok(())
                }
            }
            _ => {
                let context = self.create_context(path, model).await?;
                self.bind_to_context(Some(context), model, params).await
            }
        }
    }

    /// 行点击复用 context 时的后台刷新。
    ///
    /// 有未提交修改时，只有协同草稿场景才丢弃后刷新，否则跳过。
    async fn refresh_reused_context(&self, context: &ContextHandle, model: &dyn ODataModel) {
        if !context.has_pending_changes() {
            context.refresh();
            return;
        }
        let discard = self.config.collaborative_draft
            || model.meta_model().is_collaboration_draft_supported()
            || self.page.is_connected_to_collaboration();
        if !discard {
            debug!(path = %context.path(), "pending changes on reused context, refresh skipped");
            return;
        }
        match context.reset_changes().await {
            Ok(()) => context.refresh(),
            Err(err) => warn!(path = %context.path(), error = %err, "could not discard pending changes"),
        }
    }

    /// 真正把 context 挂到页面上。
    pub async fn bind_to_context(
        &self,
        context: Option<ContextHandle>,
        model: &dyn ODataModel,
        params: &NavigationParameters,
    ) -> Result<(), NavigationError> {
        let mut before = BeforeBindingParameters::from_navigation(params);
        let Some(mut context) = context else {
            self.page.on_before_binding(None, &before);
            self.page.on_after_binding(None);
            return Ok(());
        };

        let path = context.path();
        let parent = context.binding();
        let parent_is_list = parent
            .as_ref()
            .is_some_and(|b| b.kind() == BindingKind::List);

        if self.config.fcl_enabled {
            let isolated = parent_is_list && parent.as_ref().is_some_and(|b| b.has_own_request());
            if !isolated && !context.is_keep_alive() {
                context = self.create_context(&path, model).await?;
            }
            let request_messages = model
                .meta_model()
                .messages_path(&self.meta_path_for(&path))
                .await
                .ok()
                .flatten()
                .is_some();
            let on_evicted = self.eviction_callback(&context);
            if let Err(err) = context.set_keep_alive(true, on_evicted, request_messages) {
                error!(
                    error = %err,
                    "View for `{}` won't be synchronized. Parent listBinding must have binding parameter $$ownRequest=true",
                    path
                );
            }
        } else if parent_is_list {
            context = self.create_context(&path, model).await?;
        }

        if parent_is_list {
            before.list_binding = parent;
        }
        self.page.on_before_binding(Some(&context), &before);
        self.swap_bound_context(Some(Arc::clone(&context)));
        self.page.on_after_binding(Some(&context));
        Ok(())
    }

    fn eviction_callback(&self, context: &ContextHandle) -> Option<EvictionCallback> {
        let handler = Arc::clone(self.on_evicted.as_ref()?);
        let context = Arc::downgrade(context);
        Some(Box::new(move || match context.upgrade() {
            Some(context) => handler(context),
            None => future::ready(()).boxed(),
        }))
    }

    /// 替换页面上的 context；旧 context 若是 keep-alive 且不是新的那个，释放之。
    fn swap_bound_context(&self, next: Option<ContextHandle>) {
        let previous = self.page.bound_context();
        self.page.set_bound_context(next.clone());
        let Some(previous) = previous else {
            return;
        };
        let unchanged = next.as_ref().is_some_and(|n| Arc::ptr_eq(n, &previous));
        if !unchanged && previous.is_keep_alive() {
            if let Err(err) = previous.set_keep_alive(false, None, false) {
                warn!(path = %previous.path(), error = %err, "could not release keep-alive context");
            }
        }
    }

    pub fn clear_bound_context(&self) {
        self.swap_bound_context(None);
    }

    //
    // ========== context 创建 ==========
    //

    /// 为 `path` 创建新的 context。
    ///
    /// FCL 下走 keep-alive API，拿不到就是硬错误；
    /// 非 FCL 下先释放上一个隐藏 binding，再新建一个。
    pub async fn create_context(
        &self,
        path: &str,
        model: &dyn ODataModel,
    ) -> Result<ContextHandle, NavigationError> {
        let meta = model.meta_model();
        let meta_path = self.meta_path_for(path);
        let draft = meta.draft_kind(&meta_path).await?;

        let mut parameters = QueryParameters::from_config(&self.config);
        if let Some(kind) = draft {
            parameters
                .select
                .extend(DRAFT_STATE_PROPERTIES.iter().map(|p| p.to_string()));
            if self.config.fcl_enabled && kind == DraftKind::Root {
                parameters.expand.push(DRAFT_ADMINISTRATIVE_DATA.to_string());
            }
        }

        let context = if self.config.fcl_enabled {
            model
                .keep_alive_context(path, false, &parameters)
                .map_err(|source| NavigationError::KeepAliveUnavailable {
                    path: path.to_string(),
                    source,
                })?
        } else {
            if let Some(messages) = meta.messages_path(&meta_path).await? {
                parameters.select.push(messages);
            }
            self.dispose_hidden_binding().await;
            let binding = model.bind_context(path, &parameters);
            self.attach_data_listeners(binding.as_ref());
            let context = binding.bound_context();
            *self.hidden_binding.lock() = Some(binding);
            context
        };

        // 草稿标志已在缓存里时必须重新请求，否则草稿 / 激活版本之间切不回来。
        if let Some(kind) = draft.filter(|_| context.property(IS_ACTIVE_ENTITY).is_some()) {
            let mut targets: Vec<SideEffectTarget> = DRAFT_STATE_PROPERTIES
                .iter()
                .map(|p| SideEffectTarget::Property(p.to_string()))
                .collect();
            if self.config.fcl_enabled && kind == DraftKind::Root {
                targets.push(SideEffectTarget::NavigationProperty(
                    DRAFT_ADMINISTRATIVE_DATA.to_string(),
                ));
            }
            if let Err(err) = context.request_side_effects(&targets).await {
                warn!(%path, error = %err, "could not re-request draft state");
            }
        }

        debug!(%path, fcl = self.config.fcl_enabled, "context created");
        Ok(context)
    }

    fn attach_data_listeners(&self, binding: &dyn ContextBinding) {
        let page = Arc::clone(&self.page);
        binding.on_data_requested_once(Box::new(move || page.set_busy(true)));

        let page = Arc::clone(&self.page);
        let presenter = Arc::clone(&self.presenter);
        binding.on_data_received_once(Box::new(move |failure| {
            page.set_busy(false);
            if let Some(source) = failure {
                let err = NavigationError::Model(source);
                error!(error = %err, "data request failed");
                presenter.show_message_page(&MessagePage::from_error(&err));
            }
        }));
    }

    /// 丢弃并销毁上一个隐藏 binding；丢弃失败只记日志。
    async fn dispose_hidden_binding(&self) {
        let previous = self.hidden_binding.lock().take();
        let Some(binding) = previous else {
            return;
        };
        if binding.has_pending_changes() {
            if let Err(err) = binding.reset_changes().await {
                warn!(path = %binding.path(), error = %err, "could not discard pending changes");
            }
        }
        binding.destroy();
    }

    //
    // ========== 刷新 / 释放 ==========
    //

    /// 用一次 side effects 请求刷新 context 下所有依赖 binding。
    ///
    /// 普通 refresh 对可能由创建行支撑的 context 不可用。
    pub async fn refresh_via_side_effects(
        &self,
        context: &ContextHandle,
        model: &dyn ODataModel,
    ) -> Result<(), NavigationError> {
        let path = context.path();
        let Some(top) = context.binding() else {
            debug!(%path, "context has no binding, nothing to refresh");
            return Ok(());
        };

        let mut collector = SideEffectsCollector::new(path.clone());
        for dependent in top.dependent_bindings() {
            collector.visit(&dependent);
        }
        let messages = model
            .meta_model()
            .messages_path(&self.meta_path_for(&path))
            .await?;
        let targets = collector.into_targets(messages);
        if targets.is_empty() {
            return Ok(());
        }

        debug!(%path, targets = targets.len(), "requesting side effects");
        context.request_side_effects(&targets).await?;
        Ok(())
    }

    /// 延迟绑定：对象还在创建中，页面以可编辑、无 context 的状态显示。
    pub async fn bind_deferred(&self, path: &str, params: &NavigationParameters) {
        let before = BeforeBindingParameters {
            editable: true,
            ..BeforeBindingParameters::from_navigation(params)
        };
        self.page.on_before_binding(None, &before);

        if params.deferred_context || params.async_context.is_none() {
            if let Some(create) = &self.capabilities.create_deferred_context {
                create(path, params.list_binding.as_ref(), params.action_create);
            }
        }

        if let Some(current) = self.page.bound_context() {
            if current.has_pending_changes() {
                if let Err(err) = current.reset_changes().await {
                    warn!(path = %current.path(), error = %err, "could not discard pending changes");
                }
            }
        }

        self.clear_bound_context();
        self.page.on_after_binding(None);
    }

    /// 扩展销毁：释放 keep-alive，丢弃隐藏 binding。
    pub async fn release(&self) {
        self.clear_bound_context();
        self.dispose_hidden_binding().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctxnav_core::error::ModelError;
    use crate::ctxnav_core::memory::{
        MemoryBinding, MemoryContext, MemoryMetaModel, MemoryModel, MemoryPage, MemoryPresenter,
        PageEvent,
    };
    use crate::ctxnav_core::model::{BindingHandle, DataContext};
    use serde_json::json;

    struct Fixture {
        page: Arc<MemoryPage>,
        presenter: Arc<MemoryPresenter>,
        model: MemoryModel,
        manager: ContextLifecycleManager,
    }

    fn fixture(fcl: bool, meta: MemoryMetaModel) -> Fixture {
        let page = Arc::new(MemoryPage::new());
        let presenter = Arc::new(MemoryPresenter::default());
        let manager = ContextLifecycleManager::new(
            NavigationConfig::default().with_fcl(fcl),
            page.clone(),
            PageComponentCapabilities::default(),
            presenter.clone(),
        );
        Fixture {
            page,
            presenter,
            model: MemoryModel::new(meta),
            manager,
        }
    }

    fn params() -> NavigationParameters {
        NavigationParameters::default()
    }

    #[tokio::test]
    async fn empty_path_binds_null_without_creating() {
        let f = fixture(false, MemoryMetaModel::new());
        f.manager.bind_to_path("", &f.model, &params()).await.unwrap();

        assert_eq!(
            f.page.events(),
            vec![
                PageEvent::BeforeBinding {
                    path: None,
                    editable: false
                },
                PageEvent::AfterBinding { path: None },
            ]
        );
        assert_eq!(f.model.created_count(), 0);
    }

    #[tokio::test]
    async fn new_path_creates_hidden_context() {
        let f = fixture(false, MemoryMetaModel::new());
        f.manager
            .bind_to_path("/Orders('10')", &f.model, &params())
            .await
            .unwrap();

        let bound = f.page.bound_context().unwrap();
        assert_eq!(bound.path(), "/Orders('10')");
        assert_eq!(f.model.bound_paths(), vec!["/Orders('10')".to_string()]);
        assert_eq!(
            f.page.events().last(),
            Some(&PageEvent::AfterBinding {
                path: Some("/Orders('10')".into())
            })
        );
    }

    #[tokio::test]
    async fn rebinding_same_clean_path_is_a_no_op() {
        let f = fixture(false, MemoryMetaModel::new());
        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &params())
            .await
            .unwrap();
        let first = f.page.bound_context().unwrap();
        let events = f.page.events().len();

        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &params())
            .await
            .unwrap();

        assert_eq!(f.model.created_count(), 1);
        assert!(Arc::ptr_eq(&first, &f.page.bound_context().unwrap()));
        assert_eq!(f.page.events().len(), events);
        assert_eq!(f.model.context("/Orders('1')").unwrap().side_effect_requests().len(), 0);
    }

    #[tokio::test]
    async fn dirty_same_path_requests_side_effects() {
        let f = fixture(false, MemoryMetaModel::new().with_messages("/Orders", "SAP__Messages"));
        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &params())
            .await
            .unwrap();
        let binding = f.model.hidden_binding("/Orders('1')").unwrap();
        binding.add_dependent(Arc::new(
            MemoryBinding::new(BindingKind::List, "_Item").with_context_path("/Orders('1')"),
        ));
        binding.add_dependent(Arc::new(
            MemoryBinding::new(BindingKind::Property, "Status").with_context_path("/Orders('1')"),
        ));
        f.page.set_edit_state(EditState::Dirty);

        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &params())
            .await
            .unwrap();

        assert_eq!(f.model.created_count(), 1);
        let requests = f.model.context("/Orders('1')").unwrap().side_effect_requests();
        assert_eq!(
            requests,
            vec![vec![
                SideEffectTarget::NavigationProperty("_Item".into()),
                SideEffectTarget::Property("Status".into()),
                SideEffectTarget::Property("SAP__Messages".into()),
            ]]
        );
    }

    #[tokio::test]
    async fn app_state_restore_skips_side_effects() {
        let f = fixture(false, MemoryMetaModel::new());
        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &params())
            .await
            .unwrap();
        f.page.set_edit_state(EditState::Dirty);
        let restored = NavigationParameters {
            reason: Some(NavigationReason::AppStateChanged),
            ..Default::default()
        };
        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &restored)
            .await
            .unwrap();
        assert!(f
            .model
            .context("/Orders('1')")
            .unwrap()
            .side_effect_requests()
            .is_empty());
    }

    #[tokio::test]
    async fn rebinding_releases_previous_keep_alive_once() {
        let f = fixture(false, MemoryMetaModel::new());
        let a = Arc::new(MemoryContext::new("/Orders('A')"));
        a.set_keep_alive(true, None, false).unwrap();
        f.page.set_bound_context(Some(a.clone()));

        let b = Arc::new(MemoryContext::new("/Orders('B')"));
        let with_b = NavigationParameters {
            use_context: Some(b.clone()),
            ..Default::default()
        };
        f.manager
            .bind_to_technical_path("/Orders('B')", &f.model, &with_b)
            .await
            .unwrap();

        assert!(!a.is_keep_alive());
        assert_eq!(a.keep_alive_releases(), 1);
        let bound = f.page.bound_context().unwrap();
        assert!(Arc::ptr_eq(&bound, &(b as ContextHandle)));
        assert_eq!(f.model.created_count(), 0);
    }

    #[tokio::test]
    async fn rebinding_same_keep_alive_context_keeps_it_alive() {
        let f = fixture(true, MemoryMetaModel::new());
        let list: BindingHandle =
            Arc::new(MemoryBinding::new(BindingKind::List, "/Orders").with_own_request(true));
        let a = Arc::new(MemoryContext::new("/Orders('A')").with_binding(list));
        f.manager
            .bind_to_context(Some(a.clone()), &f.model, &params())
            .await
            .unwrap();
        f.manager
            .bind_to_context(Some(a.clone()), &f.model, &params())
            .await
            .unwrap();

        assert!(a.is_keep_alive());
        assert_eq!(a.keep_alive_releases(), 0);
    }

    #[tokio::test]
    async fn fcl_recreates_context_without_own_request() {
        let meta = MemoryMetaModel::new().with_draft("/Orders", DraftKind::Root);
        let f = fixture(true, meta);
        let list: BindingHandle = Arc::new(MemoryBinding::new(BindingKind::List, "/Orders"));
        let row = Arc::new(MemoryContext::new("/Orders('1')").with_binding(list));

        f.manager
            .bind_to_context(Some(row.clone()), &f.model, &params())
            .await
            .unwrap();

        let bound = f.page.bound_context().unwrap();
        assert!(!Arc::ptr_eq(&bound, &(row as ContextHandle)));
        assert!(bound.is_keep_alive());
        let (path, parameters) = f.model.keep_alive_requests().pop().unwrap();
        assert_eq!(path, "/Orders('1')");
        assert!(parameters.select.contains(&"IsActiveEntity".to_string()));
        assert_eq!(parameters.expand, vec!["DraftAdministrativeData".to_string()]);
        assert!(parameters.patch_without_side_effects);
    }

    #[tokio::test]
    async fn fcl_keep_alive_unavailable_is_an_error() {
        let f = fixture(true, MemoryMetaModel::new());
        f.model
            .fail_keep_alive(ModelError::new("parent binding lacks $$ownRequest"));
        let err = f
            .manager
            .bind_to_technical_path("/Orders('1')", &f.model, &params())
            .await
            .unwrap_err();
        assert!(matches!(err, NavigationError::KeepAliveUnavailable { .. }));
        assert!(f.page.bound_context().is_none());
    }

    #[tokio::test]
    async fn keep_alive_flag_failure_does_not_abort_binding() {
        let f = fixture(true, MemoryMetaModel::new());
        let list: BindingHandle =
            Arc::new(MemoryBinding::new(BindingKind::List, "/Orders").with_own_request(true));
        let row = Arc::new(
            MemoryContext::new("/Orders('1')")
                .with_binding(list)
                .refusing_keep_alive(),
        );
        f.manager
            .bind_to_context(Some(row.clone()), &f.model, &params())
            .await
            .unwrap();

        let bound = f.page.bound_context().unwrap();
        assert!(Arc::ptr_eq(&bound, &(row as ContextHandle)));
        assert!(!bound.is_keep_alive());
    }

    #[tokio::test]
    async fn non_fcl_list_context_is_recreated_plain() {
        let f = fixture(false, MemoryMetaModel::new());
        let list: BindingHandle = Arc::new(MemoryBinding::new(BindingKind::List, "/Orders"));
        let row = Arc::new(MemoryContext::new("/Orders('1')").with_binding(list));
        f.manager
            .bind_to_context(Some(row.clone()), &f.model, &params())
            .await
            .unwrap();

        let bound = f.page.bound_context().unwrap();
        assert!(!Arc::ptr_eq(&bound, &(row as ContextHandle)));
        assert!(!bound.is_keep_alive());
        assert_eq!(f.model.bound_paths(), vec!["/Orders('1')".to_string()]);
        match &f.page.events()[0] {
            PageEvent::BeforeBinding { path, .. } => {
                assert_eq!(path.as_deref(), Some("/Orders('1')"))
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(f.page.last_before_binding_had_list());
    }

    #[tokio::test]
    async fn row_press_refreshes_reused_context() {
        let f = fixture(true, MemoryMetaModel::new());
        let list: BindingHandle =
            Arc::new(MemoryBinding::new(BindingKind::List, "/Orders").with_own_request(true));
        let row = Arc::new(MemoryContext::new("/Orders('1')").with_binding(list));
        let press = NavigationParameters {
            use_context: Some(row.clone()),
            reason: Some(NavigationReason::RowPress),
            ..Default::default()
        };
        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &press)
            .await
            .unwrap();
        assert_eq!(row.refresh_count(), 1);
    }

    #[tokio::test]
    async fn row_press_with_pending_changes_skips_refresh() {
        let f = fixture(true, MemoryMetaModel::new());
        let row = Arc::new(MemoryContext::new("/Orders('1')"));
        row.set_pending_changes(true);
        let press = NavigationParameters {
            use_context: Some(row.clone()),
            reason: Some(NavigationReason::RowPress),
            ..Default::default()
        };
        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &press)
            .await
            .unwrap();
        assert_eq!(row.refresh_count(), 0);
        assert_eq!(row.reset_count(), 0);
    }

    #[tokio::test]
    async fn row_press_in_collaboration_discards_and_refreshes() {
        let f = fixture(true, MemoryMetaModel::new().with_collaboration_draft());
        let row = Arc::new(MemoryContext::new("/Orders('1')"));
        row.set_pending_changes(true);
        let press = NavigationParameters {
            use_context: Some(row.clone()),
            reason: Some(NavigationReason::RowPress),
            ..Default::default()
        };
        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &press)
            .await
            .unwrap();
        assert_eq!(row.reset_count(), 1);
        assert_eq!(row.refresh_count(), 1);
    }

    #[tokio::test]
    async fn cached_draft_flags_are_requested_again() {
        let meta = MemoryMetaModel::new().with_draft("/Orders", DraftKind::Root);
        let f = fixture(false, meta);
        f.model
            .preset_property("/Orders('1')", "IsActiveEntity", json!(true));
        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &params())
            .await
            .unwrap();

        let requests = f.model.context("/Orders('1')").unwrap().side_effect_requests();
        assert_eq!(
            requests,
            vec![vec![
                SideEffectTarget::Property("HasActiveEntity".into()),
                SideEffectTarget::Property("HasDraftEntity".into()),
                SideEffectTarget::Property("IsActiveEntity".into()),
            ]]
        );
    }

    #[tokio::test]
    async fn fcl_draft_root_also_requests_administrative_data() {
        let meta = MemoryMetaModel::new().with_draft("/Orders", DraftKind::Root);
        let f = fixture(true, meta);
        f.model
            .preset_property("/Orders('1')", "IsActiveEntity", json!(false));
        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &params())
            .await
            .unwrap();

        let requests = f.model.context("/Orders('1')").unwrap().side_effect_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].last(),
            Some(&SideEffectTarget::NavigationProperty(
                "DraftAdministrativeData".into()
            ))
        );
        assert_eq!(requests[0].len(), 4);
    }

    #[tokio::test]
    async fn fcl_draft_node_requests_only_state_flags() {
        let meta = MemoryMetaModel::new().with_draft("/Orders/_Items", DraftKind::Node);
        let f = fixture(true, meta);
        f.model
            .preset_property("/Orders('1')/_Items('2')", "IsActiveEntity", json!(true));
        f.manager
            .bind_to_technical_path("/Orders('1')/_Items('2')", &f.model, &params())
            .await
            .unwrap();

        let requests = f
            .model
            .context("/Orders('1')/_Items('2')")
            .unwrap()
            .side_effect_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .iter()
            .all(|t| matches!(t, SideEffectTarget::Property(_))));
    }

    #[tokio::test]
    async fn draft_flag_request_failure_does_not_abort_binding() {
        let meta = MemoryMetaModel::new().with_draft("/Orders", DraftKind::Root);
        let f = fixture(false, meta);
        f.model
            .preset_property("/Orders('1')", "IsActiveEntity", json!(true));
        f.model
            .fail_side_effects_on("/Orders('1')", ModelError::with_status(500, "draft flags"));

        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &params())
            .await
            .unwrap();

        let created = f.model.context("/Orders('1')").unwrap();
        assert_eq!(created.side_effect_requests().len(), 1);
        assert_eq!(
            f.manager.bound_context().map(|c| c.path()),
            Some("/Orders('1')".to_string())
        );
        assert_eq!(
            f.page.events().last(),
            Some(&PageEvent::AfterBinding {
                path: Some("/Orders('1')".into())
            })
        );
        assert!(f.presenter.pages().is_empty());
    }

    #[tokio::test]
    async fn previous_hidden_binding_is_discarded_and_destroyed() {
        let f = fixture(false, MemoryMetaModel::new());
        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &params())
            .await
            .unwrap();
        let first = f.model.hidden_binding("/Orders('1')").unwrap();
        first.set_pending_changes(true);

        f.manager
            .bind_to_technical_path("/Orders('2')", &f.model, &params())
            .await
            .unwrap();

        assert_eq!(first.reset_count(), 1);
        assert!(first.is_destroyed());
        assert!(!f.model.hidden_binding("/Orders('2')").unwrap().is_destroyed());
    }

    #[tokio::test]
    async fn data_events_toggle_busy_and_route_errors() {
        let f = fixture(false, MemoryMetaModel::new());
        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &params())
            .await
            .unwrap();
        let binding = f.model.hidden_binding("/Orders('1')").unwrap();

        binding.fire_data_requested();
        assert!(f.page.is_busy());
        binding.fire_data_received(Some(ModelError::with_status(400, "bad request")));
        assert!(!f.page.is_busy());

        let pages = f.presenter.pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].kind, crate::ctxnav_core::page::MessagePageKind::DataReceived);
    }

    #[tokio::test]
    async fn semantic_miss_binds_empty_page() {
        let meta = MemoryMetaModel::new()
            .with_draft("/Orders", DraftKind::Root)
            .with_semantic_keys("/Orders", &["OrderNo"]);
        let f = fixture(false, meta);
        f.manager
            .bind_to_path("/Orders(OrderNo='A-1')", &f.model, &params())
            .await
            .unwrap();
        assert!(f.page.bound_context().is_none());
        assert_eq!(f.model.created_count(), 0);
        assert_eq!(
            f.page.events().last(),
            Some(&PageEvent::AfterBinding { path: None })
        );
    }

    #[tokio::test]
    async fn release_drops_keep_alive_and_hidden_binding() {
        let f = fixture(false, MemoryMetaModel::new());
        f.manager
            .bind_to_technical_path("/Orders('1')", &f.model, &params())
            .await
            .unwrap();
        let bound = f.page.bound_context().unwrap();
        bound.set_keep_alive(true, None, false).unwrap();

        f.manager.release().await;

        assert!(!bound.is_keep_alive());
        assert!(f.page.bound_context().is_none());
        assert!(f.model.hidden_binding("/Orders('1')").unwrap().is_destroyed());
    }
}
