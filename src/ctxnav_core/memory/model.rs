use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::ctxnav_core::error::ModelError;
use crate::ctxnav_core::model::{
    BindingHandle, ContextBinding, ContextHandle, DataBinding, DataContext,
    DataReceivedListener, DataRequestedListener, DraftKind, EvictionCallback, Filter, MetaModel,
    ODataModel, QueryParameters, SideEffectTarget,
};
use crate::ctxnav_core::types::BindingKind;

//
// ========== context ==========
//

/// 内存中的数据对象。
pub struct MemoryContext {
    path: String,
    binding: Option<BindingHandle>,
    owner: Mutex<Weak<MemoryBinding>>,
    keep_alive: AtomicBool,
    on_evicted: Mutex<Option<EvictionCallback>>,
    refuse_keep_alive: bool,
    keep_alive_releases: AtomicUsize,
    pending_changes: AtomicBool,
    properties: Mutex<HashMap<String, Value>>,
    side_effects: Mutex<Vec<Vec<SideEffectTarget>>>,
    side_effects_failure: Mutex<Option<ModelError>>,
    refreshes: AtomicUsize,
    resets: AtomicUsize,
}

impl MemoryContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            binding: None,
            owner: Mutex::new(Weak::new()),
            keep_alive: AtomicBool::new(false),
            on_evicted: Mutex::new(None),
            refuse_keep_alive: false,
            keep_alive_releases: AtomicUsize::new(0),
            pending_changes: AtomicBool::new(false),
            properties: Mutex::new(HashMap::new()),
            side_effects: Mutex::new(Vec::new()),
            side_effects_failure: Mutex::new(None),
            refreshes: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
        }
    }

    /// 所属的父 binding（例如表格的 list binding）。
    pub fn with_binding(mut self, binding: BindingHandle) -> Self {
        self.binding = Some(binding);
        self
    }

    /// 模拟父 list binding 缺少 `$$ownRequest`：拒绝 keep-alive。
    pub fn refusing_keep_alive(mut self) -> Self {
        self.refuse_keep_alive = true;
        self
    }

    pub fn with_property(self, name: impl Into<String>, value: Value) -> Self {
        self.properties.lock().insert(name.into(), value);
        self
    }

    fn attach_owner(&self, owner: &Arc<MemoryBinding>) {
        *self.owner.lock() = Arc::downgrade(owner);
    }

    pub fn set_pending_changes(&self, pending: bool) {
        self.pending_changes.store(pending, Ordering::SeqCst);
    }

    pub fn fail_side_effects(&self, error: ModelError) {
        *self.side_effects_failure.lock() = Some(error);
    }

    pub fn keep_alive_releases(&self) -> usize {
        self.keep_alive_releases.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn side_effect_requests(&self) -> Vec<Vec<SideEffectTarget>> {
        self.side_effects.lock().clone()
    }

    /// 模拟 model 逐出 keep-alive context：调用登记的回调。
    pub async fn evict(&self) {
        let callback = self.on_evicted.lock().take();
        self.keep_alive.store(false, Ordering::SeqCst);
        if let Some(callback) = callback {
            callback().await;
        }
    }
}

#[async_trait]
impl DataContext for MemoryContext {
    fn path(&self) -> String {
        self.path.clone()
    }

    fn binding(&self) -> Option<BindingHandle> {
        if let Some(binding) = &self.binding {
            return Some(Arc::clone(binding));
        }
        self.owner
            .lock()
            .upgrade()
            .map(|owner| owner as BindingHandle)
    }

    fn is_keep_alive(&self) -> bool {
        self.keep_alive.load(Ordering::SeqCst)
    }

    fn set_keep_alive(
        &self,
        keep_alive: bool,
        on_evicted: Option<EvictionCallback>,
        _request_messages: bool,
    ) -> Result<(), ModelError> {
        if keep_alive {
            if self.refuse_keep_alive {
                return Err(ModelError::new(format!(
                    "parent binding of {} has no $$ownRequest",
                    self.path
                )));
            }
            self.keep_alive.store(true, Ordering::SeqCst);
            *self.on_evicted.lock() = on_evicted;
        } else if self.keep_alive.swap(false, Ordering::SeqCst) {
            self.keep_alive_releases.fetch_add(1, Ordering::SeqCst);
            self.on_evicted.lock().take();
        }
        Ok(())
    }

    fn has_pending_changes(&self) -> bool {
        self.pending_changes.load(Ordering::SeqCst)
    }

    async fn reset_changes(&self) -> Result<(), ModelError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.pending_changes.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.properties.lock().get(name).cloned()
    }

    async fn request_side_effects(&self, targets: &[SideEffectTarget]) -> Result<(), ModelError> {
        self.side_effects.lock().push(targets.to_vec());
        match self.side_effects_failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

//
// ========== binding ==========
//

/// 内存中的数据绑定；同时充当非 FCL 模式下的隐藏 context binding。
pub struct MemoryBinding {
    kind: BindingKind,
    path: String,
    context_path: Option<String>,
    own_request: bool,
    bound_context: Option<ContextHandle>,
    dependents: Mutex<Vec<BindingHandle>>,
    pending_changes: AtomicBool,
    resets: AtomicUsize,
    destroyed: AtomicBool,
    on_data_requested: Mutex<Option<DataRequestedListener>>,
    on_data_received: Mutex<Option<DataReceivedListener>>,
}

impl MemoryBinding {
    pub fn new(kind: BindingKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            context_path: None,
            own_request: false,
            bound_context: None,
            dependents: Mutex::new(Vec::new()),
            pending_changes: AtomicBool::new(false),
            resets: AtomicUsize::new(0),
            destroyed: AtomicBool::new(false),
            on_data_requested: Mutex::new(None),
            on_data_received: Mutex::new(None),
        }
    }

    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = Some(context_path.into());
        self
    }

    pub fn with_own_request(mut self, own_request: bool) -> Self {
        self.own_request = own_request;
        self
    }

    pub fn with_bound_context(mut self, context: ContextHandle) -> Self {
        self.bound_context = Some(context);
        self
    }

    pub fn add_dependent(&self, binding: BindingHandle) {
        self.dependents.lock().push(binding);
    }

    pub fn set_pending_changes(&self, pending: bool) {
        self.pending_changes.store(pending, Ordering::SeqCst);
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// 触发一次 `dataRequested`。
    pub fn fire_data_requested(&self) {
        let listener = self.on_data_requested.lock().take();
        if let Some(listener) = listener {
            listener();
        }
    }

    /// 触发一次 `dataReceived`，可携带请求错误。
    pub fn fire_data_received(&self, error: Option<ModelError>) {
        let listener = self.on_data_received.lock().take();
        if let Some(listener) = listener {
            listener(error);
        }
    }
}

#[async_trait]
impl DataBinding for MemoryBinding {
    fn kind(&self) -> BindingKind {
        self.kind
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn context_path(&self) -> Option<String> {
        self.context_path.clone()
    }

    fn has_own_request(&self) -> bool {
        self.own_request
    }

    fn dependent_bindings(&self) -> Vec<BindingHandle> {
        self.dependents.lock().clone()
    }

    fn has_pending_changes(&self) -> bool {
        self.pending_changes.load(Ordering::SeqCst)
    }

    async fn reset_changes(&self) -> Result<(), ModelError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.pending_changes.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl ContextBinding for MemoryBinding {
    fn bound_context(&self) -> ContextHandle {
        match &self.bound_context {
            Some(context) => Arc::clone(context),
            None => Arc::new(MemoryContext::new(self.path.clone())),
        }
    }

    fn on_data_requested_once(&self, listener: DataRequestedListener) {
        *self.on_data_requested.lock() = Some(listener);
    }

    fn on_data_received_once(&self, listener: DataReceivedListener) {
        *self.on_data_received.lock() = Some(listener);
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

//
// ========== metadata ==========
//

/// 内存中的 metadata，按 meta path 登记注解。
#[derive(Debug, Default)]
pub struct MemoryMetaModel {
    drafts: HashMap<String, DraftKind>,
    semantic_keys: HashMap<String, Vec<String>>,
    messages: HashMap<String, String>,
    case_insensitive: bool,
    collaboration_draft: bool,
}

impl MemoryMetaModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_draft(mut self, meta_path: impl Into<String>, kind: DraftKind) -> Self {
        self.drafts.insert(meta_path.into(), kind);
        self
    }

    pub fn with_semantic_keys(mut self, meta_path: impl Into<String>, keys: &[&str]) -> Self {
        self.semantic_keys.insert(
            meta_path.into(),
            keys.iter().map(|k| k.to_string()).collect(),
        );
        self
    }

    pub fn with_messages(mut self, meta_path: impl Into<String>, messages: impl Into<String>) -> Self {
        self.messages.insert(meta_path.into(), messages.into());
        self
    }

    pub fn with_case_insensitive_filtering(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn with_collaboration_draft(mut self) -> Self {
        self.collaboration_draft = true;
        self
    }
}

#[async_trait]
impl MetaModel for MemoryMetaModel {
    async fn draft_kind(&self, meta_path: &str) -> Result<Option<DraftKind>, ModelError> {
        Ok(self.drafts.get(meta_path).copied())
    }

    async fn semantic_keys(&self, meta_path: &str) -> Result<Vec<String>, ModelError> {
        Ok(self.semantic_keys.get(meta_path).cloned().unwrap_or_default())
    }

    async fn messages_path(&self, meta_path: &str) -> Result<Option<String>, ModelError> {
        Ok(self.messages.get(meta_path).cloned())
    }

    fn is_filtering_case_sensitive(&self) -> bool {
        !self.case_insensitive
    }

    fn is_collaboration_draft_supported(&self) -> bool {
        self.collaboration_draft
    }
}

//
// ========== model ==========
//

/// 内存中的 OData model。
///
/// 集合查询不做真正的过滤：返回该集合登记的全部行（最多 `top` 行）。
pub struct MemoryModel {
    meta: Arc<MemoryMetaModel>,
    rows: Mutex<HashMap<String, Vec<ContextHandle>>>,
    queries: Mutex<Vec<(String, Filter, usize)>>,
    query_failure: Mutex<Option<ModelError>>,
    presets: Mutex<HashMap<String, Vec<(String, Value)>>>,
    side_effects_failures: Mutex<HashMap<String, ModelError>>,
    contexts: Mutex<Vec<Arc<MemoryContext>>>,
    bindings: Mutex<Vec<Arc<MemoryBinding>>>,
    bind_requests: Mutex<Vec<(String, QueryParameters)>>,
    keep_alive_requests: Mutex<Vec<(String, QueryParameters)>>,
    keep_alive_failure: Mutex<Option<ModelError>>,
}

impl MemoryModel {
    pub fn new(meta: MemoryMetaModel) -> Self {
        Self {
            meta: Arc::new(meta),
            rows: Mutex::new(HashMap::new()),
            queries: Mutex::new(Vec::new()),
            query_failure: Mutex::new(None),
            presets: Mutex::new(HashMap::new()),
            side_effects_failures: Mutex::new(HashMap::new()),
            contexts: Mutex::new(Vec::new()),
            bindings: Mutex::new(Vec::new()),
            bind_requests: Mutex::new(Vec::new()),
            keep_alive_requests: Mutex::new(Vec::new()),
            keep_alive_failure: Mutex::new(None),
        }
    }

    /// 登记集合查询会返回的一行。
    pub fn add_row(&self, collection_path: impl Into<String>, row: Arc<MemoryContext>) {
        self.rows
            .lock()
            .entry(collection_path.into())
            .or_default()
            .push(row);
    }

    pub fn fail_queries(&self, error: ModelError) {
        *self.query_failure.lock() = Some(error);
    }

    pub fn fail_keep_alive(&self, error: ModelError) {
        *self.keep_alive_failure.lock() = Some(error);
    }

    /// 之后为 `path` 创建的 context 会带上该缓存属性。
    pub fn preset_property(&self, path: impl Into<String>, name: impl Into<String>, value: Value) {
        self.presets
            .lock()
            .entry(path.into())
            .or_default()
            .push((name.into(), value));
    }

    /// 之后为 `path` 创建的 context 请求 side effects 时失败。
    pub fn fail_side_effects_on(&self, path: impl Into<String>, error: ModelError) {
        self.side_effects_failures.lock().insert(path.into(), error);
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn queries(&self) -> Vec<(String, Filter, usize)> {
        self.queries.lock().clone()
    }

    /// model 创建过的 context 数量（两种方式合计）。
    pub fn created_count(&self) -> usize {
        self.contexts.lock().len()
    }

    /// `bind_context` 收到的路径。
    pub fn bound_paths(&self) -> Vec<String> {
        self.bind_requests
            .lock()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn bind_requests(&self) -> Vec<(String, QueryParameters)> {
        self.bind_requests.lock().clone()
    }

    pub fn keep_alive_requests(&self) -> Vec<(String, QueryParameters)> {
        self.keep_alive_requests.lock().clone()
    }

    /// 最近一次为 `path` 创建的 context。
    pub fn context(&self, path: &str) -> Option<Arc<MemoryContext>> {
        self.contexts
            .lock()
            .iter()
            .rev()
            .find(|c| c.path == path)
            .cloned()
    }

    /// 最近一次为 `path` 创建的隐藏 binding。
    pub fn hidden_binding(&self, path: &str) -> Option<Arc<MemoryBinding>> {
        self.bindings
            .lock()
            .iter()
            .rev()
            .find(|b| b.path == path)
            .cloned()
    }

    fn new_context(&self, path: &str) -> Arc<MemoryContext> {
        let mut context = MemoryContext::new(path);
        if let Some(presets) = self.presets.lock().get(path) {
            for (name, value) in presets {
                context = context.with_property(name.clone(), value.clone());
            }
        }
        if let Some(error) = self.side_effects_failures.lock().get(path) {
            context.fail_side_effects(error.clone());
        }
        let context = Arc::new(context);
        self.contexts.lock().push(Arc::clone(&context));
        context
    }
}

#[async_trait]
impl ODataModel for MemoryModel {
    fn meta_model(&self) -> Arc<dyn MetaModel> {
        self.meta.clone()
    }

    async fn request_contexts(
        &self,
        collection_path: &str,
        filter: &Filter,
        top: usize,
    ) -> Result<Vec<ContextHandle>, ModelError> {
        self.queries
            .lock()
            .push((collection_path.to_string(), filter.clone(), top));
        if let Some(error) = self.query_failure.lock().clone() {
            return Err(error);
        }
        Ok(self
            .rows
            .lock()
            .get(collection_path)
            .map(|rows| rows.iter().take(top).cloned().collect())
            .unwrap_or_default())
    }

    fn bind_context(&self, path: &str, parameters: &QueryParameters) -> Arc<dyn ContextBinding> {
        self.bind_requests
            .lock()
            .push((path.to_string(), parameters.clone()));
        let context = self.new_context(path);
        let binding = Arc::new(
            MemoryBinding::new(BindingKind::Context, path)
                .with_bound_context(context.clone() as ContextHandle),
        );
        context.attach_owner(&binding);
        self.bindings.lock().push(Arc::clone(&binding));
        binding
    }

    fn keep_alive_context(
        &self,
        path: &str,
        _request_messages: bool,
        parameters: &QueryParameters,
    ) -> Result<ContextHandle, ModelError> {
        self.keep_alive_requests
            .lock()
            .push((path.to_string(), parameters.clone()));
        if let Some(error) = self.keep_alive_failure.lock().clone() {
            return Err(error);
        }
        let context = self.new_context(path);
        context.set_keep_alive(true, None, false)?;
        Ok(context)
    }
}
