use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::ctxnav_core::error::NavigationError;
use crate::ctxnav_core::lifecycle::{BeforeBindingParameters, NavigationParameters, NavigationTarget};
use crate::ctxnav_core::model::ContextHandle;
use crate::ctxnav_core::page::{
    ActionButtonsInfo, DraftConfirmation, FlexibleColumnLayout, MessagePage, MessagePresenter,
    PageController, RouterProxy,
};
use crate::ctxnav_core::route::TargetInformation;
use crate::ctxnav_core::types::EditState;

/// 页面收到的生命周期回调。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    RouteMatched,
    BeforeBinding { path: Option<String>, editable: bool },
    AfterBinding { path: Option<String> },
    RouteMatchedFinished,
}

/// 记录回调顺序的页面。
#[derive(Default)]
pub struct MemoryPage {
    events: Mutex<Vec<PageEvent>>,
    bound: Mutex<Option<ContextHandle>>,
    edit_state: Mutex<EditState>,
    busy: AtomicBool,
    footer_errors: AtomicBool,
    collaboration: AtomicBool,
    last_list_binding: AtomicBool,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.events.lock().clone()
    }

    pub fn set_edit_state(&self, state: EditState) {
        *self.edit_state.lock() = state;
    }

    pub fn set_footer_errors(&self, errors: bool) {
        self.footer_errors.store(errors, Ordering::SeqCst);
    }

    pub fn set_connected_to_collaboration(&self, connected: bool) {
        self.collaboration.store(connected, Ordering::SeqCst);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// 最近一次 before-binding 是否带上了原 list binding。
    pub fn last_before_binding_had_list(&self) -> bool {
        self.last_list_binding.load(Ordering::SeqCst)
    }
}

impl PageController for MemoryPage {
    fn on_before_binding(&self, context: Option<&ContextHandle>, params: &BeforeBindingParameters) {
        self.last_list_binding
            .store(params.list_binding.is_some(), Ordering::SeqCst);
        self.events.lock().push(PageEvent::BeforeBinding {
            path: context.map(|c| c.path()),
            editable: params.editable,
        });
    }

    fn on_after_binding(&self, context: Option<&ContextHandle>) {
        self.events.lock().push(PageEvent::AfterBinding {
            path: context.map(|c| c.path()),
        });
    }

    fn on_route_matched(&self) {
        self.events.lock().push(PageEvent::RouteMatched);
    }

    fn on_route_matched_finished(&self) {
        self.events.lock().push(PageEvent::RouteMatchedFinished);
    }

    fn bound_context(&self) -> Option<ContextHandle> {
        self.bound.lock().clone()
    }

    fn set_bound_context(&self, context: Option<ContextHandle>) {
        *self.bound.lock() = context;
    }

    fn edit_state(&self) -> EditState {
        *self.edit_state.lock()
    }

    fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }

    fn footer_contains_errors(&self) -> bool {
        self.footer_errors.load(Ordering::SeqCst)
    }

    fn is_connected_to_collaboration(&self) -> bool {
        self.collaboration.load(Ordering::SeqCst)
    }
}

/// 收集展示过的错误页。
#[derive(Default)]
pub struct MemoryPresenter {
    pages: Mutex<Vec<MessagePage>>,
}

impl MemoryPresenter {
    pub fn pages(&self) -> Vec<MessagePage> {
        self.pages.lock().clone()
    }
}

impl MessagePresenter for MemoryPresenter {
    fn show_message_page(&self, page: &MessagePage) {
        self.pages.lock().push(page.clone());
    }
}

/// router 收到的一次导航请求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedNavigation {
    pub path: String,
    pub target_name: String,
    pub fcl_level: Option<u32>,
    pub fcl_level_delta: i32,
    pub layout: Option<String>,
    pub no_preservation_cache: bool,
}

/// 记录导航请求的 router。
pub struct MemoryRouter {
    hash: Mutex<String>,
    navigations: Mutex<Vec<RecordedNavigation>>,
    backs: AtomicUsize,
    synchronizations: AtomicUsize,
    impacted: AtomicBool,
}

impl MemoryRouter {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: Mutex::new(hash.into()),
            navigations: Mutex::new(Vec::new()),
            backs: AtomicUsize::new(0),
            synchronizations: AtomicUsize::new(0),
            impacted: AtomicBool::new(false),
        }
    }

    pub fn set_hash(&self, hash: impl Into<String>) {
        *self.hash.lock() = hash.into();
    }

    /// 让 `is_current_state_impacted_by` 返回给定值。
    pub fn set_impacted(&self, impacted: bool) {
        self.impacted.store(impacted, Ordering::SeqCst);
    }

    pub fn navigations(&self) -> Vec<RecordedNavigation> {
        self.navigations.lock().clone()
    }

    pub fn back_count(&self) -> usize {
        self.backs.load(Ordering::SeqCst)
    }

    pub fn synchronization_count(&self) -> usize {
        self.synchronizations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouterProxy for MemoryRouter {
    async fn navigate_to_context(
        &self,
        target: &NavigationTarget,
        params: &NavigationParameters,
        target_information: &TargetInformation,
    ) -> Result<bool, NavigationError> {
        let path = match target {
            NavigationTarget::Context(context) => context.path(),
            NavigationTarget::ListBinding(binding) => binding.path(),
        };
        self.navigations.lock().push(RecordedNavigation {
            path,
            target_name: target_information.target_name.clone(),
            fcl_level: params.fcl_level,
            fcl_level_delta: params.fcl_level_delta,
            layout: params.layout.clone(),
            no_preservation_cache: params.no_preservation_cache,
        });
        Ok(true)
    }

    fn current_hash(&self) -> String {
        self.hash.lock().clone()
    }

    async fn nav_back(&self) {
        self.backs.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current_state_impacted_by(&self, _context: &ContextHandle) -> bool {
        self.impacted.load(Ordering::SeqCst)
    }

    fn activate_route_match_synchronization(&self) {
        self.synchronizations.fetch_add(1, Ordering::SeqCst);
    }
}

/// 固定布局信息的 FCL 根视图。
#[derive(Default)]
pub struct MemoryLayout {
    info: Mutex<ActionButtonsInfo>,
    rightmost: Mutex<Option<ContextHandle>>,
    updates: Mutex<Vec<u32>>,
}

impl MemoryLayout {
    pub fn new(info: ActionButtonsInfo) -> Self {
        Self {
            info: Mutex::new(info),
            ..Default::default()
        }
    }

    pub fn set_rightmost_context(&self, context: Option<ContextHandle>) {
        *self.rightmost.lock() = context;
    }

    /// `update_ui_state_for_view` 收到的列层级。
    pub fn ui_updates(&self) -> Vec<u32> {
        self.updates.lock().clone()
    }
}

impl FlexibleColumnLayout for MemoryLayout {
    fn action_buttons_info(&self) -> ActionButtonsInfo {
        self.info.lock().clone()
    }

    fn rightmost_context(&self) -> Option<ContextHandle> {
        self.rightmost.lock().clone()
    }

    fn update_ui_state_for_view(&self, view_level: u32) {
        self.updates.lock().push(view_level);
    }
}

/// 固定回答的草稿离开确认。
pub struct MemoryConfirmation {
    answer: bool,
    asked: AtomicUsize,
}

impl MemoryConfirmation {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DraftConfirmation for MemoryConfirmation {
    async fn confirm_leave(&self, _context: &ContextHandle) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}
