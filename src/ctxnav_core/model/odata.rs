use std::sync::Arc;

use async_trait::async_trait;

use super::context::{ContextBinding, ContextHandle};
use super::filter::Filter;
use super::meta::MetaModel;
use crate::ctxnav_core::config::NavigationConfig;
use crate::ctxnav_core::error::ModelError;

/// 创建 context 时传给 model 的 binding 参数。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    /// `$$groupId`
    pub group_id: String,

    /// `$$updateGroupId`
    pub update_group_id: String,

    /// `$$patchWithoutSideEffects`
    pub patch_without_side_effects: bool,

    /// `$select`
    pub select: Vec<String>,

    /// `$expand`
    pub expand: Vec<String>,
}

impl QueryParameters {
    pub fn from_config(config: &NavigationConfig) -> Self {
        Self {
            group_id: config.hidden_group_id.clone(),
            update_group_id: config.update_group_id.clone(),
            patch_without_side_effects: true,
            select: Vec::new(),
            expand: Vec::new(),
        }
    }
}

/// OData model 的最小契约。
#[async_trait]
pub trait ODataModel: Send + Sync {
    fn meta_model(&self) -> Arc<dyn MetaModel>;

    /// 对集合执行过滤查询，最多返回 `top` 行。
    async fn request_contexts(
        &self,
        collection_path: &str,
        filter: &Filter,
        top: usize,
    ) -> Result<Vec<ContextHandle>, ModelError>;

    /// 为绝对路径创建一个独立的 context binding。
    fn bind_context(&self, path: &str, parameters: &QueryParameters) -> Arc<dyn ContextBinding>;

    /// 取得（或创建）该路径的 keep-alive context。
    fn keep_alive_context(
        &self,
        path: &str,
        request_messages: bool,
        parameters: &QueryParameters,
    ) -> Result<ContextHandle, ModelError>;
}
