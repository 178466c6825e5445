use parking_lot::Mutex;
use tracing::{debug, warn};

use super::predicate::SemanticCandidate;
use crate::ctxnav_core::error::{ModelError, NavigationError};
use crate::ctxnav_core::model::ODataModel;

/// semantic key 查询最多请求的行数。
///
/// 取 2 而不是 1：这样才能发现 semantic key 不唯一的情况。
pub const SEMANTIC_LOOKUP_TOP: usize = 2;

/// 最近一次成功的 semantic path -> technical path 映射。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticMapping {
    pub semantic_path: String,
    pub technical_path: String,
}

/// 把人类可读的 semantic key 路径换成技术 key 路径。
///
/// 只缓存最近一次解析结果（单条，写入即替换）。
#[derive(Debug, Default)]
pub struct SemanticPathResolver {
    last_mapping: Mutex<Option<SemanticMapping>>,
}

impl SemanticPathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_mapping(&self) -> Option<SemanticMapping> {
        self.last_mapping.lock().clone()
    }

    pub fn set_last_mapping(&self, mapping: Option<SemanticMapping>) {
        *self.last_mapping.lock() = mapping;
    }

    fn cached(&self, semantic_path: &str) -> Option<String> {
        self.last_mapping
            .lock()
            .as_ref()
            .filter(|m| m.semantic_path == semantic_path)
            .map(|m| m.technical_path.clone())
    }

    /// 解析 `path`。
    ///
    /// - 不适用 semantic bookmarking 时原样返回
    /// - 没有匹配行时返回 `Ok(None)`
    /// - semantic key 命中多个不同对象时视为无可用结果，返回 `Ok(None)`
    pub async fn resolve(
        &self,
        path: &str,
        model: &dyn ODataModel,
    ) -> Result<Option<String>, NavigationError> {
        let Some(candidate) = SemanticCandidate::parse(path) else {
            return Ok(Some(path.to_string()));
        };
        let failed = |source: ModelError| NavigationError::ResolutionFailed {
            path: path.to_string(),
            source,
        };

        let meta = model.meta_model();
        let collection = candidate.collection_path();
        if meta.draft_kind(&collection).await.map_err(failed)?.is_none() {
            return Ok(Some(path.to_string()));
        }
        let semantic_keys = meta.semantic_keys(&collection).await.map_err(failed)?;
        if semantic_keys.is_empty() {
            return Ok(Some(path.to_string()));
        }

        if let Some(technical_path) = self.cached(path) {
            debug!(%path, %technical_path, "semantic path served from last mapping");
            return Ok(Some(technical_path));
        }

        let Some(filter) = candidate.filter(&semantic_keys, meta.is_filtering_case_sensitive())
        else {
            debug!(%path, "key predicate does not cover the semantic keys");
            return Ok(Some(path.to_string()));
        };

        debug!(%path, %filter, "resolving semantic path");
        let rows = model
            .request_contexts(&collection, &filter, SEMANTIC_LOOKUP_TOP)
            .await
            .map_err(failed)?;

        let technical_path = match rows.as_slice() {
            [] => {
                debug!(%path, "semantic path matched no object");
                return Ok(None);
            }
            [first, rest @ ..] => {
                let first_path = first.path();
                if rest.iter().any(|row| row.path() != first_path) {
                    warn!(%path, matches = rows.len(), "semantic key is ambiguous");
                    return Ok(None);
                }
                first_path
            }
        };

        self.set_last_mapping(Some(SemanticMapping {
            semantic_path: path.to_string(),
            technical_path: technical_path.clone(),
        }));
        Ok(Some(technical_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctxnav_core::memory::{MemoryContext, MemoryMetaModel, MemoryModel};
    use crate::ctxnav_core::model::{DraftKind, Filter};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn orders_model(keys: &[&str]) -> MemoryModel {
        let meta = MemoryMetaModel::new()
            .with_draft("/Orders", DraftKind::Root)
            .with_semantic_keys("/Orders", keys);
        MemoryModel::new(meta)
    }

    #[tokio::test]
    async fn path_without_key_predicate_is_unchanged() {
        let model = orders_model(&["ID"]);
        let resolver = SemanticPathResolver::new();
        let resolved = resolver.resolve("/Orders", &model).await.unwrap();
        assert_eq!(resolved.as_deref(), Some("/Orders"));
        assert_eq!(model.query_count(), 0);
    }

    #[tokio::test]
    async fn entity_set_without_semantic_keys_is_unchanged() {
        let model = orders_model(&[]);
        let resolver = SemanticPathResolver::new();
        let resolved = resolver.resolve("/Orders('1')", &model).await.unwrap();
        assert_eq!(resolved.as_deref(), Some("/Orders('1')"));
        assert_eq!(model.query_count(), 0);
    }

    #[tokio::test]
    async fn entity_set_without_draft_is_unchanged() {
        let meta = MemoryMetaModel::new().with_semantic_keys("/Orders", &["ID"]);
        let model = MemoryModel::new(meta);
        let resolver = SemanticPathResolver::new();
        let resolved = resolver.resolve("/Orders('1')", &model).await.unwrap();
        assert_eq!(resolved.as_deref(), Some("/Orders('1')"));
        assert_eq!(model.query_count(), 0);
    }

    #[tokio::test]
    async fn builds_key_and_draft_filter_with_top_two() {
        let model = orders_model(&["ID"]);
        model.add_row(
            "/Orders",
            Arc::new(MemoryContext::new("/Orders(ID='5',IsActiveEntity=false)")),
        );
        let resolver = SemanticPathResolver::new();
        let resolved = resolver.resolve("/Orders('5')", &model).await.unwrap();
        assert_eq!(
            resolved.as_deref(),
            Some("/Orders(ID='5',IsActiveEntity=false)")
        );

        let queries = model.queries();
        assert_eq!(queries.len(), 1);
        let (collection, filter, top) = &queries[0];
        assert_eq!(collection, "/Orders");
        assert_eq!(*top, 2);
        assert!(filter.contains(&Filter::eq("ID", json!("5"))));
        assert!(filter.contains(&Filter::Any(vec![
            Filter::eq("IsActiveEntity", Value::Bool(false)),
            Filter::eq("SiblingEntity/IsActiveEntity", Value::Null),
        ])));
    }

    #[tokio::test]
    async fn second_resolution_uses_cache() {
        let model = orders_model(&["OrderNo"]);
        model.add_row(
            "/Orders",
            Arc::new(MemoryContext::new("/Orders(ID=1,IsActiveEntity=true)")),
        );
        let resolver = SemanticPathResolver::new();
        let first = resolver
            .resolve("/Orders(OrderNo='A-1')", &model)
            .await
            .unwrap();
        let second = resolver
            .resolve("/Orders(OrderNo='A-1')", &model)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(model.query_count(), 1);
        assert_eq!(
            resolver.last_mapping(),
            Some(SemanticMapping {
                semantic_path: "/Orders(OrderNo='A-1')".into(),
                technical_path: "/Orders(ID=1,IsActiveEntity=true)".into(),
            })
        );
    }

    #[tokio::test]
    async fn no_match_resolves_to_none() {
        let model = orders_model(&["OrderNo"]);
        let resolver = SemanticPathResolver::new();
        let resolved = resolver
            .resolve("/Orders(OrderNo='A-1')", &model)
            .await
            .unwrap();
        assert_eq!(resolved, None);
        assert_eq!(resolver.last_mapping(), None);
    }

    #[tokio::test]
    async fn ambiguous_key_resolves_to_none() {
        let model = orders_model(&["OrderNo"]);
        model.add_row("/Orders", Arc::new(MemoryContext::new("/Orders(ID=1,IsActiveEntity=true)")));
        model.add_row("/Orders", Arc::new(MemoryContext::new("/Orders(ID=2,IsActiveEntity=true)")));
        let resolver = SemanticPathResolver::new();
        let resolved = resolver
            .resolve("/Orders(OrderNo='A-1')", &model)
            .await
            .unwrap();
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn lookup_always_requests_two_rows() {
        let model = orders_model(&["OrderNo"]);
        for id in 1..=3 {
            model.add_row(
                "/Orders",
                Arc::new(MemoryContext::new(format!("/Orders(ID={id},IsActiveEntity=true)"))),
            );
        }
        let resolver = SemanticPathResolver::new();
        let resolved = resolver
            .resolve("/Orders(OrderNo='A-1')", &model)
            .await
            .unwrap();

        assert_eq!(resolved, None);
        let queries = model.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].2, SEMANTIC_LOOKUP_TOP);
        assert_eq!(SEMANTIC_LOOKUP_TOP, 2);
    }

    #[tokio::test]
    async fn query_failure_is_a_resolution_error() {
        let model = orders_model(&["OrderNo"]);
        model.fail_queries(ModelError::with_status(503, "service unavailable"));
        let resolver = SemanticPathResolver::new();
        let err = resolver
            .resolve("/Orders(OrderNo='A-1')", &model)
            .await
            .unwrap_err();
        assert!(matches!(err, NavigationError::ResolutionFailed { .. }));
        assert_eq!(err.status(), Some(503));
    }
}
