use async_trait::async_trait;

use crate::ctxnav_core::error::ModelError;

/// 实体集上的草稿能力注解。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftKind {
    /// 草稿根（`DraftRoot`）。
    Root,
    /// 草稿子节点（`DraftNode`）。
    Node,
}

/// 只读的 metadata 查询接口。
///
/// 参数都是 meta path（去掉 key predicate 的路径，例如 `/Orders/_Item`）。
#[async_trait]
pub trait MetaModel: Send + Sync {
    async fn draft_kind(&self, meta_path: &str) -> Result<Option<DraftKind>, ModelError>;

    /// 实体类型声明的 semantic key（有序属性路径列表）。
    async fn semantic_keys(&self, meta_path: &str) -> Result<Vec<String>, ModelError>;

    /// 注解的 messages 集合路径（例如 `SAP__Messages`）。
    async fn messages_path(&self, meta_path: &str) -> Result<Option<String>, ModelError>;

    fn is_filtering_case_sensitive(&self) -> bool;

    fn is_collaboration_draft_supported(&self) -> bool;
}

/// 把资源路径转换成 meta path：去掉每个段上的 key predicate。
///
/// `/Orders('A(1)')/_Item(2)` -> `/Orders/_Item`
pub fn meta_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut depth = 0usize;
    let mut in_quote = false;
    for ch in path.chars() {
        match ch {
            '\'' if depth > 0 => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote && depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    if !out.is_empty() && !out.starts_with('/') {
        out.insert(0, '/');
    }
    out
}
