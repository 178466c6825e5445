use crate::ctxnav_core::lifecycle::NavigationParameters;
use crate::ctxnav_core::types::{RouteArguments, DEFERRED_KEY_SENTINEL};

/// pattern 末尾可选 query 的标记。
const QUERY_TOKEN: &str = ":?query:";

/// query 中表示"通过 action 创建"的参数名。
const ACTION_CREATE_PARAMETER: &str = "i-action";

/// 由路由参数和 pattern 算出的资源路径。
///
/// `path` 为空（列表 / 根页面）或以 `/` 开头。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBindingPath {
    pub path: String,

    /// 目标对象还在创建中，没有 key。
    pub deferred: bool,
}

/// 把路由参数代入 binding pattern，得到绝对资源路径。
///
/// - 去掉 `:?query:`
/// - 每个 `{key}` 占位符替换成参数值
/// - 值为 `"..."` 且 pattern 中确实有该占位符时，标记 deferred，
///   并让目标页面以可编辑状态渲染
/// - query 中带 `i-action` 时标记 action create
///
/// 纯字符串变换，不会失败。
pub fn build_binding_path(
    arguments: &RouteArguments,
    pattern: &str,
    params: &mut NavigationParameters,
) -> ResolvedBindingPath {
    let pattern = pattern.replace(QUERY_TOKEN, "");
    let mut path = pattern.clone();
    let mut deferred = false;

    for (key, value) in arguments.values() {
        let placeholder = format!("{{{key}}}");
        if !pattern.contains(&placeholder) {
            continue;
        }
        if value == DEFERRED_KEY_SENTINEL {
            deferred = true;
            params.target_editable = true;
        }
        path = path.replace(&placeholder, value);
    }

    if arguments
        .query()
        .is_some_and(|query| query.contains_key(ACTION_CREATE_PARAMETER))
    {
        params.action_create = true;
    }

    if !path.is_empty() && !path.starts_with('/') {
        path.insert(0, '/');
    }

    ResolvedBindingPath { path, deferred }
}
