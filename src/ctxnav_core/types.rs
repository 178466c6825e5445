use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// 路由参数中表示"对象正在创建、还没有 key"的占位值。
pub const DEFERRED_KEY_SENTINEL: &str = "...";

/// 路由参数中承载 query 部分的特殊 key。
pub const QUERY_ARGUMENT: &str = "?query";

/// 出现在 hash 里的"创建中"标记，例如 `Orders(...)`。
pub const TRANSIENT_HASH_MARKER: &str = "(...)";

/// 规范化的路由参数：
///
/// 代表一次 route match 中 path 变量与 query 合并后的视图。
/// - 普通变量是字符串（`"ID" -> "10"`，或占位值 `"..."`）
/// - `"?query"` 是一个对象（例如 `{"i-action": "create"}`）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteArguments {
    pub map: BTreeMap<String, Value>,
}

impl RouteArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个字符串变量。
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.map.insert(key.into(), Value::String(value.into()));
        self
    }

    /// 设置 `"?query"` 对象。
    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.map.insert(QUERY_ARGUMENT.to_string(), Value::Object(query));
        self
    }

    /// 所有字符串形式的 path 变量（跳过 query 和非字符串值）。
    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map
            .iter()
            .filter(|(key, _)| key.as_str() != QUERY_ARGUMENT)
            .filter_map(|(key, value)| value.as_str().map(|v| (key.as_str(), v)))
    }

    pub fn query(&self) -> Option<&Map<String, Value>> {
        self.map.get(QUERY_ARGUMENT).and_then(Value::as_object)
    }
}

/// 导航原因。
///
/// 路由方把原因编码成字符串放在 navigation info 里，这里收敛成一个封闭枚举。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum NavigationReason {
    /// 用户点击了列表行。
    RowPress,
    /// 由 app state 恢复触发（例如浏览器刷新、书签）。
    AppStateChanged,
    EditFlowAction,
    SaveFlowAction,
    Other(String),
}

impl From<String> for NavigationReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "RowPress" => Self::RowPress,
            "AppStateChanged" => Self::AppStateChanged,
            "EditFlowAction" => Self::EditFlowAction,
            "SaveFlowAction" => Self::SaveFlowAction,
            _ => Self::Other(value),
        }
    }
}

/// 页面的编辑状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Clean,
    /// 服务端可能已重新计算了部分值，下一次同路径 rebind 需要走 side effects。
    Dirty,
    Processing,
}

/// 数据绑定的种类。
///
/// 取代运行时的类型探测：每个绑定显式声明自己是 list / context / property。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    List,
    Context,
    Property,
}
