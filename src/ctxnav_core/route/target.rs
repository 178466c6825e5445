use super::matched::RouteInformation;

/// 单个页面的静态目标描述。
///
/// 初始化后不可变：描述"这个页面是谁"、"它的 context 从哪个 pattern 来"、
/// 以及它在多列布局中位于哪一列。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInformation {
    /// 页面在路由配置中的 target 名，例如 `"OrdersObjectPage"`。
    pub target_name: String,

    /// binding context 的路径 pattern，例如 `"/Orders({key})"`。
    ///
    /// `None` 表示没有静态 pattern，使用路由自身的 pattern；
    /// `Some("")` 是合法的空 pattern（列表页 / 根页面）。
    pub context_pattern: Option<String>,

    /// FCL 中的列层级（0 为最左列）。
    pub view_level: u32,

    /// 该页面参与的路由名。
    pub routes: Vec<String>,
}

impl TargetInformation {
    pub fn new(target_name: impl Into<String>, view_level: u32) -> Self {
        Self {
            target_name: target_name.into(),
            context_pattern: None,
            view_level,
            routes: Vec::new(),
        }
    }

    pub fn with_context_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.context_pattern = Some(pattern.into());
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.routes.push(route.into());
        self
    }

    /// 该页面是否是这次匹配路由的目标之一。
    ///
    /// 路由的 target 列表里点名了本页面，或本页面声明参与该路由，都算命中。
    pub fn is_target_of(&self, route_name: &str, info: &RouteInformation) -> bool {
        info.targets.iter().any(|t| *t == self.target_name)
            || self.routes.iter().any(|r| r == route_name)
    }
}
