use crate::ctxnav_core::lifecycle::NavigationParameters;
use crate::ctxnav_core::types::RouteArguments;

/// 匹配到的路由的结构信息。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteInformation {
    /// 该路由显示的 target 名列表。
    pub targets: Vec<String>,

    /// 路由的嵌套层级（与页面的 `view_level` 对齐）。
    pub route_level: u32,
}

/// router 每次匹配到路由时发出的事件。
#[derive(Debug, Default)]
pub struct RouteMatchedEvent {
    pub route_name: String,

    pub route_information: RouteInformation,

    /// path 变量与 query。
    pub arguments: RouteArguments,

    /// 触发方附带的导航信息（editable / reason / useContext …）。
    pub navigation_info: NavigationParameters,

    /// 路由自身的 pattern，作为 binding pattern 的最后兜底。
    pub route_pattern: Option<String>,
}

impl RouteMatchedEvent {
    pub fn new(route_name: impl Into<String>, route_information: RouteInformation) -> Self {
        Self {
            route_name: route_name.into(),
            route_information,
            ..Default::default()
        }
    }

    pub fn with_arguments(mut self, arguments: RouteArguments) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_navigation_info(mut self, navigation_info: NavigationParameters) -> Self {
        self.navigation_info = navigation_info;
        self
    }

    pub fn with_route_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.route_pattern = Some(pattern.into());
        self
    }
}
