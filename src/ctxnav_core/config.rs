use serde::Deserialize;
use serde_json::Value;

/// 导航引擎的静态配置。
///
/// 通常来自应用 manifest 中的一段 JSON：
///
/// ```json
/// { "fclEnabled": true, "collaborativeDraft": false }
/// ```
///
/// 未给出的字段使用 `Default`。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationConfig {
    /// 是否运行在 Flexible Column Layout（多列）模式下。
    ///
    /// 打开后 context 都以 keep-alive 形式创建并跨列复用。
    pub fcl_enabled: bool,

    /// 应用是否启用了协同草稿。
    ///
    /// 决定复用 context 时遇到未提交修改是丢弃后刷新，还是跳过刷新。
    pub collaborative_draft: bool,

    /// 隐藏 context binding 的请求分组。
    pub hidden_group_id: String,

    /// 更新请求分组。
    pub update_group_id: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            fcl_enabled: false,
            collaborative_draft: false,
            hidden_group_id: "$auto.Heroes".to_string(),
            update_group_id: "$auto".to_string(),
        }
    }
}

impl NavigationConfig {
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn with_fcl(mut self, enabled: bool) -> Self {
        self.fcl_enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = NavigationConfig::from_json(json!({ "fclEnabled": true })).unwrap();
        assert!(config.fcl_enabled);
        assert!(!config.collaborative_draft);
        assert_eq!(config.hidden_group_id, "$auto.Heroes");
    }

    #[test]
    fn lookup_size_is_not_configurable() {
        let config =
            NavigationConfig::from_json(json!({ "semanticLookupTop": 1, "fclEnabled": true }))
                .unwrap();
        assert_eq!(config, NavigationConfig::default().with_fcl(true));
    }

    #[test]
    fn unknown_shape_is_rejected() {
        assert!(NavigationConfig::from_json(json!({ "fclEnabled": "yes" })).is_err());
    }
}
