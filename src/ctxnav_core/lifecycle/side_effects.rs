use crate::ctxnav_core::model::{BindingHandle, SideEffectTarget};
use crate::ctxnav_core::types::BindingKind;

/// 沿着依赖 binding 树收集 side effects 目标。
///
/// - list / context binding 记为导航属性目标；
///   带子 binding 的 context binding 不记自身，继续向下展开
/// - property binding 记为属性目标，只保留首段
///
/// 路径都相对于根 context。
#[derive(Debug)]
pub struct SideEffectsCollector {
    root_path: String,
    navigation_paths: Vec<String>,
    property_paths: Vec<String>,
}

impl SideEffectsCollector {
    pub fn new(root_path: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
            navigation_paths: Vec::new(),
            property_paths: Vec::new(),
        }
    }

    /// binding 相对根 context 的路径。
    fn relative_path(&self, binding: &BindingHandle) -> String {
        let context_path = binding.context_path().unwrap_or_default();
        let prefix = context_path
            .strip_prefix(self.root_path.as_str())
            .unwrap_or_default()
            .trim_start_matches('/');
        let own = binding.path();
        if prefix.is_empty() {
            own
        } else {
            format!("{prefix}/{own}")
        }
    }

    pub fn visit(&mut self, binding: &BindingHandle) {
        let path = self.relative_path(binding);
        match binding.kind() {
            BindingKind::Context => {
                let dependents = binding.dependent_bindings();
                if dependents.is_empty() {
                    push_unique(&mut self.navigation_paths, path);
                } else {
                    for dependent in &dependents {
                        self.visit(dependent);
                    }
                }
            }
            BindingKind::List => push_unique(&mut self.navigation_paths, path),
            BindingKind::Property => self.property_paths.push(path),
        }
    }

    /// 汇总成一次 side effects 请求的目标列表。
    pub fn into_targets(self, messages_path: Option<String>) -> Vec<SideEffectTarget> {
        let mut properties: Vec<String> = Vec::new();
        for path in self.property_paths {
            let head = path.split('/').next().unwrap_or_default().to_string();
            if !head.is_empty() {
                push_unique(&mut properties, head);
            }
        }
        if let Some(messages) = messages_path {
            push_unique(&mut properties, messages);
        }

        self.navigation_paths
            .into_iter()
            .filter(|p| !p.is_empty())
            .map(SideEffectTarget::NavigationProperty)
            .chain(properties.into_iter().map(SideEffectTarget::Property))
            .collect()
    }
}

fn push_unique(paths: &mut Vec<String>, path: String) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctxnav_core::memory::MemoryBinding;
    use std::sync::Arc;

    const ROOT: &str = "/Orders(ID=1,IsActiveEntity=false)";

    fn property(path: &str, context_path: &str) -> BindingHandle {
        Arc::new(MemoryBinding::new(BindingKind::Property, path).with_context_path(context_path))
    }

    #[test]
    fn collects_navigation_and_first_segment_properties() {
        let items = Arc::new(MemoryBinding::new(BindingKind::List, "_Item").with_context_path(ROOT));
        let customer = Arc::new(
            MemoryBinding::new(BindingKind::Context, "_Customer").with_context_path(ROOT),
        );
        let mut collector = SideEffectsCollector::new(ROOT);
        collector.visit(&(items as BindingHandle));
        collector.visit(&(customer as BindingHandle));
        collector.visit(&property("Status", ROOT));
        collector.visit(&property("Amount/Currency", ROOT));
        collector.visit(&property("Amount/Value", ROOT));

        let targets = collector.into_targets(Some("SAP__Messages".to_string()));
        assert_eq!(
            targets,
            vec![
                SideEffectTarget::NavigationProperty("_Item".into()),
                SideEffectTarget::NavigationProperty("_Customer".into()),
                SideEffectTarget::Property("Status".into()),
                SideEffectTarget::Property("Amount".into()),
                SideEffectTarget::Property("SAP__Messages".into()),
            ]
        );
    }

    #[test]
    fn context_binding_with_dependents_is_flattened() {
        let nested_ctx = format!("{ROOT}/_Customer");
        let address = Arc::new(
            MemoryBinding::new(BindingKind::List, "_Address").with_context_path(&nested_ctx),
        );
        let customer = MemoryBinding::new(BindingKind::Context, "_Customer").with_context_path(ROOT);
        customer.add_dependent(address);
        customer.add_dependent(property("Name", &nested_ctx));

        let mut collector = SideEffectsCollector::new(ROOT);
        collector.visit(&(Arc::new(customer) as BindingHandle));
        let targets = collector.into_targets(None);

        assert_eq!(
            targets,
            vec![
                SideEffectTarget::NavigationProperty("_Customer/_Address".into()),
                SideEffectTarget::Property("_Customer".into()),
            ]
        );
    }
}
