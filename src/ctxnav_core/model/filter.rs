use std::fmt;

use serde_json::Value;

/// 草稿状态相关的属性名。
pub const IS_ACTIVE_ENTITY: &str = "IsActiveEntity";
pub const HAS_ACTIVE_ENTITY: &str = "HasActiveEntity";
pub const HAS_DRAFT_ENTITY: &str = "HasDraftEntity";
pub const SIBLING_IS_ACTIVE_ENTITY: &str = "SiblingEntity/IsActiveEntity";

/// 列表查询的过滤条件。
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `path eq value`。
    Eq {
        path: String,
        value: Value,
        case_sensitive: bool,
    },

    /// 所有子条件同时成立（AND）。
    All(Vec<Filter>),

    /// 任一子条件成立（OR）。
    Any(Vec<Filter>),
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: Value) -> Self {
        Filter::Eq {
            path: path.into(),
            value,
            case_sensitive: true,
        }
    }

    pub fn eq_with_case(path: impl Into<String>, value: Value, case_sensitive: bool) -> Self {
        Filter::Eq {
            path: path.into(),
            value,
            case_sensitive,
        }
    }

    /// `(IsActiveEntity eq false) or (SiblingEntity/IsActiveEntity eq null)`
    ///
    /// 同时存在草稿和激活版本时只命中草稿；没有草稿时命中激活版本。
    pub fn draft_sibling() -> Self {
        Filter::Any(vec![
            Filter::eq(IS_ACTIVE_ENTITY, Value::Bool(false)),
            Filter::eq(SIBLING_IS_ACTIVE_ENTITY, Value::Null),
        ])
    }

    /// 递归查找是否包含某个子条件。
    pub fn contains(&self, needle: &Filter) -> bool {
        if self == needle {
            return true;
        }
        match self {
            Filter::Eq { .. } => false,
            Filter::All(children) | Filter::Any(children) => {
                children.iter().any(|child| child.contains(needle))
            }
        }
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        other => write!(f, "{other}"),
    }
}

/// 渲染成 OData `$filter` 表达式。
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Eq {
                path,
                value,
                case_sensitive,
            } => {
                if !case_sensitive && value.is_string() {
                    write!(f, "tolower({path}) eq tolower(")?;
                    write_literal(f, value)?;
                    write!(f, ")")
                } else {
                    write!(f, "{path} eq ")?;
                    write_literal(f, value)
                }
            }
            Filter::All(children) | Filter::Any(children) => {
                let op = if matches!(self, Filter::All(_)) {
                    " and "
                } else {
                    " or "
                };
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(op)?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}
