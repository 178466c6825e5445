use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::Value;

use crate::ctxnav_core::model::Filter;

/// 单段根路径：`/EntitySet(keyPredicate)`。
static SINGLE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/?(\w+)\(([^/]+)\)$").expect("static regex"));

/// key predicate 中的一项赋值。
///
/// `name` 为 `None` 表示单个未命名 key（`Orders('5')`）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAssignment {
    pub name: Option<String>,
    pub value: String,
    pub quoted: bool,
}

/// 可能是 semantic key 的路径：单段、带 key predicate。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticCandidate {
    pub entity_set: String,
    pub assignments: Vec<KeyAssignment>,
}

impl SemanticCandidate {
    /// 不是单段 `EntitySet(...)` 形式时返回 `None`。
    pub fn parse(path: &str) -> Option<Self> {
        let captures = SINGLE_SEGMENT.captures(path)?;
        let entity_set = captures.get(1)?.as_str().to_string();
        let predicate = captures.get(2)?.as_str();
        Some(Self {
            entity_set,
            assignments: parse_key_predicate(predicate),
        })
    }

    pub fn collection_path(&self) -> String {
        format!("/{}", self.entity_set)
    }

    fn value_for(&self, key: &str, key_count: usize) -> Option<&KeyAssignment> {
        if let [only] = self.assignments.as_slice() {
            if only.name.is_none() {
                return (key_count == 1).then_some(only);
            }
        }
        self.assignments
            .iter()
            .find(|a| a.name.as_deref() == Some(key))
    }

    /// 每个 semantic key 一个相等条件，再与草稿过滤条件 AND。
    ///
    /// predicate 没有覆盖全部 semantic key 时返回 `None`。
    pub fn filter(&self, semantic_keys: &[String], case_sensitive: bool) -> Option<Filter> {
        let mut equalities = Vec::with_capacity(semantic_keys.len());
        for key in semantic_keys {
            let assignment = self.value_for(key, semantic_keys.len())?;
            equalities.push(Filter::eq_with_case(
                key.as_str(),
                literal(assignment),
                case_sensitive,
            ));
        }
        Some(Filter::All(vec![
            Filter::All(equalities),
            Filter::draft_sibling(),
        ]))
    }
}

fn literal(assignment: &KeyAssignment) -> Value {
    if assignment.quoted {
        return Value::String(assignment.value.clone());
    }
    match assignment.value.as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => other
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(other.to_string())),
    }
}

/// 按引号外的分隔符切分。
fn split_outside_quotes(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    for (i, ch) in input.char_indices() {
        if ch == '\'' {
            in_quote = !in_quote;
        } else if ch == separator && !in_quote {
            parts.push(&input[start..i]);
            start = i + ch.len_utf8();
        }
    }
    parts.push(&input[start..]);
    parts
}

fn unquote(raw: &str) -> (String, bool) {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        let inner = raw[1..raw.len() - 1].replace("''", "'");
        let decoded = match percent_decode_str(&inner).decode_utf8() {
            Ok(s) => s.into_owned(),
            Err(_) => inner.clone(),
        };
        (decoded, true)
    } else {
        (raw.to_string(), false)
    }
}

/// `'5'` / `OrderNo='A-1',Year=2024` 解析成赋值列表。
pub fn parse_key_predicate(predicate: &str) -> Vec<KeyAssignment> {
    split_outside_quotes(predicate, ',')
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let pieces = split_outside_quotes(part, '=');
            match pieces.as_slice() {
                [name, value] => {
                    let (value, quoted) = unquote(value);
                    KeyAssignment {
                        name: Some(name.trim().to_string()),
                        value,
                        quoted,
                    }
                }
                _ => {
                    let (value, quoted) = unquote(part);
                    KeyAssignment {
                        name: None,
                        value,
                        quoted,
                    }
                }
            }
        })
        .collect()
}
