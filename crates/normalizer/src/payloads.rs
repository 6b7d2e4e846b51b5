//! Lenient readers for the GraphQL connection shapes.
//!
//! Every accessor treats a missing key, an explicit `null` and a value of
//! the wrong JSON type the same way: it yields the documented default.

use serde_json::Value;

pub fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub fn u64_field(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}

pub fn bool_field(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

pub fn total_count(value: &Value, key: &str) -> u64 {
    value
        .get(key)
        .map(|inner| u64_field(inner, "totalCount"))
        .unwrap_or(0)
}

pub fn object<'a>(value: &'a Value, key: &str) -> &'a Value {
    value.get(key).unwrap_or(&Value::Null)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl PageInfo {
    pub fn from_connection(connection: &Value) -> Self {
        let page_info = object(connection, "pageInfo");
        Self {
            has_next_page: bool_field(page_info, "hasNextPage"),
            end_cursor: page_info
                .get("endCursor")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub nodes: Vec<Value>,
    pub page_info: PageInfo,
    pub repository_count: u64,
    pub user_count: u64,
}

impl SearchPage {
    /// Reads `data.search`; null nodes are dropped.
    pub fn from_data(data: &Value) -> Self {
        let search = object(data, "search");
        let nodes = search
            .get("nodes")
            .and_then(Value::as_array)
            .map(|nodes| nodes.iter().filter(|n| !n.is_null()).cloned().collect())
            .unwrap_or_default();
        Self {
            nodes,
            page_info: PageInfo::from_connection(search),
            repository_count: u64_field(search, "repositoryCount"),
            user_count: u64_field(search, "userCount"),
        }
    }

    pub fn logins(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|node| str_field(node, "login"))
            .filter(|login| !login.is_empty())
            .collect()
    }
}
