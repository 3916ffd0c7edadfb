use crate::template::{parse_template, SqlPart};
use crate::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// A named SQL template item from a dot-SQL source or an inline annotation.
#[derive(Debug, Clone, Default)]
pub struct SqlItem {
    pub name: String,
    pub lines: Vec<String>,
    pub attrs: HashMap<String, String>,
}

impl SqlItem {
    pub fn inline(name: &str, sql: &str, attrs: &[(&str, &str)]) -> Self {
        SqlItem {
            name: name.to_string(),
            lines: sql.lines().map(|l| l.to_string()).collect(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
        }
    }

    pub fn delimiter(&self) -> &str {
        self.attrs.get("delimiter").map(String::as_str).unwrap_or(";")
    }

    pub fn raw(&self) -> String {
        self.lines.join("\n")
    }

    /// Compile the item's lines into a template part tree.
    pub fn compile(&self) -> Result<SqlPart> {
        parse_template(&self.name, &self.lines, self.delimiter())
    }
}

static ATTR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w+)\s*(:\s*(\S+))?").unwrap());

/// Parse a `-- key:value key:value` tag line. Returns the attribute map and
/// the main tag's value when the line is a tag line with `prefix`.
pub fn parse_dot_tag(line: &str, prefix: &str, main_tag: &str) -> Option<(HashMap<String, String>, String)> {
    let l = line.trim();
    let l = l.strip_prefix(prefix)?;
    let mut attrs = HashMap::new();
    for caps in ATTR.captures_iter(l) {
        let key = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let value = caps.get(3).map(|m| m.as_str()).unwrap_or("");
        attrs.insert(key.to_lowercase(), value.to_string());
    }
    let main = attrs.get(main_tag).cloned().unwrap_or_default();
    Some((attrs, main))
}

/// The registry of named SQL template items.
#[derive(Debug, Clone, Default)]
pub struct DotSql {
    items: HashMap<String, SqlItem>,
}

impl DotSql {
    /// Scan a dot-SQL source. `-- name: <id> [key:value]*` opens an item;
    /// following non-empty lines accumulate until the next name line or EOF.
    pub fn load_str(source: &str) -> Result<Self> {
        let mut items = HashMap::new();
        let mut current: Option<SqlItem> = None;
        for line in source.lines() {
            if let Some((attrs, name)) = parse_dot_tag(line, "--", "name") {
                if !name.is_empty() {
                    if let Some(item) = current.take() {
                        if !item.lines.is_empty() {
                            items.insert(item.name.clone(), item);
                        }
                    }
                    current = Some(SqlItem {
                        name,
                        lines: Vec::new(),
                        attrs,
                    });
                    continue;
                }
            }
            let Some(item) = current.as_mut() else {
                continue;
            };
            let trimmed = line.trim_matches([' ', '\t']);
            if trimmed.is_empty() {
                continue;
            }
            item.lines.push(trimmed.to_string());
        }
        if let Some(item) = current.take() {
            if !item.lines.is_empty() {
                items.insert(item.name.clone(), item);
            }
        }
        Ok(DotSql { items })
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    pub fn get(&self, name: &str) -> Result<&SqlItem> {
        self.items
            .get(name)
            .ok_or_else(|| Error::UnknownStatement(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn merge(&mut self, other: DotSql) {
        self.items.extend(other.items);
    }
}
