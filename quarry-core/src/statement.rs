use crate::{dialect::classify, Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// The binding discipline of a statement, derived from its placeholders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindMode {
    /// No placeholders.
    None,
    /// Bare `:` placeholders bound by occurrence order.
    Auto,
    /// `:1`, `:2`, ... placeholders bound by position.
    Seq,
    /// `:name` placeholders bound from a record or mapping.
    Named,
}

impl fmt::Display for BindMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindMode::None => "byNone",
            BindMode::Auto => "byAuto",
            BindMode::Seq => "bySeq",
            BindMode::Named => "byName",
        })
    }
}

/// A statement in canonical form: `?` markers, ordered parameter names, and
/// the binding classification.
#[derive(Debug, Clone)]
pub struct ParsedSql {
    pub id: String,
    pub sql: String,
    pub bind: BindMode,
    pub vars: Vec<String>,
    pub max_seq: usize,
    pub is_query: bool,
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'?:\w*'?").unwrap());

/// Rewrite `:name` / `:N` / `:` placeholders (and their single-quoted forms)
/// to `?` markers, collecting parameter names in order.
pub fn parse_sql(id: &str, stmt: &str) -> Result<ParsedSql> {
    let mut vars = Vec::new();
    let sql = PLACEHOLDER.replace_all(stmt, |caps: &regex::Captures| {
        let m = caps.get(0).unwrap().as_str();
        let mut v = if m.starts_with('\'') { &m[2..] } else { &m[1..] };
        if v.ends_with('\'') {
            v = &v[..v.len() - 1];
        }
        vars.push(v.to_string());
        "?"
    });
    let (bind, max_seq) = parse_bind_by(id, &vars)?;
    let (_, is_query) = classify(stmt);
    Ok(ParsedSql {
        id: id.to_string(),
        sql: sql.into_owned(),
        bind,
        vars,
        max_seq,
        is_query,
    })
}

fn parse_bind_by(id: &str, vars: &[String]) -> Result<(BindMode, usize)> {
    let mut bind = BindMode::None;
    let mut max_seq = 0usize;
    for v in vars {
        let mode = if v.is_empty() {
            BindMode::Auto
        } else if v.bytes().all(|b| b.is_ascii_digit()) {
            BindMode::Seq
        } else {
            BindMode::Named
        };
        if bind != BindMode::None && bind != mode {
            return Err(Error::InvalidBinding {
                id: id.to_string(),
                first: bind,
                second: mode,
            });
        }
        bind = mode;
        match mode {
            BindMode::Seq => {
                let n: usize = v.parse().unwrap_or(0);
                if max_seq < n {
                    max_seq = n;
                }
            }
            _ => max_seq += 1,
        }
    }
    Ok((bind, max_seq))
}
