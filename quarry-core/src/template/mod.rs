mod expr;

pub use expr::{CompiledExpr, EmptyEnv, Env};

use crate::{Error, Result};

/// A node of the parsed dynamic-SQL tree.
#[derive(Debug, Clone)]
pub enum SqlPart {
    /// Literal lines, joined by newline when rendered.
    Literal(String),
    /// `if` / `elseif` ... `else` chain. Branch expressions are compiled once.
    Cond {
        branches: Vec<(CompiledExpr, SqlPart)>,
        otherwise: Option<Box<SqlPart>>,
    },
    Seq(Vec<SqlPart>),
    /// Outermost wrapper: trims the item delimiter from the rendered text.
    Post {
        inner: Box<SqlPart>,
        delimiter: String,
    },
}

impl SqlPart {
    /// Render the part against an environment. Two evaluations with the same
    /// environment produce byte-identical SQL.
    pub fn eval(&self, id: &str, env: &dyn Env) -> Result<String> {
        match self {
            SqlPart::Literal(text) => Ok(text.clone()),
            SqlPart::Cond {
                branches,
                otherwise,
            } => {
                for (cond, part) in branches {
                    if cond.eval_bool(id, env)? {
                        return part.eval(id, env);
                    }
                }
                match otherwise {
                    Some(part) => part.eval(id, env),
                    None => Ok(String::new()),
                }
            }
            SqlPart::Seq(parts) => {
                let mut out = String::new();
                for part in parts {
                    let rendered = part.eval(id, env)?;
                    if rendered.is_empty() {
                        continue;
                    }
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(&rendered);
                }
                Ok(out)
            }
            SqlPart::Post { inner, delimiter } => {
                let rendered = inner.eval(id, env)?;
                Ok(trim_delimiter(&rendered, delimiter).to_string())
            }
        }
    }
}

fn trim_delimiter<'a>(text: &'a str, delimiter: &str) -> &'a str {
    let mut t = text.trim();
    loop {
        let mut changed = false;
        if let Some(s) = t.strip_prefix(delimiter) {
            t = s.trim();
            changed = true;
        }
        if let Some(s) = t.strip_suffix(delimiter) {
            t = s.trim();
            changed = true;
        }
        if !changed {
            return t;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Literal(String),
    If(String),
    ElseIf(String),
    Else,
    End,
    Comment,
}

/// Parse the lines of a template item into a part tree. The `delimiter` comes
/// from the item's attributes (default `;`).
pub fn parse_template(id: &str, lines: &[String], delimiter: &str) -> Result<SqlPart> {
    let mut classified = Vec::new();
    for raw in lines {
        for piece in normalize_block_directives(raw) {
            classified.push(classify_line(&piece));
        }
    }
    let mut pos = 0;
    let inner = parse_seq(id, &classified, &mut pos, false)?;
    if pos != classified.len() {
        return Err(Error::MalformedTemplate {
            id: id.to_string(),
            reason: "directive without a matching `if`".into(),
        });
    }
    Ok(SqlPart::Post {
        inner: Box::new(inner),
        delimiter: delimiter.to_string(),
    })
}

/// Split a line containing `/* kw ... */` block directives into separate
/// literal and directive lines.
fn normalize_block_directives(line: &str) -> Vec<String> {
    if !line.contains("/*") {
        return vec![line.to_string()];
    }
    let mut out = Vec::new();
    let mut rest = line;
    loop {
        let Some(start) = rest.find("/*") else {
            break;
        };
        let Some(end_rel) = rest[start + 2..].find("*/") else {
            break;
        };
        let end = start + 2 + end_rel;
        let body = rest[start + 2..end].trim();
        let keyword = body.split_whitespace().next().unwrap_or("");
        if !matches!(keyword, "if" | "elseif" | "else" | "end") {
            break;
        }
        let before = rest[..start].trim();
        if !before.is_empty() {
            out.push(before.to_string());
        }
        out.push(format!("-- {}", body));
        rest = &rest[end + 2..];
    }
    if out.is_empty() {
        return vec![line.to_string()];
    }
    let tail = rest.trim();
    if !tail.is_empty() {
        out.push(tail.to_string());
    }
    out
}

fn classify_line(line: &str) -> Line {
    let trimmed = line.trim_start();
    let Some(comment) = trimmed.strip_prefix("--") else {
        return Line::Literal(line.to_string());
    };
    let comment = comment.trim_start();
    let mut words = comment.splitn(2, char::is_whitespace);
    let keyword = words.next().unwrap_or("");
    let rest = words.next().unwrap_or("").trim();
    match keyword {
        "if" => Line::If(rest.to_string()),
        "elseif" => Line::ElseIf(rest.to_string()),
        "else" => Line::Else,
        "end" => Line::End,
        _ => Line::Comment,
    }
}

/// Parse a run of lines into a sequence. With `terminated`, stop before
/// `elseif` / `else` / `end` and leave them for the caller.
fn parse_seq(id: &str, lines: &[Line], pos: &mut usize, terminated: bool) -> Result<SqlPart> {
    let mut parts: Vec<SqlPart> = Vec::new();
    let mut literal: Vec<&str> = Vec::new();
    macro_rules! flush_literal {
        () => {
            if !literal.is_empty() {
                parts.push(SqlPart::Literal(literal.join("\n")));
                literal.clear();
            }
        };
    }
    while *pos < lines.len() {
        match &lines[*pos] {
            Line::Literal(text) => {
                literal.push(text);
                *pos += 1;
            }
            Line::Comment => {
                *pos += 1;
            }
            Line::If(expr) => {
                flush_literal!();
                *pos += 1;
                parts.push(parse_cond(id, expr, lines, pos)?);
            }
            Line::ElseIf(_) | Line::Else | Line::End => {
                if terminated {
                    break;
                }
                return Err(Error::MalformedTemplate {
                    id: id.to_string(),
                    reason: "directive without a matching `if`".into(),
                });
            }
        }
    }
    flush_literal!();
    Ok(match parts.len() {
        1 => parts.pop().unwrap(),
        _ => SqlPart::Seq(parts),
    })
}

fn parse_cond(id: &str, first_expr: &str, lines: &[Line], pos: &mut usize) -> Result<SqlPart> {
    let mut branches = Vec::new();
    let mut otherwise = None;
    let mut expr = CompiledExpr::compile(id, first_expr)?;
    loop {
        let body = parse_seq(id, lines, pos, true)?;
        match lines.get(*pos) {
            Some(Line::ElseIf(next_expr)) => {
                branches.push((expr, body));
                expr = CompiledExpr::compile(id, next_expr)?;
                *pos += 1;
            }
            Some(Line::Else) => {
                branches.push((expr, body));
                *pos += 1;
                let else_body = parse_seq(id, lines, pos, true)?;
                match lines.get(*pos) {
                    Some(Line::End) => {
                        *pos += 1;
                        otherwise = Some(Box::new(else_body));
                        break;
                    }
                    _ => {
                        return Err(Error::MalformedTemplate {
                            id: id.to_string(),
                            reason: "`else` without a matching `end`".into(),
                        });
                    }
                }
            }
            Some(Line::End) => {
                branches.push((expr, body));
                *pos += 1;
                break;
            }
            _ => {
                return Err(Error::MalformedTemplate {
                    id: id.to_string(),
                    reason: "`if` without a matching `end`".into(),
                });
            }
        }
    }
    Ok(SqlPart::Cond {
        branches,
        otherwise,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use std::collections::HashMap;

    struct MapEnv(HashMap<String, Value>);

    impl Env for MapEnv {
        fn get(&self, name: &str) -> Option<Value> {
            self.0.get(name).cloned()
        }
    }

    fn env(pairs: &[(&str, i64)]) -> MapEnv {
        MapEnv(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Value::Int64(Some(*v))))
                .collect(),
        )
    }

    fn lines(src: &str) -> Vec<String> {
        src.lines().map(|l| l.to_string()).collect()
    }

    #[test]
    fn plain_lines_join_with_newline() {
        let part = parse_template("t", &lines("select id\nfrom person"), ";").unwrap();
        assert_eq!(part.eval("t", &EmptyEnv).unwrap(), "select id\nfrom person");
    }

    #[test]
    fn conditional_branch_selection() {
        let src = "select addr from person where id = :1\n-- if _2 > 0\nand age = :2\n-- end";
        let part = parse_template("getAddr", &lines(src), ";").unwrap();
        assert_eq!(
            part.eval("getAddr", &env(&[("_1", 1), ("_2", 0)])).unwrap(),
            "select addr from person where id = :1"
        );
        assert_eq!(
            part.eval("getAddr", &env(&[("_1", 1), ("_2", 600)])).unwrap(),
            "select addr from person where id = :1 and age = :2"
        );
    }

    #[test]
    fn elseif_and_else() {
        let src = "select * from t\n-- if n > 10\nwhere a = 1\n-- elseif n > 5\nwhere a = 2\n-- else\nwhere a = 3\n-- end";
        let part = parse_template("t", &lines(src), ";").unwrap();
        assert_eq!(
            part.eval("t", &env(&[("n", 20)])).unwrap(),
            "select * from t where a = 1"
        );
        assert_eq!(
            part.eval("t", &env(&[("n", 7)])).unwrap(),
            "select * from t where a = 2"
        );
        assert_eq!(
            part.eval("t", &env(&[("n", 1)])).unwrap(),
            "select * from t where a = 3"
        );
    }

    #[test]
    fn nested_conditionals() {
        let src = "select 1\n-- if a > 0\nand a = :a\n-- if b > 0\nand b = :b\n-- end\n-- end";
        let part = parse_template("t", &lines(src), ";").unwrap();
        assert_eq!(
            part.eval("t", &env(&[("a", 1), ("b", 1)])).unwrap(),
            "select 1 and a = :a and b = :b"
        );
        assert_eq!(
            part.eval("t", &env(&[("a", 1), ("b", 0)])).unwrap(),
            "select 1 and a = :a"
        );
        assert_eq!(part.eval("t", &env(&[("a", 0), ("b", 1)])).unwrap(), "select 1");
    }

    #[test]
    fn block_directives_are_normalized() {
        let src = "select addr from person where id = :1 /* if _2 > 0 */ and age = :2 /* end */";
        let part = parse_template("t", &lines(src), ";").unwrap();
        assert_eq!(
            part.eval("t", &env(&[("_2", 600)])).unwrap(),
            "select addr from person where id = :1 and age = :2"
        );
        assert_eq!(
            part.eval("t", &env(&[("_2", 0)])).unwrap(),
            "select addr from person where id = :1"
        );
    }

    #[test]
    fn unknown_comments_do_not_emit() {
        let src = "-- Finds all users\nselect * from person";
        let part = parse_template("t", &lines(src), ";").unwrap();
        assert_eq!(part.eval("t", &EmptyEnv).unwrap(), "select * from person");
    }

    #[test]
    fn delimiter_is_trimmed() {
        let part = parse_template("t", &lines("select 1;"), ";").unwrap();
        assert_eq!(part.eval("t", &EmptyEnv).unwrap(), "select 1");
        let part = parse_template("t", &lines("select 1 $$"), "$$").unwrap();
        assert_eq!(part.eval("t", &EmptyEnv).unwrap(), "select 1");
    }

    #[test]
    fn missing_end_is_malformed() {
        let err = parse_template("t", &lines("select 1\n-- if a > 0\nand a = 1"), ";").unwrap_err();
        assert!(matches!(err, Error::MalformedTemplate { .. }));
    }

    #[test]
    fn stray_end_is_malformed() {
        let err = parse_template("t", &lines("select 1\n-- end"), ";").unwrap_err();
        assert!(matches!(err, Error::MalformedTemplate { .. }));
    }

    #[test]
    fn bad_expression_fails_at_parse_time() {
        let err = parse_template("t", &lines("select 1\n-- if a >\nx\n-- end"), ";").unwrap_err();
        assert!(matches!(err, Error::BadExpression { .. }));
    }
}
