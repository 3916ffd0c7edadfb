use crate::{Error, Result};
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Rewrite a SELECT into its COUNT(*) counterpart: the projection becomes
/// `COUNT(*)`, `ORDER BY` and `HAVING` are cleared, `LIMIT`/`OFFSET` are
/// dropped. Returns the rewritten SQL and the number of `?` markers that were
/// dropped with the limit/offset clauses, so the caller can truncate the
/// parameter vector from the tail.
pub fn count_sql(id: &str, sql: &str) -> Result<(String, usize)> {
    let mut statements = Parser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| Error::Unsupported(format!("statement `{}`: {}", id, e)))?;
    if statements.len() != 1 {
        return Err(Error::Unsupported(format!(
            "statement `{}`: expected a single SELECT",
            id
        )));
    }
    let Statement::Query(query) = &mut statements[0] else {
        return Err(Error::Unsupported(format!(
            "statement `{}`: count rewrite needs a SELECT",
            id
        )));
    };

    let mut dropped = 0;
    if let Some(limit) = query.limit.take() {
        dropped += limit.to_string().matches('?').count();
    }
    if let Some(offset) = query.offset.take() {
        dropped += offset.to_string().matches('?').count();
    }
    query.order_by.clear();

    let SetExpr::Select(select) = query.body.as_mut() else {
        return Err(Error::Unsupported(format!(
            "statement `{}`: count rewrite needs a plain SELECT",
            id
        )));
    };
    select.having = None;
    select.projection = count_projection();

    Ok((statements[0].to_string(), dropped))
}

fn count_projection() -> Vec<sqlparser::ast::SelectItem> {
    // Steal the projection from a parsed prototype instead of building the
    // AST by hand.
    let statements = Parser::parse_sql(&GenericDialect {}, "SELECT COUNT(*)")
        .expect("count prototype parses");
    let Statement::Query(query) = &statements[0] else {
        unreachable!("count prototype is a query");
    };
    let SetExpr::Select(select) = query.body.as_ref() else {
        unreachable!("count prototype is a select");
    };
    select.projection.clone()
}

/// Whether a rendered statement already has a WHERE clause. Falls back to a
/// textual scan when the statement does not parse.
pub fn has_where(sql: &str) -> bool {
    if let Ok(statements) = Parser::parse_sql(&GenericDialect {}, sql) {
        if statements.len() == 1 {
            if let Statement::Query(query) = &statements[0] {
                if let SetExpr::Select(select) = query.body.as_ref() {
                    return select.selection.is_some();
                }
            }
        }
    }
    sql.to_ascii_lowercase().contains(" where ")
}
