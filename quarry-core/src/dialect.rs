use crate::Dialect;

/// Rewrite `?` markers for the target dialect. The PostgreSQL family uses
/// numbered markers `$1..$N` in source order; everything else keeps `?`.
pub fn rewrite_markers(sql: &str, dialect: Dialect) -> String {
    if dialect != Dialect::Postgres {
        return sql.to_string();
    }
    let mut out = String::with_capacity(sql.len() + 8);
    let mut seq = 0;
    for c in sql.chars() {
        if c == '?' {
            seq += 1;
            out.push('$');
            out.push_str(&seq.to_string());
        } else {
            out.push(c);
        }
    }
    out
}

/// Classify a statement by its leading keyword. Returns the upper-cased first
/// word and whether the statement produces rows.
pub fn classify(sql: &str) -> (String, bool) {
    let key = sql
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    let is_query = matches!(
        key.as_str(),
        "SELECT" | "SHOW" | "DESC" | "DESCRIBE" | "EXPLAIN"
    );
    (key, is_query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_markers_are_numbered() {
        assert_eq!(
            rewrite_markers("select * from t where a=? and b=?", Dialect::Postgres),
            "select * from t where a=$1 and b=$2"
        );
        assert_eq!(rewrite_markers("select 1", Dialect::Postgres), "select 1");
    }

    #[test]
    fn other_dialects_keep_question_marks() {
        let sql = "insert into t values(?, ?)";
        assert_eq!(rewrite_markers(sql, Dialect::Mysql), sql);
        assert_eq!(rewrite_markers(sql, Dialect::Generic), sql);
    }

    #[test]
    fn classify_by_leading_keyword() {
        assert_eq!(classify("select 1"), ("SELECT".into(), true));
        assert_eq!(classify("  SHOW tables"), ("SHOW".into(), true));
        assert_eq!(classify("describe t"), ("DESCRIBE".into(), true));
        assert_eq!(classify("explain select 1"), ("EXPLAIN".into(), true));
        assert_eq!(classify("insert into t values(1)"), ("INSERT".into(), false));
        assert_eq!(classify("update t set a=1"), ("UPDATE".into(), false));
        assert_eq!(classify("replace into t values(1)"), ("REPLACE".into(), false));
        assert_eq!(classify(""), ("".into(), false));
    }
}
