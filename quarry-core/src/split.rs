/// Split a multi-statement script on `separator`, honouring single- and
/// double-quoted strings (with `''` / `""` escapes and backslash escapes)
/// and `--` line comments. Empty fragments are dropped and the rest are
/// trimmed.
pub fn split_script(script: &str, separator: char) -> Vec<String> {
    enum State {
        Plain,
        Single,
        Double,
        Comment,
    }
    let mut out = Vec::new();
    let mut current = String::new();
    let mut state = State::Plain;
    let mut chars = script.chars().peekable();
    while let Some(c) = chars.next() {
        match state {
            State::Plain => match c {
                '\\' => {
                    current.push(c);
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                '\'' => {
                    state = State::Single;
                    current.push(c);
                }
                '"' => {
                    state = State::Double;
                    current.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    state = State::Comment;
                    current.push(c);
                    current.push(chars.next().unwrap());
                }
                _ if c == separator => {
                    push_statement(&mut out, &current);
                    current.clear();
                }
                _ => current.push(c),
            },
            State::Single => match c {
                '\\' => {
                    current.push(c);
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                '\'' if chars.peek() == Some(&'\'') => {
                    current.push(c);
                    current.push(chars.next().unwrap());
                }
                '\'' => {
                    state = State::Plain;
                    current.push(c);
                }
                _ => current.push(c),
            },
            State::Double => match c {
                '"' if chars.peek() == Some(&'"') => {
                    current.push(c);
                    current.push(chars.next().unwrap());
                }
                '"' => {
                    state = State::Plain;
                    current.push(c);
                }
                _ => current.push(c),
            },
            State::Comment => {
                current.push(c);
                if c == '\n' {
                    state = State::Plain;
                }
            }
        }
    }
    push_statement(&mut out, &current);
    out
}

fn push_statement(out: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_separator() {
        assert_eq!(
            split_script("select 1; select 2;", ';'),
            vec!["select 1", "select 2"]
        );
    }

    #[test]
    fn keeps_quoted_separators() {
        assert_eq!(
            split_script("insert into t values('a;b'); select 1", ';'),
            vec!["insert into t values('a;b')", "select 1"]
        );
    }

    #[test]
    fn keeps_double_quoted_separators() {
        assert_eq!(
            split_script("select \";\" from t; select 2", ';'),
            vec!["select \";\" from t", "select 2"]
        );
    }

    #[test]
    fn apostrophe_escape() {
        assert_eq!(
            split_script("insert into t values('it''s; fine'); select 1", ';'),
            vec!["insert into t values('it''s; fine')", "select 1"]
        );
    }

    #[test]
    fn doubled_quote_escape_in_identifiers() {
        assert_eq!(
            split_script("select \"a\"\"b;c\" from t; select 2", ';'),
            vec!["select \"a\"\"b;c\" from t", "select 2"]
        );
    }

    #[test]
    fn backslash_escape() {
        assert_eq!(
            split_script(r"select 'a\'b;c'; select 2", ';'),
            vec![r"select 'a\'b;c'", "select 2"]
        );
    }

    #[test]
    fn line_comments_hide_separators() {
        assert_eq!(
            split_script("select 1; -- comment; with semicolon\nselect 2", ';'),
            vec!["select 1", "-- comment; with semicolon\nselect 2"]
        );
    }

    #[test]
    fn quoted_dashes_are_not_comments() {
        assert_eq!(
            split_script("select '--;' from t; select 2", ';'),
            vec!["select '--;' from t", "select 2"]
        );
    }

    #[test]
    fn drops_empty_fragments() {
        assert_eq!(split_script(";;select 1;;", ';'), vec!["select 1"]);
        assert!(split_script("  ", ';').is_empty());
    }
}
