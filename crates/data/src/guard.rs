//! Read-only screening of generated query text.

use epiqa_core::{AppError, AppResult};

/// Rejects query text that is empty, holds more than one statement, or is
/// not a read (`SELECT` / `WITH`).
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryGuard;

impl QueryGuard {
    /// Check `query` and return the statement with comments, surrounding
    /// whitespace and trailing semicolons removed.
    pub fn check(&self, query: &str) -> AppResult<String> {
        let statement = strip_comments(query);
        let statement = statement.trim().trim_end_matches(';').trim_end();

        if statement.is_empty() {
            return Err(AppError::Execution("Query is empty".to_string()));
        }

        if has_unquoted_semicolon(statement) {
            return Err(AppError::Execution(
                "Only a single statement is allowed".to_string(),
            ));
        }

        let keyword = leading_keyword(statement);
        if keyword != "SELECT" && keyword != "WITH" {
            return Err(AppError::Execution(format!(
                "Only SELECT or WITH statements are allowed, got {}",
                keyword
            )));
        }

        Ok(statement.to_string())
    }
}

/// First identifier of the statement, ignoring opening parentheses.
fn leading_keyword(statement: &str) -> String {
    statement
        .trim_start_matches(|c: char| c == '(' || c.is_whitespace())
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Drop `-- line` and `/* block */` comments outside string literals.
fn strip_comments(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut chars = query.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

fn has_unquoted_semicolon(statement: &str) -> bool {
    let mut quote: Option<char> = None;
    for c in statement.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == ';' => return true,
            None => {}
        }
    }
    false
}
