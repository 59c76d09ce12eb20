//! Decoding of generated `var NAME = <data>;` script files
//!
//! Documentation generators emit the navigation tree and its index as small
//! JavaScript files that only assign a literal to a global variable. The
//! literal itself is JSON, so decoding is a matter of locating the
//! declaration, cutting the payload out and handing it to `serde_json`.

use super::DataError;
use serde::de::DeserializeOwned;

/// Extract the raw payload assigned to `var <name>` in `source`.
///
/// The payload runs from the first non-whitespace character after `=` up to
/// the terminating `;` (or end of input).
pub fn extract_var<'a>(source: &'a str, name: &str) -> Result<&'a str, DataError> {
    let start = find_declaration(source, name).ok_or_else(|| DataError::MissingVar(name.to_string()))?;
    let rest = source[start..].trim_start();
    let rest = rest
        .strip_prefix('=')
        .ok_or_else(|| DataError::Script(format!("expected '=' after 'var {name}'")))?;

    let end = payload_end(rest);
    let payload = rest[..end].trim();
    if payload.is_empty() {
        return Err(DataError::Script(format!("'var {name}' has no value")));
    }
    Ok(payload)
}

/// Decode the payload of `var <name>` as `T`.
pub fn parse_var<T: DeserializeOwned>(source: &str, name: &str) -> Result<T, DataError> {
    let payload = extract_var(source, name)?;
    serde_json::from_str(payload).map_err(|e| DataError::Json {
        var: name.to_string(),
        message: e.to_string(),
    })
}

/// Byte offset just past the identifier of a `var <name>` declaration.
fn find_declaration(source: &str, name: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(pos) = source[search_from..].find("var") {
        let var_pos = search_from + pos;
        search_from = var_pos + 3;

        // `var` must start a token
        if var_pos > 0 {
            let prev = source[..var_pos].chars().next_back();
            if prev.is_some_and(is_ident_char) {
                continue;
            }
        }

        let after_var = &source[var_pos + 3..];
        let trimmed = after_var.trim_start();
        if trimmed.len() == after_var.len() {
            continue;
        }
        let ident_start = var_pos + 3 + (after_var.len() - trimmed.len());
        if let Some(after_name) = trimmed.strip_prefix(name) {
            if !after_name.chars().next().is_some_and(is_ident_char) {
                return Some(ident_start + name.len());
            }
        }
    }
    None
}

/// Find where a payload ends: the first `;` outside of string literals.
fn payload_end(rest: &str) -> usize {
    let mut in_string: Option<char> = None;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            ';' => return i,
            _ => {}
        }
    }
    rest.len()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
