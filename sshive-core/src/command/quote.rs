//! Quoting for POSIX shells and AppleScript string literals.

/// Quotes a word for a POSIX shell
///
/// Words made only of safe characters are returned unchanged.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        return value.to_string();
    }
    let escaped = value.replace('\'', "'\\''");
    format!("'{escaped}'")
}

/// Joins words into a single shell command line
#[must_use]
pub fn shell_join<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|w| shell_quote(w.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders a value as an AppleScript string literal
#[must_use]
pub fn applescript_quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Characters `cmd` treats specially outside quotes
const CMD_METACHARACTERS: &str = "^&|<>()%!\"";

/// Quotes a word for a Windows command line run through `cmd`
///
/// The word is first quoted the way the MSVC runtime splits arguments, then
/// every `cmd` metacharacter, quotes included, is escaped with `^` so `cmd`
/// passes the line on untouched.
#[must_use]
pub fn cmd_quote(value: &str) -> String {
    let quoted = msvc_quote(value);
    let mut escaped = String::with_capacity(quoted.len() * 2);
    for c in quoted.chars() {
        if CMD_METACHARACTERS.contains(c) {
            escaped.push('^');
        }
        escaped.push(c);
    }
    escaped
}

fn msvc_quote(value: &str) -> String {
    let plain = !value.is_empty() && !value.contains([' ', '\t', '\n', '"']);
    if plain {
        return value.to_string();
    }
    let mut quoted = String::from('"');
    let mut backslashes = 0;
    for c in value.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                quoted.push_str(&"\\".repeat(backslashes * 2 + 1));
                backslashes = 0;
            }
            _ => {
                quoted.push_str(&"\\".repeat(backslashes));
                backslashes = 0;
            }
        }
        if c != '\\' {
            quoted.push(c);
        }
    }
    quoted.push_str(&"\\".repeat(backslashes * 2));
    quoted.push('"');
    quoted
}
