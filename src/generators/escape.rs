//! String escaping for SQL literals and identifiers.

/// Escape a string for a MySQL-style quoted literal.
///
/// Control characters that MySQL treats specially get backslash escapes and
/// the quote character itself is doubled.
pub fn escape_string_for_quote(s: &str, quote_char: char) -> String {
    let mut result = String::with_capacity(s.len() * 2);
    for c in s.chars() {
        match c {
            '\0' => result.push_str("\\0"),
            '\x08' => result.push_str("\\b"),
            '\t' => result.push_str("\\t"),
            '\x1a' => result.push_str("\\Z"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\\' => result.push_str("\\\\"),
            c if c == quote_char => {
                result.push(c);
                result.push(c);
            }
            c => result.push(c),
        }
    }
    result
}

/// Escape a string by doubling the quote character only (standard SQL).
pub fn escape_string_doubling(s: &str, quote_char: char) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        if c == quote_char {
            result.push(c);
        }
        result.push(c);
    }
    result
}

/// Wrap an identifier in `quote_char`, doubling embedded quotes.
pub fn quote_identifier(name: &str, quote_char: char) -> String {
    format!("{q}{}{q}", escape_string_doubling(name, quote_char), q = quote_char)
}
