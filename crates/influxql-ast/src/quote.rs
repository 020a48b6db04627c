// String and identifier quoting.
//
// Both quoters apply their replacements as a single left-to-right pass so
// an already-escaped backslash is never re-escaped.

/// Quote a string value for embedding in query text.
#[must_use]
pub fn quote_string(s: &str) -> String {
    let mut buf = String::with_capacity(s.len() + 2);
    buf.push('\'');
    for ch in s.chars() {
        match ch {
            '\n' => buf.push_str("\\n"),
            '\\' => buf.push_str("\\\\"),
            '\'' => buf.push_str("\\'"),
            _ => buf.push(ch),
        }
    }
    buf.push('\'');
    buf
}

/// Quote a sequence of bare identifier segments, joining them with `.`.
#[must_use]
pub fn quote_ident(segments: &[&str]) -> String {
    let mut buf = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            buf.push('.');
        }
        buf.push('"');
        for ch in segment.chars() {
            match ch {
                '\n' => buf.push_str("\\n"),
                '\\' => buf.push_str("\\\\"),
                '"' => buf.push_str("\\\""),
                _ => buf.push(ch),
            }
        }
        buf.push('"');
    }
    buf
}

/// Reserved words of the query language, upper-cased.
///
/// Kept in sync with the scanner's keyword table; a bare identifier that
/// matches one of these must be rendered quoted to survive a round trip.
const RESERVED_WORDS: &[&str] = &[
    "ALL",
    "ALTER",
    "AND",
    "AS",
    "ASC",
    "BEGIN",
    "BY",
    "CONTINUOUS",
    "CREATE",
    "DATABASE",
    "DATABASES",
    "DEFAULT",
    "DELETE",
    "DESC",
    "DROP",
    "DURATION",
    "END",
    "FALSE",
    "FIELD",
    "FROM",
    "GRANT",
    "GROUP",
    "IN",
    "INTO",
    "KEY",
    "KEYS",
    "LIMIT",
    "MEASUREMENT",
    "MEASUREMENTS",
    "OFFSET",
    "ON",
    "OR",
    "ORDER",
    "PASSWORD",
    "POLICIES",
    "POLICY",
    "PRIVILEGES",
    "QUERIES",
    "QUERY",
    "READ",
    "REPLICATION",
    "RETENTION",
    "REVOKE",
    "SELECT",
    "SERIES",
    "SHOW",
    "TAG",
    "TO",
    "TRUE",
    "USER",
    "USERS",
    "VALUES",
    "WHERE",
    "WITH",
    "WRITE",
];

/// Whether `s` matches a reserved word, case-insensitively.
#[must_use]
pub fn is_reserved_word(s: &str) -> bool {
    let upper = s.to_ascii_uppercase();
    RESERVED_WORDS.binary_search(&upper.as_str()).is_ok()
}
