//! Name validation and reserved-identifier escaping (§6.4).

use crate::JetError;

/// A representative subset of Access's reserved SQL keywords (§6.4: "Access
/// reserves a large set of SQL keywords (listed in the source)"). Matching
/// is case-insensitive.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "ASC", "AVG", "BETWEEN", "BY", "COLUMN", "COUNT", "CREATE",
    "DATABASE", "DELETE", "DESC", "DISTINCT", "DROP", "FROM", "GROUP", "HAVING", "IN", "INDEX",
    "INNER", "INSERT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "MAX", "MIN", "NOT", "NULL",
    "ON", "OR", "ORDER", "OUTER", "PASSWORD", "PRIMARY", "RIGHT", "SELECT", "SET", "SUM", "TABLE",
    "TOP", "UNION", "UNIQUE", "UPDATE", "VALUES", "VIEW", "WHERE",
];

fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.iter().any(|kw| kw.eq_ignore_ascii_case(name))
}

/// Escape `name` if it collides with a reserved identifier, by prefixing
/// `"x"` (§6.4).
pub fn escape_identifier(name: &str) -> String {
    if is_reserved(name) {
        format!("x{}", name)
    } else {
        name.to_string()
    }
}

/// Validate a column or table name: non-empty and within `max_length`
/// (§6.4).
pub fn validate_name(name: &str, max_length: usize, kind: &str) -> Result<(), JetError> {
    if name.is_empty() {
        return Err(JetError::Value(format!("{} name must not be empty", kind)));
    }
    if name.len() > max_length {
        return Err(JetError::Value(format!(
            "{} name {:?} exceeds maximum length {}",
            kind, name, max_length
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_word_gets_escaped() {
        assert_eq!(escape_identifier("Select"), "xSelect");
        assert_eq!(escape_identifier("select"), "xselect");
    }

    #[test]
    fn ordinary_name_is_unchanged() {
        assert_eq!(escape_identifier("Customer"), "Customer");
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(validate_name("", 64, "column").is_err());
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "x".repeat(65);
        assert!(validate_name(&name, 64, "table").is_err());
    }

    #[test]
    fn name_at_exact_limit_is_accepted() {
        let name = "x".repeat(64);
        assert!(validate_name(&name, 64, "table").is_ok());
    }
}
