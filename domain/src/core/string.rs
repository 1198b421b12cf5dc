//! String utilities for the domain layer.

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Split an identifier into lowercase word tokens.
///
/// Handles camelCase, PascalCase, snake_case, kebab-case and acronym runs:
/// `getAccountsByID` → `["get", "accounts", "by", "id"]`,
/// `HTTPServer` → `["http", "server"]`.
pub fn split_identifier(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // aB → split before B; ABc → split before B (end of acronym run)
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                tokens.push(std::mem::take(&mut current));
            }
        }

        current.extend(c.to_lowercase());
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Case- and separator-insensitive form of an identifier.
///
/// `account_id`, `accountId` and `AccountID` all normalize to `accountid`.
pub fn normalize_identifier(s: &str) -> String {
    split_identifier(s).concat()
}

/// Naive English singular of a lowercase token (`accounts` → `account`,
/// `addresses` → `address`). Tokens that do not look plural are returned as is.
pub fn singular(token: &str) -> &str {
    if token.ends_with("sses") {
        return &token[..token.len() - 2];
    }
    if token.len() > 1 && token.ends_with('s') && !token.ends_with("ss") {
        return &token[..token.len() - 1];
    }
    token
}
