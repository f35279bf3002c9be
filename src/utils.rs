/// Converts an identifier to the kebab-case form used for command names and
/// flags: `getUserById` -> `get-user-by-id`, `folder_id` -> `folder-id`,
/// `XMLHttpRequest` -> `xml-http-request`, `/users/{id}` -> `users-id`.
#[must_use]
pub fn to_kebab_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().filter(|c| *c != '\'').collect();
    let mut result = String::with_capacity(s.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            if !result.is_empty() && !result.ends_with('-') {
                result.push('-');
            }
            continue;
        }

        if ch.is_uppercase() && i > 0 && !result.ends_with('-') && !result.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_numeric()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                result.push('-');
            }
        }

        result.extend(ch.to_lowercase());
    }

    result.trim_end_matches('-').to_string()
}

/// Upper-cases the first character: `orchestrator` -> `Orchestrator`.
#[must_use]
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
