//! Prefetch candidate derivation
//!
//! A just-written key hints at what will be read next: sibling keys in the
//! same `prefix:` namespace, and any key-like tokens quoted inside the
//! serialized value (cross-references between records). Candidates are
//! capped so a pathological value cannot flood the prefetch queue.

/// Sibling suffixes speculatively resolved alongside any namespaced key
const NAMESPACE_SIBLINGS: [&str; 3] = ["metadata", "config", "stats"];

/// Maximum number of prefetch candidates derived per write
const MAX_CANDIDATES: usize = 10;

/// Derive the keys worth prefetching after a write of `key` with the given
/// serialized value
///
/// # Example
///
/// ```
/// use hivemind_domain::related_keys;
///
/// let candidates = related_keys("user:1", "{\"name\":\"ada\"}");
/// assert_eq!(candidates, vec!["user:metadata", "user:config", "user:stats"]);
/// ```
pub fn related_keys(key: &str, serialized_value: &str) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();

    // Same-namespace siblings
    if let Some(prefix) = key.split(':').next()
        && !prefix.is_empty()
        && key.contains(':')
    {
        for suffix in NAMESPACE_SIBLINGS {
            let candidate = format!("{prefix}:{suffix}");
            if candidate != key && !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    // Quoted key-like tokens embedded in the value
    for token in quoted_tokens(serialized_value) {
        if candidates.len() >= MAX_CANDIDATES {
            break;
        }
        if token != key && !candidates.contains(&token) {
            candidates.push(token);
        }
    }

    candidates.truncate(MAX_CANDIDATES);
    candidates
}

/// Scan a serialized value for double-quoted tokens shaped like keys
/// (`namespace:name`, restricted to identifier characters)
fn quoted_tokens(serialized: &str) -> impl Iterator<Item = String> + '_ {
    serialized
        .split('"')
        .skip(1)
        .step_by(2)
        .filter(|token| looks_like_key(token))
        .map(str::to_string)
}

fn looks_like_key(token: &str) -> bool {
    token.contains(':')
        && !token.starts_with(':')
        && !token.ends_with(':')
        && !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-' | '.'))
}
