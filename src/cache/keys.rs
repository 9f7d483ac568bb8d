//! Cache key construction.

/// Fixed key holding the sync token of the payloads currently cached.
pub const SYNC_TOKEN_KEY: &str = "lastSync";

/// Build the cache key for a query of `kind` with the given parameters.
///
/// Present parameters are sorted by name and URL-encoded; absent ones are
/// left out, so `graph:artists` and `graph:artists?limit=10` never collide.
/// `kind` must not contain `?`.
pub fn cache_key(kind: &str, params: &[(&str, Option<String>)]) -> String {
    let mut present: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (*name, v)))
        .collect();
    present.sort_by(|a, b| a.0.cmp(b.0));

    let mut key = format!("graph:{}", kind);
    if !present.is_empty() {
        let query: Vec<String> = present
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect();
        key.push('?');
        key.push_str(&query.join("&"));
    }
    key
}
