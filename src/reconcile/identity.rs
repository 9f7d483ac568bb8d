/// Comparison key used to recognize the same artist across sources.
///
/// Lowercases the name and keeps only ASCII letters and digits. Names with
/// no such characters yield an empty key, which callers treat as
/// unresolvable.
pub fn resolve_identity(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}
