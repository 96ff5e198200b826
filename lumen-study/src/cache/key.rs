//! Key derivation and selection comparison

/// Joins the sorted document ids of a cache key
pub const KEY_SEPARATOR: &str = ",";

/// Order-independent key for a list of document ids
///
/// Ids are sorted lexicographically, deduplicated and joined, so two
/// selections holding the same set of ids map to the same key. Returns
/// `None` for an empty list.
pub fn cache_key<S: AsRef<str>>(document_ids: &[S]) -> Option<String> {
    if document_ids.is_empty() {
        return None;
    }
    let mut ids: Vec<&str> = document_ids.iter().map(AsRef::as_ref).collect();
    ids.sort_unstable();
    ids.dedup();
    Some(ids.join(KEY_SEPARATOR))
}

/// Whether a derived artifact must be recomputed after the selection changed
///
/// Compares lengths first and then the sorted lists position by position.
/// Duplicates are significant: `["a"]` and `["a", "a"]` differ.
pub fn needs_refresh<P, C>(previous: &[P], current: &[C]) -> bool
where
    P: AsRef<str>,
    C: AsRef<str>,
{
    if previous.is_empty() != current.is_empty() {
        return true;
    }
    if previous.len() != current.len() {
        return true;
    }

    let mut previous: Vec<&str> = previous.iter().map(AsRef::as_ref).collect();
    let mut current: Vec<&str> = current.iter().map(AsRef::as_ref).collect();
    previous.sort_unstable();
    current.sort_unstable();

    previous.iter().zip(current.iter()).any(|(p, c)| p != c)
}
