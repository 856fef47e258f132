//! Title word matching.
//!
//! A title filter matches a record when every word of the filter appears as a
//! word of the title, ignoring case but not diacritics. Words are maximal
//! runs of alphanumeric characters, which lines up with the `books_fts` index
//! (`unicode61` with `remove_diacritics 0`).

/// Split `text` into lowercase words.
pub(crate) fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Build an FTS5 `MATCH` expression requiring every term.
///
/// Each term is emitted as a quoted string; terms only contain alphanumeric
/// characters so no escaping is needed, and FTS5 keywords such as `OR` or
/// `NEAR` lose their meaning inside quotes.
pub(crate) fn fts_query(terms: &[String]) -> String {
    terms.iter().map(|term| format!("\"{term}\"")).collect::<Vec<_>>().join(" ")
}

/// `true` if every term appears as a word of `title`.
#[cfg(any(test, feature = "mock"))]
pub(crate) fn matches(terms: &[String], title: &str) -> bool {
    let words = self::terms(title);
    terms.iter().all(|term| words.contains(term))
}
