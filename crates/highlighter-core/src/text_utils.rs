use unicode_normalization::UnicodeNormalization;

/// Soft hyphen, as emitted by some typesetters at discretionary breaks.
const SOFT_HYPHEN: char = '\u{00AD}';
/// Unicode HYPHEN.
const HYPHEN: char = '\u{2010}';

/// Characters that may end a line at a hyphenated word break.
pub fn is_line_break_hyphen(c: char) -> bool {
    matches!(c, '-' | SOFT_HYPHEN | HYPHEN)
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fold one character for case-insensitive matching.
///
/// Applies NFKC (so ligatures like `ﬁ` become `fi`) then lowercases. One
/// input char may fold to several output chars. Soft hyphens are invisible
/// and fold to nothing.
pub fn fold_char(c: char, out: &mut Vec<char>) {
    if c == SOFT_HYPHEN {
        return;
    }
    for n in std::iter::once(c).nfkc() {
        out.extend(n.to_lowercase());
    }
}

/// Fold a whole string the same way page text is folded.
pub fn fold_text(text: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        if c.is_whitespace() {
            out.push(' ');
        } else {
            fold_char(c, &mut out);
        }
    }
    out
}

/// Case- and whitespace-insensitive key used to collapse duplicate terms.
pub fn term_key(term: &str) -> String {
    fold_text(&normalize_whitespace(term)).into_iter().collect()
}

/// Cut `text` to at most `max_chars` characters without splitting a char.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
