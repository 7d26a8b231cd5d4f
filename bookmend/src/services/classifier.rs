//! Suspicious-name heuristics
//!
//! Best-effort signals that an author/title folder pair was mis-split by
//! whatever produced it. False positives are expected; that is why
//! flagged folders land in a reviewable queue instead of being renamed
//! outright.

/// Words that belong to titles, not author names.
const TITLE_INDICATORS: &[&str] = &[
    "the", "of", "and", "a", "in", "to", "for", "model", "maris",
];

/// Function words checked inside two-token titles.
const TITLE_FUNCTION_WORDS: &[&str] = &["the", "of", "and", "a"];

/// Format and release markers that never appear in real author names.
const FORMAT_INDICATORS: &[&str] = &["epub", "pdf", "mp3", "m4b", "r1.", "r2.", "[", "]"];

/// Decide whether an author/title pair looks mis-split. Rules run in
/// order and the first match wins; the returned string is the queue
/// reason shown to operators.
pub fn classify(author: &str, title: &str) -> Option<&'static str> {
    let author_lower = author.to_lowercase();

    // Publication year landed in the author field
    if (1950..2030).any(|y: i32| author.contains(&y.to_string())) {
        return Some("year in author");
    }

    // Title vocabulary in the author field
    if author_lower
        .split_whitespace()
        .any(|word| TITLE_INDICATORS.contains(&word))
    {
        return Some("title word in author");
    }

    // Exactly two capitalized tokens with no function words reads like
    // "First Last". The function-word check is a substring match over
    // the whole title, so e.g. "Thomas" escapes via its inner 'a'.
    let title_parts: Vec<&str> = title.split_whitespace().collect();
    if title_parts.len() == 2
        && title_parts
            .iter()
            .all(|part| part.chars().next().is_some_and(|c| c.is_uppercase()))
    {
        let title_lower = title.to_lowercase();
        if !TITLE_FUNCTION_WORDS.iter().any(|word| title_lower.contains(word)) {
            return Some("title looks like author name");
        }
    }

    // "Last, First" mis-split
    if author.matches(',').count() == 1 {
        return Some("comma in author name");
    }

    if FORMAT_INDICATORS
        .iter()
        .any(|marker| author_lower.contains(marker))
    {
        return Some("format indicator in author");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_pair_passes() {
        assert_eq!(classify("J.R.R. Tolkien", "The Hobbit"), None);
        assert_eq!(classify("Adrian Tchaikovsky", "Children of Time"), None);
    }

    #[test]
    fn test_swapped_author_title() {
        assert_eq!(
            classify("The Hobbit", "J.R.R. Tolkien"),
            Some("title word in author")
        );
    }

    #[test]
    fn test_year_in_author() {
        assert_eq!(classify("Dean Koontz 1999", "Odd Thomas"), Some("year in author"));
        // The year check also matches inside longer digit runs
        assert_eq!(classify("Author 20211", "Title"), Some("year in author"));
        // Years outside the plausible range do not fire
        assert_eq!(classify("Catch 22 Press 1949", "Something Strange"), None);
    }

    #[test]
    fn test_comma_in_author_wins_over_title_shape() {
        // "Odd Thomas" is two capitalized tokens, but "Thomas" contains
        // an 'a', so the title-shape rule passes and the comma rule fires.
        assert_eq!(
            classify("Koontz, Dean", "Odd Thomas"),
            Some("comma in author name")
        );
    }

    #[test]
    fn test_two_commas_do_not_fire_comma_rule() {
        // Co-author lists use multiple commas and are legitimate
        assert_eq!(classify("Niven, Pournelle, Barnes", "Legacy Heorot"), None);
    }

    #[test]
    fn test_title_looks_like_author_name() {
        assert_eq!(
            classify("Service Model", "Adrian Tchaikovsky"),
            // Author field trips the indicator list first
            Some("title word in author")
        );
        assert_eq!(
            classify("Odd Thomas", "Stephen King"),
            Some("title looks like author name")
        );
        // Function-word substring anywhere in the title defuses the
        // rule, including a bare 'a' inside a longer word
        assert_eq!(classify("Tchaikovsky", "The Hobbit"), None);
        assert_eq!(classify("Tchaikovsky", "Dean Koontz"), None);
    }

    #[test]
    fn test_format_indicator_in_author() {
        assert_eq!(
            classify("Dean Koontz EPUB", "Odd Thomas Part One"),
            Some("format indicator in author")
        );
        assert_eq!(
            classify("[bitsearch.to] Dean Koontz", "Whatever Title Here"),
            Some("format indicator in author")
        );
    }

    #[test]
    fn test_markers_in_title_field_are_ignored() {
        // Year and format checks only read the author field
        assert_eq!(classify("Dean Koontz", "Odd Thomas 1999 EPUB"), None);
    }

    #[test]
    fn test_rules_apply_in_order() {
        // Carries a year AND a comma; the year rule runs first
        assert_eq!(classify("Koontz, Dean 2004", "Odd Thomas"), Some("year in author"));
    }
}
