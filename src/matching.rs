//! Match engine: window titles containing a watch expression

/// Titles matching at least one expression.
///
/// Expression-major, snapshot-minor: for each expression in order, every title
/// containing it is appended. A title matched by several expressions appears
/// once per expression. Plain substring test, no case folding or trimming.
pub fn match_titles<E, T>(expressions: &[E], snapshot: &[T]) -> Vec<String>
where
    E: AsRef<str>,
    T: AsRef<str>,
{
    let mut matched = Vec::new();
    for expression in expressions {
        for title in snapshot {
            if title.as_ref().contains(expression.as_ref()) {
                matched.push(title.as_ref().to_string());
            }
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_major_order() {
        let matched = match_titles(&["Chrome", "Note"], &["NotePad", "Chrome - tab"]);
        assert_eq!(matched, vec!["Chrome - tab", "NotePad"]);
    }

    #[test]
    fn test_duplicate_expressions_not_deduplicated() {
        let matched = match_titles(&["a", "a"], &["cat"]);
        assert_eq!(matched, vec!["cat", "cat"]);
    }

    #[test]
    fn test_title_matched_by_two_expressions() {
        let matched = match_titles(&["Note", "Pad"], &["NotePad", "Paint"]);
        assert_eq!(matched, vec!["NotePad", "NotePad"]);
    }

    #[test]
    fn test_case_sensitive() {
        assert!(match_titles(&["chrome"], &["Chrome"]).is_empty());
    }

    #[test]
    fn test_no_trimming() {
        assert!(match_titles(&[" Pad"], &["NotePad"]).is_empty());
        assert_eq!(match_titles(&[" Pad"], &["Note Pad"]), vec!["Note Pad"]);
    }

    #[test]
    fn test_empty_inputs() {
        let none: [&str; 0] = [];
        assert!(match_titles(&none, &["NotePad"]).is_empty());
        assert!(match_titles(&["Note"], &none).is_empty());
    }

    #[test]
    fn test_snapshot_order_within_expression() {
        let matched = match_titles(&["o"], &["foo", "bar", "boo"]);
        assert_eq!(matched, vec!["foo", "boo"]);
    }
}
