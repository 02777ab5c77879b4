//! Display-name generation for new consoles.

/// Pick a display name based on `base` that does not clash with `existing`.
///
/// The first console gets `base`; later ones get `base (n)` where `n` is one
/// above the highest index in use. A bare `base` counts as index 1. The
/// index saturates at `u64::MAX`.
pub fn make_title<'a, I>(base: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(|name| index_of(base, name))
        .max();

    match max {
        Some(n) => format!("{} ({})", base, n.saturating_add(1)),
        None => base.to_string(),
    }
}

fn index_of(base: &str, name: &str) -> Option<u64> {
    let rest = name.strip_prefix(base)?;
    if rest.is_empty() {
        return Some(1);
    }
    rest.strip_prefix(" (")?.strip_suffix(')')?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_title() {
        assert_eq!(make_title("Rust REPL", []), "Rust REPL");
        assert_eq!(make_title("Rust REPL", ["Other"]), "Rust REPL");
    }

    #[test]
    fn test_second_title() {
        assert_eq!(make_title("Rust REPL", ["Rust REPL"]), "Rust REPL (2)");
    }

    #[test]
    fn test_uses_highest_index() {
        let existing = ["Rust REPL (4)", "Rust REPL", "Rust REPL (2)"];
        assert_eq!(make_title("Rust REPL", existing), "Rust REPL (5)");
    }

    #[test]
    fn test_gap_after_close() {
        // Only the numbered console is still open.
        assert_eq!(make_title("Rust REPL", ["Rust REPL (3)"]), "Rust REPL (4)");
    }

    #[test]
    fn test_ignores_lookalikes() {
        let existing = ["Rust REPLs", "Rust REPL (x)", "Rust REPL(2)"];
        assert_eq!(make_title("Rust REPL", existing), "Rust REPL");
    }

    #[test]
    fn test_huge_index_does_not_overflow() {
        assert_eq!(
            make_title("Rust REPL", ["Rust REPL (4294967295)"]),
            "Rust REPL (4294967296)"
        );
        let max = format!("Rust REPL ({})", u64::MAX);
        assert_eq!(make_title("Rust REPL", [max.as_str()]), max);
    }

    #[test]
    fn test_out_of_range_index_ignored() {
        let existing = ["Rust REPL (99999999999999999999999)", "Rust REPL"];
        assert_eq!(make_title("Rust REPL", existing), "Rust REPL (2)");
    }
}
