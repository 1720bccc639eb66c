//! Bounded prefix edit distance.

/// Whether `prefix` is within `budget` edits of some prefix of `text`.
///
/// Only the first `prefix.len() + budget` characters of `text` can take
/// part in such a match, so the DP table is cut to that many columns and the
/// cost stays proportional to the query word, not the keyword.
pub fn check_prefix_edit_distance(prefix: &[char], text: &[char], budget: usize) -> bool {
    let columns = prefix
        .len()
        .saturating_add(budget)
        .saturating_add(1)
        .min(text.len() + 1);

    let mut prev: Vec<usize> = (0..columns).collect();
    let mut curr = vec![0usize; columns];

    for i in 1..=prefix.len() {
        curr[0] = i;
        let mut min_in_row = curr[0];

        for j in 1..columns {
            let cost = if prefix[i - 1] == text[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
            min_in_row = min_in_row.min(curr[j]);
        }

        // Rows never decrease their minimum, so this one decides.
        if min_in_row > budget {
            return false;
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    prev.iter().any(|&d| d <= budget)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(prefix: &str, text: &str, budget: usize) -> bool {
        let prefix: Vec<char> = prefix.chars().collect();
        let text: Vec<char> = text.chars().collect();
        check_prefix_edit_distance(&prefix, &text, budget)
    }

    #[test]
    fn test_exact_prefix() {
        assert!(check("fire", "firefox", 0));
        assert!(check("firefox", "firefox", 0));
        assert!(check("", "firefox", 0));
        assert!(!check("fox", "firefox", 0));
    }

    #[test]
    fn test_typos_within_budget() {
        assert!(check("firefix", "firefox", 1));
        assert!(check("frefox", "firefox", 1));
        assert!(check("fireefox", "firefox", 1));
        assert!(!check("firefix", "firefox", 0));
        assert!(!check("fyrefix", "firefox", 1));
        assert!(check("fyrefix", "firefox", 2));
    }

    #[test]
    fn test_prefix_longer_than_text() {
        assert!(check("firefoxes", "firefox", 2));
        assert!(!check("firefoxes", "firefox", 1));
        assert!(check("ab", "", 2));
        assert!(!check("ab", "", 1));
    }

    #[test]
    fn test_unrelated_words() {
        assert!(!check("xyzxyz", "firefox", 1));
        assert!(!check("xyzxyz", "firefox", 3));
    }

    #[test]
    fn test_non_ascii() {
        assert!(check("über", "überall", 0));
        assert!(check("uber", "überall", 1));
    }
}
