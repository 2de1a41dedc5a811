//! English ordinals for 1-based positions.

const WORDS: [&str; 10] = [
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];

/// `1 → "first"` … `10 → "tenth"`, then `11th`, `21st`, `22nd`, ...
///
/// Numbers ending in 11, 12 or 13 take `th`; otherwise the last digit decides.
pub fn get_ord(n: usize) -> String {
    if let Some(word) = n.checked_sub(1).and_then(|i| WORDS.get(i)) {
        return (*word).to_string();
    }
    let suffix = match (n % 100, n % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_through_tenth() {
        let words: Vec<String> = (1..=10).map(get_ord).collect();
        assert_eq!(
            words,
            vec![
                "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth",
                "ninth", "tenth"
            ]
        );
    }

    #[test]
    fn test_numeric_suffixes() {
        assert_eq!(get_ord(11), "11th");
        assert_eq!(get_ord(12), "12th");
        assert_eq!(get_ord(13), "13th");
        assert_eq!(get_ord(21), "21st");
        assert_eq!(get_ord(22), "22nd");
        assert_eq!(get_ord(23), "23rd");
        assert_eq!(get_ord(30), "30th");
        assert_eq!(get_ord(111), "111th");
        assert_eq!(get_ord(101), "101st");
    }
}
