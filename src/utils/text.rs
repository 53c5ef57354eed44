/// Normalizes homework text returned by the diary API.
///
/// The API serializes line breaks as literal `\n` escape sequences inside
/// the JSON string value; turn them into real line breaks. Returns `None`
/// when nothing remains but whitespace.
pub fn normalize_homework(raw: &str) -> Option<String> {
    let normalized = raw.replace("\\n", "\n");
    if normalized.trim().is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Extracts the last whitespace-delimited token of a message.
///
/// Used to pull the class-login argument out of a free-text login command.
pub fn last_token(text: &str) -> Option<&str> {
    text.split_whitespace().last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_homework_escaped_newlines() {
        let normalized = normalize_homework("Math\\nRead ch.3").unwrap();
        assert_eq!(normalized, "Math\nRead ch.3");
        assert_eq!(normalized.lines().count(), 2);
    }

    #[test]
    fn test_normalize_homework_plain_text() {
        assert_eq!(normalize_homework("Алгебра: §5").unwrap(), "Алгебра: §5");
    }

    #[test]
    fn test_normalize_homework_blank() {
        assert!(normalize_homework("").is_none());
        assert!(normalize_homework("   ").is_none());
        // Only escape sequences and whitespace left after normalization
        assert!(normalize_homework("\\n \\n").is_none());
    }

    #[test]
    fn test_last_token() {
        assert_eq!(last_token("увійти 10A"), Some("10A"));
        assert_eq!(last_token("  увійти   10A  "), Some("10A"));
        assert_eq!(last_token("увійти"), Some("увійти"));
        assert_eq!(last_token("   "), None);
    }
}
