//! HTTP status code matching
//!
//! Patterns are either exact codes ("206") or class wildcards ("2xx").

/// Check if a status code matches any of the accepted patterns
pub fn is_status_acceptable(status: u16, accepted: &[String]) -> bool {
    accepted.iter().any(|pattern| matches_pattern(status, pattern))
}

/// Whether `pattern` is something `is_status_acceptable` understands
pub fn is_valid_pattern(pattern: &str) -> bool {
    let pattern = pattern.trim();
    match pattern.strip_suffix("xx") {
        Some(class) => class.len() == 1 && matches!(class.as_bytes()[0], b'1'..=b'5'),
        None => pattern.len() == 3 && pattern.parse::<u16>().is_ok_and(|c| (100..600).contains(&c)),
    }
}

fn matches_pattern(status: u16, pattern: &str) -> bool {
    let pattern = pattern.trim();
    if let Some(class) = pattern.strip_suffix("xx") {
        return class.len() == 1 && class.parse::<u16>().is_ok_and(|digit| status / 100 == digit);
    }
    pattern.parse::<u16>().is_ok_and(|exact| exact == status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(200, true)]
    #[case(206, true)]
    #[case(301, true)]
    #[case(302, true)]
    #[case(404, false)]
    #[case(500, false)]
    fn test_default_stream_patterns(#[case] status: u16, #[case] expected: bool) {
        let accepted = patterns(&["2xx", "3xx"]);
        assert_eq!(is_status_acceptable(status, &accepted), expected);
    }

    #[test]
    fn test_exact_codes() {
        let accepted = patterns(&["200", "405"]);
        assert!(is_status_acceptable(405, &accepted));
        assert!(!is_status_acceptable(204, &accepted));
    }

    #[test]
    fn test_empty_patterns_accept_nothing() {
        assert!(!is_status_acceptable(200, &[]));
    }

    #[rstest]
    #[case("2xx", true)]
    #[case(" 404 ", true)]
    #[case("2x", false)]
    #[case("9xx", false)]
    #[case("20", false)]
    #[case("ok", false)]
    fn test_pattern_validation(#[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(is_valid_pattern(pattern), expected);
    }
}
