//! Shared test utilities for lode tests
//!
//! This module provides common test helpers, fixtures, and utilities
//! to reduce code duplication across test modules.



#[cfg(test)]
pub mod assertions {
    /// Assert that an error message contains a specific substring
    pub fn assert_error_contains(error_msg: &str, expected_text: &str) {
        assert!(
            error_msg.to_lowercase().contains(&expected_text.to_lowercase()),
            "Error message '{}' does not contain '{}'",
            error_msg,
            expected_text
        );
    }

    /// Assert that a string matches a regex pattern
    pub fn assert_matches_pattern(text: &str, pattern: &str) {
        let re = regex::Regex::new(pattern).expect("Invalid regex pattern");
        assert!(
            re.is_match(text),
            "Text '{}' does not match pattern '{}'",
            text,
            pattern
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_gemfile_dir() {
        let (_temp, gemfile_path) = fixtures::create_test_gemfile_dir();
        assert!(gemfile_path.exists());
        let content = std::fs::read_to_string(&gemfile_path).unwrap();
        assert!(content.contains("rails"));
    }

    #[test]
    fn test_create_test_lockfile_dir() {
        let (_temp, lockfile_path) = fixtures::create_test_lockfile_dir();
        assert!(lockfile_path.exists());
        let content = std::fs::read_to_string(&lockfile_path).unwrap();
        assert!(content.contains("GEM"));
    }

    #[test]
    fn test_create_test_gemspec() {
        let (_temp, gemspec_path) = fixtures::create_test_gemspec("test-gem", "1.0.0");
        assert!(gemspec_path.exists());
        let content = std::fs::read_to_string(&gemspec_path).unwrap();
        assert!(content.contains("test-gem"));
        assert!(content.contains("1.0.0"));
    }

    #[test]
    fn test_minimal_install_options() {
        let options = options::minimal_install_options("rails");
        assert_eq!(options.gems[0], "rails");
        assert!(!options.verbose);
        assert!(!options.quiet);
    }
}
