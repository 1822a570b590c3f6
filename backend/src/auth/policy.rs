//! Pluggable credential policy predicates.
//!
//! The password strength policy and the username profanity filter are plain
//! values held by the auth service, so word lists and policy thresholds can
//! be swapped without touching the orchestration code.

/// Minimum-requirements password policy: length plus character classes.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

impl PasswordPolicy {
    /// Checks a candidate password against the policy.
    pub fn is_strong(&self, password: &str) -> bool {
        if password.chars().count() < self.min_length {
            return false;
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            return false;
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            return false;
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return false;
        }
        if self.require_special && !password.chars().any(|c| !c.is_ascii_alphanumeric()) {
            return false;
        }
        true
    }
}

/// Words rejected in usernames regardless of charset validity.
const DEFAULT_WORD_LIST: &[&str] = &[
    "bastard", "bitch", "cock", "cunt", "dick", "fag", "fuck", "nigga", "nigger", "piss", "prick",
    "pussy", "shit", "slut", "twat", "whore",
];

/// Case-insensitive profanity filter over a maintained word list.
#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    words: Vec<String>,
}

impl Default for ProfanityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_WORD_LIST.iter().map(|w| w.to_string()))
    }
}

impl ProfanityFilter {
    pub fn new(words: impl IntoIterator<Item = String>) -> Self {
        Self {
            words: words.into_iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    /// Returns true when the candidate contains a listed word.
    pub fn is_profane(&self, candidate: &str) -> bool {
        let lowered = candidate.to_lowercase();
        self.words.iter().any(|word| lowered.contains(word.as_str()))
    }
}

/// Username shape check: 3-16 characters from `[A-Za-z0-9_.]`.
pub fn is_valid_username(username: &str) -> bool {
    let length = username.chars().count();
    (3..=16).contains(&length)
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}
