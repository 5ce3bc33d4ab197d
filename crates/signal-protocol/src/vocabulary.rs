//! Reaction vocabulary.

/// Reactions offered when no vocabulary is configured
pub const DEFAULT_REACTIONS: [&str; 6] = ["👍", "👎", "😂", "😮", "❤️", "🎉"];

/// The set of reaction symbols a session accepts.
///
/// Peers may run a newer vocabulary; symbols outside this set are dropped on
/// receipt rather than treated as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionVocabulary {
    symbols: Vec<String>,
}

impl Default for ReactionVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_REACTIONS)
    }
}

impl ReactionVocabulary {
    /// Create a vocabulary from symbols; blanks and duplicates are skipped
    #[must_use]
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for symbol in symbols {
            let symbol = symbol.as_ref().trim();
            if !symbol.is_empty() && !unique.iter().any(|s| s == symbol) {
                unique.push(symbol.to_string());
            }
        }
        Self { symbols: unique }
    }

    /// Parse a comma-separated list
    #[must_use]
    pub fn parse_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Whether `symbol` is a member
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    /// Number of symbols
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the vocabulary is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterate over the symbols in configured order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vocabulary() {
        let vocabulary = ReactionVocabulary::default();
        assert_eq!(vocabulary.len(), DEFAULT_REACTIONS.len());
        assert!(vocabulary.contains("👍"));
        assert!(!vocabulary.contains("🦀"));
    }

    #[test]
    fn test_parse_list_trims_and_dedupes() {
        let vocabulary = ReactionVocabulary::parse_list(" 👍 ,🎉,,👍");
        assert_eq!(vocabulary.iter().collect::<Vec<_>>(), vec!["👍", "🎉"]);
    }

    #[test]
    fn test_empty_list() {
        assert!(ReactionVocabulary::parse_list(" , ").is_empty());
    }
}
