//! Low-confidence answer detection.
//!
//! [`FallbackPolicy`] is a string heuristic, not a semantic judgment: an
//! answer is treated as unhelpful when it is blank or contains one of a
//! configured set of phrases. False positives and negatives are expected.

use crate::config::DEFAULT_FALLBACK_PHRASES;

/// Decides whether an answer should be regenerated without retrieved context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    phrases: Vec<String>,
}

impl FallbackPolicy {
    /// Create a policy from a phrase set. Phrases are matched case-insensitively.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| normalize(p.as_ref().trim()))
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    /// The normalized phrase set.
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// `true` when the trimmed answer is empty or contains a configured phrase.
    pub fn needs_fallback(&self, answer_text: &str) -> bool {
        let trimmed = answer_text.trim();
        if trimmed.is_empty() {
            return true;
        }
        let lowered = normalize(trimmed);
        self.phrases.iter().any(|p| lowered.contains(p.as_str()))
    }

    /// The context-free prompt used for the second attempt.
    ///
    /// The question followed by the background text, separated by a blank
    /// line; just the question when there is no background.
    pub fn fallback_prompt(question: &str, background: Option<&str>) -> String {
        match background.map(str::trim).filter(|b| !b.is_empty()) {
            Some(background) => format!("{question}\n\n{background}"),
            None => question.to_string(),
        }
    }
}

/// Lowercase and fold curly apostrophes, common in model output ("don’t know").
fn normalize(text: &str) -> String {
    text.to_lowercase().replace('\u{2019}', "'")
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_PHRASES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_confidence_phrases_trigger_fallback() {
        let policy = FallbackPolicy::default();
        assert!(policy.needs_fallback("I'm not sure about that."));
        assert!(policy.needs_fallback("I DON'T KNOW."));
        assert!(policy.needs_fallback("Sorry, I cannot answer that question."));
        assert!(policy.needs_fallback("I'm not aware of any such department."));
        assert!(policy.needs_fallback("I don’t know."));
    }

    #[test]
    fn confident_answer_passes() {
        let policy = FallbackPolicy::default();
        assert!(!policy.needs_fallback("SIT is located in Valachil, Mangaluru."));
    }

    #[test]
    fn blank_answer_triggers_fallback() {
        let policy = FallbackPolicy::default();
        assert!(policy.needs_fallback(""));
        assert!(policy.needs_fallback("  \n\t "));
    }

    #[test]
    fn custom_phrases_replace_defaults() {
        let policy = FallbackPolicy::new(["No Idea", "  "]);
        assert_eq!(policy.phrases(), ["no idea".to_string()]);
        assert!(policy.needs_fallback("no idea, sorry"));
        assert!(!policy.needs_fallback("I'm not sure"));
    }

    #[test]
    fn curly_apostrophe_phrases_match_either_form() {
        let policy = FallbackPolicy::new(["I don\u{2019}t know"]);
        assert_eq!(policy.phrases(), ["i don't know".to_string()]);
        assert!(policy.needs_fallback("I don\u{2019}t know."));
        assert!(policy.needs_fallback("I don't know."));
    }

    #[test]
    fn fallback_prompt_appends_background() {
        assert_eq!(FallbackPolicy::fallback_prompt("Q?", Some("bg")), "Q?\n\nbg");
        assert_eq!(FallbackPolicy::fallback_prompt("Q?", Some("  ")), "Q?");
        assert_eq!(FallbackPolicy::fallback_prompt("Q?", None), "Q?");
    }
}
