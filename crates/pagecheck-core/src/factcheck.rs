//! Fact-check contract and the built-in rule table.
//!
//! [`FactChecker`] is the seam the editor session depends on: text in,
//! verdict out. [`RuleTableChecker`] answers from a fixed, ordered table of
//! trigger phrases and stands in for a real verification backend. Runtime
//! concerns (simulated latency, HTTP transport) live in the `pagecheck`
//! crate.
//!
//! # Matching
//!
//! The input is lowercased and tested against each [`Rule`] in order; the
//! first rule whose trigger matches wins. Inputs matching nothing receive the
//! fallback verdict (`is_factual = true`, `confidence = 0.75`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Verdict for a span of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactCheckResult {
    pub original_text: String,
    pub is_factual: bool,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub explanation: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Error)]
pub enum FactCheckError {
    #[error("text to fact-check must not be empty")]
    EmptyText,

    /// Transport failure or server error. Safe to retry.
    #[error("fact-check service unavailable: {0}")]
    Unavailable(String),

    /// The service refused the request.
    #[error("fact-check request rejected: {0}")]
    Rejected(String),
}

impl FactCheckError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FactCheckError::Unavailable(_))
    }
}

#[async_trait]
pub trait FactChecker: Send + Sync {
    /// Short identifier used in logs (e.g. `"stub"`, `"http"`).
    fn name(&self) -> &str;

    async fn check(&self, text: &str) -> Result<FactCheckResult, FactCheckError>;
}

/// What a rule looks for in the lowercased input.
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    /// Any of the phrases occurs.
    AnyOf(&'static [&'static str]),
    /// `subject` occurs together with at least one of `qualifiers`.
    WithQualifier {
        subject: &'static str,
        qualifiers: &'static [&'static str],
    },
}

impl Trigger {
    fn matches(&self, lowered: &str) -> bool {
        match self {
            Trigger::AnyOf(phrases) => phrases.iter().any(|p| lowered.contains(p)),
            Trigger::WithQualifier {
                subject,
                qualifiers,
            } => lowered.contains(subject) && qualifiers.iter().any(|q| lowered.contains(q)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub trigger: Trigger,
    pub is_factual: bool,
    pub confidence: f64,
    pub explanation: &'static str,
    pub sources: &'static [&'static str],
}

impl Rule {
    fn verdict(&self, text: &str) -> FactCheckResult {
        FactCheckResult {
            original_text: text.to_string(),
            is_factual: self.is_factual,
            confidence: self.confidence,
            explanation: self.explanation.to_string(),
            sources: self.sources.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub const RULES: &[Rule] = &[
    Rule {
        trigger: Trigger::AnyOf(&["moon is a square", "moon is square"]),
        is_factual: false,
        confidence: 0.97,
        explanation: "Incorrect, Moon is a Sphere",
        sources: &["NASA", "Astronomical Society", "Space Science Institute"],
    },
    Rule {
        trigger: Trigger::AnyOf(&["earth is flat"]),
        is_factual: false,
        confidence: 0.95,
        explanation: "The Earth is not flat. Scientific evidence overwhelmingly supports that \
            the Earth is an oblate spheroid. This has been proven through satellite imagery, \
            physics experiments, and direct observation.",
        sources: &["NASA", "National Geographic", "Scientific American"],
    },
    Rule {
        trigger: Trigger::AnyOf(&["water boils at 100"]),
        is_factual: true,
        confidence: 0.98,
        explanation: "Correct! Water boils at 100°C (212°F) at standard atmospheric pressure \
            (1 atm or 101.325 kPa). This is a well-established scientific fact.",
        sources: &["Physics textbooks", "NIST", "Encyclopedia Britannica"],
    },
    Rule {
        trigger: Trigger::AnyOf(&["humans only use 10% of their brain"]),
        is_factual: false,
        confidence: 0.92,
        explanation: "This is a myth. Neurological research shows that humans use virtually \
            all of their brain tissue. Brain imaging studies demonstrate activity throughout \
            the brain even during simple tasks.",
        sources: &[
            "Scientific American",
            "Nature Neuroscience",
            "Harvard Medical School",
        ],
    },
    Rule {
        trigger: Trigger::WithQualifier {
            subject: "sun",
            qualifiers: &["star", "yellow"],
        },
        is_factual: true,
        confidence: 0.99,
        explanation: "Correct! The Sun is indeed a star, specifically a G-type main-sequence \
            star (yellow dwarf) that provides light and heat to our solar system.",
        sources: &[
            "NASA Solar Physics",
            "International Astronomical Union",
            "Encyclopedia Britannica",
        ],
    },
];

pub const FALLBACK: Rule = Rule {
    trigger: Trigger::AnyOf(&[]),
    is_factual: true,
    confidence: 0.75,
    explanation: "Based on available information, this statement appears to be factually \
        accurate, though additional verification is recommended for critical use cases.",
    sources: &["General knowledge database"],
};

/// Looks `text` up in [`RULES`], falling back to [`FALLBACK`].
pub fn lookup(text: &str) -> FactCheckResult {
    let lowered = text.to_lowercase();
    RULES
        .iter()
        .find(|r| r.trigger.matches(&lowered))
        .unwrap_or(&FALLBACK)
        .verdict(text)
}

/// [`FactChecker`] that answers instantly from the rule table.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleTableChecker;

#[async_trait]
impl FactChecker for RuleTableChecker {
    fn name(&self) -> &str {
        "rules"
    }

    async fn check(&self, text: &str) -> Result<FactCheckResult, FactCheckError> {
        if text.trim().is_empty() {
            return Err(FactCheckError::EmptyText);
        }
        Ok(lookup(text))
    }
}
