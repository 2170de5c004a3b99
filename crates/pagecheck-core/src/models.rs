//! Core data models: persisted pages, their typed content, and annotations.
//!
//! A [`Page`] is what the store persists. Its `content` is an opaque JSON
//! value as far as the store is concerned; the editor reads and writes it
//! through the typed [`PageContent`] view.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::factcheck::FactCheckResult;

/// A persisted page, keyed by a store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Current time truncated to the millisecond precision every backend stores.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Snapshot of the editing surface: serialized markup plus its plain-text
/// extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentBody {
    pub html: String,
    pub text: String,
}

/// Typed view of a page's `content`.
///
/// Older pages stored the annotation list under `comments`; that key is
/// accepted on read and always written back as `annotations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "comments")]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("malformed page content: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("annotation {id} is invalid: {source}")]
    InvalidAnnotation {
        id: String,
        #[source]
        source: AnnotationError,
    },
}

impl PageContent {
    pub fn new(body: DocumentBody, annotations: Vec<Annotation>) -> Self {
        Self {
            html: body.html,
            text: body.text,
            annotations,
        }
    }

    /// Decodes and validates stored content.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ContentError> {
        let content: PageContent = serde_json::from_value(value.clone())?;
        for annotation in &content.annotations {
            annotation
                .validate()
                .map_err(|source| ContentError::InvalidAnnotation {
                    id: annotation.id.clone(),
                    source,
                })?;
        }
        Ok(content)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, ContentError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn body(&self) -> DocumentBody {
        DocumentBody {
            html: self.html.clone(),
            text: self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationKind {
    FactCheck,
    General,
}

/// Verdict attached to a `fact-check` annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactCheck {
    pub is_factual: bool,
    pub confidence: f64,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

/// Badge bucket for a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl FactCheck {
    pub fn level(&self) -> ConfidenceLevel {
        if self.confidence >= 0.8 {
            ConfidenceLevel::High
        } else if self.confidence >= 0.6 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    /// Confidence as a rounded percentage, e.g. `0.975` → `98`.
    pub fn percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// A fact-check or free-form comment attached to a span of selected text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_check: Option<FactCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnotationError {
    #[error("annotation text must not be empty")]
    EmptyText,
    #[error("fact-check annotation is missing its verdict")]
    MissingFactCheck,
    #[error("general annotation must not carry a fact-check verdict")]
    UnexpectedFactCheck,
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

impl Annotation {
    pub fn fact_check(id: String, result: &FactCheckResult, created_at: DateTime<Utc>) -> Self {
        let sources = if result.sources.is_empty() {
            None
        } else {
            Some(result.sources.clone())
        };
        Self {
            id,
            kind: AnnotationKind::FactCheck,
            text: result.original_text.clone(),
            fact_check: Some(FactCheck {
                is_factual: result.is_factual,
                confidence: result.confidence,
                explanation: result.explanation.clone(),
                sources,
            }),
            comment: None,
            created_at,
        }
    }

    pub fn general(
        id: String,
        text: impl Into<String>,
        comment: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: AnnotationKind::General,
            text: text.into(),
            fact_check: None,
            comment: Some(comment.into()),
            created_at,
        }
    }

    pub fn validate(&self) -> Result<(), AnnotationError> {
        if self.text.trim().is_empty() {
            return Err(AnnotationError::EmptyText);
        }
        match (self.kind, &self.fact_check) {
            (AnnotationKind::FactCheck, None) => Err(AnnotationError::MissingFactCheck),
            (AnnotationKind::General, Some(_)) => Err(AnnotationError::UnexpectedFactCheck),
            (AnnotationKind::FactCheck, Some(fc)) => {
                if fc.confidence.is_finite() && (0.0..=1.0).contains(&fc.confidence) {
                    Ok(())
                } else {
                    Err(AnnotationError::ConfidenceOutOfRange(fc.confidence))
                }
            }
            (AnnotationKind::General, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verdict(confidence: f64) -> FactCheckResult {
        FactCheckResult {
            original_text: "The moon is a square.".into(),
            is_factual: false,
            confidence,
            explanation: "Incorrect, Moon is a Sphere".into(),
            sources: vec!["NASA".into()],
        }
    }

    #[test]
    fn test_fact_check_annotation_is_valid() {
        let a = Annotation::fact_check("1".into(), &verdict(0.97), now_millis());
        assert_eq!(a.kind, AnnotationKind::FactCheck);
        assert!(a.fact_check.is_some());
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_general_annotation_has_no_verdict() {
        let a = Annotation::general("2".into(), "some span", "needs a citation", now_millis());
        assert!(a.fact_check.is_none());
        assert_eq!(a.comment.as_deref(), Some("needs a citation"));
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_mismatched_kind() {
        let mut a = Annotation::general("3".into(), "span", "c", now_millis());
        a.kind = AnnotationKind::FactCheck;
        assert_eq!(a.validate(), Err(AnnotationError::MissingFactCheck));

        let mut b = Annotation::fact_check("4".into(), &verdict(0.5), now_millis());
        b.kind = AnnotationKind::General;
        assert_eq!(b.validate(), Err(AnnotationError::UnexpectedFactCheck));
    }

    #[test]
    fn test_validate_rejects_confidence_out_of_range() {
        for bad in [1.2, -0.1, f64::NAN] {
            let a = Annotation::fact_check("5".into(), &verdict(bad), now_millis());
            assert!(matches!(
                a.validate(),
                Err(AnnotationError::ConfidenceOutOfRange(_))
            ));
        }
    }

    #[test]
    fn test_wire_shape_uses_type_and_camel_case() {
        let a = Annotation::fact_check("6".into(), &verdict(0.97), now_millis());
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["type"], "fact-check");
        assert_eq!(v["factCheck"]["isFactual"], false);
        assert!(v.get("comment").is_none());
        assert!(v["createdAt"].is_string());
    }

    #[test]
    fn test_legacy_comments_key_decodes() {
        let stored = json!({
            "html": "<p>The moon is a square.</p>",
            "text": "The moon is a square.",
            "comments": [{
                "id": "1753000000000",
                "text": "The moon is a square.",
                "type": "fact-check",
                "factCheck": {
                    "isFactual": false,
                    "confidence": 0.97,
                    "explanation": "Incorrect, Moon is a Sphere",
                    "sources": ["NASA"]
                },
                "createdAt": "2025-07-23T04:12:00.000Z"
            }]
        });
        let content = PageContent::from_value(&stored).unwrap();
        assert_eq!(content.annotations.len(), 1);
        let written = content.to_value().unwrap();
        assert!(written.get("comments").is_none());
        assert_eq!(written["annotations"][0]["id"], "1753000000000");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let content = PageContent::from_value(&json!({})).unwrap();
        assert_eq!(content, PageContent::default());
    }

    #[test]
    fn test_from_value_rejects_invalid_annotation() {
        let stored = json!({
            "annotations": [{
                "id": "x",
                "text": "span",
                "type": "fact-check",
                "createdAt": "2025-07-23T04:12:00Z"
            }]
        });
        let err = PageContent::from_value(&stored).unwrap_err();
        assert!(matches!(err, ContentError::InvalidAnnotation { ref id, .. } if id == "x"));
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        assert!(matches!(
            PageContent::from_value(&json!("just a string")),
            Err(ContentError::Malformed(_))
        ));
    }

    #[test]
    fn test_confidence_levels() {
        let mut fc = FactCheck {
            is_factual: true,
            confidence: 0.98,
            explanation: String::new(),
            sources: None,
        };
        assert_eq!(fc.level(), ConfidenceLevel::High);
        assert_eq!(fc.percent(), 98);
        fc.confidence = 0.75;
        assert_eq!(fc.level(), ConfidenceLevel::Medium);
        fc.confidence = 0.4;
        assert_eq!(fc.level(), ConfidenceLevel::Low);
    }
}
