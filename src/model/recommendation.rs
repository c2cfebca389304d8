//! Recommendations attached to a classification
//!
//! The backend historically sends one free-text string with independent
//! clauses joined by `" | "`. Newer producers can send a structured list of
//! `{severity, message}` pairs instead; both decode into `Recommendation`.

use serde::{Deserialize, Serialize};

/// Delimiter between clauses in the legacy text form
pub const CLAUSE_DELIMITER: &str = " | ";

const WARNING_MARKERS: &[&str] = &["⚠️", "Low", "Poor"];
const SUCCESS_MARKERS: &[&str] = &["✅", "Excellent", "High"];
const ERROR_MARKERS: &[&str] = &["❌"];

/// Presentation severity of a recommendation clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Success,
    Error,
    #[serde(other)]
    Neutral,
}

impl Severity {
    /// Guess the severity of a free-text clause from its markers
    ///
    /// Warning markers win over success markers, which win over error
    /// markers, so "❌ Poor quality" is a warning.
    pub fn infer(clause: &str) -> Self {
        let has_any = |markers: &[&str]| markers.iter().any(|m| clause.contains(m));

        if has_any(WARNING_MARKERS) {
            Severity::Warning
        } else if has_any(SUCCESS_MARKERS) {
            Severity::Success
        } else if has_any(ERROR_MARKERS) {
            Severity::Error
        } else {
            Severity::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Neutral => "neutral",
        }
    }
}

/// One independent recommendation clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    #[serde(default = "neutral")]
    pub severity: Severity,
    pub message: String,
}

fn neutral() -> Severity {
    Severity::Neutral
}

impl Clause {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Recommendation as delivered by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recommendation {
    /// Already-classified clauses; no text heuristics are applied
    Structured(Vec<Clause>),
    /// Legacy delimited free text
    Text(String),
}

impl Recommendation {
    /// Split into clauses, classifying legacy text heuristically
    pub fn clauses(&self) -> Vec<Clause> {
        match self {
            Recommendation::Structured(clauses) => clauses.clone(),
            Recommendation::Text(text) => text
                .split(CLAUSE_DELIMITER)
                .filter(|part| !part.trim().is_empty())
                .map(|part| Clause::new(Severity::infer(part), part))
                .collect(),
        }
    }
}

impl From<&str> for Recommendation {
    fn from(text: &str) -> Self {
        Recommendation::Text(text.to_string())
    }
}

impl From<String> for Recommendation {
    fn from(text: String) -> Self {
        Recommendation::Text(text)
    }
}

impl From<Vec<Clause>> for Recommendation {
    fn from(clauses: Vec<Clause>) -> Self {
        Recommendation::Structured(clauses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_clause_text() {
        let rec = Recommendation::from("✅ High confidence | ⚠️ Low sharpness");
        let clauses = rec.clauses();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].severity, Severity::Success);
        assert_eq!(clauses[0].message, "✅ High confidence");
        assert_eq!(clauses[1].severity, Severity::Warning);
        assert_eq!(clauses[1].message, "⚠️ Low sharpness");
    }

    #[test]
    fn test_marker_precedence() {
        assert_eq!(Severity::infer("❌ Poor quality - check camera setup"), Severity::Warning);
        assert_eq!(Severity::infer("❌ Camera offline"), Severity::Error);
        assert_eq!(Severity::infer("🌟 Excellent quality"), Severity::Success);
        assert_eq!(Severity::infer("⚡ Medium confidence - acceptable"), Severity::Neutral);
        assert_eq!(Severity::infer("💡 Improve lighting - image too dark"), Severity::Neutral);
    }

    #[test]
    fn test_structured_bypasses_heuristics() {
        let json = r#"[{"severity": "error", "message": "High glare"}, {"message": "plain"}]"#;
        let rec: Recommendation = serde_json::from_str(json).unwrap();
        let clauses = rec.clauses();
        // "High" would read as success if it went through the text heuristic
        assert_eq!(clauses[0].severity, Severity::Error);
        assert_eq!(clauses[1].severity, Severity::Neutral);
    }

    #[test]
    fn test_unknown_severity_is_neutral() {
        let json = r#"[{"severity": "info", "message": "note"}]"#;
        let rec: Recommendation = serde_json::from_str(json).unwrap();
        assert_eq!(rec.clauses()[0].severity, Severity::Neutral);
    }

    #[test]
    fn test_text_decodes_as_text() {
        let rec: Recommendation = serde_json::from_str(r#""Model not loaded""#).unwrap();
        assert_eq!(rec, Recommendation::Text("Model not loaded".into()));
        assert_eq!(rec.clauses()[0].severity, Severity::Neutral);
    }

    #[test]
    fn test_empty_text_has_no_clauses() {
        assert!(Recommendation::from("").clauses().is_empty());
    }
}
