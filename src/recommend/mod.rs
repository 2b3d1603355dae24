//! Guideline recommendation engine.
//!
//! Classifies a profile into a guideline pathway, runs gap analysis against
//! the pathway's mandated therapy classes, and builds the recommendation
//! sections. Generation is total: failures are embedded in the document.

pub mod classify;
pub mod document;
pub mod engine;
pub mod sections;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use classify::{classify_pathway, gap_analysis, GapFinding, GapStatus, MedicationBuckets};
pub use document::{RecommendationDocument, Section, SectionKind};
pub use engine::{validate_profile, RecommendationEngine};

use crate::models::PatientProfile;
use crate::rules::{GuidelineRules, RulesError};

#[derive(Error, Debug)]
pub enum RecommendationError {
    #[error("Invalid profile field {field}: {reason}")]
    InvalidProfile { field: String, reason: String },

    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error("Internal fault: {0}")]
    Internal(String),
}

/// Guideline material supplied by an external loader. Carried through to the
/// engine for provenance; thresholds come from [`GuidelineRules`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuidelineData {
    pub source: Option<String>,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl GuidelineData {
    pub fn new(source: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            source: Some(source.into()),
            content,
        }
    }
}

/// Generate recommendations with the built-in rule table.
pub fn generate_recommendation(
    profile: &PatientProfile,
    guidelines: &GuidelineData,
) -> RecommendationDocument {
    RecommendationEngine::new(GuidelineRules::builtin(), guidelines).generate(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::extract_profile;

    #[test]
    fn note_to_document() {
        let profile = extract_profile(
            "65 yo man, HFrEF, LVEF 25%, NYHA class III. On lisinopril 10 mg daily and furosemide 40 mg BID.",
        );
        let doc = generate_recommendation(&profile, &GuidelineData::default());
        let md = doc.render_markdown();

        assert!(md.contains("**Demographics:** 65-year-old male"));
        assert!(md.contains("✅ **ACE inhibitor/ARB:** lisinopril 10 daily - Appropriate for HFrEF"));
        assert!(md.contains("1. **Beta-blocker**"));
        assert!(md.contains("2. **MRA therapy**"));
        assert!(md.contains("3. **SGLT2 inhibitor**"));
        assert!(!md.contains("Loop diuretic"));
        assert!(md.contains("Device therapy evaluation"));
        assert!(!md.contains("For more specific recommendations"));
    }

    #[test]
    fn empty_note_still_gets_full_document() {
        let doc = generate_recommendation(&extract_profile(""), &GuidelineData::default());
        assert!(!doc.is_error());
        assert_eq!(doc.sections.len(), 6);
        assert!(doc.render_markdown().contains("- Recent laboratory values (K+, creatinine)"));
    }

    #[test]
    fn lab_only_note_gets_insufficient_data_note() {
        let profile = extract_profile("Labs: Hemoglobin 11.2 g/dL, glucose 140 mg/dL, albumin 3.1 g/dL.");
        assert!(profile.medications.is_empty());

        let doc = generate_recommendation(&profile, &GuidelineData::default());
        assert!(doc.section(SectionKind::InsufficientDataNote).is_some());
        assert!(!doc.render_markdown().contains("Other medications"));
    }

    #[test]
    fn guideline_data_is_passed_through() {
        let guidelines = GuidelineData::new("hf_guidelines.json", serde_json::json!({"sections": []}));
        let doc = generate_recommendation(&PatientProfile::default(), &guidelines);
        assert!(!doc.is_error());
    }
}
