use std::panic::{self, AssertUnwindSafe};

use crate::models::PatientProfile;
use crate::rules::GuidelineRules;

use super::classify::{classify_pathway, MedicationBuckets};
use super::document::{RecommendationDocument, Section, SectionKind, DOCUMENT_TITLE};
use super::sections::{self, Assessment};
use super::{GuidelineData, RecommendationError};

/// Rule-driven recommendation engine.
/// Holds only borrowed, read-only inputs, so repeated calls on the same
/// profile produce identical documents.
pub struct RecommendationEngine<'a> {
    rules: &'a GuidelineRules,
    guidelines: &'a GuidelineData,
}

impl<'a> RecommendationEngine<'a> {
    pub fn new(rules: &'a GuidelineRules, guidelines: &'a GuidelineData) -> Self {
        Self { rules, guidelines }
    }

    /// Total: any validation failure or panic becomes an error section.
    pub fn generate(&self, profile: &PatientProfile) -> RecommendationDocument {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_generate(profile)));
        let error = match outcome {
            Ok(Ok(document)) => return document,
            Ok(Err(e)) => e,
            Err(payload) => RecommendationError::Internal(panic_message(payload.as_ref())),
        };

        tracing::error!(error = %error, "Error generating recommendations");
        self.error_document(&error)
    }

    /// Fallible core used by [`generate`](Self::generate).
    pub fn try_generate(
        &self,
        profile: &PatientProfile,
    ) -> Result<RecommendationDocument, RecommendationError> {
        validate_profile(profile)?;
        self.rules.validate()?;

        let assessment = Assessment {
            profile,
            rules: self.rules,
            pathway: classify_pathway(profile, self.rules),
            buckets: MedicationBuckets::partition(&profile.medications, self.rules),
        };

        let mut document_sections = vec![
            sections::summary(&assessment),
            sections::current_medications(&assessment),
            sections::new_therapies(&assessment),
            sections::monitoring(&assessment),
            sections::lifestyle(&assessment),
        ];
        // Appended after every other section, never in place of them.
        if let Some(note) = sections::insufficient_data(&assessment) {
            document_sections.push(note);
        }

        tracing::info!(
            pathway = %assessment.pathway,
            medications = profile.medications.len(),
            sections = document_sections.len(),
            guideline_source = self.guidelines.source.as_deref().unwrap_or("none"),
            "Generated recommendations"
        );

        Ok(RecommendationDocument {
            title: DOCUMENT_TITLE.to_string(),
            guideline_version: self.rules.version.clone(),
            pathway: Some(assessment.pathway),
            sections: document_sections,
        })
    }

    fn error_document(&self, error: &RecommendationError) -> RecommendationDocument {
        RecommendationDocument {
            title: DOCUMENT_TITLE.to_string(),
            guideline_version: self.rules.version.clone(),
            pathway: None,
            sections: vec![Section::new(
                SectionKind::Error,
                vec![format!("Error generating recommendations: {error}")],
            )],
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> RecommendationError {
    RecommendationError::InvalidProfile {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn unit_interval(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

/// Data-model bounds for profiles that did not come from local extraction.
pub fn validate_profile(profile: &PatientProfile) -> Result<(), RecommendationError> {
    if let Some(age) = profile.age {
        if !(18..=120).contains(&age) {
            return Err(invalid("age", format!("{age} outside 18-120")));
        }
    }
    if let Some(lvef) = profile.lvef {
        if lvef > 100 {
            return Err(invalid("lvef", format!("{lvef}% exceeds 100")));
        }
    }
    if let Some(nyha) = profile.nyha_class {
        if !(1..=4).contains(&nyha) {
            return Err(invalid("nyha_class", format!("{nyha} outside 1-4")));
        }
    }
    for med in &profile.medications {
        if med.name.trim().is_empty() {
            return Err(invalid("medications", "empty medication name"));
        }
        if let Some(dose) = med.dose {
            if !dose.is_finite() || dose < 0.0 {
                return Err(invalid("medications", format!("{}: invalid dose {dose}", med.name)));
            }
        }
        if !unit_interval(med.confidence) {
            return Err(invalid(
                "medications",
                format!("{}: confidence {} outside [0, 1]", med.name, med.confidence),
            ));
        }
    }
    for c in &profile.comorbidities {
        if !unit_interval(c.confidence) {
            return Err(invalid(
                "comorbidities",
                format!("{}: confidence {} outside [0, 1]", c.condition, c.confidence),
            ));
        }
    }
    for (name, lab) in &profile.lab_values {
        if !lab.value.is_finite() {
            return Err(invalid("lab_values", format!("{name}: non-finite value")));
        }
    }
    Ok(())
}
