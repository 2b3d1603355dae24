//! Pathway classification, medication bucketing, and gap analysis.
//!
//! Everything here returns data; wording lives in `sections`.

use std::collections::HashMap;

use crate::models::{DrugClass, HfType, Medication, PatientProfile, Pathway};
use crate::rules::GuidelineRules;

/// Reduced pathway is checked first, so a profile matching both sides
/// (e.g. explicit HFpEF with LVEF 30) follows HFrEF guidance.
pub fn classify_pathway(profile: &PatientProfile, rules: &GuidelineRules) -> Pathway {
    let lvef = profile.lvef;
    if profile.hf_type == Some(HfType::Reduced)
        || lvef.is_some_and(|v| v < rules.lvef.pathway_reduced_below)
    {
        Pathway::Reduced
    } else if profile.hf_type == Some(HfType::Preserved)
        || lvef.is_some_and(|v| v >= rules.lvef.pathway_preserved_min)
    {
        Pathway::Preserved
    } else {
        Pathway::Indeterminate
    }
}

/// MRA gate shared by gap analysis, new-therapy suggestions, and monitoring.
pub fn mra_indicated(profile: &PatientProfile, rules: &GuidelineRules) -> bool {
    profile.lvef.is_some_and(|v| v <= rules.lvef.mra_max)
}

pub fn device_therapy_indicated(profile: &PatientProfile, rules: &GuidelineRules) -> bool {
    profile.lvef.is_some_and(|v| v <= rules.lvef.device_therapy_max)
}

/// Disjoint partition of a profile's medications by therapy class.
#[derive(Debug, Default)]
pub struct MedicationBuckets<'a> {
    by_class: HashMap<DrugClass, Vec<&'a Medication>>,
}

impl<'a> MedicationBuckets<'a> {
    pub fn partition(medications: &'a [Medication], rules: &GuidelineRules) -> Self {
        let mut by_class: HashMap<DrugClass, Vec<&'a Medication>> = HashMap::new();
        for med in medications {
            by_class
                .entry(rules.classify_medication(&med.name))
                .or_default()
                .push(med);
        }
        Self { by_class }
    }

    pub fn get(&self, class: DrugClass) -> &[&'a Medication] {
        self.by_class.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, class: DrugClass) -> bool {
        !self.get(class).is_empty()
    }

    /// "name dose freq" for each member, comma separated.
    pub fn describe(&self, class: DrugClass) -> String {
        self.get(class)
            .iter()
            .map(|m| m.display())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapStatus {
    /// Class prescribed.
    Present,
    /// Not prescribed and recommended for this profile.
    Missing,
    /// Not prescribed; the profile does not meet the class's gate.
    NotIndicated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GapFinding {
    pub class: DrugClass,
    pub status: GapStatus,
}

/// Mandated-class findings in guideline order, then diuretics when present.
/// Only meaningful for the reduced pathway.
pub fn gap_analysis(
    buckets: &MedicationBuckets<'_>,
    profile: &PatientProfile,
    rules: &GuidelineRules,
) -> Vec<GapFinding> {
    let mut findings: Vec<GapFinding> = DrugClass::MANDATED
        .iter()
        .map(|&class| {
            let status = if buckets.has(class) {
                GapStatus::Present
            } else if class == DrugClass::Mra && !mra_indicated(profile, rules) {
                GapStatus::NotIndicated
            } else {
                GapStatus::Missing
            };
            GapFinding { class, status }
        })
        .collect();

    // Symptomatic therapy: reported when present, never flagged missing.
    if buckets.has(DrugClass::Diuretic) {
        findings.push(GapFinding {
            class: DrugClass::Diuretic,
            status: GapStatus::Present,
        });
    }

    findings
}
