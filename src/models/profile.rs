use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::enums::{ExtractionMethod, HfStage, HfType, Sex};

/// A medication mention resolved from a clinical note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    /// Normalized lowercase name.
    pub name: String,
    pub dose: Option<f64>,
    pub frequency: Option<String>,
    pub is_hf_medication: bool,
    /// Descriptive only, in [0, 1].
    pub confidence: f64,
}

impl Medication {
    /// "name dose frequency" with absent parts skipped.
    pub fn display(&self) -> String {
        let mut parts = vec![self.name.clone()];
        if let Some(dose) = self.dose {
            parts.push(dose.to_string());
        }
        if let Some(ref frequency) = self.frequency {
            parts.push(frequency.clone());
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comorbidity {
    /// Display form, e.g. "Atrial Fibrillation".
    pub condition: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabValue {
    pub value: f64,
    /// Canonical unit for known labs, `None` otherwise.
    pub unit: Option<String>,
}

/// Canonical patient record extracted from one clinical note.
///
/// Built fresh per input text and consumed read-only by the recommendation
/// engine. The only post-creation mutation is [`crate::extraction::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub age: Option<u32>,
    pub sex: Option<Sex>,
    pub hf_stage: Option<HfStage>,
    pub hf_type: Option<HfType>,
    pub lvef: Option<u32>,
    pub nyha_class: Option<u8>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub lab_values: BTreeMap<String, LabValue>,
    #[serde(default)]
    pub comorbidities: Vec<Comorbidity>,
    /// Traceability notes; never read by the engine.
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub extraction_method: ExtractionMethod,
}

impl PatientProfile {
    /// True when nothing usable for therapy guidance was found.
    pub fn lacks_core_data(&self) -> bool {
        self.lvef.is_none() && self.medications.is_empty() && self.hf_type.is_none()
    }

    pub fn medication_names(&self) -> impl Iterator<Item = &str> {
        self.medications.iter().map(|m| m.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn med(name: &str, dose: Option<f64>, frequency: Option<&str>) -> Medication {
        Medication {
            name: name.into(),
            dose,
            frequency: frequency.map(Into::into),
            is_hf_medication: true,
            confidence: 0.9,
        }
    }

    #[test]
    fn display_skips_missing_parts() {
        assert_eq!(med("lisinopril", Some(20.0), Some("daily")).display(), "lisinopril 20 daily");
        assert_eq!(med("carvedilol", Some(3.125), None).display(), "carvedilol 3.125");
        assert_eq!(med("digoxin", None, None).display(), "digoxin");
    }

    #[test]
    fn empty_profile_lacks_core_data() {
        let profile = PatientProfile::default();
        assert!(profile.lacks_core_data());
        assert_eq!(profile.extraction_method, ExtractionMethod::Regex);
    }

    #[test]
    fn any_core_field_clears_the_gap() {
        let mut profile = PatientProfile {
            age: Some(70),
            sex: Some(Sex::Male),
            ..Default::default()
        };
        assert!(profile.lacks_core_data());

        profile.medications.push(med("furosemide", Some(40.0), None));
        assert!(!profile.lacks_core_data());
    }

    #[test]
    fn deserializes_with_missing_collections() {
        let profile: PatientProfile =
            serde_json::from_str(r#"{"age":64,"sex":"female","hf_stage":null,"hf_type":"HFpEF","lvef":58,"nyha_class":2}"#)
                .unwrap();
        assert_eq!(profile.hf_type, Some(HfType::Preserved));
        assert!(profile.medications.is_empty());
        assert!(profile.lab_values.is_empty());
    }
}
