//! Medical-NER response shape and its mapping onto [`PatientProfile`].

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extraction::patterns::{lab_unit, AGE_RANGE, LVEF_RANGE};
use crate::models::{Comorbidity, ExtractionMethod, HfType, LabValue, Medication, PatientProfile};
use crate::rules::GuidelineRules;

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap());

/// Response body from `POST <base>/entities`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntitiesResponse {
    #[serde(default)]
    pub entities: Vec<DetectedEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectedEntity {
    pub text: String,
    /// MEDICATION, MEDICAL_CONDITION, TEST_TREATMENT_PROCEDURE, ...
    pub category: String,
    #[serde(rename = "Type")]
    pub entity_type: String,
    pub score: f64,
    #[serde(default)]
    pub attributes: Vec<EntityAttribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityAttribute {
    #[serde(rename = "Type")]
    pub attribute_type: String,
    pub text: String,
    pub score: f64,
}

impl DetectedEntity {
    fn attribute(&self, attribute_type: &str) -> Option<&EntityAttribute> {
        self.attributes
            .iter()
            .find(|a| a.attribute_type == attribute_type)
    }
}

/// Canonical lab keys by the names a NER service reports them under.
const LAB_ALIASES: &[(&str, &[&str])] = &[
    ("potassium", &["potassium", "k", "k+"]),
    ("sodium", &["sodium", "na", "na+"]),
    ("creatinine", &["creatinine", "cr", "serum creatinine"]),
    ("egfr", &["egfr", "gfr"]),
    ("bun", &["bun", "blood urea nitrogen"]),
    ("bnp", &["bnp", "brain natriuretic peptide"]),
    ("nt_probnp", &["nt-probnp", "nt probnp", "ntprobnp"]),
    ("hemoglobin", &["hemoglobin", "hgb", "hb"]),
];

fn canonical_lab(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    LAB_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&lower.as_str()))
        .map(|(key, _)| key.to_string())
        .unwrap_or(lower)
}

fn first_number(text: &str) -> Option<f64> {
    FIRST_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1)?.as_str().parse().ok())
}

fn hf_type_from_condition(text: &str) -> Option<HfType> {
    let lower = text.to_lowercase();
    if !lower.contains("heart failure") && !lower.contains("hf") {
        return None;
    }
    if lower.contains("hfref") || lower.contains("reduced ejection") {
        Some(HfType::Reduced)
    } else if lower.contains("hfpef") || lower.contains("preserved ejection") {
        Some(HfType::Preserved)
    } else if lower.contains("hfmref") || lower.contains("mid-range") {
        Some(HfType::MildlyReduced)
    } else {
        None
    }
}

/// Map detected entities onto a profile.
///
/// Values outside the data-model bounds are dropped, the same as local
/// extraction does. Medications are deduplicated by normalized name.
pub fn profile_from_entities(entities: &[DetectedEntity], rules: &GuidelineRules) -> PatientProfile {
    let mut profile = PatientProfile {
        extraction_method: ExtractionMethod::Remote,
        ..Default::default()
    };
    let mut seen = HashSet::new();

    for entity in entities {
        match entity.category.as_str() {
            "MEDICATION" => {
                let name = entity.text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
                if name.is_empty() || !seen.insert(name.clone()) {
                    continue;
                }
                let dose = entity
                    .attribute("DOSAGE")
                    .and_then(|a| first_number(&a.text));
                let frequency = entity
                    .attribute("FREQUENCY")
                    .map(|a| a.text.trim().to_lowercase());
                profile.medications.push(Medication {
                    is_hf_medication: rules.is_hf_medication(&name),
                    name,
                    dose,
                    frequency,
                    confidence: entity.score.clamp(0.0, 1.0),
                });
            }
            "MEDICAL_CONDITION" => {
                if profile.hf_type.is_none() {
                    profile.hf_type = hf_type_from_condition(&entity.text);
                }
                profile.comorbidities.push(Comorbidity {
                    condition: entity.text.clone(),
                    confidence: entity.score.clamp(0.0, 1.0),
                });
            }
            "TEST_TREATMENT_PROCEDURE" => {
                let Some(value) = entity
                    .attribute("TEST_VALUE")
                    .and_then(|a| first_number(&a.text))
                else {
                    continue;
                };
                let lower = entity.text.to_lowercase();
                if lower.contains("lvef") || lower.contains("ejection fraction") {
                    let lvef = value as u32;
                    if profile.lvef.is_none() && LVEF_RANGE.contains(&lvef) && value.fract() == 0.0 {
                        profile.lvef = Some(lvef);
                    }
                } else if value.is_finite() {
                    let key = canonical_lab(&entity.text);
                    let unit = lab_unit(&key).map(str::to_string);
                    profile
                        .lab_values
                        .entry(key)
                        .or_insert(LabValue { value, unit });
                }
            }
            "PROTECTED_HEALTH_INFORMATION" if entity.entity_type == "AGE" => {
                if profile.age.is_none() {
                    profile.age = entity
                        .text
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .or_else(|| first_number(&entity.text).map(|v| v as u32))
                        .filter(|age| AGE_RANGE.contains(age));
                }
            }
            _ => {}
        }
    }

    profile
        .notes
        .push(format!("{} entities from remote source", entities.len()));
    profile
}
