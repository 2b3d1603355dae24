//! Local, deterministic clinical-note extraction.
//!
//! Every field is extracted independently from the raw text; the assembler
//! then fills the HF type gap from LVEF. No step can fail: a note with no
//! recognizable content yields an all-empty profile.

pub mod assembler;
pub mod fields;
pub mod medications;
pub mod patterns;

use std::sync::LazyLock;

pub use assembler::{infer_hf_type, merge};
pub use medications::MedicationExtractor;

use crate::models::{ExtractionMethod, PatientProfile};
use crate::rules::{GuidelineRules, RulesError};

static DEFAULT_EXTRACTOR: LazyLock<Extractor> = LazyLock::new(|| {
    Extractor::new(GuidelineRules::builtin()).expect("built-in medication lexicon compiles")
});

/// Extract a profile with the built-in rule table.
pub fn extract_profile(text: &str) -> PatientProfile {
    DEFAULT_EXTRACTOR.extract(text)
}

/// Extract a profile with a caller-supplied rule table.
pub fn extract_profile_with(text: &str, rules: &GuidelineRules) -> Result<PatientProfile, RulesError> {
    Ok(Extractor::new(rules)?.extract(text))
}

/// Field extractors bound to one rule table.
pub struct Extractor {
    rules: GuidelineRules,
    medications: MedicationExtractor,
}

impl Extractor {
    pub fn new(rules: &GuidelineRules) -> Result<Self, RulesError> {
        let medications = MedicationExtractor::new(rules)
            .map_err(|e| RulesError::Invalid(format!("medication lexicon: {e}")))?;
        Ok(Self {
            rules: rules.clone(),
            medications,
        })
    }

    pub fn rules(&self) -> &GuidelineRules {
        &self.rules
    }

    pub fn extract(&self, text: &str) -> PatientProfile {
        let mut profile = self.extract_fields(text);

        // Inference only after every primary extractor has run.
        infer_hf_type(&mut profile, &self.rules);

        tracing::info!(
            chars = text.len(),
            medications = profile.medications.len(),
            labs = profile.lab_values.len(),
            comorbidities = profile.comorbidities.len(),
            has_lvef = profile.lvef.is_some(),
            hf_type = profile.hf_type.map(|t| t.as_str()),
            "Extracted patient profile"
        );

        profile
    }

    /// Primary fields only. `hf_type` holds an explicitly stated type or
    /// nothing; callers combining sources run [`infer_hf_type`] once at the end.
    pub fn extract_fields(&self, text: &str) -> PatientProfile {
        PatientProfile {
            age: fields::extract_age(text),
            sex: fields::extract_sex(text),
            hf_stage: fields::extract_stage(text),
            hf_type: fields::extract_hf_type(text),
            lvef: fields::extract_lvef(text),
            nyha_class: fields::extract_nyha(text),
            medications: self.medications.extract(text),
            lab_values: fields::extract_lab_values(text),
            comorbidities: fields::extract_comorbidities(text),
            notes: Vec::new(),
            extraction_method: ExtractionMethod::Regex,
        }
    }
}
