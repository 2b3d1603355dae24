//! Patient profile assembly: combine independent field results, fill the
//! HF type gap from LVEF, and merge profiles from alternate sources.

use crate::models::PatientProfile;
use crate::rules::GuidelineRules;

/// Derive `hf_type` from LVEF when no explicit type was found.
///
/// Runs once, after every primary extractor. An explicit type is never
/// overwritten.
pub fn infer_hf_type(profile: &mut PatientProfile, rules: &GuidelineRules) {
    if profile.hf_type.is_some() {
        return;
    }
    let Some(lvef) = profile.lvef else {
        return;
    };

    let inferred = rules.infer_hf_type(lvef);
    profile.hf_type = Some(inferred);
    profile
        .notes
        .push(format!("HF type {inferred} inferred from LVEF {lvef}%"));
}

/// Merge an alternate source's profile over a primary one.
///
/// List-valued fields from `secondary` replace the primary's wholesale when
/// non-empty; scalar fields from `secondary` win when set. Notes are
/// concatenated and the secondary's extraction method is kept.
pub fn merge(primary: PatientProfile, secondary: PatientProfile) -> PatientProfile {
    let mut notes = primary.notes;
    notes.extend(secondary.notes);

    PatientProfile {
        age: secondary.age.or(primary.age),
        sex: secondary.sex.or(primary.sex),
        hf_stage: secondary.hf_stage.or(primary.hf_stage),
        hf_type: secondary.hf_type.or(primary.hf_type),
        lvef: secondary.lvef.or(primary.lvef),
        nyha_class: secondary.nyha_class.or(primary.nyha_class),
        medications: if secondary.medications.is_empty() {
            primary.medications
        } else {
            secondary.medications
        },
        lab_values: if secondary.lab_values.is_empty() {
            primary.lab_values
        } else {
            secondary.lab_values
        },
        comorbidities: if secondary.comorbidities.is_empty() {
            primary.comorbidities
        } else {
            secondary.comorbidities
        },
        notes,
        extraction_method: secondary.extraction_method,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    fn med(name: &str) -> Medication {
        Medication {
            name: name.into(),
            dose: None,
            frequency: None,
            is_hf_medication: true,
            confidence: 0.9,
        }
    }

    #[test]
    fn inference_fills_gap_only() {
        let rules = GuidelineRules::builtin();

        let mut profile = PatientProfile {
            lvef: Some(28),
            ..Default::default()
        };
        infer_hf_type(&mut profile, rules);
        assert_eq!(profile.hf_type, Some(HfType::Reduced));
        assert_eq!(profile.notes, vec!["HF type HFrEF inferred from LVEF 28%"]);

        let mut explicit = PatientProfile {
            lvef: Some(28),
            hf_type: Some(HfType::Preserved),
            ..Default::default()
        };
        infer_hf_type(&mut explicit, rules);
        assert_eq!(explicit.hf_type, Some(HfType::Preserved));
        assert!(explicit.notes.is_empty());
    }

    #[test]
    fn inference_without_lvef_is_noop() {
        let mut profile = PatientProfile::default();
        infer_hf_type(&mut profile, GuidelineRules::builtin());
        assert_eq!(profile.hf_type, None);
    }

    #[test]
    fn mid_range_lvef_infers_mildly_reduced() {
        let mut profile = PatientProfile {
            lvef: Some(45),
            ..Default::default()
        };
        infer_hf_type(&mut profile, GuidelineRules::builtin());
        assert_eq!(profile.hf_type, Some(HfType::MildlyReduced));
    }

    #[test]
    fn empty_secondary_list_keeps_primary() {
        let primary = PatientProfile {
            medications: vec![med("lisinopril")],
            ..Default::default()
        };
        let merged = merge(primary, PatientProfile::default());
        assert_eq!(merged.medications, vec![med("lisinopril")]);
    }

    #[test]
    fn non_empty_secondary_list_replaces_wholesale() {
        let primary = PatientProfile {
            medications: vec![med("lisinopril"), med("carvedilol")],
            ..Default::default()
        };
        let secondary = PatientProfile {
            medications: vec![med("entresto")],
            ..Default::default()
        };
        let merged = merge(primary, secondary);
        assert_eq!(merged.medications, vec![med("entresto")]);
    }

    #[test]
    fn scalars_prefer_secondary_when_set() {
        let primary = PatientProfile {
            age: Some(70),
            lvef: Some(30),
            sex: Some(Sex::Male),
            ..Default::default()
        };
        let secondary = PatientProfile {
            lvef: Some(25),
            extraction_method: ExtractionMethod::Remote,
            ..Default::default()
        };
        let merged = merge(primary, secondary);
        assert_eq!(merged.age, Some(70));
        assert_eq!(merged.sex, Some(Sex::Male));
        assert_eq!(merged.lvef, Some(25));
        assert_eq!(merged.extraction_method, ExtractionMethod::Remote);
    }
}
