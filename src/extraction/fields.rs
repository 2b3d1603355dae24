//! Field extractors. Each is a total, pure function of the note text and
//! independent of every other field.

use std::collections::BTreeMap;

use crate::models::{Comorbidity, HfStage, HfType, LabValue, Sex};

use super::patterns::{
    lab_unit, AGE_RULES, COMORBIDITY_RULES, HF_TYPE_RULES, LAB_RULES, LVEF_RULES, NYHA_RULES,
    PATTERN_CONFIDENCE, SEX_RULES, STAGE_RULES,
};

pub fn extract_age(text: &str) -> Option<u32> {
    AGE_RULES.first_match(text)
}

pub fn extract_sex(text: &str) -> Option<Sex> {
    SEX_RULES.first_match(text)
}

pub fn extract_stage(text: &str) -> Option<HfStage> {
    STAGE_RULES.first_match(text)
}

/// Explicitly stated HF type only; LVEF-derived typing is the assembler's job.
pub fn extract_hf_type(text: &str) -> Option<HfType> {
    HF_TYPE_RULES.first_match(text)
}

pub fn extract_lvef(text: &str) -> Option<u32> {
    LVEF_RULES.first_match(text)
}

pub fn extract_nyha(text: &str) -> Option<u8> {
    NYHA_RULES.first_match(text)
}

/// First value per known lab, with its canonical unit.
pub fn extract_lab_values(text: &str) -> BTreeMap<String, LabValue> {
    let mut labs = BTreeMap::new();
    for rule in LAB_RULES.iter() {
        let value = rule
            .pattern
            .captures(text)
            .and_then(|caps| caps.get(1)?.as_str().parse::<f64>().ok());
        if let Some(value) = value {
            labs.insert(
                rule.name.to_string(),
                LabValue {
                    value,
                    unit: lab_unit(rule.name).map(str::to_string),
                },
            );
        }
    }
    labs
}

/// Every comorbidity whose pattern appears, in table order.
pub fn extract_comorbidities(text: &str) -> Vec<Comorbidity> {
    COMORBIDITY_RULES
        .iter()
        .filter(|rule| rule.pattern.is_match(text))
        .map(|rule| Comorbidity {
            condition: rule.condition.to_string(),
            confidence: PATTERN_CONFIDENCE,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_from_hyphenated_form() {
        assert_eq!(extract_age("72-year-old man with dyspnea"), Some(72));
    }

    #[test]
    fn age_out_of_bounds_is_discarded() {
        assert_eq!(extract_age("150 year old"), None);
        assert_eq!(extract_age("12 yo"), None);
    }

    #[test]
    fn age_variants() {
        assert_eq!(extract_age("Age: 67"), Some(67));
        assert_eq!(extract_age("a 58 yo woman"), Some(58));
        assert_eq!(extract_age("81 years of age"), Some(81));
    }

    #[test]
    fn sex_checks_male_first() {
        assert_eq!(extract_sex("65-year-old man"), Some(Sex::Male));
        assert_eq!(extract_sex("Mrs. Jones, 70"), Some(Sex::Female));
        assert_eq!(extract_sex("female patient"), Some(Sex::Female));
        assert_eq!(extract_sex("patient with dyspnea"), None);
    }

    #[test]
    fn stage_is_uppercased() {
        assert_eq!(extract_stage("heart failure stage c"), Some(HfStage::C));
        assert_eq!(extract_stage("no staging"), None);
    }

    #[test]
    fn explicit_type_phrases() {
        assert_eq!(extract_hf_type("known HFpEF"), Some(HfType::Preserved));
        assert_eq!(
            extract_hf_type("heart failure with reduced ejection fraction"),
            Some(HfType::Reduced)
        );
        assert_eq!(extract_hf_type("HFimpEF after therapy"), Some(HfType::Improved));
        assert_eq!(extract_hf_type("LVEF 28%"), None);
    }

    #[test]
    fn lvef_variants() {
        assert_eq!(extract_lvef("LVEF 28%"), Some(28));
        assert_eq!(extract_lvef("ejection fraction of 55%"), Some(55));
        assert_eq!(extract_lvef("EF: 35"), Some(35));
        assert_eq!(extract_lvef("LVEF 250%"), None);
    }

    #[test]
    fn nyha_variants() {
        assert_eq!(extract_nyha("NYHA class II"), Some(2));
        assert_eq!(extract_nyha("NYHA functional class 3"), Some(3));
        assert_eq!(extract_nyha("FC IV"), Some(4));
        assert_eq!(extract_nyha("no class noted"), None);
    }

    #[test]
    fn labs_carry_canonical_units() {
        let labs = extract_lab_values("K+ 5.1, Na 134, creatinine 1.8, eGFR 42, NT-proBNP 2400");
        assert_eq!(labs["potassium"].value, 5.1);
        assert_eq!(labs["potassium"].unit.as_deref(), Some("mEq/L"));
        assert_eq!(labs["sodium"].value, 134.0);
        assert_eq!(labs["creatinine"].unit.as_deref(), Some("mg/dL"));
        assert_eq!(labs["egfr"].value, 42.0);
        assert_eq!(labs["nt_probnp"].value, 2400.0);
        assert!(!labs.contains_key("bnp"));
    }

    #[test]
    fn first_value_per_lab_wins() {
        let labs = extract_lab_values("potassium 4.1 on admission, potassium 5.6 today");
        assert_eq!(labs["potassium"].value, 4.1);
        assert_eq!(labs.len(), 1);
    }

    #[test]
    fn comorbidities_in_table_order() {
        let found = extract_comorbidities("Hx of HTN, T2DM and atrial fibrillation");
        let names: Vec<&str> = found.iter().map(|c| c.condition.as_str()).collect();
        assert_eq!(names, vec!["Diabetes", "Hypertension", "Atrial Fibrillation"]);
        assert!(found.iter().all(|c| c.confidence == 0.9));
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert_eq!(extract_age(""), None);
        assert!(extract_lab_values("").is_empty());
        assert!(extract_comorbidities("").is_empty());
    }
}
