//! Pattern library: ordered recognition tables per field.
//!
//! Each scalar field is an explicit table of (pattern, priority, normalizer,
//! validator). Tables are compiled once and are read-only for the life of the
//! process. Precedence lives in the table, not in extractor control flow.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::{HfStage, HfType, Sex};

/// Valid adult age range; matches outside are discarded, not clamped.
pub const AGE_RANGE: std::ops::RangeInclusive<u32> = 18..=120;
pub const LVEF_RANGE: std::ops::RangeInclusive<u32> = 0..=100;
pub const NYHA_RANGE: std::ops::RangeInclusive<u8> = 1..=4;

/// Confidence assigned to pattern-matched entries.
pub const PATTERN_CONFIDENCE: f64 = 0.9;

// ---------------------------------------------------------------------------
// Rule tables
// ---------------------------------------------------------------------------

/// One recognition rule for a scalar field.
pub struct FieldRule<T> {
    pub pattern: Regex,
    /// Lower runs first.
    pub priority: u8,
    pub normalize: fn(&Captures) -> Option<T>,
    pub validate: fn(&T) -> bool,
}

impl<T> FieldRule<T> {
    fn new(pattern: &str, priority: u8, normalize: fn(&Captures) -> Option<T>) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            priority,
            normalize,
            validate: |_| true,
        }
    }

    fn validated(mut self, validate: fn(&T) -> bool) -> Self {
        self.validate = validate;
        self
    }
}

/// Ordered alternatives for one field: first valid match wins.
pub struct FieldRules<T> {
    pub field: &'static str,
    rules: Vec<FieldRule<T>>,
}

impl<T: std::fmt::Debug> FieldRules<T> {
    fn new(field: &'static str, mut rules: Vec<FieldRule<T>>) -> Self {
        rules.sort_by_key(|r| r.priority);
        Self { field, rules }
    }

    pub fn rules(&self) -> &[FieldRule<T>] {
        &self.rules
    }

    /// Try each rule in priority order. A match that fails normalization or
    /// validation is discarded and the next rule is tried.
    pub fn first_match(&self, text: &str) -> Option<T> {
        for rule in &self.rules {
            let Some(caps) = rule.pattern.captures(text) else {
                continue;
            };
            match (rule.normalize)(&caps) {
                Some(value) if (rule.validate)(&value) => return Some(value),
                Some(value) => {
                    tracing::debug!(
                        field = self.field,
                        priority = rule.priority,
                        value = ?value,
                        "Discarded out-of-range match"
                    );
                }
                None => {}
            }
        }
        None
    }
}

fn group_u32(caps: &Captures) -> Option<u32> {
    caps.get(1)?.as_str().parse().ok()
}

fn group_parse<T: std::str::FromStr>(caps: &Captures) -> Option<T> {
    caps.get(1)?.as_str().to_uppercase().parse().ok()
}

fn in_age_range(age: &u32) -> bool {
    AGE_RANGE.contains(age)
}

fn in_lvef_range(lvef: &u32) -> bool {
    LVEF_RANGE.contains(lvef)
}

fn roman_or_digit(caps: &Captures) -> Option<u8> {
    match caps.get(1)?.as_str().to_uppercase().as_str() {
        "I" | "1" => Some(1),
        "II" | "2" => Some(2),
        "III" | "3" => Some(3),
        "IV" | "4" => Some(4),
        _ => None,
    }
}

pub static AGE_RULES: LazyLock<FieldRules<u32>> = LazyLock::new(|| {
    FieldRules::new(
        "age",
        vec![
            FieldRule::new(r"(?i)(\d+)\s*(?:years?\s+old|yo|y\.?o\.?)\b", 0, group_u32),
            FieldRule::new(r"(?i)(\d+)\s*(?:year|yr)s?\s+old\b", 1, group_u32),
            FieldRule::new(r"(?i)\bage\s*:?\s*(\d+)\b", 2, group_u32),
            FieldRule::new(r"(?i)(\d+)\s*years?\s+of\s+age\b", 3, group_u32),
            FieldRule::new(r"(?im)^\s*(\d+)\s*(?:years?\s+old|yo)", 4, group_u32),
            FieldRule::new(r"(?i)(\d{2,3})\s*-\s*years?\s*-\s*old", 5, group_u32),
        ]
        .into_iter()
        .map(|r| r.validated(in_age_range))
        .collect(),
    )
});

pub static SEX_RULES: LazyLock<FieldRules<Sex>> = LazyLock::new(|| {
    FieldRules::new(
        "sex",
        vec![
            FieldRule::new(r"(?i)\b(?:male|man|gentleman|mr\.?)\b", 0, |_| Some(Sex::Male)),
            // "Ms" only as a title before a capitalised name, never the
            // millisecond unit after a number ("QRS 150 ms").
            FieldRule::new(
                r"(?i:\b(?:female|woman|lady|mrs)\b)|(?:^|[^\d\s])\s*\b(?i:ms)\.?\s+[A-Z][a-z]",
                1,
                |_| Some(Sex::Female),
            ),
        ],
    )
});

pub static STAGE_RULES: LazyLock<FieldRules<HfStage>> = LazyLock::new(|| {
    FieldRules::new(
        "hf_stage",
        vec![
            FieldRule::new(r"(?i)(?:heart\s+failure\s+)?stage\s+([A-D])\b", 0, group_parse),
            FieldRule::new(r"(?i)\bHF\s+stage\s+([A-D])\b", 1, group_parse),
            FieldRule::new(r"(?i)ACC/AHA\s+stage\s+([A-D])\b", 2, group_parse),
        ],
    )
});

pub static HF_TYPE_RULES: LazyLock<FieldRules<HfType>> = LazyLock::new(|| {
    FieldRules::new(
        "hf_type",
        vec![
            FieldRule::new(
                r"(?i)\bHFrEF\b|heart\s+failure\s+with\s+reduced\s+ejection\s+fraction",
                0,
                |_| Some(HfType::Reduced),
            ),
            FieldRule::new(
                r"(?i)\bHFpEF\b|heart\s+failure\s+with\s+preserved\s+ejection\s+fraction",
                1,
                |_| Some(HfType::Preserved),
            ),
            FieldRule::new(
                r"(?i)\bHFmrEF\b|heart\s+failure\s+with\s+mid-?range\s+ejection\s+fraction",
                2,
                |_| Some(HfType::MildlyReduced),
            ),
            FieldRule::new(
                r"(?i)\bHFimpEF\b|heart\s+failure\s+with\s+improved\s+ejection\s+fraction",
                3,
                |_| Some(HfType::Improved),
            ),
        ],
    )
});

pub static LVEF_RULES: LazyLock<FieldRules<u32>> = LazyLock::new(|| {
    FieldRules::new(
        "lvef",
        vec![
            FieldRule::new(r"(?i)\bLVEF\s*(?:of|:|=|is)?\s*(\d+)(?:\s*%)?", 0, group_u32),
            FieldRule::new(
                r"(?i)ejection\s+fraction\s*(?:of|:|=|is)?\s*(\d+)(?:\s*%)?",
                1,
                group_u32,
            ),
            FieldRule::new(r"(?i)\bEF\s*(?:of|:|=|is)?\s*(\d+)(?:\s*%)?", 2, group_u32),
        ]
        .into_iter()
        .map(|r| r.validated(in_lvef_range))
        .collect(),
    )
});

pub static NYHA_RULES: LazyLock<FieldRules<u8>> = LazyLock::new(|| {
    FieldRules::new(
        "nyha_class",
        vec![
            FieldRule::new(
                r"(?i)\bNYHA\s+(?:class|functional\s+class)?\s*(IV|III|II|I|[1-4])\b",
                0,
                roman_or_digit,
            ),
            FieldRule::new(
                r"(?i)functional\s+class\s*(IV|III|II|I|[1-4])\b",
                1,
                roman_or_digit,
            ),
            FieldRule::new(r"(?i)\bFC\s*(IV|III|II|I|[1-4])\b", 2, roman_or_digit),
        ]
        .into_iter()
        .map(|r| r.validated(|c| NYHA_RANGE.contains(c)))
        .collect(),
    )
});

// ---------------------------------------------------------------------------
// Accumulating tables
// ---------------------------------------------------------------------------

/// Lab recognizer: canonical key, pattern with the magnitude in group 1.
pub struct LabRule {
    pub name: &'static str,
    pub pattern: Regex,
}

const NUMBER: &str = r"\s*(?:of|:|=|is)?\s*(\d+(?:\.\d+)?)";

pub static LAB_RULES: LazyLock<Vec<LabRule>> = LazyLock::new(|| {
    [
        ("potassium", r"(?i)(?:\bK\+?|\bpotassium)"),
        ("sodium", r"(?i)(?:\bNa\+?|\bsodium)"),
        ("creatinine", r"(?i)\b(?:Cr|creatinine)\b"),
        ("egfr", r"(?i)\beGFR\b"),
        ("bun", r"(?i)\bBUN\b"),
        ("bnp", r"(?i)\bBNP\b"),
        ("nt_probnp", r"(?i)(?:\bNT-proBNP|\bNT\s*pro\s*BNP)\b"),
        ("hemoglobin", r"(?i)\b(?:Hgb|Hb|hemoglobin)\b"),
    ]
    .into_iter()
    .map(|(name, prefix)| LabRule {
        name,
        pattern: Regex::new(&format!("{prefix}{NUMBER}")).unwrap(),
    })
    .collect()
});

/// Canonical unit for a lab key. Unknown labs have none.
pub fn lab_unit(name: &str) -> Option<&'static str> {
    match name {
        "potassium" | "sodium" => Some("mEq/L"),
        "creatinine" | "bun" => Some("mg/dL"),
        "egfr" => Some("mL/min/1.73m²"),
        "bnp" | "nt_probnp" => Some("pg/mL"),
        "hemoglobin" => Some("g/dL"),
        _ => None,
    }
}

/// Comorbidity recognizer: display form and pattern.
pub struct ComorbidityRule {
    pub condition: &'static str,
    pub pattern: Regex,
}

pub static COMORBIDITY_RULES: LazyLock<Vec<ComorbidityRule>> = LazyLock::new(|| {
    [
        ("Diabetes", r"(?i)\b(?:diabetes|DM|T2DM|type\s+2\s+diabetes)\b"),
        ("Hypertension", r"(?i)\b(?:hypertension|HTN|high\s+blood\s+pressure)\b"),
        (
            "Chronic Kidney Disease",
            r"(?i)\b(?:CKD|chronic\s+kidney\s+disease|renal\s+insufficiency)\b",
        ),
        ("Atrial Fibrillation", r"(?i)\b(?:atrial\s+fibrillation|AF|A-fib)\b"),
        ("Coronary Artery Disease", r"(?i)\b(?:CAD|coronary\s+artery\s+disease|CHD)\b"),
        ("COPD", r"(?i)\b(?:COPD|chronic\s+obstructive\s+pulmonary\s+disease)\b"),
        ("Sleep Apnea", r"(?i)\b(?:sleep\s+apnea|OSA|obstructive\s+sleep\s+apnea)\b"),
        ("Depression", r"(?i)\b(?:depression|depressive\s+disorder)\b"),
    ]
    .into_iter()
    .map(|(condition, pattern)| ComorbidityRule {
        condition,
        pattern: Regex::new(pattern).unwrap(),
    })
    .collect()
});

// ---------------------------------------------------------------------------
// Medication patterns
// ---------------------------------------------------------------------------

/// A word followed by a numeric dose and unit, e.g. "atorvastatin 40 mg".
pub static DOSED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]+(?:[/\-][a-z]+)*)\s+\d+(?:\.\d+)?\s*(?:mg|mcg|g|units?)\b").unwrap()
});

/// Dose magnitude and unit near a medication name.
pub static DOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(mg|mcg|g|units?)\b").unwrap());

pub static FREQUENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(once\s+daily|twice\s+daily|three\s+times\s+daily|four\s+times\s+daily|daily|bid|tid|qid|qd|qhs|prn)\b",
    )
    .unwrap()
});

/// True when the unit ending at byte `end` is the numerator of a
/// concentration ("11.2 g/dL"), which is a lab result rather than a dose.
pub fn is_concentration(text: &str, end: usize) -> bool {
    text[end..].starts_with('/')
}

/// Ends a medication's dose window.
pub static CLAUSE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,;\n]|\.\s").unwrap());

/// Words the dosed-name pattern must not treat as drugs: lab indicators and
/// common connectors that precede a number. Sorted for binary search.
pub const NON_DRUG_WORDS: &[&str] = &[
    "and", "at", "bun", "by", "cr", "creatinine", "daily", "decreased", "dose", "from",
    "glucose", "hb", "hemoglobin", "hgb", "increased", "k", "na", "of", "on", "plus",
    "potassium", "sodium", "taking", "then", "to", "was", "with",
];

/// Frequently co-prescribed drugs recognized even without a dose.
pub const COMMON_MEDICATIONS: &[&str] = &[
    "amiodarone", "amlodipine", "apixaban", "aspirin", "atorvastatin", "clopidogrel",
    "insulin", "metformin", "rivaroxaban", "rosuvastatin", "sacubitril/valsartan",
    "vericiguat", "warfarin",
];

/// Longest-first alternation over a lexicon, so compound names win.
pub fn lexicon_pattern(names: &[String]) -> Result<Regex, regex::Error> {
    let mut sorted: Vec<&String> = names.iter().collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let alternation = sorted
        .iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_rules_are_sorted_by_priority() {
        let priorities: Vec<u8> = AGE_RULES.rules().iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn invalid_match_falls_through_to_next_rule() {
        // First rule sees 150 (discarded); "age: 64" is picked up by a later rule.
        assert_eq!(AGE_RULES.first_match("150 years old, age: 64"), Some(64));
    }

    #[test]
    fn nyha_recognizes_roman_four() {
        assert_eq!(NYHA_RULES.first_match("NYHA class IV symptoms"), Some(4));
        assert_eq!(NYHA_RULES.first_match("NYHA III"), Some(3));
        assert_eq!(NYHA_RULES.first_match("functional class 2"), Some(2));
    }

    #[test]
    fn stage_requires_standalone_letter() {
        assert_eq!(STAGE_RULES.first_match("stage and symptoms"), None);
        assert_eq!(STAGE_RULES.first_match("ACC/AHA stage c"), Some(HfStage::C));
    }

    #[test]
    fn bnp_does_not_match_inside_nt_probnp() {
        let bnp = LAB_RULES.iter().find(|r| r.name == "bnp").unwrap();
        assert!(bnp.pattern.captures("NT-proBNP 1800").is_none());
        assert_eq!(&bnp.pattern.captures("BNP 450").unwrap()[1], "450");
    }

    #[test]
    fn lab_units() {
        assert_eq!(lab_unit("potassium"), Some("mEq/L"));
        assert_eq!(lab_unit("egfr"), Some("mL/min/1.73m²"));
        assert_eq!(lab_unit("troponin"), None);
    }

    #[test]
    fn lexicon_prefers_longest_name() {
        let re = lexicon_pattern(&["valsartan".into(), "sacubitril/valsartan".into()]).unwrap();
        let found: Vec<&str> = re.find_iter("on Sacubitril/Valsartan 49/51").map(|m| m.as_str()).collect();
        assert_eq!(found, vec!["Sacubitril/Valsartan"]);
    }

    #[test]
    fn concentration_units_are_detected() {
        let text = "glucose 140 mg/dL";
        assert!(is_concentration(text, text.find("/").unwrap()));
        assert!(!is_concentration("40 mg daily", 5));
    }

    #[test]
    fn ms_unit_is_not_a_title() {
        assert_eq!(SEX_RULES.first_match("QRS 150 ms, LBBB"), None);
        assert_eq!(SEX_RULES.first_match("QRS 150 ms. The rhythm is sinus"), None);
        assert_eq!(SEX_RULES.first_match("Ms. Smith, 70, seen today"), Some(Sex::Female));
        assert_eq!(SEX_RULES.first_match("seen with Ms Jones"), Some(Sex::Female));
    }

    #[test]
    fn non_drug_words_sorted() {
        for window in NON_DRUG_WORDS.windows(2) {
            assert!(window[0] < window[1], "{:?} >= {:?}", window[0], window[1]);
        }
    }
}
