//! Medication extraction: name recognition, then independent dose and
//! frequency attachment from the text following each name.

use std::collections::HashSet;

use regex::Regex;

use crate::models::Medication;
use crate::rules::GuidelineRules;

use super::patterns::{
    is_concentration, lexicon_pattern, CLAUSE_END, COMMON_MEDICATIONS, DOSE, DOSED_NAME,
    FREQUENCY, NON_DRUG_WORDS, PATTERN_CONFIDENCE,
};

/// How far past a name a dose may appear.
const DOSE_WINDOW_CHARS: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Mention {
    start: usize,
    end: usize,
}

impl Mention {
    fn overlaps(&self, start: usize, end: usize) -> bool {
        start < self.end && self.start < end
    }
}

/// Recognizes medications against a rule table's lexicon plus the generic
/// "name + dose" pattern.
pub struct MedicationExtractor {
    lexicon: Regex,
    hf_medications: HashSet<String>,
}

impl MedicationExtractor {
    pub fn new(rules: &GuidelineRules) -> Result<Self, regex::Error> {
        let mut names = rules.known_medications();
        names.extend(COMMON_MEDICATIONS.iter().map(|s| s.to_string()));
        names.sort();
        names.dedup();

        Ok(Self {
            lexicon: lexicon_pattern(&names)?,
            hf_medications: rules.hf_medications.iter().map(|m| m.to_lowercase()).collect(),
        })
    }

    /// All medications in order of first mention, one entry per normalized name.
    pub fn extract(&self, text: &str) -> Vec<Medication> {
        let mentions = self.find_mentions(text);
        let mut seen = HashSet::new();
        let mut medications = Vec::new();

        for (i, mention) in mentions.iter().enumerate() {
            let name = normalize_name(&text[mention.start..mention.end]);
            if !seen.insert(name.clone()) {
                continue;
            }

            let limit = mentions.get(i + 1).map_or(text.len(), |next| next.start);
            let (dose, frequency) = attach_dose(text, mention.end, limit);
            let is_hf_medication = self.hf_medications.contains(&name);

            medications.push(Medication {
                name,
                dose,
                frequency,
                is_hf_medication,
                confidence: PATTERN_CONFIDENCE,
            });
        }

        medications
    }

    fn find_mentions(&self, text: &str) -> Vec<Mention> {
        let known: Vec<Mention> = self
            .lexicon
            .find_iter(text)
            .map(|m| Mention {
                start: m.start(),
                end: m.end(),
            })
            .collect();
        let mut mentions = known.clone();

        for caps in DOSED_NAME.captures_iter(text) {
            let (Some(whole), Some(word)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if is_concentration(text, whole.end()) {
                continue;
            }
            let lower = word.as_str().to_lowercase();
            if NON_DRUG_WORDS.binary_search(&lower.as_str()).is_ok() {
                continue;
            }
            if known.iter().any(|k| k.overlaps(word.start(), word.end())) {
                continue;
            }
            // Salt or formulation qualifier directly after a known name
            // ("metoprolol succinate 25mg").
            if known
                .iter()
                .any(|k| k.end <= word.start() && text[k.end..word.start()].trim().is_empty())
            {
                continue;
            }
            mentions.push(Mention {
                start: word.start(),
                end: word.end(),
            });
        }

        mentions.sort_by_key(|m| m.start);
        mentions
    }
}

/// Dose and frequency from the clause following a name, bounded by
/// `limit` (the next mention) and [`DOSE_WINDOW_CHARS`].
fn attach_dose(text: &str, start: usize, limit: usize) -> (Option<f64>, Option<String>) {
    let mut window = &text[start..limit.max(start)];
    if let Some(end) = CLAUSE_END.find(window) {
        window = &window[..end.start()];
    }
    if let Some((cut, _)) = window.char_indices().nth(DOSE_WINDOW_CHARS) {
        window = &window[..cut];
    }

    let dose = DOSE
        .captures_iter(window)
        .find(|caps| caps.get(0).is_some_and(|m| !is_concentration(window, m.end())))
        .and_then(|caps| caps.get(1)?.as_str().parse::<f64>().ok());
    let frequency = FREQUENCY
        .captures(window)
        .and_then(|caps| caps.get(1).map(|m| normalize_phrase(m.as_str())));

    (dose, frequency)
}

fn normalize_name(raw: &str) -> String {
    normalize_phrase(raw)
}

fn normalize_phrase(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> MedicationExtractor {
        MedicationExtractor::new(GuidelineRules::builtin()).unwrap()
    }

    fn names(meds: &[Medication]) -> Vec<&str> {
        meds.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn duplicate_mentions_collapse_to_first() {
        let meds = extractor().extract("Lisinopril 20mg daily. Continue lisinopril 20mg.");
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].name, "lisinopril");
        assert_eq!(meds[0].dose, Some(20.0));
        assert_eq!(meds[0].frequency.as_deref(), Some("daily"));
    }

    #[test]
    fn detection_order_is_text_order() {
        let meds = extractor()
            .extract("Meds: carvedilol 12.5 mg BID, furosemide 40 mg daily, lisinopril 10 mg");
        assert_eq!(names(&meds), vec!["carvedilol", "furosemide", "lisinopril"]);
        assert_eq!(meds[0].dose, Some(12.5));
        assert_eq!(meds[0].frequency.as_deref(), Some("bid"));
        assert_eq!(meds[1].dose, Some(40.0));
    }

    #[test]
    fn name_without_dose_is_still_a_medication() {
        let meds = extractor().extract("Started on spironolactone last week");
        assert_eq!(names(&meds), vec!["spironolactone"]);
        assert_eq!(meds[0].dose, None);
        assert_eq!(meds[0].frequency, None);
        assert!(meds[0].is_hf_medication);
    }

    #[test]
    fn dose_does_not_leak_across_clauses() {
        let meds = extractor().extract("digoxin, then torsemide 20 mg");
        assert_eq!(names(&meds), vec!["digoxin", "torsemide"]);
        assert_eq!(meds[0].dose, None);
        assert_eq!(meds[1].dose, Some(20.0));
    }

    #[test]
    fn unknown_dosed_names_are_kept() {
        let meds = extractor().extract("simvastatin 40 mg qhs");
        assert_eq!(names(&meds), vec!["simvastatin"]);
        assert!(!meds[0].is_hf_medication);
        assert_eq!(meds[0].frequency.as_deref(), Some("qhs"));
    }

    #[test]
    fn lab_indicators_are_not_medications() {
        let meds = extractor().extract("potassium 4 mg? taking 20 mg of something");
        assert!(meds.is_empty(), "got {:?}", names(&meds));
    }

    #[test]
    fn concentration_lab_results_are_not_medications() {
        let meds = extractor()
            .extract("Labs: Hemoglobin 11.2 g/dL, glucose 140 mg/dL, albumin 3.1 g/dL.");
        assert!(meds.is_empty(), "got {:?}", names(&meds));

        let meds = extractor().extract("Hgb 12 g, Hb 11 g");
        assert!(meds.is_empty(), "got {:?}", names(&meds));
    }

    #[test]
    fn non_ascii_text_is_handled() {
        let meds = extractor().extract("furosemide 40 mg — 日本語, lisinopril 5 mg — día");
        assert_eq!(names(&meds), vec!["furosemide", "lisinopril"]);
        assert_eq!(meds[0].dose, Some(40.0));
        assert_eq!(meds[1].dose, Some(5.0));

        let meds = extractor().extract("carvedilol 日本語日本語日本語日本語日本語日本語日本語日本語日本語日本語日本語日本語日本語日本語日本語日本語日本語日本語");
        assert_eq!(names(&meds), vec!["carvedilol"]);
        assert_eq!(meds[0].dose, None);
    }

    #[test]
    fn salt_qualifier_is_not_a_separate_medication() {
        let meds = extractor().extract("metoprolol succinate 50 mg daily");
        assert_eq!(names(&meds), vec!["metoprolol"]);
        assert_eq!(meds[0].dose, Some(50.0));
    }

    #[test]
    fn compound_name_is_one_medication() {
        let meds = extractor().extract("sacubitril/valsartan 24/26 mg BID");
        assert_eq!(names(&meds), vec!["sacubitril/valsartan"]);
        assert!(meds[0].is_hf_medication);
    }

    #[test]
    fn empty_text_has_no_medications() {
        assert!(extractor().extract("").is_empty());
    }
}
