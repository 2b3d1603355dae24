//! Versioned guideline rule table.
//!
//! Every clinical threshold, drug-class membership list, and canonical starting
//! dose the pipeline uses lives here. The built-in table encodes the 2022
//! AHA/ACC/HFSA heart failure guideline; an updated table can be loaded from
//! JSON without touching extraction or engine control flow.

use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DrugClass, HfType};

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Rule table read failed ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Rule table parse failed ({path}): {message}")]
    Parse { path: String, message: String },

    #[error("Invalid rule table: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// LVEF cut-offs (percent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LvefThresholds {
    /// Inference: LVEF at or below this means HFrEF.
    pub infer_reduced_max: u32,
    /// Inference: LVEF at or above this means HFpEF. Between is HFmrEF.
    pub infer_preserved_min: u32,
    /// Pathway: LVEF strictly below this routes to the HFrEF pathway.
    pub pathway_reduced_below: u32,
    /// Pathway: LVEF at or above this routes to the HFpEF pathway.
    pub pathway_preserved_min: u32,
    /// MRA is recommended only at or below this LVEF.
    pub mra_max: u32,
    /// ICD/CRT evaluation is suggested at or below this LVEF.
    pub device_therapy_max: u32,
}

/// Membership list for one therapy bucket. Matching is substring against the
/// normalized medication name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugClassRule {
    pub class: DrugClass,
    pub label: String,
    pub members: Vec<String>,
}

/// Canonical starting-dose suggestion for a class that is not yet prescribed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TherapyStart {
    pub class: DrugClass,
    pub label: String,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidelineRules {
    pub version: String,
    pub lvef: LvefThresholds,
    /// Loop diuretic suggestion fires at or above this NYHA class.
    pub loop_diuretic_min_nyha: u8,
    /// Checked in order; the first bucket containing a name wins.
    pub drug_classes: Vec<DrugClassRule>,
    pub starting_therapy: Vec<TherapyStart>,
    /// Names flagged `is_hf_medication` (exact match on normalized name).
    pub hf_medications: Vec<String>,
}

static BUILTIN: LazyLock<GuidelineRules> = LazyLock::new(|| GuidelineRules::aha_acc_hfsa_2022());

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl GuidelineRules {
    /// Process-wide read-only default table.
    pub fn builtin() -> &'static GuidelineRules {
        &BUILTIN
    }

    fn aha_acc_hfsa_2022() -> Self {
        Self {
            version: "2022 AHA/ACC/HFSA".into(),
            lvef: LvefThresholds {
                infer_reduced_max: 40,
                infer_preserved_min: 50,
                pathway_reduced_below: 40,
                pathway_preserved_min: 50,
                mra_max: 35,
                device_therapy_max: 35,
            },
            loop_diuretic_min_nyha: 2,
            drug_classes: vec![
                DrugClassRule {
                    class: DrugClass::AceArb,
                    label: "ACE inhibitor/ARB".into(),
                    members: names(&[
                        "lisinopril", "enalapril", "captopril", "ramipril", "fosinopril",
                        "losartan", "valsartan", "candesartan", "telmisartan", "olmesartan",
                        "entresto",
                    ]),
                },
                DrugClassRule {
                    class: DrugClass::BetaBlocker,
                    label: "Beta-blocker".into(),
                    members: names(&["metoprolol", "carvedilol", "bisoprolol", "nebivolol"]),
                },
                DrugClassRule {
                    class: DrugClass::Mra,
                    label: "MRA".into(),
                    members: names(&["spironolactone", "eplerenone", "finerenone"]),
                },
                DrugClassRule {
                    class: DrugClass::Diuretic,
                    label: "Diuretics".into(),
                    members: names(&[
                        "furosemide", "torsemide", "bumetanide", "hydrochlorothiazide",
                        "chlorthalidone", "metolazone",
                    ]),
                },
                DrugClassRule {
                    class: DrugClass::Sglt2,
                    label: "SGLT2 inhibitor".into(),
                    members: names(&[
                        "dapagliflozin", "empagliflozin", "canagliflozin", "sotagliflozin",
                    ]),
                },
            ],
            starting_therapy: vec![
                TherapyStart {
                    class: DrugClass::AceArb,
                    label: "ACE inhibitor".into(),
                    instruction: "Start lisinopril 5mg daily, titrate to maximum tolerated dose (up to 40mg daily)".into(),
                },
                TherapyStart {
                    class: DrugClass::BetaBlocker,
                    label: "Beta-blocker".into(),
                    instruction: "Start metoprolol succinate 25mg daily or carvedilol 3.125mg BID, titrate as tolerated".into(),
                },
                TherapyStart {
                    class: DrugClass::Mra,
                    label: "MRA therapy".into(),
                    instruction: "Consider spironolactone 25mg daily (monitor K+ and creatinine)".into(),
                },
                TherapyStart {
                    class: DrugClass::Sglt2,
                    label: "SGLT2 inhibitor".into(),
                    instruction: "Consider dapagliflozin 10mg daily for additional cardiovascular benefit".into(),
                },
                TherapyStart {
                    class: DrugClass::Diuretic,
                    label: "Loop diuretic".into(),
                    instruction: "Consider if signs of volume overload present".into(),
                },
            ],
            hf_medications: names(&[
                "lisinopril", "enalapril", "captopril", "ramipril", "fosinopril",
                "losartan", "valsartan", "candesartan", "telmisartan", "olmesartan",
                "metoprolol", "carvedilol", "bisoprolol", "nebivolol",
                "spironolactone", "eplerenone",
                "sacubitril/valsartan", "entresto",
                "furosemide", "torsemide", "bumetanide",
                "dapagliflozin", "empagliflozin",
                "digoxin", "ivabradine", "hydralazine", "isosorbide",
            ]),
        }
    }

    /// Load a rule table from a JSON file and validate it.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let json = std::fs::read_to_string(path).map_err(|e| RulesError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let rules: GuidelineRules = serde_json::from_str(&json).map_err(|e| RulesError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        rules.validate()?;

        tracing::info!(
            version = %rules.version,
            classes = rules.drug_classes.len(),
            "Loaded guideline rule table"
        );
        Ok(rules)
    }

    /// Structural checks a table must pass before the engine trusts it.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.version.trim().is_empty() {
            return Err(RulesError::Invalid("version label is empty".into()));
        }

        let t = &self.lvef;
        if [t.infer_reduced_max, t.infer_preserved_min, t.pathway_reduced_below,
            t.pathway_preserved_min, t.mra_max, t.device_therapy_max]
            .iter()
            .any(|v| *v > 100)
        {
            return Err(RulesError::Invalid("LVEF thresholds must be within 0-100".into()));
        }
        if t.infer_reduced_max >= t.infer_preserved_min {
            return Err(RulesError::Invalid(format!(
                "inference thresholds overlap: reduced <= {} vs preserved >= {}",
                t.infer_reduced_max, t.infer_preserved_min
            )));
        }
        if t.pathway_reduced_below > t.pathway_preserved_min {
            return Err(RulesError::Invalid(format!(
                "pathway thresholds overlap: reduced < {} vs preserved >= {}",
                t.pathway_reduced_below, t.pathway_preserved_min
            )));
        }

        let mut seen = Vec::new();
        for rule in &self.drug_classes {
            if rule.class == DrugClass::Other {
                return Err(RulesError::Invalid("'other' is implicit and takes no members".into()));
            }
            if seen.contains(&rule.class) {
                return Err(RulesError::Invalid(format!("duplicate class table: {}", rule.class)));
            }
            if rule.members.iter().any(|m| m.trim().is_empty()) {
                return Err(RulesError::Invalid(format!("empty member in {}", rule.class)));
            }
            seen.push(rule.class);
        }

        for class in DrugClass::MANDATED {
            match self.class_rule(class) {
                Some(rule) if !rule.members.is_empty() => {}
                _ => {
                    return Err(RulesError::Invalid(format!(
                        "mandated class {class} has no membership table"
                    )))
                }
            }
            if self.starting_therapy_for(class).is_none() {
                return Err(RulesError::Invalid(format!(
                    "mandated class {class} has no starting therapy"
                )));
            }
        }

        Ok(())
    }

    pub fn class_rule(&self, class: DrugClass) -> Option<&DrugClassRule> {
        self.drug_classes.iter().find(|r| r.class == class)
    }

    pub fn starting_therapy_for(&self, class: DrugClass) -> Option<&TherapyStart> {
        self.starting_therapy.iter().find(|s| s.class == class)
    }

    /// Display label for a class ("Other" when the table has none).
    pub fn class_label(&self, class: DrugClass) -> &str {
        self.class_rule(class).map(|r| r.label.as_str()).unwrap_or("Other")
    }

    /// Bucket for a normalized medication name. First table in order wins.
    pub fn classify_medication(&self, name: &str) -> DrugClass {
        let lower = name.to_lowercase();
        self.drug_classes
            .iter()
            .find(|rule| rule.members.iter().any(|m| lower.contains(m.as_str())))
            .map(|rule| rule.class)
            .unwrap_or(DrugClass::Other)
    }

    pub fn is_hf_medication(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.hf_medications.iter().any(|m| *m == lower)
    }

    /// Threshold-derived HF type for an LVEF value.
    pub fn infer_hf_type(&self, lvef: u32) -> HfType {
        if lvef <= self.lvef.infer_reduced_max {
            HfType::Reduced
        } else if lvef >= self.lvef.infer_preserved_min {
            HfType::Preserved
        } else {
            HfType::MildlyReduced
        }
    }

    /// Every medication name the table knows about, deduplicated.
    pub fn known_medications(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .drug_classes
            .iter()
            .flat_map(|r| r.members.iter().cloned())
            .chain(self.hf_medications.iter().cloned())
            .map(|m| m.to_lowercase())
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

impl Default for GuidelineRules {
    fn default() -> Self {
        Self::builtin().clone()
    }
}
