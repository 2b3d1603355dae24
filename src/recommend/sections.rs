//! Section builders. Each turns a classified profile into one block of
//! guideline text.

use crate::models::{DrugClass, PatientProfile, Pathway};
use crate::rules::GuidelineRules;

use super::classify::{
    device_therapy_indicated, gap_analysis, mra_indicated, GapStatus, MedicationBuckets,
};
use super::document::{Section, SectionKind};

/// A profile with its pathway and medication buckets resolved.
pub struct Assessment<'a> {
    pub profile: &'a PatientProfile,
    pub rules: &'a GuidelineRules,
    pub pathway: Pathway,
    pub buckets: MedicationBuckets<'a>,
}

impl Assessment<'_> {
    /// Reduced pathway, no MRA prescribed, and LVEF within the MRA gate.
    fn mra_recommended(&self) -> bool {
        self.pathway == Pathway::Reduced
            && !self.buckets.has(DrugClass::Mra)
            && mra_indicated(self.profile, self.rules)
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

pub fn summary(a: &Assessment<'_>) -> Section {
    let p = a.profile;
    let mut lines = Vec::new();

    let demographics = match (p.age, p.sex) {
        (Some(age), Some(sex)) => Some(format!("{age}-year-old {sex}")),
        (Some(age), None) => Some(format!("{age} years old")),
        (None, Some(sex)) => Some(sex.to_string()),
        (None, None) => None,
    };
    if let Some(demographics) = demographics {
        lines.push(format!("**Demographics:** {demographics}"));
    }

    let mut hf = Vec::new();
    if let Some(hf_type) = p.hf_type {
        hf.push(format!("Type: {hf_type}"));
    }
    if let Some(stage) = p.hf_stage {
        hf.push(format!("Stage: {stage}"));
    }
    if let Some(lvef) = p.lvef {
        hf.push(format!("LVEF: {lvef}%"));
    }
    if let Some(nyha) = p.nyha_class {
        hf.push(format!("NYHA Class: {nyha}"));
    }
    if !hf.is_empty() {
        lines.push(format!("**Heart Failure:** {}", hf.join(", ")));
    }

    if lines.is_empty() {
        lines.push("No demographic or heart failure details identified.".to_string());
    }

    let pathway = match a.pathway {
        Pathway::Indeterminate => "indeterminate (LVEF assessment needed)".to_string(),
        other => other.to_string(),
    };
    lines.push(format!("**Guideline pathway:** {pathway}"));

    if !p.comorbidities.is_empty() {
        let names: Vec<&str> = p.comorbidities.iter().map(|c| c.condition.as_str()).collect();
        lines.push(format!("**Comorbidities:** {}", names.join(", ")));
    }

    if !p.lab_values.is_empty() {
        let labs: Vec<String> = p
            .lab_values
            .iter()
            .map(|(name, lab)| match lab.unit {
                Some(ref unit) => format!("{name} {} {unit}", lab.value),
                None => format!("{name} {}", lab.value),
            })
            .collect();
        lines.push(format!("**Labs:** {}", labs.join(", ")));
    }

    Section::new(SectionKind::Summary, lines)
}

// ---------------------------------------------------------------------------
// Current medications
// ---------------------------------------------------------------------------

pub fn current_medications(a: &Assessment<'_>) -> Section {
    let p = a.profile;
    if p.medications.is_empty() {
        return Section::new(
            SectionKind::CurrentMedicationAnalysis,
            vec!["No current medications reported.".to_string()],
        );
    }

    let lines = if a.pathway == Pathway::Reduced {
        reduced_pathway_analysis(a)
    } else {
        p.medications
            .iter()
            .map(|m| format!("• {} (confidence: {:.2})", m.display(), m.confidence))
            .collect()
    };

    Section::new(SectionKind::CurrentMedicationAnalysis, lines)
}

fn reduced_pathway_analysis(a: &Assessment<'_>) -> Vec<String> {
    let mut lines = Vec::new();

    for finding in gap_analysis(&a.buckets, a.profile, a.rules) {
        let label = a.rules.class_label(finding.class);
        let meds = a.buckets.describe(finding.class);
        let line = match (finding.class, finding.status) {
            (DrugClass::AceArb | DrugClass::BetaBlocker, GapStatus::Present) => {
                format!("✅ **{label}:** {meds} - Appropriate for HFrEF")
            }
            (DrugClass::Mra, GapStatus::Present) => {
                format!("✅ **{label}:** {meds} - Good addition for HFrEF")
            }
            (DrugClass::Sglt2, GapStatus::Present) => {
                format!("✅ **{label}:** {meds} - Excellent for additional benefit")
            }
            (DrugClass::Diuretic, GapStatus::Present) => {
                format!("✅ **{label}:** {meds} - For volume management")
            }
            (_, GapStatus::Present) => format!("✅ **{label}:** {meds}"),
            (DrugClass::AceArb | DrugClass::BetaBlocker, GapStatus::Missing) => {
                format!("❌ **{label}:** Not prescribed - **Strongly recommended** for HFrEF")
            }
            (DrugClass::Mra, GapStatus::Missing) => format!(
                "❌ **{label}:** Not prescribed - **Recommended** for HFrEF with LVEF ≤{}%",
                a.rules.lvef.mra_max
            ),
            (_, GapStatus::Missing) => {
                format!("⚠️ **{label}:** Not prescribed - Recommended for additional cardiovascular benefit")
            }
            (_, GapStatus::NotIndicated) => format!(
                "⚠️ **{label}:** Consider adding if LVEF ≤{}% and symptoms persist",
                a.rules.lvef.mra_max
            ),
        };
        lines.push(line);
    }

    if a.buckets.has(DrugClass::Other) {
        lines.push(format!(
            "• **Other medications:** {}",
            a.buckets.describe(DrugClass::Other)
        ));
    }

    lines
}

// ---------------------------------------------------------------------------
// New therapy
// ---------------------------------------------------------------------------

pub fn new_therapies(a: &Assessment<'_>) -> Section {
    let lines = match a.pathway {
        Pathway::Reduced => {
            let items = reduced_pathway_starts(a);
            if items.is_empty() {
                vec!["Continue current therapy with regular monitoring.".to_string()]
            } else {
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| format!("{}. {item}", i + 1))
                    .collect()
            }
        }
        Pathway::Preserved => vec![
            "**HFpEF Management:**".to_string(),
            "• Control blood pressure (target <130/80 mmHg)".to_string(),
            "• Manage diabetes if present".to_string(),
            "• Consider SGLT2 inhibitor for additional benefit".to_string(),
            "• Diuretics for volume management if needed".to_string(),
        ],
        Pathway::Indeterminate => vec![
            "**General Heart Failure Management:**".to_string(),
            "• LVEF assessment needed to guide therapy".to_string(),
            "• Consider ACE inhibitor or ARB".to_string(),
            "• Beta-blocker therapy if appropriate".to_string(),
            "• Volume assessment and diuretic therapy if needed".to_string(),
        ],
    };

    Section::new(SectionKind::NewMedicationRecommendations, lines)
}

/// Unnumbered starting-therapy items, in guideline order.
fn reduced_pathway_starts(a: &Assessment<'_>) -> Vec<String> {
    let mut items = Vec::new();
    let mut start = |class: DrugClass| {
        if let Some(therapy) = a.rules.starting_therapy_for(class) {
            items.push(format!("**{}** - {}", therapy.label, therapy.instruction));
        }
    };

    if !a.buckets.has(DrugClass::AceArb) {
        start(DrugClass::AceArb);
    }
    if !a.buckets.has(DrugClass::BetaBlocker) {
        start(DrugClass::BetaBlocker);
    }
    if a.mra_recommended() {
        start(DrugClass::Mra);
    }
    if !a.buckets.has(DrugClass::Sglt2) {
        start(DrugClass::Sglt2);
    }
    let symptomatic = a
        .profile
        .nyha_class
        .is_some_and(|c| c >= a.rules.loop_diuretic_min_nyha);
    if symptomatic && !a.buckets.has(DrugClass::Diuretic) {
        start(DrugClass::Diuretic);
    }

    items
}

// ---------------------------------------------------------------------------
// Monitoring and lifestyle
// ---------------------------------------------------------------------------

pub fn monitoring(a: &Assessment<'_>) -> Section {
    let mut lines = vec![
        "**Laboratory Monitoring:**".to_string(),
        "• Complete metabolic panel (K+, Na+, creatinine, eGFR) in 1-2 weeks after medication changes".to_string(),
        "• BNP or NT-proBNP if diagnosis unclear or monitoring therapy".to_string(),
    ];

    if a.buckets.has(DrugClass::Mra) || a.mra_recommended() {
        lines.push(
            "• **MRA monitoring:** K+ and creatinine within 1 week, then monthly for 3 months"
                .to_string(),
        );
    }
    if a.buckets.has(DrugClass::AceArb) {
        lines.push("• **ACE inhibitor/ARB:** Monitor blood pressure and renal function".to_string());
    }

    lines.extend(
        [
            "",
            "**Clinical Monitoring:**",
            "• Daily weight monitoring (report weight gain >2-3 lbs in 1 day or >5 lbs in 1 week)",
            "• Symptoms assessment (dyspnea, fatigue, exercise tolerance)",
            "• Blood pressure and heart rate",
            "• Follow-up in 1-2 weeks after medication initiation/changes",
        ]
        .map(String::from),
    );

    Section::new(SectionKind::Monitoring, lines)
}

pub fn lifestyle(a: &Assessment<'_>) -> Section {
    let mut lines: Vec<String> = [
        "**Dietary Modifications:**",
        "• Sodium restriction: <3g daily (2g if advanced HF)",
        "• Fluid restriction: 2L daily if hyponatremic or advanced HF",
        "• Weight management if overweight",
        "",
        "**Activity & Exercise:**",
        "• Regular aerobic exercise as tolerated (cardiac rehabilitation if available)",
        "• Avoid excessive exertion during acute decompensation",
        "",
        "**Additional Considerations:**",
        "• Medication adherence counseling",
        "• Vaccination (influenza, pneumococcal, COVID-19)",
        "• Avoid NSAIDs and certain antiarrhythmic drugs",
    ]
    .map(String::from)
    .to_vec();

    if device_therapy_indicated(a.profile, a.rules) {
        lines.push(format!(
            "• **Device therapy evaluation:** Consider ICD/CRT evaluation if LVEF ≤{}% on optimal medical therapy",
            a.rules.lvef.device_therapy_max
        ));
    }

    Section::new(SectionKind::Lifestyle, lines)
}

/// Present only when LVEF, medications, and HF type are all missing.
pub fn insufficient_data(a: &Assessment<'_>) -> Option<Section> {
    if !a.profile.lacks_core_data() {
        return None;
    }
    Some(Section::new(
        SectionKind::InsufficientDataNote,
        [
            "For more specific recommendations, please provide:",
            "- LVEF (ejection fraction)",
            "- Current medications with doses",
            "- NYHA functional class or symptoms",
            "- Recent laboratory values (K+, creatinine)",
        ]
        .map(String::from)
        .to_vec(),
    ))
}
