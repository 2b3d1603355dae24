use serde::{Deserialize, Serialize};

use crate::models::Pathway;

pub const DOCUMENT_TITLE: &str = "Heart Failure Management Recommendations";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Summary,
    CurrentMedicationAnalysis,
    NewMedicationRecommendations,
    Monitoring,
    Lifestyle,
    InsufficientDataNote,
    Error,
}

impl SectionKind {
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Summary => "📋 Patient Summary",
            Self::CurrentMedicationAnalysis => "💊 Current Medications Analysis",
            Self::NewMedicationRecommendations => "✅ Medication Recommendations",
            Self::Monitoring => "🔍 Monitoring & Follow-up",
            Self::Lifestyle => "🏃 Lifestyle & Additional Considerations",
            Self::InsufficientDataNote => "⚠️ Note",
            Self::Error => "❌ Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub heading: String,
    pub body: String,
}

impl Section {
    pub fn new(kind: SectionKind, lines: Vec<String>) -> Self {
        Self {
            kind,
            heading: kind.heading().to_string(),
            body: lines.join("\n"),
        }
    }
}

/// Ordered recommendation sections for one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationDocument {
    pub title: String,
    pub guideline_version: String,
    /// `None` only for error documents.
    pub pathway: Option<Pathway>,
    pub sections: Vec<Section>,
}

impl RecommendationDocument {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn is_error(&self) -> bool {
        self.section(SectionKind::Error).is_some()
    }

    /// Markdown layout: title, guideline line, then one `###` block per section.
    pub fn render_markdown(&self) -> String {
        let mut out = vec![
            format!("## 🏥 {}", self.title),
            format!("*Based on {} Heart Failure Guidelines*", self.guideline_version),
            String::new(),
        ];
        for section in &self.sections {
            out.push(format!("### {}", section.heading));
            out.push(section.body.clone());
            out.push(String::new());
        }
        out.join("\n")
    }
}
