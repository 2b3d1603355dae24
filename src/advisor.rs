//! Process-level composition root.
//!
//! Everything the pipeline depends on (rule table, guideline data, optional
//! remote source) is constructed once and injected here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AdvisorConfig;
use crate::extraction::Extractor;
use crate::models::PatientProfile;
use crate::recommend::{GuidelineData, RecommendationDocument, RecommendationEngine};
use crate::remote::{extract_with_fallback, EntitySource, HttpEntitySource, RemoteError};
use crate::rules::{GuidelineRules, RulesError};

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// One note's extraction and recommendation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub profile: PatientProfile,
    pub document: RecommendationDocument,
}

pub struct Advisor {
    extractor: Extractor,
    guidelines: GuidelineData,
    source: Option<Box<dyn EntitySource>>,
}

impl Advisor {
    pub fn new(rules: GuidelineRules, guidelines: GuidelineData) -> Result<Self, RulesError> {
        rules.validate()?;
        Ok(Self {
            extractor: Extractor::new(&rules)?,
            guidelines,
            source: None,
        })
    }

    pub fn with_entity_source(mut self, source: Box<dyn EntitySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Build from configuration. An unreadable or invalid rule table falls
    /// back to the built-in one; a remote client that cannot be constructed
    /// is an error.
    pub fn from_config(config: &AdvisorConfig, guidelines: GuidelineData) -> Result<Self, AdvisorError> {
        let rules = match config.rules_path {
            Some(ref path) => GuidelineRules::load(path).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to built-in guideline rules");
                GuidelineRules::builtin().clone()
            }),
            None => GuidelineRules::builtin().clone(),
        };
        let mut advisor = Self::new(rules, guidelines)?;

        if let Some(ref url) = config.entity_url {
            let source = HttpEntitySource::new(url, config.entity_timeout_secs, advisor.rules())?;
            if !source.is_available() {
                tracing::warn!(url = %url, "Entity service not responding, local extraction will be used on failure");
            }
            advisor = advisor.with_entity_source(Box::new(source));
        }

        tracing::info!(
            rules = %advisor.rules().version,
            remote = advisor.source.is_some(),
            "Advisor ready"
        );
        Ok(advisor)
    }

    pub fn rules(&self) -> &GuidelineRules {
        self.extractor.rules()
    }

    pub fn extract(&self, text: &str) -> PatientProfile {
        extract_with_fallback(&self.extractor, text, self.source.as_deref())
    }

    pub fn recommend(&self, profile: &PatientProfile) -> RecommendationDocument {
        RecommendationEngine::new(self.rules(), &self.guidelines).generate(profile)
    }

    /// Full pipeline: extract, then recommend.
    pub fn analyze(&self, text: &str) -> Analysis {
        let profile = self.extract(text);
        let document = self.recommend(&profile);
        Analysis { profile, document }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::models::{ExtractionMethod, HfType};
    use crate::recommend::SectionKind;
    use crate::remote::MockEntitySource;

    fn advisor() -> Advisor {
        Advisor::new(GuidelineRules::default(), GuidelineData::default()).unwrap()
    }

    #[test]
    fn analyze_runs_full_pipeline() {
        let analysis = advisor().analyze("LVEF 30%, on carvedilol 6.25 mg BID");
        assert_eq!(analysis.profile.hf_type, Some(HfType::Reduced));
        assert!(!analysis.document.is_error());
        assert!(analysis
            .document
            .section(SectionKind::CurrentMedicationAnalysis)
            .unwrap()
            .body
            .contains("carvedilol 6.25 bid"));
    }

    #[test]
    fn rejects_invalid_rules() {
        let mut rules = GuidelineRules::default();
        rules.version = " ".into();
        assert!(Advisor::new(rules, GuidelineData::default()).is_err());
    }

    #[test]
    fn injected_source_is_used() {
        let remote = PatientProfile {
            lvef: Some(20),
            ..Default::default()
        };
        let advisor = advisor().with_entity_source(Box::new(MockEntitySource::new(remote)));
        let profile = advisor.extract("LVEF 35%");
        assert_eq!(profile.lvef, Some(20));
        assert_eq!(profile.extraction_method, ExtractionMethod::Remote);
    }

    #[test]
    fn config_with_bad_rules_falls_back_to_builtin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[]").unwrap();
        let config = AdvisorConfig {
            rules_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let advisor = Advisor::from_config(&config, GuidelineData::default()).unwrap();
        assert_eq!(advisor.rules().version, GuidelineRules::builtin().version);
    }

    #[test]
    fn config_loads_custom_rules() {
        let mut rules = GuidelineRules::default();
        rules.version = "local override".into();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&rules).unwrap().as_bytes())
            .unwrap();
        let config = AdvisorConfig {
            rules_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let advisor = Advisor::from_config(&config, GuidelineData::default()).unwrap();
        assert_eq!(advisor.analyze("").document.guideline_version, "local override");
    }
}
