//! Optional remote entity source.
//!
//! A remote medical-NER service can supply the same canonical fields as local
//! extraction. It is strictly an enhancement: the local profile is computed
//! first, and any remote failure degrades to that profile.

pub mod entities;
pub mod http;

use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

pub use entities::{profile_from_entities, DetectedEntity, EntitiesResponse, EntityAttribute};
pub use http::{HttpEntitySource, MockEntitySource};

use crate::extraction::{infer_hf_type, merge, Extractor};
use crate::models::{ExtractionMethod, PatientProfile};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("Entity service not reachable at {0}")]
    Connection(String),

    #[error("Entity service request timed out after {0}s")]
    Timeout(u64),

    #[error("Entity service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse entity service response: {0}")]
    ResponseParsing(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Alternate extractor producing the canonical profile shape.
pub trait EntitySource: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, text: &str) -> Result<PatientProfile, RemoteError>;
}

/// Local extraction, optionally enriched by a remote source.
///
/// The local profile is always computed first. A remote success is merged
/// over it and marked [`ExtractionMethod::Remote`]; a remote error or panic
/// returns the local profile marked [`ExtractionMethod::RegexFallback`].
pub fn extract_with_fallback(
    extractor: &Extractor,
    text: &str,
    source: Option<&dyn EntitySource>,
) -> PatientProfile {
    let Some(source) = source else {
        return extractor.extract(text);
    };
    // HF type is inferred once, after every source has contributed.
    let local = extractor.extract_fields(text);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| source.extract(text)));
    match outcome {
        Ok(Ok(remote)) => {
            let mut merged = merge(local, remote);
            infer_hf_type(&mut merged, extractor.rules());
            merged.extraction_method = ExtractionMethod::Remote;
            tracing::info!(
                source = source.name(),
                medications = merged.medications.len(),
                "Merged remote entities over local extraction"
            );
            merged
        }
        Ok(Err(e)) => {
            tracing::warn!(source = source.name(), error = %e, "Remote extraction failed, using local profile");
            fallback(extractor, local, format!("remote extraction failed: {e}"))
        }
        Err(_) => {
            tracing::warn!(source = source.name(), "Remote extraction panicked, using local profile");
            fallback(extractor, local, "remote extraction aborted".to_string())
        }
    }
}

fn fallback(extractor: &Extractor, mut local: PatientProfile, note: String) -> PatientProfile {
    infer_hf_type(&mut local, extractor.rules());
    local.extraction_method = ExtractionMethod::RegexFallback;
    local.notes.push(note);
    local
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HfType, Medication};
    use crate::rules::GuidelineRules;

    struct PanickingSource;

    impl EntitySource for PanickingSource {
        fn name(&self) -> &str {
            "panicking"
        }

        fn extract(&self, _text: &str) -> Result<PatientProfile, RemoteError> {
            panic!("service client bug")
        }
    }

    fn extractor() -> Extractor {
        Extractor::new(GuidelineRules::builtin()).unwrap()
    }

    const NOTE: &str = "LVEF 30%. On lisinopril 10 mg daily.";

    #[test]
    fn no_source_is_plain_local_extraction() {
        let profile = extract_with_fallback(&extractor(), NOTE, None);
        assert_eq!(profile.extraction_method, ExtractionMethod::Regex);
        assert_eq!(profile.lvef, Some(30));
    }

    #[test]
    fn remote_success_is_merged() {
        let remote = PatientProfile {
            medications: vec![Medication {
                name: "entresto".into(),
                dose: Some(49.0),
                frequency: Some("bid".into()),
                is_hf_medication: true,
                confidence: 0.98,
            }],
            extraction_method: ExtractionMethod::Remote,
            ..Default::default()
        };
        let source = MockEntitySource::new(remote);
        let profile = extract_with_fallback(&extractor(), NOTE, Some(&source));

        assert_eq!(profile.extraction_method, ExtractionMethod::Remote);
        assert_eq!(profile.medication_names().collect::<Vec<_>>(), vec!["entresto"]);
        // Scalar absent remotely, kept from local.
        assert_eq!(profile.lvef, Some(30));
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn remote_lvef_drives_inference_after_merge() {
        let remote = PatientProfile {
            lvef: Some(25),
            ..Default::default()
        };
        let source = MockEntitySource::new(remote);
        let profile = extract_with_fallback(&extractor(), "Echo: LVEF 55%", Some(&source));

        assert_eq!(profile.lvef, Some(25));
        assert_eq!(profile.hf_type, Some(HfType::Reduced));
        assert_eq!(profile.notes, vec!["HF type HFrEF inferred from LVEF 25%".to_string()]);
    }

    #[test]
    fn explicit_local_type_survives_merge() {
        let remote = PatientProfile {
            lvef: Some(25),
            ..Default::default()
        };
        let source = MockEntitySource::new(remote);
        let profile = extract_with_fallback(&extractor(), "Known HFpEF. LVEF 55%", Some(&source));

        assert_eq!(profile.hf_type, Some(HfType::Preserved));
        assert!(profile.notes.is_empty());
    }

    #[test]
    fn fallback_profile_is_still_inferred() {
        let source = MockEntitySource::failing(RemoteError::Timeout(10));
        let profile = extract_with_fallback(&extractor(), "Echo: LVEF 55%", Some(&source));

        assert_eq!(profile.hf_type, Some(HfType::Preserved));
        assert_eq!(profile.notes.len(), 2);
    }

    #[test]
    fn remote_error_falls_back_to_local() {
        let source = MockEntitySource::failing(RemoteError::Connection("http://x".into()));
        let profile = extract_with_fallback(&extractor(), NOTE, Some(&source));

        assert_eq!(profile.extraction_method, ExtractionMethod::RegexFallback);
        assert_eq!(profile.medication_names().collect::<Vec<_>>(), vec!["lisinopril"]);
        assert!(profile.notes.iter().any(|n| n.contains("not reachable")));
    }

    #[test]
    fn remote_panic_falls_back_to_local() {
        let profile = extract_with_fallback(&extractor(), NOTE, Some(&PanickingSource));
        assert_eq!(profile.extraction_method, ExtractionMethod::RegexFallback);
        assert_eq!(profile.lvef, Some(30));
    }
}
