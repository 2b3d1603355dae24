pub mod advisor; // Composition root
pub mod config;
pub mod extraction; // Pattern library, field extractors, profile assembly
pub mod models;
pub mod recommend; // Pathway classification, gap analysis, sections
pub mod remote; // Optional remote entity source
pub mod rules; // Versioned guideline rule table

use tracing_subscriber::EnvFilter;

pub use advisor::{Advisor, AdvisorError, Analysis};
pub use extraction::{extract_profile, merge};
pub use models::PatientProfile;
pub use recommend::{generate_recommendation, GuidelineData, RecommendationDocument};
pub use rules::GuidelineRules;

/// Initialize tracing on stderr. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
