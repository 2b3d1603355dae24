use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use hf_advisor::config::AdvisorConfig;
use hf_advisor::{Advisor, GuidelineData};

/// Extract a heart failure profile from a clinical note and print
/// guideline-based recommendations.
#[derive(Parser, Debug)]
#[command(name = "hf-advisor", version)]
struct Args {
    /// Emit `{profile, document}` as JSON instead of Markdown
    #[arg(long)]
    json: bool,

    /// Clinical note to read; stdin when omitted
    file: Option<PathBuf>,
}

fn read_note(file: Option<&PathBuf>) -> std::io::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    hf_advisor::init_tracing();

    let config = match AdvisorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration rejected");
            return ExitCode::FAILURE;
        }
    };

    let advisor = match Advisor::from_config(&config, GuidelineData::default()) {
        Ok(advisor) => advisor,
        Err(e) => {
            tracing::error!(error = %e, "Advisor setup failed");
            return ExitCode::FAILURE;
        }
    };

    let text = match read_note(args.file.as_ref()) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read clinical note");
            return ExitCode::FAILURE;
        }
    };

    let analysis = advisor.analyze(&text);

    if args.json {
        match serde_json::to_string_pretty(&analysis) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize analysis");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", analysis.document.render_markdown());
    }

    ExitCode::SUCCESS
}
