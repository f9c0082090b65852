//! Command-line definition

use clap::{Args, Parser, Subcommand};
use mnemos_common::biomarkers::{BiomarkerPanel, FEATURES};
use mnemos_common::GatewayError;
use std::path::PathBuf;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "mnemosctl")]
#[command(about = "Mnemos - chat with the medical report analysis service", long_about = None)]
#[command(version = VERSION)]
pub struct Cli {
    /// Verbose logging (overridden by MNEMOS_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Inference service base URL
    #[arg(long, global = true, value_name = "URL")]
    pub inference_url: Option<String>,

    /// General backend base URL
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Defaults to `chat`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat: attach scans, submit biomarkers, ask questions
    Chat,

    /// Analyze one scan image (png, jpg, jpeg, gif, dcm, dicom)
    AnalyzeImage {
        path: PathBuf,

        /// Print the normalized result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze a biomarker panel
    AnalyzeBio {
        #[command(flatten)]
        bio: BioArgs,

        /// Print the normalized result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the inference service is up
    Health {
        #[arg(long)]
        json: bool,
    },

    /// Sign in to the backend and store the session
    Login {
        #[arg(long)]
        email: String,

        /// Read from MNEMOS_PASSWORD or prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Show the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Biomarker values, either as one CSV list or one flag per feature
#[derive(Args, Debug, Default, Clone)]
pub struct BioArgs {
    /// All seven values in order: gender,age,educ,ses,mmse,etiv,nwbv
    #[arg(long, value_name = "CSV")]
    pub features: Option<String>,

    /// 0 = female, 1 = male
    #[arg(long)]
    pub gender: Option<f64>,

    #[arg(long)]
    pub age: Option<f64>,

    /// Years of education
    #[arg(long)]
    pub educ: Option<f64>,

    /// Socioeconomic status (1-5)
    #[arg(long)]
    pub ses: Option<f64>,

    /// Mini-Mental State Examination score (0-30)
    #[arg(long)]
    pub mmse: Option<f64>,

    /// Estimated total intracranial volume
    #[arg(long)]
    pub etiv: Option<f64>,

    /// Normalized whole-brain volume
    #[arg(long)]
    pub nwbv: Option<f64>,
}

impl BioArgs {
    fn named(&self) -> [Option<f64>; 7] {
        [
            self.gender,
            self.age,
            self.educ,
            self.ses,
            self.mmse,
            self.etiv,
            self.nwbv,
        ]
    }

    pub fn to_panel(&self) -> Result<BiomarkerPanel, GatewayError> {
        let named = self.named();

        if let Some(csv) = &self.features {
            if named.iter().any(Option::is_some) {
                return Err(GatewayError::InvalidInput(
                    "use either --features or the per-feature flags, not both".into(),
                ));
            }
            return BiomarkerPanel::parse_csv(csv);
        }

        let missing: Vec<String> = FEATURES
            .iter()
            .zip(named.iter())
            .filter(|(_, value)| value.is_none())
            .map(|(spec, _)| format!("--{}", spec.key))
            .collect();

        if !missing.is_empty() {
            return Err(GatewayError::InvalidInput(format!(
                "missing biomarker values: {}",
                missing.join(", ")
            )));
        }

        let values: Vec<f64> = named.iter().flatten().copied().collect();
        BiomarkerPanel::from_slice(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["mnemosctl"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mnemosctl",
            "health",
            "--inference-url",
            "http://10.0.0.5:5001",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.inference_url.as_deref(), Some("http://10.0.0.5:5001"));
        assert!(matches!(cli.command, Some(Commands::Health { json: false })));
    }

    #[test]
    fn test_bio_from_csv() {
        let cli = Cli::try_parse_from([
            "mnemosctl",
            "analyze-bio",
            "--features",
            "0,65,12,2,28,1500,0.8",
        ])
        .unwrap();
        let Some(Commands::AnalyzeBio { bio, .. }) = cli.command else {
            panic!("expected analyze-bio");
        };
        assert_eq!(bio.to_panel().unwrap().age, 65.0);
    }

    #[test]
    fn test_bio_from_named_flags() {
        let bio = BioArgs {
            gender: Some(1.0),
            age: Some(72.0),
            educ: Some(16.0),
            ses: Some(3.0),
            mmse: Some(24.0),
            etiv: Some(1600.0),
            nwbv: Some(0.72),
            ..Default::default()
        };
        let panel = bio.to_panel().unwrap();
        assert_eq!(panel.to_vector(), [1.0, 72.0, 16.0, 3.0, 24.0, 1600.0, 0.72]);
    }

    #[test]
    fn test_bio_reports_missing_flags() {
        let bio = BioArgs {
            age: Some(72.0),
            ..Default::default()
        };
        let err = bio.to_panel().unwrap_err().to_string();
        assert!(err.contains("--gender"));
        assert!(err.contains("--nwbv"));
        assert!(!err.contains("--age"));
    }

    #[test]
    fn test_bio_rejects_mixed_input() {
        let bio = BioArgs {
            features: Some("0,65,12,2,28,1500,0.8".into()),
            mmse: Some(20.0),
            ..Default::default()
        };
        assert!(matches!(bio.to_panel(), Err(GatewayError::InvalidInput(_))));
    }
}
