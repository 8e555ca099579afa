use serde::Deserialize;

use crate::error::ReconError;
use crate::similarity::Scorer;

pub const DEFAULT_THRESHOLD: u8 = 70;
pub const DEFAULT_REPORT_SHEET: &str = "Relatório";
pub const DEFAULT_REFERENCE_SHEET: &str = "Planilha1";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub inputs: InputsConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// File locations, relative to the config file's directory.
#[derive(Debug, Clone, Deserialize)]
pub struct InputsConfig {
    pub report: String,
    #[serde(default = "default_report_sheet")]
    pub report_sheet: String,
    pub reference: String,
    #[serde(default = "default_reference_sheet")]
    pub reference_sheet: String,
    pub customers: String,
    /// First sheet when unset.
    #[serde(default)]
    pub customers_sheet: Option<String>,
}

fn default_report_sheet() -> String {
    DEFAULT_REPORT_SHEET.into()
}

fn default_reference_sheet() -> String {
    DEFAULT_REFERENCE_SHEET.into()
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Minimum similarity (0-100) for a fuzzy match to be accepted.
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default)]
    pub scorer: Scorer,
    #[serde(default)]
    pub duplicate_keys: DuplicatePolicy,
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            scorer: Scorer::default(),
            duplicate_keys: DuplicatePolicy::default(),
        }
    }
}

/// What the dictionary builder does when a product key repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Later rows overwrite earlier ones; the key keeps its first position.
    #[default]
    KeepLast,
    KeepFirst,
    Reject,
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeepLast => write!(f, "keep_last"),
            Self::KeepFirst => write!(f, "keep_first"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_output_dir() -> String {
    "Final_Procesado".into()
}

fn default_prefix() -> String {
    "arquivo".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            prefix: default_prefix(),
            format: OutputFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.matching.validate()?;

        let paths = [
            ("inputs.report", &self.inputs.report),
            ("inputs.reference", &self.inputs.reference),
            ("inputs.customers", &self.inputs.customers),
            ("output.dir", &self.output.dir),
        ];
        for (field, value) in paths {
            if value.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "{field} must not be empty"
                )));
            }
        }

        if self.output.prefix.contains(|c: char| c == '/' || c == '\\') {
            return Err(ReconError::ConfigValidation(format!(
                "output.prefix must be a file name, got '{}'",
                self.output.prefix
            )));
        }

        Ok(())
    }
}

impl MatchingConfig {
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.threshold > 100 {
            return Err(ReconError::ConfigValidation(format!(
                "matching.threshold must be between 0 and 100, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
