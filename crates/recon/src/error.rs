use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (threshold out of range, empty path, etc.).
    ConfigValidation(String),
    /// A required column is absent from an input table.
    MissingColumn { table: String, column: String },
    /// Reference table repeats a product key under the `reject` policy.
    DuplicateKey { key: String, first_row: usize, row: usize },
    /// Summary serialization error.
    Serialize(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::DuplicateKey { key, first_row, row } => {
                write!(
                    f,
                    "reference key '{key}' on row {row} duplicates row {first_row}"
                )
            }
            Self::Serialize(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
