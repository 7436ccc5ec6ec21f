use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("input file not found: {}", path.display())]
    MissingInputFile { path: PathBuf },

    #[error("required column '{column}' is missing (present columns: {})", present.join(", "))]
    MissingRequiredColumn { column: String, present: Vec<String> },

    #[error("unsupported spreadsheet format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("unable to read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("the worksheet has no header row at line {line}")]
    EmptySheet { line: usize },

    #[error("calendar conversion failed: {0}")]
    Calendar(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
