use thiserror::Error;

/// Main error type for beegraph
#[derive(Error, Debug)]
pub enum BeegraphError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A source could not be extracted (malformed input)
    #[error("Parse error: {0}")]
    Parse(String),

    /// The curated override file is not valid structured data
    #[error("Override parse error in {path}: {message}")]
    OverrideParse { path: String, message: String },

    /// No configured source produced any data
    #[error("No sources were parsed successfully")]
    NoSources,

    /// Writing an output file failed
    #[error("Failed to write {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenient Result type using BeegraphError
pub type Result<T> = std::result::Result<T, BeegraphError>;
