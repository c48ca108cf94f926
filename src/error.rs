use thiserror::Error;

/// Failures while turning one detail page into a record
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Embedded data script not found on {url}")]
    MissingNextData { url: String },

    #[error("Embedded data is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Page error: {0:#}")]
    Page(#[from] anyhow::Error),
}

/// Failures while writing or reading the columnar output
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Column {column} holds unsupported type {data_type}")]
    UnsupportedColumn { column: String, data_type: String },
}
