use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("statement format not recognized (supported: {supported})")]
    UnsupportedFormat { supported: String },

    #[error("document has no text")]
    EmptyDocument,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
