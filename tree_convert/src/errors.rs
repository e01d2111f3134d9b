use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Expected a list of records, got {0}")]
    NotAList(&'static str),

    #[error("Item {index} is not a record")]
    NotARecord { index: usize },
}
