use thiserror::Error;

#[derive(Error, Debug)]
pub enum AetheriaError {
    /// Required input is missing (no file, no image data, no prompt).
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Read error: {0}")]
    Read(String),

    /// The payload could not be decoded as a raster image of its declared type.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// Remote model call failed or produced no usable image.
    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Metadata store error: {0}")]
    MetadataStore(String),

    #[error("Workspace is busy: {0} in progress")]
    Busy(String),
}

impl AetheriaError {
    /// True for failures of either the object store or the metadata store.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::ObjectStore(_) | Self::MetadataStore(_))
    }
}

pub type Result<T> = std::result::Result<T, AetheriaError>;
