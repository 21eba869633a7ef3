use thiserror::Error;

/// Largest accepted file size, exclusive (15MB)
pub const MAX_FILE_SIZE: u64 = 15_000_000;

/// Media type fragments that are accepted for upload
pub const ACCEPTED_MEDIA_TYPES: &[&str] = &["jpeg", "jpg", "png"];

/// Reasons a candidate file is rejected before submission
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Nothing usable was selected, or the file could not be read
    #[error("There was an error on choosing a file from your computer.")]
    Unreadable,

    #[error("File must be of type jpg, jpeg or png.")]
    UnsupportedType { media_type: String },

    #[error("File size must be maximum 15MB.")]
    TooLarge { size: u64 },
}

/// Check whether a media type names one of the accepted picture formats
pub fn is_accepted_media_type(media_type: &str) -> bool {
    let media_type = media_type.to_ascii_lowercase();
    ACCEPTED_MEDIA_TYPES
        .iter()
        .any(|accepted| media_type.contains(accepted))
}

/// Validate a candidate file by its declared media type and byte size
///
/// The type is checked before the size, so a file failing both reports the
/// type error.
pub fn validate_candidate(media_type: &str, size: u64) -> Result<(), ValidationError> {
    if !is_accepted_media_type(media_type) {
        return Err(ValidationError::UnsupportedType {
            media_type: media_type.to_string(),
        });
    }

    if size >= MAX_FILE_SIZE {
        return Err(ValidationError::TooLarge { size });
    }

    Ok(())
}
