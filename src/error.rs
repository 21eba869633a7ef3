use std::fmt;
use thiserror::Error;

use crate::validate::ValidationError;

/// Message shown when a remote call fails without a more specific reason
pub const GENERIC_MESSAGE: &str = "There was an error. Please try again.";

/// Remote step of a submission, used to pick the message shown on failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Fetching a presigned upload authorization
    Authorization,
    /// Multipart POST to the object store
    Upload,
    /// Attaching the caption to the uploaded object
    ImageInfo,
    /// Asking the inference service for a description
    Description,
}

impl Step {
    fn fallback_message(self) -> &'static str {
        match self {
            Self::ImageInfo => "There was an error on saving the image description.",
            Self::Authorization | Self::Upload | Self::Description => GENERIC_MESSAGE,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authorization => "get-upload-url",
            Self::Upload => "object store upload",
            Self::ImageInfo => "add-image-info",
            Self::Description => "generate-description",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while preparing or submitting a picture
#[derive(Error, Debug)]
pub enum ClientError {
    /// The selected file was rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Required form fields are missing
    #[error("Invalid form: file or caption missing")]
    InvalidForm,

    /// No presigned upload is held for this submission
    #[error("No upload authorization available")]
    AuthorizationMissing,

    /// The session already completed; it must be started over first
    #[error("Submission already completed")]
    StartOverRequired,

    /// A remote endpoint answered with a non-success status
    #[error("{step} failed with status {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Remote {
        step: Step,
        status: u16,
        message: Option<String>,
    },

    /// The request never produced a usable response
    #[error("{step} request failed: {source}")]
    Transport {
        step: Step,
        #[source]
        source: reqwest::Error,
    },

    /// The describe endpoint returned unpaired labels and scores
    #[error("Malformed description: {labels} labels but {scores} scores")]
    MalformedDescription { labels: usize, scores: usize },
}

impl ClientError {
    /// Wrap a reqwest error raised during `step`
    pub fn transport(step: Step) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Transport { step, source }
    }

    /// Get the message to show the user for this error
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::InvalidForm => "Invalid form. Please fill all data.".to_string(),
            Self::AuthorizationMissing => "No presignedUrl. Can not upload image on s3.".to_string(),
            Self::StartOverRequired => "Start over to submit another picture.".to_string(),
            Self::Remote {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Remote { step, .. } | Self::Transport { step, .. } => {
                step.fallback_message().to_string()
            }
            Self::MalformedDescription { .. } => GENERIC_MESSAGE.to_string(),
        }
    }

    /// Whether the error concerns the form rather than a remote call
    pub fn is_form_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidForm)
    }
}
