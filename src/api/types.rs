use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Which screen a session drives; each has its own authorization endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Upload a picture with a caption for the training set
    Label,
    /// Upload a picture and get a generated description back
    Describe,
}

impl Flow {
    pub fn authorization_path(self) -> &'static str {
        match self {
            Self::Label => "/api/get-upload-url",
            Self::Describe => "/api/get-upload-url-no-descr",
        }
    }

    pub fn requires_caption(self) -> bool {
        matches!(self, Self::Label)
    }
}

/// Single-use authorization to POST one object straight to the store
///
/// Deliberately not `Clone`: an upload takes it by value.
#[derive(Debug, Deserialize, PartialEq)]
pub struct PresignedUpload {
    pub fields: UploadFields,
    pub url: String,
}

impl PresignedUpload {
    pub fn object_key(&self) -> &str {
        &self.fields.object_key
    }
}

/// Form fields that must accompany the file in the multipart upload
#[derive(Debug, Deserialize, PartialEq)]
pub struct UploadFields {
    #[serde(rename = "AWSAccessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "key")]
    pub object_key: String,
    pub policy: String,
    pub signature: String,
    #[serde(rename = "x-amz-security-token")]
    pub security_token: String,
}

impl UploadFields {
    /// Multipart field names and values, in the order the store expects them
    pub fn into_form_fields(self) -> [(&'static str, String); 5] {
        [
            ("AWSAccessKeyId", self.access_key_id),
            ("key", self.object_key),
            ("policy", self.policy),
            ("signature", self.signature),
            ("x-amz-security-token", self.security_token),
        ]
    }
}

/// Caption attached to an uploaded object
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageInfo {
    /// Object key of the uploaded picture
    pub id: String,
    pub description: String,
    /// Original file name
    pub name: String,
}

/// Wire shape of the describe endpoint's answer
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DescriptionResponse {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Labels paired index by index with their scores
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionResult {
    labels: Vec<String>,
    scores: Vec<f64>,
}

impl DescriptionResult {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.scores.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl TryFrom<DescriptionResponse> for DescriptionResult {
    type Error = ClientError;

    fn try_from(response: DescriptionResponse) -> Result<Self, Self::Error> {
        if response.labels.len() != response.values.len() {
            return Err(ClientError::MalformedDescription {
                labels: response.labels.len(),
                scores: response.values.len(),
            });
        }

        Ok(Self {
            labels: response.labels,
            scores: response.values,
        })
    }
}
