use bytes::Bytes;
use std::fmt;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::media;
use crate::validate::{self, ValidationError};

/// Bytes read from the start of a file when its extension says nothing
const SNIFF_LEN: usize = 64;

/// A validated picture held in memory until it is submitted or discarded
///
/// Loading the file acquires its preview buffer; dropping the value releases
/// it, so replacing or resetting the selection never leaks the old one.
pub struct SelectedPicture {
    name: String,
    media_type: String,
    bytes: Bytes,
}

impl SelectedPicture {
    /// Read and validate the file at `path`
    ///
    /// The media type and size are checked before the content is read, so an
    /// oversized file is rejected without being loaded.
    pub async fn load(path: &Path) -> Result<Self, ValidationError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            warn!("Cannot stat {}: {}", path.display(), e);
            ValidationError::Unreadable
        })?;
        if !metadata.is_file() {
            return Err(ValidationError::Unreadable);
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or(ValidationError::Unreadable)?;

        let media_type = match media::media_type_from_extension(path) {
            Some(media_type) => media_type,
            None => {
                let head = read_head(path).await?;
                media::detect_media_type(path, &head)
            }
        };

        validate::validate_candidate(media_type, metadata.len())?;

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            warn!("Cannot read {}: {}", path.display(), e);
            ValidationError::Unreadable
        })?;
        // the file may have grown since it was checked
        validate::validate_candidate(media_type, bytes.len() as u64)?;

        debug!("Acquired preview for {} ({} bytes)", name, bytes.len());

        Ok(Self {
            name,
            media_type: media_type.to_string(),
            bytes: Bytes::from(bytes),
        })
    }

    /// File name sent along with the caption
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the content, cheap to hand to a request body
    pub fn content(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for SelectedPicture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedPicture")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl Drop for SelectedPicture {
    fn drop(&mut self) {
        debug!("Released preview for {}", self.name);
    }
}

async fn read_head(path: &Path) -> Result<Vec<u8>, ValidationError> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| {
        warn!("Cannot open {}: {}", path.display(), e);
        ValidationError::Unreadable
    })?;

    let mut head = vec![0u8; SNIFF_LEN];
    let n = file
        .read(&mut head)
        .await
        .map_err(|_| ValidationError::Unreadable)?;
    head.truncate(n);
    Ok(head)
}
