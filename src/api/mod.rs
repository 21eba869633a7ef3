pub mod client;
pub mod types;
pub mod xml;

pub use client::ApiClient;
pub use types::{
    DescriptionResponse, DescriptionResult, Flow, ImageInfo, PresignedUpload, UploadFields,
};

use crate::error::ClientError;
use crate::picture::SelectedPicture;

/// Remote calls a submission session depends on
#[allow(async_fn_in_trait)]
pub trait PictureApi {
    /// Obtain a fresh single-use upload authorization for `flow`
    async fn fetch_authorization(&self, flow: Flow) -> Result<PresignedUpload, ClientError>;

    /// Upload `picture` to the object store, consuming the authorization
    async fn upload_object(
        &self,
        authorization: PresignedUpload,
        picture: &SelectedPicture,
    ) -> Result<(), ClientError>;

    /// Associate a caption and file name with an uploaded object
    async fn add_image_info(&self, info: &ImageInfo) -> Result<(), ClientError>;

    /// Ask the inference service to describe an uploaded object
    async fn generate_description(&self, object_key: &str)
    -> Result<DescriptionResponse, ClientError>;
}
