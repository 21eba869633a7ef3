use anyhow::Result;
use reqwest::{Response, multipart};
use tracing::{debug, info, warn};

use super::types::{DescriptionResponse, Flow, ImageInfo, PresignedUpload};
use super::{PictureApi, xml};
use crate::config::Config;
use crate::error::{ClientError, Step};
use crate::picture::SelectedPicture;

const ADD_IMAGE_INFO_PATH: &str = "/api/add-image-info";
const GENERATE_DESCRIPTION_PATH: &str = "/api/generate-description";

/// HTTP client for the description API and the object store behind it
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    config: Config,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder().use_rustls_tls();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Turn a non-success response into an error, keeping the store's message
async fn remote_failure(step: Step, response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = xml::error_message(&body);

    warn!(
        "{} failed with status {}: {}",
        step,
        status,
        message.as_deref().unwrap_or("no message")
    );

    ClientError::Remote {
        step,
        status: status.as_u16(),
        message,
    }
}

impl PictureApi for ApiClient {
    async fn fetch_authorization(&self, flow: Flow) -> Result<PresignedUpload, ClientError> {
        let url = self.config.endpoint(flow.authorization_path());
        debug!("Requesting upload authorization from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ClientError::transport(Step::Authorization))?;

        if !response.status().is_success() {
            return Err(remote_failure(Step::Authorization, response).await);
        }

        let upload: PresignedUpload = response
            .json()
            .await
            .map_err(ClientError::transport(Step::Authorization))?;

        debug!("Received authorization for key {}", upload.object_key());
        Ok(upload)
    }

    async fn upload_object(
        &self,
        authorization: PresignedUpload,
        picture: &SelectedPicture,
    ) -> Result<(), ClientError> {
        let PresignedUpload { fields, url } = authorization;

        let body = reqwest::Body::from(picture.content());
        let part = multipart::Part::stream_with_length(body, picture.size())
            .file_name(picture.name().to_string())
            .mime_str(picture.media_type())
            .map_err(ClientError::transport(Step::Upload))?;

        // the store ignores any field that follows the file
        let form = fields
            .into_form_fields()
            .into_iter()
            .fold(multipart::Form::new(), |form, (name, value)| {
                form.text(name, value)
            })
            .part("file", part);

        info!("Uploading {} ({} bytes)", picture.name(), picture.size());

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(ClientError::transport(Step::Upload))?;

        if !response.status().is_success() {
            return Err(remote_failure(Step::Upload, response).await);
        }

        Ok(())
    }

    async fn add_image_info(&self, info: &ImageInfo) -> Result<(), ClientError> {
        let url = self.config.endpoint(ADD_IMAGE_INFO_PATH);
        debug!("Saving description for {}", info.id);

        let response = self
            .client
            .post(&url)
            .json(info)
            .send()
            .await
            .map_err(ClientError::transport(Step::ImageInfo))?;

        if !response.status().is_success() {
            return Err(remote_failure(Step::ImageInfo, response).await);
        }

        Ok(())
    }

    async fn generate_description(
        &self,
        object_key: &str,
    ) -> Result<DescriptionResponse, ClientError> {
        let url = self.config.endpoint(GENERATE_DESCRIPTION_PATH);
        debug!("Requesting description for {}", object_key);

        let response = self
            .client
            .get(&url)
            .query(&[("id", object_key)])
            .send()
            .await
            .map_err(ClientError::transport(Step::Description))?;

        if !response.status().is_success() {
            return Err(remote_failure(Step::Description, response).await);
        }

        response
            .json()
            .await
            .map_err(ClientError::transport(Step::Description))
    }
}
