pub mod api;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod media;
pub mod picture;
pub mod validate;
pub mod workflow;

pub use api::{
    ApiClient, DescriptionResponse, DescriptionResult, Flow, ImageInfo, PictureApi,
    PresignedUpload, UploadFields,
};
pub use config::Config;
pub use error::{ClientError, Step};
pub use picture::SelectedPicture;
pub use validate::{MAX_FILE_SIZE, ValidationError};
pub use workflow::{Outcome, Phase, Session};
