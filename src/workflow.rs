//! Submission session for one screen.
//!
//! A [`Session`] owns everything a screen holds between user actions: the
//! selected picture, the caption, the current upload authorization, inline
//! field errors, and the outcome of the last submission. Remote calls go
//! through a [`PictureApi`] so the state machine runs the same against the
//! real API and an in-memory fake.
//!
//! ```text
//! Idle -> Validating -> Idle (file held | file cleared + error)
//! Idle -> AwaitingAuthorization -> Idle
//! Idle -> Submitting -> AwaitingRemoteProcessing -> Completed | Failed
//! ```

use std::path::Path;
use tracing::{debug, info, warn};

use crate::api::{DescriptionResult, Flow, ImageInfo, PictureApi, PresignedUpload};
use crate::error::ClientError;
use crate::picture::SelectedPicture;
use crate::validate::ValidationError;

/// Inline error shown next to the file input
pub const FILE_REQUIRED: &str = "! Please upload a file";
/// Inline error shown next to the caption input
pub const CAPTION_REQUIRED: &str = "! Please set a description";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    AwaitingAuthorization,
    Submitting,
    AwaitingRemoteProcessing,
    Completed,
    Failed,
}

/// Result of a completed submission
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The picture and its caption were stored
    Labelled { object_key: String, name: String },
    /// The picture was described by the inference service
    Described {
        object_key: String,
        result: DescriptionResult,
    },
}

pub struct Session<A> {
    api: A,
    flow: Flow,
    phase: Phase,
    picture: Option<SelectedPicture>,
    caption: String,
    authorization: Option<PresignedUpload>,
    authorization_error: Option<ClientError>,
    file_error: Option<String>,
    caption_error: Option<String>,
    submit_enabled: bool,
    outcome: Option<Outcome>,
}

impl<A: PictureApi> Session<A> {
    pub fn new(api: A, flow: Flow) -> Self {
        Self {
            api,
            flow,
            phase: Phase::Idle,
            picture: None,
            caption: String::new(),
            authorization: None,
            authorization_error: None,
            file_error: None,
            caption_error: None,
            submit_enabled: true,
            outcome: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn picture(&self) -> Option<&SelectedPicture> {
        self.picture.as_ref()
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn file_error(&self) -> Option<&str> {
        self.file_error.as_deref()
    }

    pub fn caption_error(&self) -> Option<&str> {
        self.caption_error.as_deref()
    }

    pub fn can_submit(&self) -> bool {
        self.submit_enabled
    }

    pub fn has_authorization(&self) -> bool {
        self.authorization.is_some()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Why the authorization for the next submission could not be fetched
    pub fn authorization_error(&self) -> Option<&ClientError> {
        self.authorization_error.as_ref()
    }

    /// Fetch an upload authorization unless one is already held
    ///
    /// Called when the screen is first shown and again after every
    /// submission, since each submission consumes the one it used.
    pub async fn ensure_authorization(&mut self) -> Result<(), ClientError> {
        if self.authorization.is_some() {
            return Ok(());
        }

        let previous = self.phase;
        self.phase = Phase::AwaitingAuthorization;
        let fetched = self.api.fetch_authorization(self.flow).await;
        self.phase = previous;

        match fetched {
            Ok(authorization) => {
                debug!(
                    "Holding authorization for key {}",
                    authorization.object_key()
                );
                self.authorization = Some(authorization);
                self.authorization_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Could not obtain upload authorization: {}", e);
                Err(e)
            }
        }
    }

    /// Select the file at `path`, replacing any previous selection
    ///
    /// On rejection the previous selection is cleared as well and submission
    /// stays disabled until a valid file is chosen.
    pub async fn select_file(&mut self, path: &Path) -> Result<(), ValidationError> {
        self.phase = Phase::Validating;
        self.picture = None;
        self.outcome = None;

        let loaded = SelectedPicture::load(path).await;
        self.phase = Phase::Idle;

        match loaded {
            Ok(picture) => {
                info!("Selected {} ({})", picture.name(), picture.media_type());
                self.picture = Some(picture);
                self.file_error = None;
                self.submit_enabled = true;
                Ok(())
            }
            Err(e) => {
                warn!("Rejected {}: {}", path.display(), e);
                self.file_error = Some(e.to_string());
                self.submit_enabled = false;
                Err(e)
            }
        }
    }

    pub fn set_caption(&mut self, caption: impl Into<String>) {
        self.caption = caption.into();
        self.caption_error = None;
        self.submit_enabled = true;
    }

    /// Discard the selection, caption, errors and result
    ///
    /// Issues no network call; a held authorization is kept.
    pub fn reset(&mut self) {
        self.picture = None;
        self.caption.clear();
        self.file_error = None;
        self.caption_error = None;
        self.outcome = None;
        self.submit_enabled = true;
        self.phase = Phase::Idle;
    }

    /// Reset and fetch a fresh authorization for the next submission
    pub async fn start_over(&mut self) -> Result<(), ClientError> {
        self.reset();
        self.ensure_authorization().await
    }

    /// Upload the selected picture and run the flow's follow-up call
    ///
    /// The held authorization is consumed whatever the outcome, and a fresh
    /// one is requested before returning. A failed request is kept in
    /// [`Session::authorization_error`] and never replaces the submission's
    /// own result.
    pub async fn submit(&mut self) -> Result<Outcome, ClientError> {
        if self.phase == Phase::Completed {
            return Err(ClientError::StartOverRequired);
        }

        let mut missing = false;
        if self.flow.requires_caption() && self.caption.trim().is_empty() {
            self.caption_error = Some(CAPTION_REQUIRED.to_string());
            missing = true;
        }
        if self.picture.is_none() {
            self.file_error = Some(FILE_REQUIRED.to_string());
            missing = true;
        }
        if missing {
            self.submit_enabled = false;
            return Err(ClientError::InvalidForm);
        }

        let Some(authorization) = self.authorization.take() else {
            warn!("Submission attempted without an upload authorization");
            return Err(ClientError::AuthorizationMissing);
        };

        self.submit_enabled = false;
        let object_key = authorization.object_key().to_string();

        let transferred = self.transfer(authorization, &object_key).await;
        self.authorization_error = self.ensure_authorization().await.err();

        match transferred {
            Ok(outcome) => {
                info!("Submission of {} completed", object_key);
                self.phase = Phase::Completed;
                if self.flow == Flow::Label {
                    self.picture = None;
                    self.caption.clear();
                }
                self.outcome = Some(outcome.clone());
                Ok(outcome)
            }
            Err(e) => {
                warn!("Submission of {} failed: {}", object_key, e);
                self.phase = Phase::Failed;
                self.submit_enabled = true;
                Err(e)
            }
        }
    }

    async fn transfer(
        &mut self,
        authorization: PresignedUpload,
        object_key: &str,
    ) -> Result<Outcome, ClientError> {
        let Some(picture) = self.picture.as_ref() else {
            return Err(ClientError::InvalidForm);
        };

        self.phase = Phase::Submitting;
        self.api.upload_object(authorization, picture).await?;

        self.phase = Phase::AwaitingRemoteProcessing;
        match self.flow {
            Flow::Label => {
                let info = ImageInfo {
                    id: object_key.to_string(),
                    description: self.caption.clone(),
                    name: picture.name().to_string(),
                };
                self.api.add_image_info(&info).await?;

                Ok(Outcome::Labelled {
                    object_key: info.id,
                    name: info.name,
                })
            }
            Flow::Describe => {
                let response = self.api.generate_description(object_key).await?;
                let result = DescriptionResult::try_from(response)?;

                Ok(Outcome::Described {
                    object_key: object_key.to_string(),
                    result,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DescriptionResponse, UploadFields};
    use crate::error::Step;
    use crate::picture::tests::{fixture, png_fixture};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Authorization(Flow),
        Upload { key: String, name: String, size: u64 },
        ImageInfo(ImageInfo),
        Description(String),
    }

    /// In-memory API that records every call and hands out numbered keys
    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<Call>>,
        issued: Mutex<usize>,
        deny_authorization: bool,
        /// Authorizations handed out before every further request is denied
        authorization_limit: Option<usize>,
        store_error: Option<(u16, Option<String>)>,
        image_info_status: Option<u16>,
        description: Option<DescriptionResponse>,
    }

    impl FakeApi {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn uploads(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Upload { .. }))
                .count()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl PictureApi for FakeApi {
        async fn fetch_authorization(&self, flow: Flow) -> Result<PresignedUpload, ClientError> {
            self.record(Call::Authorization(flow));
            let mut issued = self.issued.lock().unwrap();
            let exhausted = self.authorization_limit.is_some_and(|limit| *issued >= limit);
            if self.deny_authorization || exhausted {
                return Err(ClientError::Remote {
                    step: Step::Authorization,
                    status: 500,
                    message: None,
                });
            }

            *issued += 1;
            Ok(PresignedUpload {
                fields: UploadFields {
                    access_key_id: "ASIAEXAMPLE".to_string(),
                    object_key: format!("uploads/key-{}", *issued),
                    policy: "policy".to_string(),
                    signature: "signature".to_string(),
                    security_token: "token".to_string(),
                },
                url: "https://bucket.s3.amazonaws.com/".to_string(),
            })
        }

        async fn upload_object(
            &self,
            authorization: PresignedUpload,
            picture: &SelectedPicture,
        ) -> Result<(), ClientError> {
            self.record(Call::Upload {
                key: authorization.object_key().to_string(),
                name: picture.name().to_string(),
                size: picture.size(),
            });
            match &self.store_error {
                Some((status, message)) => Err(ClientError::Remote {
                    step: Step::Upload,
                    status: *status,
                    message: message.clone(),
                }),
                None => Ok(()),
            }
        }

        async fn add_image_info(&self, info: &ImageInfo) -> Result<(), ClientError> {
            self.record(Call::ImageInfo(info.clone()));
            match self.image_info_status {
                Some(status) => Err(ClientError::Remote {
                    step: Step::ImageInfo,
                    status,
                    message: None,
                }),
                None => Ok(()),
            }
        }

        async fn generate_description(
            &self,
            object_key: &str,
        ) -> Result<DescriptionResponse, ClientError> {
            self.record(Call::Description(object_key.to_string()));
            self.description.clone().ok_or(ClientError::Remote {
                step: Step::Description,
                status: 404,
                message: None,
            })
        }
    }

    fn cat_and_hat() -> DescriptionResponse {
        DescriptionResponse {
            labels: vec!["cat".to_string(), "hat".to_string()],
            values: vec![0.9, 0.3],
        }
    }

    #[tokio::test]
    async fn test_label_flow_uploads_then_saves_caption() {
        let file = png_fixture(2_000_000);
        let mut session = Session::new(FakeApi::default(), Flow::Label);

        session.ensure_authorization().await.unwrap();
        session.select_file(file.path()).await.unwrap();
        session.set_caption("a red apple");
        let name = session.picture().unwrap().name().to_string();

        let outcome = session.submit().await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Labelled {
                object_key: "uploads/key-1".to_string(),
                name: name.clone(),
            }
        );
        assert_eq!(
            session.api().calls(),
            vec![
                Call::Authorization(Flow::Label),
                Call::Upload {
                    key: "uploads/key-1".to_string(),
                    name: name.clone(),
                    size: 2_000_000,
                },
                Call::ImageInfo(ImageInfo {
                    id: "uploads/key-1".to_string(),
                    description: "a red apple".to_string(),
                    name,
                }),
                Call::Authorization(Flow::Label),
            ]
        );
        assert_eq!(session.phase(), Phase::Completed);
        assert!(session.picture().is_none());
        assert_eq!(session.caption(), "");
        // the used authorization was replaced for the next picture
        assert!(session.has_authorization());
        assert!(session.authorization_error().is_none());
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_without_network() {
        let file = fixture(".jpg", &[0xFF, 0xD8, 0xFF], 20_000_000);
        let mut session = Session::new(FakeApi::default(), Flow::Label);

        let err = session.select_file(file.path()).await.unwrap_err();

        assert_eq!(err, ValidationError::TooLarge { size: 20_000_000 });
        assert_eq!(session.file_error(), Some("File size must be maximum 15MB."));
        assert!(session.picture().is_none());
        assert!(!session.can_submit());
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.api().calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_clears_previous_selection() {
        let good = png_fixture(1024);
        let bad = fixture(".gif", b"GIF89a", 1024);
        let mut session = Session::new(FakeApi::default(), Flow::Describe);

        session.select_file(good.path()).await.unwrap();
        assert!(session.can_submit());

        session.select_file(bad.path()).await.unwrap_err();
        assert!(session.picture().is_none());
        assert_eq!(
            session.file_error(),
            Some("File must be of type jpg, jpeg or png.")
        );
        assert!(!session.can_submit());

        session.select_file(good.path()).await.unwrap();
        assert!(session.file_error().is_none());
        assert!(session.can_submit());
    }

    #[tokio::test]
    async fn test_select_then_reset_is_idle_and_quiet() {
        let file = png_fixture(4096);
        let mut session = Session::new(FakeApi::default(), Flow::Label);

        session.select_file(file.path()).await.unwrap();
        session.set_caption("a red apple");
        session.reset();

        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.picture().is_none());
        assert_eq!(session.caption(), "");
        assert!(session.outcome().is_none());
        assert!(session.api().calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_upload_without_authorization() {
        let file = png_fixture(4096);
        let api = FakeApi {
            deny_authorization: true,
            ..Default::default()
        };
        let mut session = Session::new(api, Flow::Describe);

        let err = session.ensure_authorization().await.unwrap_err();
        assert_eq!(err.user_message(), crate::error::GENERIC_MESSAGE);
        assert!(!session.has_authorization());

        session.select_file(file.path()).await.unwrap();
        let err = session.submit().await.unwrap_err();

        assert!(matches!(err, ClientError::AuthorizationMissing));
        assert_eq!(session.api().uploads(), 0);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_missing_fields_are_reported_inline() {
        let mut session = Session::new(FakeApi::default(), Flow::Label);
        session.ensure_authorization().await.unwrap();

        let err = session.submit().await.unwrap_err();

        assert!(matches!(err, ClientError::InvalidForm));
        assert_eq!(err.user_message(), "Invalid form. Please fill all data.");
        assert_eq!(session.file_error(), Some(FILE_REQUIRED));
        assert_eq!(session.caption_error(), Some(CAPTION_REQUIRED));
        assert!(!session.can_submit());
        // the authorization survives a rejected form
        assert!(session.has_authorization());

        session.set_caption("   ");
        let file = png_fixture(4096);
        session.select_file(file.path()).await.unwrap();
        assert!(session.can_submit());
        assert!(matches!(
            session.submit().await.unwrap_err(),
            ClientError::InvalidForm
        ));
        assert_eq!(session.api().uploads(), 0);
    }

    #[tokio::test]
    async fn test_describe_flow_pairs_labels_with_scores() {
        let file = png_fixture(4096);
        let api = FakeApi {
            description: Some(cat_and_hat()),
            ..Default::default()
        };
        let mut session = Session::new(api, Flow::Describe);

        session.ensure_authorization().await.unwrap();
        session.select_file(file.path()).await.unwrap();
        let outcome = session.submit().await.unwrap();

        let Outcome::Described { object_key, result } = outcome else {
            panic!("expected a description");
        };
        assert_eq!(object_key, "uploads/key-1");
        assert_eq!(
            result.pairs().collect::<Vec<_>>(),
            vec![("cat", 0.9), ("hat", 0.3)]
        );
        assert_eq!(
            session.api().calls()[2],
            Call::Description("uploads/key-1".to_string())
        );
        // the picture stays on screen next to its description
        assert!(session.picture().is_some());
        assert_eq!(session.phase(), Phase::Completed);
        assert!(matches!(
            session.submit().await.unwrap_err(),
            ClientError::StartOverRequired
        ));
    }

    #[tokio::test]
    async fn test_store_failure_replaces_authorization() {
        let file = png_fixture(4096);
        let api = FakeApi {
            store_error: Some((403, Some("Policy expired.".to_string()))),
            ..Default::default()
        };
        let mut session = Session::new(api, Flow::Label);

        session.ensure_authorization().await.unwrap();
        session.select_file(file.path()).await.unwrap();
        session.set_caption("a red apple");
        let err = session.submit().await.unwrap_err();

        assert_eq!(err.user_message(), "Policy expired.");
        assert_eq!(session.phase(), Phase::Failed);
        assert!(session.can_submit());
        assert!(session.has_authorization());
        // the form is kept for a retry
        assert!(session.picture().is_some());
        assert_eq!(session.caption(), "a red apple");

        // the retry goes out under the refetched authorization
        let err = session.submit().await.unwrap_err();
        assert_eq!(err.user_message(), "Policy expired.");
        let keys: Vec<_> = session
            .api()
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upload { key, .. } => Some(key),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec!["uploads/key-1", "uploads/key-2"]);
    }

    #[tokio::test]
    async fn test_metadata_failure_is_not_rolled_back() {
        let file = png_fixture(4096);
        let api = FakeApi {
            image_info_status: Some(500),
            ..Default::default()
        };
        let mut session = Session::new(api, Flow::Label);

        session.ensure_authorization().await.unwrap();
        session.select_file(file.path()).await.unwrap();
        session.set_caption("a red apple");
        let err = session.submit().await.unwrap_err();

        assert_eq!(
            err.user_message(),
            "There was an error on saving the image description."
        );
        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(session.api().uploads(), 1);
    }

    #[tokio::test]
    async fn test_malformed_description_fails() {
        let file = png_fixture(4096);
        let api = FakeApi {
            description: Some(DescriptionResponse {
                labels: vec!["cat".to_string()],
                values: vec![],
            }),
            ..Default::default()
        };
        let mut session = Session::new(api, Flow::Describe);

        session.ensure_authorization().await.unwrap();
        session.select_file(file.path()).await.unwrap();
        let err = session.submit().await.unwrap_err();

        assert!(matches!(err, ClientError::MalformedDescription { .. }));
        assert_eq!(session.phase(), Phase::Failed);
        assert!(session.outcome().is_none());
    }

    #[tokio::test]
    async fn test_refetch_failure_keeps_submission_result() {
        let file = png_fixture(4096);
        let api = FakeApi {
            authorization_limit: Some(1),
            ..Default::default()
        };
        let mut session = Session::new(api, Flow::Label);

        session.ensure_authorization().await.unwrap();
        session.select_file(file.path()).await.unwrap();
        session.set_caption("a red apple");
        let outcome = session.submit().await.unwrap();

        assert!(matches!(outcome, Outcome::Labelled { .. }));
        assert_eq!(session.phase(), Phase::Completed);
        assert!(!session.has_authorization());
        let err = session.authorization_error().unwrap();
        assert_eq!(err.user_message(), crate::error::GENERIC_MESSAGE);

        // a later successful fetch clears the recorded failure
        *session.api().issued.lock().unwrap() = 0;
        session.start_over().await.unwrap();
        assert!(session.has_authorization());
        assert!(session.authorization_error().is_none());
    }

    #[tokio::test]
    async fn test_start_over_fetches_fresh_authorization() {
        let file = png_fixture(4096);
        let api = FakeApi {
            description: Some(cat_and_hat()),
            ..Default::default()
        };
        let mut session = Session::new(api, Flow::Describe);

        session.ensure_authorization().await.unwrap();
        // held authorizations are not refetched
        session.ensure_authorization().await.unwrap();
        session.select_file(file.path()).await.unwrap();
        session.submit().await.unwrap();
        assert!(session.has_authorization());

        // the authorization fetched after the submission is reused
        session.start_over().await.unwrap();

        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.picture().is_none());
        assert!(session.outcome().is_none());
        assert!(session.has_authorization());
        let authorizations = session
            .api()
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Authorization(Flow::Describe)))
            .count();
        assert_eq!(authorizations, 2);

        session.select_file(file.path()).await.unwrap();
        let Outcome::Described { object_key, .. } = session.submit().await.unwrap() else {
            panic!("expected a description");
        };
        assert_eq!(object_key, "uploads/key-2");
    }
}
