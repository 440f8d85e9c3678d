//! The REST backend as this client consumes it.
//!
//! Each concern gets its own trait so the controllers can be driven by
//! in-memory fakes; [`HttpBackend`] implements all of them over HTTP.

use aura_common::model::{
    auth::{AccessToken, LoginCredentials, LoginResponse, SignupRequest},
    profile::{Profile, ProfileUpdate},
    vote::VoteRequest,
};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

mod http;

pub use http::HttpBackend;

pub type Result<T, E = BackendError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Backend replied with status {status}")]
    Status { status: StatusCode, body: String },
    #[error("Backend response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            BackendError::Transport(err) => err.status(),
            BackendError::Decode(_) => None,
        }
    }

    /// The `message` field of a JSON error body, if the backend sent one.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: String,
        }

        match self {
            BackendError::Status { body, .. } => serde_json::from_str::<ErrorBody>(body)
                .ok()
                .map(|error| error.message),
            _ => None,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct SignupResponse {
    #[serde(default, alias = "token")]
    pub access_token: Option<AccessToken>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ImageSlot {
    Avatar,
    Cover,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl ImageSlot {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "/profile/avatar",
            ImageSlot::Cover => "/profile/cover",
        }
    }

    #[must_use]
    pub fn part_name(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "profile_image",
            ImageSlot::Cover => "cover_image",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "profile image",
            ImageSlot::Cover => "cover image",
        }
    }
}

pub trait FeedBackend: Send + Sync {
    /// Raw home feed body; its shape is resolved by the feed controller.
    fn fetch_home_feed(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<serde_json::Value>> + Send;

    fn submit_vote(
        &self,
        token: &AccessToken,
        vote: &VoteRequest,
    ) -> impl Future<Output = Result<()>> + Send;
}

pub trait AuthBackend: Send + Sync {
    fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> impl Future<Output = Result<LoginResponse>> + Send;

    fn signup(&self, request: &SignupRequest)
    -> impl Future<Output = Result<SignupResponse>> + Send;
}

pub trait ProfileBackend: Send + Sync {
    fn fetch_profile(&self, token: &AccessToken) -> impl Future<Output = Result<Profile>> + Send;

    fn update_profile(
        &self,
        token: &AccessToken,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<()>> + Send;

    fn upload_image(
        &self,
        token: &AccessToken,
        slot: ImageSlot,
        image: ImageUpload,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<B: FeedBackend> FeedBackend for std::sync::Arc<B> {
    fn fetch_home_feed(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<serde_json::Value>> + Send {
        (**self).fetch_home_feed(token)
    }

    fn submit_vote(
        &self,
        token: &AccessToken,
        vote: &VoteRequest,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).submit_vote(token, vote)
    }
}
