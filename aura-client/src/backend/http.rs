use crate::backend::{
    AuthBackend, BackendError, FeedBackend, ImageSlot, ImageUpload, ProfileBackend, Result,
    SignupResponse,
};
use aura_common::model::{
    auth::{AccessToken, LoginCredentials, LoginResponse, SignupRequest},
    profile::{Profile, ProfileUpdate},
    vote::VoteRequest,
};
use reqwest::{
    Client, RequestBuilder, Response,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use tracing::debug;

pub const HOME_FEED_PATH: &str = "/incidents/incident-home";
pub const VOTE_PATH: &str = "/vote/";
pub const LOGIN_PATH: &str = "/auth/login";
pub const SIGNUP_PATH: &str = "/auth/signup";
pub const PROFILE_PATH: &str = "/profile";

#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    #[must_use]
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, %body, "Backend rejected request");
            Err(BackendError::Status { status, body })
        }
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let bytes = Self::send(request).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl FeedBackend for HttpBackend {
    async fn fetch_home_feed(&self, token: &AccessToken) -> Result<serde_json::Value> {
        let url = self.url(HOME_FEED_PATH);
        debug!(%url, "Fetching posts");

        Self::send_json(self.client.get(url).bearer_auth(token.as_str())).await
    }

    async fn submit_vote(&self, token: &AccessToken, vote: &VoteRequest) -> Result<()> {
        let request = self
            .client
            .post(self.url(VOTE_PATH))
            .bearer_auth(token.as_str())
            .json(vote);

        Self::send(request).await.map(drop)
    }
}

impl AuthBackend for HttpBackend {
    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginResponse> {
        Self::send_json(self.client.post(self.url(LOGIN_PATH)).form(credentials)).await
    }

    async fn signup(&self, request: &SignupRequest) -> Result<SignupResponse> {
        let response = Self::send(self.client.post(self.url(SIGNUP_PATH)).json(request)).await?;
        let bytes = response.bytes().await?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(SignupResponse::default());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl ProfileBackend for HttpBackend {
    async fn fetch_profile(&self, token: &AccessToken) -> Result<Profile> {
        Self::send_json(
            self.client
                .get(self.url(PROFILE_PATH))
                .bearer_auth(token.as_str()),
        )
        .await
    }

    async fn update_profile(&self, token: &AccessToken, update: &ProfileUpdate) -> Result<()> {
        let request = self
            .client
            .put(self.url(PROFILE_PATH))
            .bearer_auth(token.as_str())
            .json(update);

        Self::send(request).await.map(drop)
    }

    async fn upload_image(
        &self,
        token: &AccessToken,
        slot: ImageSlot,
        image: ImageUpload,
    ) -> Result<()> {
        let part = Part::bytes(image.bytes).file_name(image.file_name);
        let form = Form::new().part(slot.part_name(), part);

        let request = self
            .client
            .put(self.url(slot.path()))
            .bearer_auth(token.as_str())
            .multipart(form);

        Self::send(request).await.map(drop)
    }
}
