//! A stand-in backend served by axum on a random local port.

use aura_common::model::{profile::ProfileUpdate, vote::VoteRequest};
use axum::{
    Form, Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{Value, json};
use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

pub const VALID_TOKEN: &str = "token-rae";
pub const VALID_EMAIL: &str = "rae@example.org";
pub const VALID_PASSWORD: &str = "hunter22";
pub const FAULTY_EMAIL: &str = "boom@example.org";
pub const SIGNUP_TOKEN: &str = "token-new";

type BearerHeader = Option<TypedHeader<Authorization<Bearer>>>;

#[derive(Debug, Default)]
pub struct FakeState {
    fail_votes: AtomicBool,
    votes: Mutex<Vec<VoteRequest>>,
    profile_fetches: AtomicUsize,
    profile_updates: Mutex<Vec<ProfileUpdate>>,
    uploads: Mutex<Vec<(String, String, usize)>>,
}

impl FakeState {
    pub fn fail_votes(&self, fail: bool) {
        self.fail_votes.store(fail, Ordering::SeqCst);
    }

    pub fn votes(&self) -> Vec<VoteRequest> {
        self.votes.lock().unwrap().clone()
    }

    pub fn profile_fetches(&self) -> usize {
        self.profile_fetches.load(Ordering::SeqCst)
    }

    pub fn profile_updates(&self) -> Vec<ProfileUpdate> {
        self.profile_updates.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(String, String, usize)> {
        self.uploads.lock().unwrap().clone()
    }
}

pub struct FakeServer {
    pub address: SocketAddr,
    pub state: Arc<FakeState>,
}

impl FakeServer {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());

        let app = Router::new()
            .route("/incidents/incident-home", get(home_feed))
            .route("/vote/", post(vote))
            .route("/auth/login", post(login))
            .route("/auth/signup", post(signup))
            .route("/profile", get(profile).put(update_profile))
            .route("/profile/avatar", put(upload_avatar))
            .route("/profile/cover", put(upload_cover))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Self { address, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }
}

pub fn sample_posts() -> Value {
    json!([
        {
            "incident_id": 1,
            "content": "Power outage on Elm street",
            "created_at": "2025-10-05T11:00:00Z",
            "name": "Rae",
            "username": "rae",
            "total_upvotes": 2,
            "total_downvotes": 0,
            "is_upvoted": false,
            "is_downvoted": false
        },
        {
            "incident_id": 2,
            "content": "Flooded underpass near the station",
            "created_at": "2025-10-05T11:30:00Z",
            "name": "Ode",
            "total_upvotes": 0,
            "total_downvotes": 1,
            "is_upvoted": false,
            "is_downvoted": true
        }
    ])
}

fn authorized(header: &BearerHeader) -> bool {
    header
        .as_ref()
        .is_some_and(|TypedHeader(auth)| auth.token() == VALID_TOKEN)
}

async fn home_feed(header: BearerHeader) -> Response {
    if !authorized(&header) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    Json(json!({ "posts": sample_posts() })).into_response()
}

async fn vote(
    State(state): State<Arc<FakeState>>,
    header: BearerHeader,
    Json(vote): Json<VoteRequest>,
) -> StatusCode {
    if !authorized(&header) {
        return StatusCode::UNAUTHORIZED;
    }
    if state.fail_votes.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    state.votes.lock().unwrap().push(vote);
    StatusCode::OK
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(Form(form): Form<LoginForm>) -> Response {
    if form.username == FAULTY_EMAIL {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if form.username == VALID_EMAIL && form.password == VALID_PASSWORD {
        return Json(json!({ "access_token": VALID_TOKEN, "token_type": "bearer" })).into_response();
    }
    StatusCode::UNAUTHORIZED.into_response()
}

#[derive(Deserialize)]
struct SignupBody {
    email: String,
}

async fn signup(Json(body): Json<SignupBody>) -> Response {
    if body.email == VALID_EMAIL {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Email already exists" })),
        )
            .into_response();
    }
    if body.email.ends_with("@blocked.test") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "errors": { "email": "Email domain is not allowed" } })),
        )
            .into_response();
    }
    if body.email == FAULTY_EMAIL {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    (StatusCode::CREATED, Json(json!({ "token": SIGNUP_TOKEN }))).into_response()
}

async fn profile(State(state): State<Arc<FakeState>>, header: BearerHeader) -> Response {
    if !authorized(&header) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    state.profile_fetches.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "user": {
            "id": 4,
            "name": "Rae Lindqvist",
            "username": "rae",
            "bio": "Night shift dispatcher",
            "created_at": "2024-11-02T08:00:00Z",
            "incidents": 1
        },
        "incidents": [sample_posts()[0].clone()]
    }))
    .into_response()
}

async fn update_profile(
    State(state): State<Arc<FakeState>>,
    header: BearerHeader,
    Json(update): Json<ProfileUpdate>,
) -> Response {
    if !authorized(&header) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if update.name.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Name cannot be empty" })),
        )
            .into_response();
    }

    state.profile_updates.lock().unwrap().push(update);
    Json(json!({ "status": "ok" })).into_response()
}

async fn record_upload(state: &FakeState, slot: &str, mut multipart: Multipart) -> StatusCode {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_owned();
        let len = field.bytes().await.unwrap().len();
        state
            .uploads
            .lock()
            .unwrap()
            .push((slot.to_owned(), name, len));
    }
    StatusCode::OK
}

async fn upload_avatar(
    State(state): State<Arc<FakeState>>,
    header: BearerHeader,
    multipart: Multipart,
) -> StatusCode {
    if !authorized(&header) {
        return StatusCode::UNAUTHORIZED;
    }
    record_upload(&state, "avatar", multipart).await
}

async fn upload_cover(
    State(state): State<Arc<FakeState>>,
    header: BearerHeader,
    multipart: Multipart,
) -> StatusCode {
    if !authorized(&header) {
        return StatusCode::UNAUTHORIZED;
    }
    record_upload(&state, "cover", multipart).await
}
