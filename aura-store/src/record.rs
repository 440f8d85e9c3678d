use aura_common::{
    model::{Id, post::{Post, PostMarker}, profile::Profile},
    util::PositiveDuration,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const POSTS_KEY: &str = "posts";
pub const POSTS_TIMESTAMP_KEY: &str = "posts_timestamp";
pub const PROFILE_KEY: &str = "profile";
pub const PROFILE_TIMESTAMP_KEY: &str = "profile_timestamp";

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Store had invalid entry under {key}: {value}")]
pub struct StoreDataError {
    pub key: &'static str,
    pub value: String,
}

/// The cached feed: posts in display order plus when they were fetched.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Snapshot {
    pub posts: Vec<Post>,
    pub captured_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CachedProfile {
    pub profile: Profile,
    pub captured_at: UtcDateTime,
}

impl Snapshot {
    #[must_use]
    pub fn new(posts: Vec<Post>, captured_at: UtcDateTime) -> Self {
        Self { posts, captured_at }
    }

    #[must_use]
    pub fn age(&self, now: UtcDateTime) -> Duration {
        now - self.captured_at
    }

    #[must_use]
    pub fn is_fresh(&self, now: UtcDateTime, window: PositiveDuration) -> bool {
        self.age(now) < window.get()
    }

    #[must_use]
    pub fn position(&self, id: Id<PostMarker>) -> Option<usize> {
        self.posts.iter().position(|post| post.id == id)
    }
}

impl CachedProfile {
    #[must_use]
    pub fn is_fresh(&self, now: UtcDateTime, ttl: PositiveDuration) -> bool {
        now - self.captured_at < ttl.get()
    }
}

/// Timestamps are stored as unix milliseconds.
#[must_use]
pub fn encode_timestamp(time: UtcDateTime) -> String {
    (time.unix_timestamp_nanos() / 1_000_000).to_string()
}

pub fn decode_timestamp(key: &'static str, value: &str) -> Result<UtcDateTime, StoreDataError> {
    let invalid = || StoreDataError {
        key,
        value: value.to_owned(),
    };

    let millis: i128 = value.trim().parse().map_err(|_| invalid())?;
    let nanos = millis.checked_mul(1_000_000).ok_or_else(invalid)?;
    UtcDateTime::from_unix_timestamp_nanos(nanos).map_err(|_| invalid())
}
