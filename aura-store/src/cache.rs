use crate::{
    kv::{KeyValueStore, Result},
    record::{
        ACCESS_TOKEN_KEY, CachedProfile, POSTS_KEY, POSTS_TIMESTAMP_KEY, PROFILE_KEY,
        PROFILE_TIMESTAMP_KEY, Snapshot, decode_timestamp, encode_timestamp,
    },
};
use aura_common::model::{auth::AccessToken, post::Post, profile::Profile};
use time::UtcDateTime;
use tracing::debug;

/// Typed view over a [`KeyValueStore`] holding everything the client keeps
/// between runs: the bearer token, the feed snapshot and the profile.
#[derive(Debug)]
pub struct SessionCache<S> {
    store: S,
}

impl<S: KeyValueStore> SessionCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// An empty stored token counts as no token.
    pub fn access_token(&self) -> Result<Option<AccessToken>> {
        Ok(self
            .store
            .get(ACCESS_TOKEN_KEY)?
            .and_then(|token| AccessToken::new(token).ok()))
    }

    pub fn set_access_token(&self, token: &AccessToken) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, token.as_str().to_owned())
    }

    /// A snapshot without a readable timestamp is returned as captured at
    /// the unix epoch, so it is never considered fresh.
    pub fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        let Some(posts_json) = self.store.get(POSTS_KEY)? else {
            return Ok(None);
        };
        let posts: Vec<Post> = serde_json::from_str(&posts_json)?;

        let captured_at = match self.store.get(POSTS_TIMESTAMP_KEY)? {
            Some(raw) => decode_timestamp(POSTS_TIMESTAMP_KEY, &raw).unwrap_or_else(|err| {
                debug!(%err, "Treating snapshot as stale");
                UtcDateTime::UNIX_EPOCH
            }),
            None => UtcDateTime::UNIX_EPOCH,
        };

        Ok(Some(Snapshot::new(posts, captured_at)))
    }

    /// The old timestamp is dropped first, so a write that fails halfway
    /// leaves a snapshot that reads as stale.
    pub fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let posts_json = serde_json::to_string(&snapshot.posts)?;
        self.store.remove(POSTS_TIMESTAMP_KEY)?;
        self.store.set(POSTS_KEY, posts_json)?;
        self.store
            .set(POSTS_TIMESTAMP_KEY, encode_timestamp(snapshot.captured_at))
    }

    pub fn clear_snapshot(&self) -> Result<()> {
        self.store.remove(POSTS_KEY)?;
        self.store.remove(POSTS_TIMESTAMP_KEY)
    }

    pub fn load_profile(&self) -> Result<Option<CachedProfile>> {
        let (Some(profile_json), Some(raw_timestamp)) = (
            self.store.get(PROFILE_KEY)?,
            self.store.get(PROFILE_TIMESTAMP_KEY)?,
        ) else {
            return Ok(None);
        };

        Ok(Some(CachedProfile {
            profile: serde_json::from_str(&profile_json)?,
            captured_at: decode_timestamp(PROFILE_TIMESTAMP_KEY, &raw_timestamp)?,
        }))
    }

    pub fn save_profile(&self, profile: &Profile, captured_at: UtcDateTime) -> Result<()> {
        self.store.set(PROFILE_KEY, serde_json::to_string(profile)?)?;
        self.store
            .set(PROFILE_TIMESTAMP_KEY, encode_timestamp(captured_at))
    }

    pub fn clear_profile(&self) -> Result<()> {
        self.store.remove(PROFILE_KEY)?;
        self.store.remove(PROFILE_TIMESTAMP_KEY)
    }

    /// Forgets everything tied to the signed-in viewer.
    pub fn clear_session(&self) -> Result<()> {
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.clear_profile()?;
        self.clear_snapshot()
    }
}
