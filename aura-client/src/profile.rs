use crate::backend::{BackendError, ImageSlot, ImageUpload, ProfileBackend};
use aura_common::{
    clock::{Clock, SystemClock},
    model::{
        auth::AccessToken,
        profile::{Profile, ProfileUpdate},
    },
    util::PositiveDuration,
};
use aura_store::{cache::SessionCache, kv::KeyValueStore, kv::StoreError};
use std::sync::Arc;
use thiserror::Error;
use time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_PROFILE_TTL_SECS: u32 = 300;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("No access token found")]
    MissingToken,
    #[error("{message}")]
    Rejected { message: String },
    #[error("Profile request failed: {0}")]
    Backend(BackendError),
    #[error("Profile cache failed: {0}")]
    Store(#[from] StoreError),
}

impl ProfileError {
    fn from_backend(err: BackendError, what: &str) -> Self {
        let message = err.message();
        match err {
            BackendError::Status { status, .. } => ProfileError::Rejected {
                message: message
                    .unwrap_or_else(|| format!("Failed to update {what}: {}", status.as_u16())),
            },
            other => ProfileError::Backend(other),
        }
    }
}

/// The viewer's own profile, cached for a while after each fetch.
pub struct ProfileService<B, S, C = SystemClock> {
    backend: B,
    cache: Arc<SessionCache<S>>,
    clock: C,
    ttl: PositiveDuration,
}

impl<B, S, C> ProfileService<B, S, C>
where
    B: ProfileBackend,
    S: KeyValueStore,
    C: Clock,
{
    pub fn new(backend: B, cache: Arc<SessionCache<S>>, clock: C) -> Self {
        Self {
            backend,
            cache,
            clock,
            ttl: PositiveDuration::new_unchecked(Duration::seconds(
                DEFAULT_PROFILE_TTL_SECS.into(),
            )),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: PositiveDuration) -> Self {
        self.ttl = ttl;
        self
    }

    fn token(&self) -> Result<AccessToken, ProfileError> {
        self.cache.access_token()?.ok_or(ProfileError::MissingToken)
    }

    pub async fn get_profile(&self) -> Result<Profile, ProfileError> {
        let now = self.clock.now();
        match self.cache.load_profile() {
            Ok(Some(cached)) if cached.is_fresh(now, self.ttl) => {
                debug!("Serving cached profile");
                return Ok(cached.profile);
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "Cached profile could not be read"),
        }

        let token = self.token()?;
        let profile = self.backend.fetch_profile(&token).await.map_err(|err| {
            error!(%err, "Error fetching profile");
            ProfileError::Backend(err)
        })?;

        if let Err(err) = self.cache.save_profile(&profile, now) {
            warn!(%err, "Profile could not be cached");
        }

        Ok(profile)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ProfileError> {
        let token = self.token()?;
        self.backend
            .update_profile(&token, update)
            .await
            .map_err(|err| {
                error!(%err, "Error updating profile");
                ProfileError::from_backend(err, "profile")
            })?;

        info!("Profile updated");
        self.invalidate()
    }

    pub async fn update_avatar(&self, image: ImageUpload) -> Result<(), ProfileError> {
        self.upload(ImageSlot::Avatar, image).await
    }

    pub async fn update_cover(&self, image: ImageUpload) -> Result<(), ProfileError> {
        self.upload(ImageSlot::Cover, image).await
    }

    async fn upload(&self, slot: ImageSlot, image: ImageUpload) -> Result<(), ProfileError> {
        let token = self.token()?;
        self.backend
            .upload_image(&token, slot, image)
            .await
            .map_err(|err| {
                error!(%err, ?slot, "Error uploading image");
                ProfileError::from_backend(err, slot.label())
            })?;

        info!(?slot, "Image updated");
        self.invalidate()
    }

    /// Drops the cached profile so the next read goes to the backend.
    pub fn invalidate(&self) -> Result<(), ProfileError> {
        Ok(self.cache.clear_profile()?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        backend::{HttpBackend, ImageUpload},
        profile::{ProfileError, ProfileService},
        testing::{FakeServer, VALID_TOKEN},
    };
    use aura_common::{
        clock::ManualClock,
        model::{auth::AccessToken, profile::ProfileUpdate},
        util::PositiveDuration,
    };
    use aura_store::{cache::SessionCache, kv::MemoryStore};
    use std::sync::Arc;
    use time::{Duration, macros::utc_datetime};

    type TestService = ProfileService<HttpBackend, MemoryStore, Arc<ManualClock>>;

    async fn service(
        signed_in: bool,
    ) -> (FakeServer, TestService, Arc<ManualClock>, Arc<SessionCache<MemoryStore>>) {
        let server = FakeServer::start().await;
        let cache = Arc::new(SessionCache::new(MemoryStore::new()));
        if signed_in {
            cache
                .set_access_token(&AccessToken::new(VALID_TOKEN.to_owned()).unwrap())
                .unwrap();
        }
        let clock = Arc::new(ManualClock::new(utc_datetime!(2025-10-05 12:00)));
        let service = ProfileService::new(
            HttpBackend::new(&server.url()),
            Arc::clone(&cache),
            Arc::clone(&clock),
        );
        (server, service, clock, cache)
    }

    #[tokio::test]
    async fn profile_is_cached_until_ttl() {
        let (server, service, clock, _cache) = service(true).await;

        let profile = service.get_profile().await.unwrap();
        assert_eq!(profile.user.name, "Rae Lindqvist");
        assert_eq!(profile.incidents.len(), 1);

        clock.advance(Duration::seconds(299));
        service.get_profile().await.unwrap();
        assert_eq!(server.state.profile_fetches(), 1);

        clock.advance(Duration::seconds(2));
        service.get_profile().await.unwrap();
        assert_eq!(server.state.profile_fetches(), 2);
    }

    #[tokio::test]
    async fn configured_ttl_replaces_default() {
        let (server, service, clock, _cache) = service(true).await;
        let service = service.with_ttl(PositiveDuration::from_secs(10).unwrap());

        service.get_profile().await.unwrap();
        clock.advance(Duration::seconds(11));
        service.get_profile().await.unwrap();

        assert_eq!(server.state.profile_fetches(), 2);
    }

    #[tokio::test]
    async fn update_invalidates_cache() {
        let (server, service, _clock, cache) = service(true).await;
        let profile = service.get_profile().await.unwrap();

        let mut update = ProfileUpdate::from(&profile.user);
        update.bio = "Day shift now".to_owned();
        service.update_profile(&update).await.unwrap();

        assert_eq!(server.state.profile_updates(), vec![update]);
        assert!(cache.load_profile().unwrap().is_none());

        service.get_profile().await.unwrap();
        assert_eq!(server.state.profile_fetches(), 2);
    }

    #[tokio::test]
    async fn rejected_update_carries_backend_message() {
        let (_server, service, _clock, _cache) = service(true).await;
        let profile = service.get_profile().await.unwrap();

        let mut update = ProfileUpdate::from(&profile.user);
        update.name = String::new();

        let err = service.update_profile(&update).await.unwrap_err();
        assert_eq!(err.to_string(), "Name cannot be empty");
    }

    #[tokio::test]
    async fn images_use_their_own_parts() {
        let (server, service, _clock, _cache) = service(true).await;
        let image = ImageUpload {
            bytes: vec![0xff; 16],
            file_name: "me.png".to_owned(),
        };

        service.update_avatar(image.clone()).await.unwrap();
        service.update_cover(image).await.unwrap();

        assert_eq!(
            server.state.uploads(),
            vec![
                ("avatar".to_owned(), "profile_image".to_owned(), 16),
                ("cover".to_owned(), "cover_image".to_owned(), 16),
            ]
        );
    }

    #[tokio::test]
    async fn signed_out_requests_fail_fast() {
        let (server, service, _clock, _cache) = service(false).await;

        assert!(matches!(
            service.get_profile().await,
            Err(ProfileError::MissingToken)
        ));
        assert!(matches!(
            service.update_cover(ImageUpload::default()).await,
            Err(ProfileError::MissingToken)
        ));
        assert_eq!(server.state.profile_fetches(), 0);
    }
}
