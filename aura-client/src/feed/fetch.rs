use crate::{
    backend::FeedBackend,
    feed::{Feed, FeedState, response::FeedResponse},
};
use aura_common::{clock::Clock, model::post::Post, util::PositiveDuration};
use aura_store::{kv::KeyValueStore, record::Snapshot};
use std::sync::Arc;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

impl<B, S, C> Feed<B, S, C>
where
    B: FeedBackend,
    S: KeyValueStore,
    C: Clock,
{
    /// Serves the stored snapshot while it is fresh, otherwise refetches.
    ///
    /// Never fails: a missing token or a failed request yields an empty
    /// feed and leaves the stored snapshot alone.
    pub async fn get_feed(&self) -> FeedState {
        match self.cache.load_snapshot() {
            Ok(Some(snapshot)) if snapshot.is_fresh(self.clock.now(), self.config.freshness) => {
                debug!(posts = snapshot.posts.len(), "Using cached posts");
                return self.publish(snapshot.posts, false);
            }
            Ok(Some(_)) => debug!("Cached posts are stale"),
            Ok(None) => debug!("No cached posts"),
            Err(err) => warn!(%err, "Cached posts could not be read"),
        }

        self.refresh().await
    }

    /// Fetches from the backend regardless of snapshot age.
    pub async fn refresh(&self) -> FeedState {
        self.state.send_modify(|state| state.is_loading = true);

        let posts = self.fetch_posts().await;
        self.publish(posts, false)
    }

    async fn fetch_posts(&self) -> Vec<Post> {
        let token = match self.cache.access_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!("No access token found");
                return Vec::new();
            }
            Err(err) => {
                error!(%err, "Access token could not be read");
                return Vec::new();
            }
        };

        let body = match self.backend.fetch_home_feed(&token).await {
            Ok(body) => body,
            Err(err) => {
                error!(%err, "Error while fetching posts");
                return Vec::new();
            }
        };

        let posts = match FeedResponse::from_value(body) {
            FeedResponse::Malformed(err) => {
                error!(%err, "Posts in response could not be parsed");
                return Vec::new();
            }
            response => match response.into_posts() {
                Some(posts) => posts,
                None => {
                    error!("Could not extract posts array from response");
                    return Vec::new();
                }
            },
        };

        let snapshot = Snapshot::new(posts, self.clock.now());
        match self.cache.save_snapshot(&snapshot) {
            Ok(()) => debug!(posts = snapshot.posts.len(), "Stored fresh posts"),
            Err(err) => error!(%err, "Fresh posts could not be stored"),
        }

        snapshot.posts
    }
}

impl<B, S, C> Feed<B, S, C>
where
    B: FeedBackend + 'static,
    S: KeyValueStore + 'static,
    C: Clock + 'static,
{
    /// Calls [`Feed::refresh`] every `period` until `cancel` fires. The first
    /// refresh happens one period from now.
    pub fn spawn_refresh_task(
        self: Arc<Self>,
        period: PositiveDuration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let period = period.to_std();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(?period, "Starting periodic feed refresh");

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let state = self.refresh().await;
                        debug!(posts = state.posts.len(), "Periodic feed refresh finished");
                    }
                }
            }

            info!("Stopped periodic feed refresh");
        })
    }
}
