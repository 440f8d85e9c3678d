//! Home feed: the cached snapshot, how it is refreshed, and how votes are
//! applied to it.

use crate::backend::FeedBackend;
use aura_common::{
    clock::{Clock, SystemClock},
    model::{Id, post::{Post, PostMarker}},
    util::PositiveDuration,
};
use aura_store::{cache::SessionCache, kv::KeyValueStore};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, watch};

mod fetch;
pub mod response;
mod vote;

pub const DEFAULT_FRESHNESS_SECS: u32 = 60;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u32 = 60;

/// What a feed view renders.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct FeedState {
    pub posts: Vec<Post>,
    pub is_loading: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            is_loading: true,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct FeedConfig {
    /// How long a snapshot is served without asking the backend.
    pub freshness: PositiveDuration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            freshness: PositiveDuration::new_unchecked(Duration::seconds(
                DEFAULT_FRESHNESS_SECS.into(),
            )),
        }
    }
}

pub struct Feed<B, S, C = SystemClock> {
    backend: B,
    cache: Arc<SessionCache<S>>,
    clock: C,
    config: FeedConfig,
    state: watch::Sender<FeedState>,
    post_locks: PostLocks,
}

impl<B, S, C> Feed<B, S, C>
where
    B: FeedBackend,
    S: KeyValueStore,
    C: Clock,
{
    pub fn new(backend: B, cache: Arc<SessionCache<S>>, clock: C, config: FeedConfig) -> Self {
        Self {
            backend,
            cache,
            clock,
            config,
            state: watch::Sender::new(FeedState::default()),
            post_locks: PostLocks::default(),
        }
    }

    /// Observes every change to the displayed posts, including optimistic
    /// vote writes and their reverts.
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> FeedState {
        self.state.borrow().clone()
    }

    fn publish(&self, posts: Vec<Post>, is_loading: bool) -> FeedState {
        let state = FeedState { posts, is_loading };
        self.state.send_replace(state.clone());
        state
    }
}

/// One async mutex per post id, so mutations of the same post run one at a
/// time while different posts proceed independently.
#[derive(Debug, Default)]
struct PostLocks(Mutex<HashMap<Id<PostMarker>, Arc<AsyncMutex<()>>>>);

impl PostLocks {
    async fn acquire(&self, id: Id<PostMarker>) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(id).or_default())
        };
        lock.lock_owned().await
    }
}
