use crate::{backend::FeedBackend, feed::Feed};
use aura_common::{
    clock::Clock,
    model::{
        Id,
        post::{Post, PostMarker},
        vote::{VoteIntent, VoteRequest},
    },
};
use aura_store::kv::KeyValueStore;
use tracing::{debug, error, warn};

impl<B, S, C> Feed<B, S, C>
where
    B: FeedBackend,
    S: KeyValueStore,
    C: Clock,
{
    /// Applies a vote button press to the stored snapshot right away, then
    /// tells the backend. If the backend does not accept it the post is put
    /// back the way it was.
    ///
    /// Presses on the same post are handled one after the other. Nothing is
    /// fetched here: without a stored snapshot the press is dropped.
    pub async fn toggle_vote(&self, intent: VoteIntent) {
        let Some(action) = intent.action() else {
            debug!(post_id = %intent.post_id, "Vote intent without an action");
            return;
        };
        let post_id = intent.post_id;
        let _guard = self.post_locks.acquire(post_id).await;

        let mut snapshot = match self.cache.load_snapshot() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                warn!(%post_id, "No cached posts to vote on");
                return;
            }
            Err(err) => {
                error!(%err, %post_id, "Cached posts could not be read");
                return;
            }
        };

        let Some(index) = snapshot.position(post_id) else {
            warn!(%post_id, "Post not found in cached posts");
            return;
        };

        let token = match self.cache.access_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!(%post_id, "No access token found");
                return;
            }
            Err(err) => {
                error!(%err, "Access token could not be read");
                return;
            }
        };

        let before = snapshot.posts[index].clone();
        let after = before.with_vote(action);
        let request = VoteRequest::new(post_id, after.vote_state());
        snapshot.posts[index] = after;

        if let Err(err) = self.cache.save_snapshot(&snapshot) {
            error!(%err, %post_id, "Optimistic vote could not be stored");
            return;
        }
        self.state.send_modify(|state| state.posts = snapshot.posts);

        match self.backend.submit_vote(&token, &request).await {
            Ok(()) => debug!(%post_id, ?action, "Vote updated"),
            Err(err) => {
                error!(%err, %post_id, ?action, "Failed to update vote, reverting");
                self.restore_post(post_id, before);
            }
        }
    }

    /// Puts `original` back in place of the post with `post_id`. The snapshot
    /// is re-read because a refresh may have replaced it in the meantime.
    fn restore_post(&self, post_id: Id<PostMarker>, original: Post) {
        let mut snapshot = match self.cache.load_snapshot() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(err) => {
                error!(%err, %post_id, "Cached posts could not be read for revert");
                return;
            }
        };

        let Some(index) = snapshot.position(post_id) else {
            debug!(%post_id, "Post disappeared before revert");
            return;
        };
        snapshot.posts[index] = original;

        if let Err(err) = self.cache.save_snapshot(&snapshot) {
            error!(%err, %post_id, "Reverted vote could not be stored");
        }
        self.state.send_modify(|state| state.posts = snapshot.posts);
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        feed::{Feed, FeedConfig, tests::FakeFeedBackend},
        testing::sample_posts,
    };
    use aura_common::{
        clock::SystemClock,
        model::{
            Id,
            auth::AccessToken,
            post::Post,
            vote::{VoteIntent, VoteRequest},
        },
    };
    use aura_store::{
        cache::SessionCache,
        kv::{FileStore, MemoryStore},
        record::Snapshot,
    };
    use std::sync::{Arc, atomic::Ordering};
    use time::UtcDateTime;

    type TestFeed = Feed<Arc<FakeFeedBackend>, MemoryStore, SystemClock>;

    fn seeded_feed() -> (TestFeed, Arc<FakeFeedBackend>, Arc<SessionCache<MemoryStore>>) {
        let backend = Arc::new(FakeFeedBackend::default());
        let cache = Arc::new(SessionCache::new(MemoryStore::new()));
        cache
            .set_access_token(&AccessToken::new("token".to_owned()).unwrap())
            .unwrap();

        let posts: Vec<Post> = serde_json::from_value(sample_posts()).unwrap();
        cache
            .save_snapshot(&Snapshot::new(posts, UtcDateTime::now()))
            .unwrap();

        let feed = Feed::new(
            Arc::clone(&backend),
            Arc::clone(&cache),
            SystemClock,
            FeedConfig::default(),
        );
        (feed, backend, cache)
    }

    fn stored_post(cache: &SessionCache<MemoryStore>, id: u64) -> Post {
        let snapshot = cache.load_snapshot().unwrap().unwrap();
        snapshot
            .posts
            .into_iter()
            .find(|post| post.id == Id::new(id))
            .unwrap()
    }

    #[tokio::test]
    async fn upvote_is_applied_and_sent() {
        let (feed, backend, cache) = seeded_feed();

        feed.toggle_vote(VoteIntent::upvote(Id::new(1))).await;

        let post = stored_post(&cache, 1);
        assert!(post.is_upvoted);
        assert_eq!(post.total_upvotes, 3);
        assert_eq!(
            *backend.votes.lock().unwrap(),
            vec![VoteRequest {
                incident_id: Id::new(1),
                is_upvoted: true,
                is_downvoted: false,
            }]
        );
        assert_eq!(feed.current().posts[0], post);
    }

    #[tokio::test]
    async fn switching_sides_moves_both_counts() {
        let (feed, _backend, cache) = seeded_feed();

        feed.toggle_vote(VoteIntent::upvote(Id::new(2))).await;

        let post = stored_post(&cache, 2);
        assert!(post.is_upvoted);
        assert!(!post.is_downvoted);
        assert_eq!((post.total_upvotes, post.total_downvotes), (1, 0));
    }

    #[tokio::test]
    async fn failed_vote_is_reverted() {
        let (feed, backend, cache) = seeded_feed();
        backend.fail_votes.store(true, Ordering::SeqCst);

        for (id, intent) in [
            (1, VoteIntent::upvote(Id::new(1))),
            (1, VoteIntent::downvote(Id::new(1))),
            (2, VoteIntent::upvote(Id::new(2))),
            (2, VoteIntent::downvote(Id::new(2))),
        ] {
            let before = stored_post(&cache, id);
            feed.toggle_vote(intent).await;
            assert_eq!(stored_post(&cache, id), before, "{intent:?}");
        }

        let displayed: Vec<Post> = serde_json::from_value(sample_posts()).unwrap();
        assert_eq!(feed.current().posts, displayed);
    }

    #[tokio::test]
    async fn subscribers_see_reverted_state() {
        let (feed, backend, _cache) = seeded_feed();
        backend.fail_votes.store(true, Ordering::SeqCst);
        let mut receiver = feed.subscribe();

        feed.toggle_vote(VoteIntent::upvote(Id::new(1))).await;

        assert!(receiver.has_changed().unwrap());
        assert!(!receiver.borrow_and_update().posts[0].is_upvoted);
    }

    #[tokio::test]
    async fn no_snapshot_or_unknown_post_is_a_no_op() {
        let (feed, backend, cache) = seeded_feed();

        feed.toggle_vote(VoteIntent::upvote(Id::new(99))).await;
        assert!(backend.votes.lock().unwrap().is_empty());

        cache.clear_snapshot().unwrap();
        feed.toggle_vote(VoteIntent::upvote(Id::new(1))).await;
        assert!(backend.votes.lock().unwrap().is_empty());
        assert_eq!(backend.feed_calls.load(Ordering::SeqCst), 0);
        assert!(cache.load_snapshot().unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_intent_is_a_no_op() {
        let (feed, backend, cache) = seeded_feed();
        let before = cache.load_snapshot().unwrap();

        feed.toggle_vote(VoteIntent {
            post_id: Id::new(1),
            want_upvote: false,
            want_downvote: false,
        })
        .await;

        assert_eq!(cache.load_snapshot().unwrap(), before);
        assert!(backend.votes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_presses_on_one_post_are_serialized() {
        let (feed, backend, cache) = seeded_feed();
        let original = stored_post(&cache, 1);

        tokio::join!(
            feed.toggle_vote(VoteIntent::upvote(Id::new(1))),
            feed.toggle_vote(VoteIntent::upvote(Id::new(1))),
        );

        assert_eq!(stored_post(&cache, 1), original);
        let votes = backend.votes.lock().unwrap();
        assert_eq!(votes.len(), 2);
        assert!(votes[0].is_upvoted);
        assert!(!votes[1].is_upvoted);
    }

    #[tokio::test]
    async fn unpersisted_vote_is_neither_kept_nor_sent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(SessionCache::new(
            FileStore::open(dir.path().join("store.json")).unwrap(),
        ));
        cache
            .set_access_token(&AccessToken::new("token".to_owned()).unwrap())
            .unwrap();
        let posts: Vec<Post> = serde_json::from_value(sample_posts()).unwrap();
        cache
            .save_snapshot(&Snapshot::new(posts.clone(), UtcDateTime::now()))
            .unwrap();

        let backend = Arc::new(FakeFeedBackend::default());
        let feed = Feed::new(
            Arc::clone(&backend),
            Arc::clone(&cache),
            SystemClock,
            FeedConfig::default(),
        );

        std::fs::create_dir(dir.path().join("store.tmp")).unwrap();
        feed.toggle_vote(VoteIntent::upvote(Id::new(1))).await;

        assert_eq!(cache.load_snapshot().unwrap().unwrap().posts, posts);
        assert!(backend.votes.lock().unwrap().is_empty());
        assert!(feed.current().posts.is_empty());
    }
}
