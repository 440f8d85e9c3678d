use aura_client::{
    auth::{Auth, LoginError},
    backend::HttpBackend,
    config::{ClientConfig, ConfigError},
    feed::{Feed, FeedState},
    profile::ProfileService,
};
use aura_common::{
    clock::{Clock, SystemClock},
    util::format_relative,
};
use aura_store::{cache::SessionCache, kv::FileStore, kv::StoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Error opening store: {0}")]
    Store(#[from] StoreError),
    #[error("Error logging in: {0}")]
    Login(#[from] LoginError),
    #[error("Error waiting for Ctrl-C: {0}")]
    Signal(std::io::Error),
    #[error("Feed refresh task failed: {0}")]
    RefreshTask(#[from] tokio::task::JoinError),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "aura_client=debug,aura_store=debug,aura_common=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn print_feed(state: &FeedState, clock: &impl Clock) {
    let now = clock.now();

    if state.posts.is_empty() {
        println!("No posts yet.");
        return;
    }

    for post in &state.posts {
        let when = post
            .created_at_utc()
            .map_or_else(|| post.created_at.clone(), |then| format_relative(then, now));
        let up = if post.is_upvoted { "[+]" } else { "+" };
        let down = if post.is_downvoted { "[-]" } else { "-" };

        println!("#{} {} · {when}", post.id, post.author_name);
        println!("  {}", post.content);
        println!(
            "  {up}{}  {down}{}  {} comments",
            post.total_upvotes, post.total_downvotes, post.total_comments
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let config = ClientConfig::from_env()?;

    let cache = Arc::new(SessionCache::new(FileStore::open(config.store_path.clone())?));
    let backend = HttpBackend::new(&config.backend_url);

    let auth = Auth::new(backend.clone(), Arc::clone(&cache));
    if !auth.is_authenticated() {
        match config.credentials.clone() {
            Some(credentials) => {
                auth.login(credentials).await?;
            }
            None => warn!("No stored session and no credentials configured"),
        }
    }

    let profiles = ProfileService::new(backend.clone(), Arc::clone(&cache), SystemClock)
        .with_ttl(config.profile_ttl);
    match profiles.get_profile().await {
        Ok(profile) => println!(
            "Signed in as {} ({} posts)",
            profile.user.name, profile.user.incidents
        ),
        Err(err) => warn!(%err, "Profile could not be loaded"),
    }

    let feed = Arc::new(Feed::new(backend, cache, SystemClock, config.feed));
    print_feed(&feed.get_feed().await, &SystemClock);

    let cancel = CancellationToken::new();
    let mut updates = feed.subscribe();
    let refresh = Arc::clone(&feed).spawn_refresh_task(config.refresh_interval, cancel.clone());

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(InitError::Signal)?;
                break;
            }
            Ok(()) = updates.changed() => {
                let state = updates.borrow_and_update().clone();
                if !state.is_loading {
                    print_feed(&state, &SystemClock);
                }
            }
        }
    }

    info!("Shutting down");
    cancel.cancel();
    refresh.await?;

    Ok(())
}
