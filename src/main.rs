//! wall-state entry point.
//!
//! Connects to the configured Redis instance and reports on every watched
//! set: its cardinality and a short preview of each member.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::join_all;
use tracing_subscriber::EnvFilter;

use wall_state::RELEASE;
use wall_state::config::SyncConfig;
use wall_state::domain::{Container, JoinCoordinator, ObjectCache};
use wall_state::error::{DecodeError, SyncError};
use wall_state::store::{Hash, KeyValueStore, RedisStore};
use wall_state::text::{ELLIPSIS, truncate};

/// Raw record: the stored hash, rendered as sorted JSON for previews.
#[derive(Debug)]
struct Record(serde_json::Map<String, serde_json::Value>);

fn decode_record(hash: Hash) -> Result<Record, DecodeError> {
    let mut fields: Vec<(String, String)> = hash.into_iter().collect();
    fields.sort();
    Ok(Record(
        fields
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect(),
    ))
}

async fn report(container: &Container<Record>, preview_length: usize) -> Result<(), SyncError> {
    let set = container.set_name();
    let len = container.len().await?;
    tracing::info!(set, len, "watched set");
    for (key, record) in container.items().await? {
        match record {
            Some(record) => {
                let preview = serde_json::Value::Object(record.0.clone()).to_string();
                let preview = truncate(&preview, preview_length, ELLIPSIS);
                tracing::info!(set, key = %key, %preview, "member");
            }
            None => tracing::warn!(set, key = %key, "member has no stored hash"),
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = SyncConfig::from_env()?;
    tracing::info!(release = RELEASE, url = %config.redis_url, "starting wall-state");

    // Build store and object cache
    let redis = RedisStore::connect(&config.redis_url).await?;
    tracing::info!(url = redis.url(), "connected to store");
    let store: Arc<dyn KeyValueStore> = Arc::new(redis);
    let cache = Arc::new(ObjectCache::with_caching(
        store,
        decode_record,
        config.caching_enabled,
    ));

    // Report every watched set concurrently; each completion finishes its task
    let containers: Vec<Container<Record>> = config
        .watch_sets
        .iter()
        .map(|set| Container::new(Arc::clone(&cache), set.as_str()))
        .collect();
    let sets = containers.len();
    let join = Mutex::new(JoinCoordinator::new(config.watch_sets.clone(), move || {
        tracing::info!(sets, "all watched sets reported");
    }));

    let join = &join;
    let preview_length = config.preview_length;
    let results = join_all(containers.iter().map(|container| async move {
        report(container, preview_length).await?;
        join.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finish(&container.set_name().to_string())
    }))
    .await;
    for result in results {
        result?;
    }

    tracing::info!(live_objects = cache.cached_len(), "done");
    Ok(())
}
