// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Offline-first sync walkthrough.
//!
//! Demonstrates, against an on-disk SQLite store and an in-process remote:
//! 1. Cold start with the network down (`NoCacheAvailable`)
//! 2. First successful sync and write-through to the cache
//! 3. A change notification plus a foreground resume, coalesced
//! 4. A restart while offline, served from cache
//! 5. Profile edits that survive the restart
//! 6. Metrics captured by a debugging recorder
//!
//! # Run
//!
//! ```bash
//! cargo run --example offline_sync
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use recipe_sync::{
    AppLifecycle, AppState, BroadcastChangeFeed, CatalogCache, CatalogSnapshot, ChangeEvent,
    ChangeNotificationListener, ChangeOp, Difficulty, Ingredient, NewUser, RecipeSyncConfig,
    Recipe, RemoteCatalogSource, RemoteFetchError, ShoppingListReplace, SyncCoordinator,
    UserProfileRepository,
};

/// Stand-in for the hosted catalog, with a network switch.
struct DemoRemote {
    online: AtomicBool,
    revision: AtomicUsize,
}

#[async_trait]
impl RemoteCatalogSource for DemoRemote {
    async fn fetch_all(&self) -> Result<CatalogSnapshot, RemoteFetchError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if !self.online.load(Ordering::SeqCst) {
            return Err(RemoteFetchError::Transport("network unreachable".into()));
        }
        let revision = self.revision.fetch_add(1, Ordering::SeqCst);

        let mut wo = Recipe::new("wo", "Wô", Difficulty::Easy);
        wo.region = "Sud".into();
        wo.ingredients = vec![Ingredient::new("farine de maïs", "500 g"), Ingredient::new("eau", "1 L")];
        let mut amiwo = Recipe::new("amiwo", format!("Amiwô (rev {revision})"), Difficulty::Medium);
        amiwo.region = "Sud".into();
        amiwo.ingredients = vec![Ingredient::new("farine de maïs", "400 g"), Ingredient::new("tomate", "3")];

        Ok(CatalogSnapshot::fresh(vec![amiwo, wo]))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_sync=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let dir = tempfile::tempdir()?;
    let config = RecipeSyncConfig {
        storage_url: Some(format!("sqlite://{}?mode=rwc", dir.path().join("device.db").display())),
        ..Default::default()
    };
    let remote = Arc::new(DemoRemote {
        online: AtomicBool::new(false),
        revision: AtomicUsize::new(1),
    });

    // ─────────────────────────────────────────────────────────────────────────
    // 1. First launch, offline
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📴 First launch, network down");
    let store = recipe_sync::storage::open(&config).await?;
    let profiles = UserProfileRepository::load(store.clone(), config.storage_keys.clone()).await;
    let cache = Arc::new(CatalogCache::load(store.clone(), config.storage_keys.catalog.clone()).await);
    let coordinator = Arc::new(SyncCoordinator::new(remote.clone(), cache));

    let outcome = coordinator.start().await;
    println!("   Outcome: {:?}", outcome);
    match coordinator.current_catalog() {
        Ok(catalog) => println!("   Catalog: {} recipes", catalog.len()),
        Err(e) => println!("   Catalog: {e}"),
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Network back, resume to foreground
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📶 Network back");
    remote.online.store(true, Ordering::SeqCst);

    let feed = BroadcastChangeFeed::new(config.change_feed_capacity);
    let lifecycle = AppLifecycle::new();
    let listener = ChangeNotificationListener::spawn(
        &feed,
        &lifecycle,
        config.catalog_table.clone(),
        coordinator.clone(),
    );

    lifecycle.set(AppState::Background);
    tokio::time::sleep(Duration::from_millis(10)).await;
    lifecycle.set(AppState::Active);
    tokio::time::sleep(Duration::from_millis(20)).await;

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Curator edits land while that sync is still running
    // ─────────────────────────────────────────────────────────────────────────
    feed.publish(ChangeEvent::new("recipes", ChangeOp::Update));
    feed.publish(ChangeEvent::new("recipes", ChangeOp::Insert));
    tokio::time::sleep(Duration::from_millis(200)).await;

    let catalog = coordinator.current_catalog()?;
    println!("   State: {}", coordinator.state());
    for recipe in catalog.iter() {
        println!("   • {} [{}]", recipe.name, recipe.difficulty);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Profile edits
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n👤 Profile edits");
    let user = profiles
        .create_user(NewUser {
            name: "Afi".into(),
            email: "afi@example.com".into(),
            password: String::new(),
            avatar: String::new(),
        })
        .await?;
    profiles.set_current_user(Some(user.clone())).await;
    profiles.toggle_favorite(&user.id, "amiwo").await;
    if let Some(amiwo) = catalog.get("amiwo") {
        let list = ShoppingListReplace::from_current(&user).add_recipe(amiwo);
        profiles.update_shopping_list(&user.id, list).await;
    }
    let current = profiles.current_user().ok_or("no current user")?;
    println!("   {} ❤ {:?}, 🛒 {} items", current.name, current.favorites, current.shopping_list.len());

    listener.release().await;
    drop(coordinator);
    drop(profiles);

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Restart, offline again
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🔁 Restart, network down");
    remote.online.store(false, Ordering::SeqCst);
    let store = recipe_sync::storage::open(&config).await?;
    let profiles = UserProfileRepository::load(store.clone(), config.storage_keys.clone()).await;
    let cache = Arc::new(CatalogCache::load(store, config.storage_keys.catalog.clone()).await);
    let coordinator = SyncCoordinator::new(remote.clone(), cache);

    println!("   Outcome: {:?}", coordinator.start().await);
    let catalog = coordinator.current_catalog()?;
    println!("   Serving {} recipes ({})", catalog.len(), catalog.freshness());
    if let Some(error) = coordinator.last_error() {
        println!("   Last known data: {error}");
    }
    if let Some(current) = profiles.current_user() {
        let favorites: Vec<&str> = catalog.resolve_favorites(&current).iter().map(|r| r.name.as_str()).collect();
        println!("   {} is still signed in, favorites: {:?}", current.name, favorites);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    dump_metrics(&snapshotter);
    Ok(())
}

fn dump_metrics(snapshotter: &Snapshotter) {
    println!("\n📊 Metrics");
    let mut lines = Vec::new();
    for (composite_key, _, _, value) in snapshotter.snapshot().into_vec() {
        let (_, key) = composite_key.into_parts();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };
        let rendered = match value {
            DebugValue::Counter(v) => v.to_string(),
            DebugValue::Gauge(v) => format!("{:.0}", v.into_inner()),
            DebugValue::Histogram(samples) => format!("{} samples", samples.len()),
        };
        lines.push(format!("   {}{} = {}", key.name(), label_str, rendered));
    }
    lines.sort();
    for line in lines {
        println!("{line}");
    }
}
