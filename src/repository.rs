// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Local user profile repository.
//!
//! Owns the roster of known users and the single-slot "current user"
//! pointer. The pointer holds an id into the roster, never a copy, so the
//! two cannot disagree: [`UserProfileRepository::current_user`] always reads
//! the roster entry.
//!
//! # Persistence
//!
//! Two documents are written through [`KeyValueStore`]:
//! - the roster (`Vec<UserProfile>`) under `storage_keys.users`
//! - the pointer (`{"id": ...}`) under `storage_keys.current_user`
//!
//! Every mutation is applied in memory first, then persisted before the
//! call returns. A failed write (`StorageWriteFailed`) is logged and counted
//! but does not undo the in-memory change: the process keeps correct state,
//! only durability is lost.
//!
//! # Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use recipe_sync::{UserProfileRepository, InMemoryStore, NewUser};
//! # use recipe_sync::config::StorageKeys;
//! # async fn example() {
//! let repo = UserProfileRepository::load(Arc::new(InMemoryStore::new()), StorageKeys::default()).await;
//! let user = repo.create_user(NewUser {
//!     name: "Afi".into(),
//!     email: "afi@example.com".into(),
//!     password: String::new(),
//!     avatar: String::new(),
//! }).await.unwrap();
//! repo.set_current_user(Some(user.clone())).await;
//! let updated = repo.toggle_favorite(&user.id, "wo").await.unwrap();
//! assert!(updated.is_favorite("wo"));
//! # }
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::StorageKeys;
use crate::profile::{
    AvatarUpdate, FavoriteToggle, NewUser, ProfileUpdate, SettingsPatch, ShoppingListReplace,
    UserProfile,
};
use crate::storage::{self, KeyValueStore};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProfileError {
    #[error("A local account already uses '{0}'")]
    EmailTaken(String),
    #[error("Email must not be empty")]
    EmptyEmail,
}

/// Persisted form of the current-user slot.
///
/// Decodes from a full profile document as well, since only `id` is read.
#[derive(Debug, Serialize, Deserialize)]
struct CurrentUserPointer {
    id: String,
}

#[derive(Debug, Clone, Default)]
struct ProfileState {
    roster: Vec<UserProfile>,
    current_id: Option<String>,
}

impl ProfileState {
    fn position(&self, user_id: &str) -> Option<usize> {
        self.roster.iter().position(|u| u.id == user_id)
    }

    /// Insert or replace by id, else by email. Returns true if the current
    /// pointer had to follow a replaced entry to its new id.
    fn upsert(&mut self, profile: UserProfile) -> bool {
        let pos = self.position(&profile.id).or_else(|| {
            if profile.email.is_empty() {
                return None;
            }
            self.roster
                .iter()
                .position(|u| u.email.eq_ignore_ascii_case(&profile.email))
        });

        match pos {
            Some(pos) => {
                let new_id = profile.id.clone();
                let old = std::mem::replace(&mut self.roster[pos], profile);
                if old.id != new_id && self.current_id.as_deref() == Some(old.id.as_str()) {
                    self.current_id = Some(new_id);
                    return true;
                }
                false
            }
            None => {
                self.roster.push(profile);
                false
            }
        }
    }

    fn current(&self) -> Option<&UserProfile> {
        let id = self.current_id.as_deref()?;
        self.roster.iter().find(|u| u.id == id)
    }
}

/// Roster + current-user slot, persisted on every mutation.
pub struct UserProfileRepository {
    store: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    /// Published state; readers never wait on I/O
    state: RwLock<ProfileState>,
    /// Serializes mutations across their persistence await
    write_lock: Mutex<()>,
}

impl UserProfileRepository {
    /// Load roster and pointer from `store`.
    ///
    /// Missing or unreadable documents load as empty. A pointer to an id
    /// that is not on the roster is dropped.
    pub async fn load(store: Arc<dyn KeyValueStore>, keys: StorageKeys) -> Self {
        let roster: Vec<UserProfile> = storage::load(store.as_ref(), &keys.users)
            .await
            .unwrap_or_default();
        let pointer: Option<CurrentUserPointer> =
            storage::load(store.as_ref(), &keys.current_user).await;

        let current_id = match pointer {
            Some(p) if roster.iter().any(|u| u.id == p.id) => Some(p.id),
            Some(p) => {
                warn!(id = %p.id, "Current-user pointer not on roster, signing out");
                None
            }
            None => None,
        };

        info!(users = roster.len(), signed_in = current_id.is_some(), "Profile repository loaded");

        Self {
            store,
            keys,
            state: RwLock::new(ProfileState { roster, current_id }),
            write_lock: Mutex::new(()),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reads (synchronous, in-memory)
    // ═══════════════════════════════════════════════════════════════════════

    /// The roster, in insertion order.
    #[must_use]
    pub fn list_users(&self) -> Vec<UserProfile> {
        self.state.read().roster.clone()
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.read().current().cloned()
    }

    #[must_use]
    pub fn get_user(&self, user_id: &str) -> Option<UserProfile> {
        let state = self.state.read();
        state.position(user_id).map(|pos| state.roster[pos].clone())
    }

    /// Case-insensitive lookup for the sign-in screen. No credential check.
    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<UserProfile> {
        let email = email.trim();
        self.state
            .read()
            .roster
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Mutations (persisted before return)
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert or replace by id first, else by email.
    #[tracing::instrument(skip(self, profile), fields(user_id = %profile.id))]
    pub async fn upsert_user(&self, profile: UserProfile) {
        let _guard = self.write_lock.lock().await;
        let (snapshot, pointer_changed) = {
            let mut state = self.state.write();
            let pointer_changed = state.upsert(profile);
            (state.clone(), pointer_changed)
        };
        let persisted = self.persist(&snapshot, pointer_changed).await;
        crate::metrics::record_profile_mutation("upsert", persisted);
    }

    /// Point the current-user slot at `profile` (upserting it), or clear the
    /// slot with `None`. Clearing leaves the roster untouched.
    #[tracing::instrument(skip(self, profile))]
    pub async fn set_current_user(&self, profile: Option<UserProfile>) {
        let _guard = self.write_lock.lock().await;
        let snapshot = {
            let mut state = self.state.write();
            match profile {
                Some(profile) => {
                    let id = profile.id.clone();
                    state.upsert(profile);
                    state.current_id = Some(id);
                }
                None => state.current_id = None,
            }
            state.clone()
        };
        debug!(current = ?snapshot.current_id, "Current user changed");
        let persisted = self.persist(&snapshot, true).await;
        crate::metrics::record_profile_mutation("set_current", persisted);
    }

    /// Create a local account with a client-generated id.
    #[tracing::instrument(skip(self, new_user))]
    pub async fn create_user(&self, new_user: NewUser) -> Result<UserProfile, ProfileError> {
        if new_user.email.trim().is_empty() {
            return Err(ProfileError::EmptyEmail);
        }
        let _guard = self.write_lock.lock().await;
        let (profile, snapshot) = {
            let mut state = self.state.write();
            let email = new_user.email.trim();
            if state.roster.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
                return Err(ProfileError::EmailTaken(email.to_string()));
            }
            let profile = UserProfile::new(new_user);
            state.roster.push(profile.clone());
            (profile, state.clone())
        };
        info!(user_id = %profile.id, "Local account created");
        let persisted = self.persist(&snapshot, false).await;
        crate::metrics::record_profile_mutation("create", persisted);
        Ok(profile)
    }

    /// Flip `recipe_id` in the user's favorites. `None` if the user is unknown.
    pub async fn toggle_favorite(&self, user_id: &str, recipe_id: &str) -> Option<UserProfile> {
        self.apply(
            user_id,
            FavoriteToggle {
                recipe_id: recipe_id.to_string(),
            },
        )
        .await
    }

    pub async fn update_shopping_list(
        &self,
        user_id: &str,
        update: ShoppingListReplace,
    ) -> Option<UserProfile> {
        self.apply(user_id, update).await
    }

    pub async fn update_avatar(&self, user_id: &str, update: AvatarUpdate) -> Option<UserProfile> {
        self.apply(user_id, update).await
    }

    pub async fn update_settings(&self, user_id: &str, patch: SettingsPatch) -> Option<UserProfile> {
        self.apply(user_id, patch).await
    }

    /// Apply one explicit update to the roster entry for `user_id`.
    ///
    /// Returns the updated profile, or `None` (a no-op) when no such user
    /// exists. The current-user view follows automatically since it reads
    /// the same roster entry.
    #[tracing::instrument(skip(self, update), fields(kind = U::KIND))]
    pub async fn apply<U: ProfileUpdate>(&self, user_id: &str, update: U) -> Option<UserProfile> {
        let _guard = self.write_lock.lock().await;
        let (updated, snapshot) = {
            let mut state = self.state.write();
            let Some(pos) = state.position(user_id) else {
                debug!(user_id, "Profile not found, update ignored");
                return None;
            };
            update.apply(&mut state.roster[pos]);
            (state.roster[pos].clone(), state.clone())
        };
        let persisted = self.persist(&snapshot, false).await;
        crate::metrics::record_profile_mutation(U::KIND, persisted);
        Some(updated)
    }

    /// Write the roster (and the pointer if it moved). Returns false on a
    /// storage failure.
    async fn persist(&self, state: &ProfileState, pointer_changed: bool) -> bool {
        let mut ok = true;

        if let Err(e) = storage::persist(self.store.as_ref(), &self.keys.users, &state.roster).await {
            warn!(error = %e, "Roster write failed; change kept in memory only");
            ok = false;
        }

        if pointer_changed {
            let result = match &state.current_id {
                Some(id) => {
                    storage::persist(
                        self.store.as_ref(),
                        &self.keys.current_user,
                        &CurrentUserPointer { id: id.clone() },
                    )
                    .await
                }
                None => self.store.delete(&self.keys.current_user).await,
            };
            if let Err(e) = result {
                warn!(error = %e, "Current-user write failed; change kept in memory only");
                ok = false;
            }
        }

        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Language, ShoppingItem};
    use crate::storage::InMemoryStore;
    use serde_json::json;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.into(),
            email: email.into(),
            password: "secret".into(),
            avatar: String::new(),
        }
    }

    async fn repo_with(store: Arc<InMemoryStore>) -> UserProfileRepository {
        UserProfileRepository::load(store, StorageKeys::default()).await
    }

    #[tokio::test]
    async fn test_empty_store_loads_empty() {
        let repo = repo_with(Arc::new(InMemoryStore::new())).await;
        assert!(repo.list_users().is_empty());
        assert!(repo.current_user().is_none());
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let repo = repo_with(Arc::new(InMemoryStore::new())).await;
        repo.create_user(new_user("Afi", "afi@example.com")).await.unwrap();

        let err = repo.create_user(new_user("Other", "AFI@example.com ")).await.unwrap_err();
        assert_eq!(err, ProfileError::EmailTaken("AFI@example.com".into()));
        assert_eq!(
            repo.create_user(new_user("Nobody", "  ")).await.unwrap_err(),
            ProfileError::EmptyEmail
        );
        assert_eq!(repo.list_users().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_matches_id_then_email() {
        let repo = repo_with(Arc::new(InMemoryStore::new())).await;
        let afi = repo.create_user(new_user("Afi", "afi@example.com")).await.unwrap();

        let mut renamed = afi.clone();
        renamed.name = "Afiwa".into();
        repo.upsert_user(renamed).await;
        assert_eq!(repo.list_users().len(), 1);
        assert_eq!(repo.list_users()[0].name, "Afiwa");

        let mut same_email = afi.clone();
        same_email.id = "server-issued".into();
        repo.upsert_user(same_email).await;
        assert_eq!(repo.list_users().len(), 1);
        assert_eq!(repo.list_users()[0].id, "server-issued");

        let mut stranger = afi.clone();
        stranger.id = "s".into();
        stranger.email = "s@example.com".into();
        repo.upsert_user(stranger).await;
        assert_eq!(repo.list_users().len(), 2);
    }

    #[tokio::test]
    async fn test_pointer_follows_email_matched_replacement() {
        let repo = repo_with(Arc::new(InMemoryStore::new())).await;
        let afi = repo.create_user(new_user("Afi", "afi@example.com")).await.unwrap();
        repo.set_current_user(Some(afi.clone())).await;

        let mut reissued = afi.clone();
        reissued.id = "new-id".into();
        repo.upsert_user(reissued).await;

        assert_eq!(repo.current_user().unwrap().id, "new-id");
    }

    #[tokio::test]
    async fn test_sign_out_keeps_roster() {
        let repo = repo_with(Arc::new(InMemoryStore::new())).await;
        let afi = repo.create_user(new_user("Afi", "afi@example.com")).await.unwrap();
        repo.set_current_user(Some(afi.clone())).await;
        assert_eq!(repo.current_user().unwrap().id, afi.id);

        repo.set_current_user(None).await;
        assert!(repo.current_user().is_none());
        assert_eq!(repo.list_users().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_unknown_user_is_noop() {
        let store = Arc::new(InMemoryStore::new());
        let repo = repo_with(store.clone()).await;

        assert!(repo.toggle_favorite("ghost", "r1").await.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_keeps_current_and_roster_in_step() {
        let repo = repo_with(Arc::new(InMemoryStore::new())).await;
        let afi = repo.create_user(new_user("Afi", "afi@example.com")).await.unwrap();
        repo.set_current_user(Some(afi.clone())).await;

        let updated = repo.toggle_favorite(&afi.id, "wo").await.unwrap();
        assert!(updated.is_favorite("wo"));

        let current = repo.current_user().unwrap();
        let roster_entry = repo.get_user(&afi.id).unwrap();
        assert_eq!(current.favorites, roster_entry.favorites);
        assert_eq!(current, updated);

        let back = repo.toggle_favorite(&afi.id, "wo").await.unwrap();
        assert_eq!(back.favorites, afi.favorites);
    }

    #[tokio::test]
    async fn test_mutations_survive_reload() {
        let store = Arc::new(InMemoryStore::new());
        let repo = repo_with(store.clone()).await;
        let afi = repo.create_user(new_user("Afi", "afi@example.com")).await.unwrap();
        repo.set_current_user(Some(afi.clone())).await;
        repo.toggle_favorite(&afi.id, "amiwo").await;
        repo.update_avatar(&afi.id, AvatarUpdate { avatar: "data:image/png;base64,AA==".into() }).await;
        repo.update_settings(&afi.id, SettingsPatch { language: Some(Language::En), ..Default::default() }).await;
        repo.update_shopping_list(
            &afi.id,
            ShoppingListReplace { items: vec![ShoppingItem::new("gari", "1 kg")] },
        )
        .await;

        let reloaded = repo_with(store).await;
        let current = reloaded.current_user().unwrap();
        assert_eq!(current.id, afi.id);
        assert!(current.is_favorite("amiwo"));
        assert_eq!(current.avatar, "data:image/png;base64,AA==");
        assert_eq!(current.settings.language, Language::En);
        assert_eq!(current.shopping_list[0].item, "gari");
    }

    #[tokio::test]
    async fn test_dangling_pointer_is_dropped_on_load() {
        let store = Arc::new(InMemoryStore::new());
        store.set("users", &json!([])).await.unwrap();
        store.set("current_user", &json!({"id": "gone"})).await.unwrap();

        let repo = repo_with(store).await;
        assert!(repo.current_user().is_none());
    }

    #[tokio::test]
    async fn test_legacy_full_profile_pointer_is_accepted() {
        let store = Arc::new(InMemoryStore::new());
        let profile = json!({"id": "u1", "name": "Afi", "email": "afi@example.com"});
        store.set("users", &json!([profile.clone()])).await.unwrap();
        store.set("current_user", &profile).await.unwrap();

        let repo = repo_with(store).await;
        assert_eq!(repo.current_user().unwrap().name, "Afi");
    }

    #[tokio::test]
    async fn test_corrupt_roster_loads_as_empty() {
        let store = Arc::new(InMemoryStore::new());
        store.set("users", &json!({"not": "a list"})).await.unwrap();

        let repo = repo_with(store).await;
        assert!(repo.list_users().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_email_ignores_case_and_whitespace() {
        let repo = repo_with(Arc::new(InMemoryStore::new())).await;
        let afi = repo.create_user(new_user("Afi", "Afi@Example.com")).await.unwrap();
        repo.create_user(new_user("Kodjo", "kodjo@example.com")).await.unwrap();

        let found = repo.find_by_email("  afi@EXAMPLE.com\n").unwrap();
        assert_eq!(found.id, afi.id);
        assert_eq!(repo.find_by_email("KODJO@example.com").unwrap().name, "Kodjo");

        assert!(repo.find_by_email("afi@example.org").is_none());
        assert!(repo.find_by_email("").is_none());
        assert!(repo.find_by_email("   ").is_none());
    }
}
