// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Local user profile model and explicit update types.
//!
//! Profiles are local-only. Every mutation goes through one of the update
//! structs below ([`FavoriteToggle`], [`ShoppingListReplace`],
//! [`AvatarUpdate`], [`SettingsPatch`]) so a partial or malformed change
//! cannot be merged onto a profile by accident.
//!
//! Credentials are carried as an opaque string for storage compatibility
//! only. Nothing in this crate hashes or verifies them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::recipe::Recipe;

/// UI language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
    Es,
}

/// Unit system for ingredient amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub unit_system: UnitSystem,
}

/// One shopping list entry, addressable by its own `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    pub id: String,
    pub item: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub is_purchased: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
}

impl ShoppingItem {
    /// A free-standing entry with a fresh id.
    pub fn new(item: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            item: item.into(),
            amount: amount.into(),
            is_purchased: false,
            recipe_name: None,
            recipe_id: None,
        }
    }

    /// One entry per ingredient of `recipe`, linked back to it.
    #[must_use]
    pub fn from_recipe(recipe: &Recipe) -> Vec<Self> {
        recipe
            .ingredients
            .iter()
            .map(|ingredient| Self {
                recipe_name: Some(recipe.name.clone()),
                recipe_id: Some(recipe.id.clone()),
                ..Self::new(ingredient.item.clone(), ingredient.amount.clone())
            })
            .collect()
    }
}

/// A locally known user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Opaque; never compared or hashed here
    #[serde(default)]
    pub password: String,
    /// Data URI or URL
    #[serde(default)]
    pub avatar: String,
    /// Recipe ids (membership only)
    #[serde(default)]
    pub favorites: BTreeSet<String>,
    #[serde(default)]
    pub shopping_list: Vec<ShoppingItem>,
    #[serde(default)]
    pub settings: Settings,
}

impl std::fmt::Debug for UserProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserProfile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("avatar", &self.avatar.len())
            .field("favorites", &self.favorites)
            .field("shopping_list", &self.shopping_list.len())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Sign-up payload.
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub avatar: String,
}

impl UserProfile {
    /// A new profile with a client-generated id and default settings.
    pub fn new(new_user: NewUser) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: new_user.name,
            email: new_user.email.trim().to_string(),
            password: new_user.password,
            avatar: new_user.avatar,
            favorites: BTreeSet::new(),
            shopping_list: Vec::new(),
            settings: Settings::default(),
        }
    }

    #[must_use]
    pub fn is_favorite(&self, recipe_id: &str) -> bool {
        self.favorites.contains(recipe_id)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Explicit updates
// ═══════════════════════════════════════════════════════════════════════════

/// A field-level change to one profile.
pub trait ProfileUpdate {
    /// Short name for logs and metrics.
    const KIND: &'static str;

    fn apply(self, profile: &mut UserProfile);
}

/// Flip membership of one recipe in `favorites`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteToggle {
    pub recipe_id: String,
}

impl ProfileUpdate for FavoriteToggle {
    const KIND: &'static str = "favorite_toggle";

    fn apply(self, profile: &mut UserProfile) {
        if !profile.favorites.remove(&self.recipe_id) {
            profile.favorites.insert(self.recipe_id);
        }
    }
}

/// Replace the whole shopping list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListReplace {
    pub items: Vec<ShoppingItem>,
}

impl ShoppingListReplace {
    /// Start from the current list to build the replacement.
    #[must_use]
    pub fn from_current(profile: &UserProfile) -> Self {
        Self {
            items: profile.shopping_list.clone(),
        }
    }

    /// Append every ingredient of `recipe`.
    #[must_use]
    pub fn add_recipe(mut self, recipe: &Recipe) -> Self {
        self.items.extend(ShoppingItem::from_recipe(recipe));
        self
    }

    #[must_use]
    pub fn push(mut self, item: ShoppingItem) -> Self {
        self.items.push(item);
        self
    }

    /// Flip `is_purchased` on the entry with `item_id` (no-op if absent).
    #[must_use]
    pub fn toggle_purchased(mut self, item_id: &str) -> Self {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.is_purchased = !item.is_purchased;
        }
        self
    }

    #[must_use]
    pub fn remove(mut self, item_id: &str) -> Self {
        self.items.retain(|i| i.id != item_id);
        self
    }

    #[must_use]
    pub fn clear_purchased(mut self) -> Self {
        self.items.retain(|i| !i.is_purchased);
        self
    }
}

impl ProfileUpdate for ShoppingListReplace {
    const KIND: &'static str = "shopping_list_replace";

    fn apply(self, profile: &mut UserProfile) {
        profile.shopping_list = self.items;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarUpdate {
    pub avatar: String,
}

impl ProfileUpdate for AvatarUpdate {
    const KIND: &'static str = "avatar_update";

    fn apply(self, profile: &mut UserProfile) {
        profile.avatar = self.avatar;
    }
}

/// Only the `Some` fields are changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default)]
    pub dark_mode: Option<bool>,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub unit_system: Option<UnitSystem>,
}

impl ProfileUpdate for SettingsPatch {
    const KIND: &'static str = "settings_patch";

    fn apply(self, profile: &mut UserProfile) {
        if let Some(dark_mode) = self.dark_mode {
            profile.settings.dark_mode = dark_mode;
        }
        if let Some(language) = self.language {
            profile.settings.language = language;
        }
        if let Some(unit_system) = self.unit_system {
            profile.settings.unit_system = unit_system;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{Difficulty, Ingredient};

    fn profile() -> UserProfile {
        UserProfile::new(NewUser {
            name: "Afi".into(),
            email: " afi@example.com ".into(),
            password: "hunter2".into(),
            avatar: String::new(),
        })
    }

    #[test]
    fn test_new_profile_defaults() {
        let p = profile();
        assert!(!p.id.is_empty());
        assert_eq!(p.email, "afi@example.com");
        assert!(p.favorites.is_empty());
        assert_eq!(p.settings, Settings::default());
        assert_eq!(p.settings.language, Language::Fr);
    }

    #[test]
    fn test_debug_redacts_password() {
        let p = profile();
        let rendered = format!("{:?}", p);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_favorite_toggle_is_an_involution() {
        let mut p = profile();
        let before = p.favorites.clone();

        FavoriteToggle { recipe_id: "r1".into() }.apply(&mut p);
        assert!(p.is_favorite("r1"));

        FavoriteToggle { recipe_id: "r1".into() }.apply(&mut p);
        assert_eq!(p.favorites, before);
    }

    #[test]
    fn test_settings_patch_touches_only_given_fields() {
        let mut p = profile();
        SettingsPatch {
            dark_mode: Some(true),
            ..Default::default()
        }
        .apply(&mut p);

        assert!(p.settings.dark_mode);
        assert_eq!(p.settings.language, Language::Fr);
        assert_eq!(p.settings.unit_system, UnitSystem::Metric);

        let patch: SettingsPatch = serde_json::from_str(r#"{"unitSystem": "imperial"}"#).unwrap();
        patch.apply(&mut p);
        assert!(p.settings.dark_mode);
        assert_eq!(p.settings.unit_system, UnitSystem::Imperial);
    }

    #[test]
    fn test_shopping_list_builders() {
        let mut recipe = Recipe::new("r1", "Amiwô", Difficulty::Medium);
        recipe.ingredients = vec![Ingredient::new("maïs", "500 g"), Ingredient::new("tomate", "3")];

        let mut p = profile();
        let replace = ShoppingListReplace::from_current(&p)
            .add_recipe(&recipe)
            .push(ShoppingItem::new("sel", "1 pincée"));
        assert_eq!(replace.items.len(), 3);
        assert_eq!(replace.items[0].recipe_id.as_deref(), Some("r1"));
        assert_eq!(replace.items[1].recipe_name.as_deref(), Some("Amiwô"));
        assert_ne!(replace.items[0].id, replace.items[1].id);

        let first = replace.items[0].id.clone();
        let salt = replace.items[2].id.clone();
        replace.toggle_purchased(&first).remove(&salt).apply(&mut p);

        assert_eq!(p.shopping_list.len(), 2);
        assert!(p.shopping_list[0].is_purchased);

        ShoppingListReplace::from_current(&p).clear_purchased().apply(&mut p);
        assert_eq!(p.shopping_list.len(), 1);
        assert_eq!(p.shopping_list[0].item, "tomate");
    }

    #[test]
    fn test_profile_json_shape() {
        let mut p = profile();
        p.shopping_list.push(ShoppingItem::new("sel", "1"));
        let json = serde_json::to_value(&p).unwrap();

        assert!(json.get("shoppingList").is_some());
        assert_eq!(json["shoppingList"][0]["isPurchased"], false);
        assert_eq!(json["settings"]["darkMode"], false);
        assert_eq!(json["settings"]["unitSystem"], "metric");

        let back: UserProfile = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }
}
