// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Recipe catalog data model.
//!
//! A [`Recipe`] is owned by the curated remote catalog and is read-only from
//! the device's perspective. A [`CatalogSnapshot`] is one complete, atomic
//! version of the catalog; it is replaced wholesale on every successful sync.
//!
//! # Ingestion
//!
//! [`CatalogSnapshot::ingest`] is the only way records enter a snapshot. It
//! enforces the snapshot invariants:
//! - ids are never empty (empty-id records are dropped)
//! - ids are unique; on duplicates the **last** record wins, keeping the
//!   position of the first occurrence
//!
//! ```
//! use recipe_sync::{CatalogSnapshot, Difficulty, Recipe};
//!
//! let snapshot = CatalogSnapshot::fresh(vec![
//!     Recipe::new("A", "Wô", Difficulty::Easy),
//!     Recipe::new("B", "Amiwô", Difficulty::Medium),
//!     Recipe::new("A", "Wô v2", Difficulty::Easy),
//! ]);
//!
//! assert_eq!(snapshot.len(), 2);
//! assert_eq!(snapshot.get("A").unwrap().name, "Wô v2");
//! assert_eq!(snapshot.recipes()[0].id, "A");
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::profile::UserProfile;

/// Closed set of difficulty levels shown on recipe cards.
///
/// Serialized with the catalog's French labels; English spellings are
/// accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "Facile", alias = "facile", alias = "Easy", alias = "easy")]
    Easy,
    #[serde(rename = "Moyen", alias = "moyen", alias = "Medium", alias = "medium")]
    Medium,
    #[serde(rename = "Difficile", alias = "difficile", alias = "Hard", alias = "hard")]
    Hard,
}

impl Difficulty {
    /// Catalog label for this level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "Facile",
            Self::Medium => "Moyen",
            Self::Hard => "Difficile",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ingredient line. Sequence order is display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub item: String,
    #[serde(default)]
    pub amount: String,
}

impl Ingredient {
    pub fn new(item: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            amount: amount.into(),
        }
    }
}

/// A catalog recipe in its internal (camelCase) shape.
///
/// `prep_time` / `cook_time` are free text and never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    /// Reconciliation key, stable across syncs
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub category: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub prep_time: String,
    #[serde(default)]
    pub cook_time: String,
    /// URL or empty string
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    /// Execution order
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique_description: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl Recipe {
    /// Create a recipe with the required fields; everything else empty.
    pub fn new(id: impl Into<String>, name: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            region: String::new(),
            category: String::new(),
            difficulty,
            prep_time: String::new(),
            cook_time: String::new(),
            image: String::new(),
            ingredients: Vec::new(),
            steps: Vec::new(),
            alias: None,
            benefits: None,
            technique_title: None,
            technique_description: None,
            kind: None,
            base: None,
            style: None,
        }
    }
}

/// Where a snapshot's contents came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Produced by a successful remote fetch in this process
    Fresh,
    /// Served from the local cache
    Stale,
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::Stale => write!(f, "stale"),
        }
    }
}

/// One complete, de-duplicated version of the catalog.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    recipes: Vec<Recipe>,
    index: HashMap<String, usize>,
    freshness: Freshness,
    /// Epoch millis of the fetch that produced these records (0 = unknown)
    fetched_at: i64,
}

impl CatalogSnapshot {
    /// Ingest records produced by a successful fetch, stamped now.
    pub fn fresh(records: impl IntoIterator<Item = Recipe>) -> Self {
        Self::ingest(records, Freshness::Fresh, crate::now_millis())
    }

    /// Rebuild a snapshot from the local cache.
    pub fn cached(records: impl IntoIterator<Item = Recipe>, fetched_at: i64) -> Self {
        Self::ingest(records, Freshness::Stale, fetched_at)
    }

    /// An empty snapshot (nothing ever fetched).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            recipes: Vec::new(),
            index: HashMap::new(),
            freshness: Freshness::Stale,
            fetched_at: 0,
        }
    }

    /// Build a snapshot, enforcing id invariants (last write wins).
    pub fn ingest(
        records: impl IntoIterator<Item = Recipe>,
        freshness: Freshness,
        fetched_at: i64,
    ) -> Self {
        let mut recipes: Vec<Recipe> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut dropped = 0usize;
        let mut replaced = 0usize;

        for recipe in records {
            if recipe.id.trim().is_empty() {
                dropped += 1;
                continue;
            }
            match index.get(&recipe.id) {
                Some(&pos) => {
                    recipes[pos] = recipe;
                    replaced += 1;
                }
                None => {
                    index.insert(recipe.id.clone(), recipes.len());
                    recipes.push(recipe);
                }
            }
        }

        if dropped > 0 {
            warn!(dropped, "Dropped catalog records with an empty id");
        }
        if replaced > 0 {
            debug!(replaced, "Duplicate recipe ids collapsed (last occurrence wins)");
        }

        Self {
            recipes,
            index,
            freshness,
            fetched_at,
        }
    }

    /// Same records, marked as served from cache.
    #[must_use]
    pub fn as_stale(&self) -> Self {
        Self {
            freshness: Freshness::Stale,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }

    #[must_use]
    pub fn into_recipes(self) -> Vec<Recipe> {
        self.recipes
    }

    #[must_use]
    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.freshness == Freshness::Fresh
    }

    #[must_use]
    pub fn fetched_at(&self) -> i64 {
        self.fetched_at
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Look up a recipe by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.index.get(id).and_then(|&pos| self.recipes.get(pos))
    }

    /// Recipes in a category (case-insensitive), catalog order.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<&Recipe> {
        self.recipes
            .iter()
            .filter(|r| r.category.eq_ignore_ascii_case(category))
            .collect()
    }

    /// Recipes from a region (case-insensitive), catalog order.
    #[must_use]
    pub fn by_region(&self, region: &str) -> Vec<&Recipe> {
        self.recipes
            .iter()
            .filter(|r| r.region.eq_ignore_ascii_case(region))
            .collect()
    }

    /// Case-insensitive substring match on name and alias.
    /// A blank query matches everything.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Recipe> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.recipes.iter().collect();
        }
        self.recipes
            .iter()
            .filter(|r| {
                r.name.to_lowercase().contains(&needle)
                    || r.alias
                        .as_deref()
                        .is_some_and(|a| a.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Distinct non-empty categories, first-seen order.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        distinct(self.recipes.iter().map(|r| r.category.as_str()))
    }

    /// Distinct non-empty regions, first-seen order.
    #[must_use]
    pub fn regions(&self) -> Vec<&str> {
        distinct(self.recipes.iter().map(|r| r.region.as_str()))
    }

    /// The user's favorites that exist in this snapshot, catalog order.
    /// Favorites pointing at recipes no longer in the catalog are skipped.
    #[must_use]
    pub fn resolve_favorites(&self, profile: &UserProfile) -> Vec<&Recipe> {
        self.recipes
            .iter()
            .filter(|r| profile.favorites.contains(&r.id))
            .collect()
    }
}

impl Default for CatalogSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: &str, name: &str) -> Recipe {
        Recipe::new(id, name, Difficulty::Easy)
    }

    #[test]
    fn test_ingest_last_occurrence_wins() {
        let snapshot = CatalogSnapshot::fresh(vec![
            recipe("a", "first"),
            recipe("b", "other"),
            recipe("a", "second"),
            recipe("a", "third"),
        ]);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.recipes()[0].name, "third");
        assert_eq!(snapshot.recipes()[1].id, "b");
        assert_eq!(snapshot.get("a").unwrap().name, "third");
    }

    #[test]
    fn test_ingest_drops_empty_ids() {
        let snapshot = CatalogSnapshot::fresh(vec![recipe("", "ghost"), recipe("  ", "blank"), recipe("x", "real")]);

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("").is_none());
        assert_eq!(snapshot.recipes()[0].id, "x");
    }

    #[test]
    fn test_freshness_markers() {
        let fresh = CatalogSnapshot::fresh(vec![recipe("a", "A")]);
        assert!(fresh.is_fresh());
        assert!(fresh.fetched_at() > 0);

        let stale = fresh.as_stale();
        assert_eq!(stale.freshness(), Freshness::Stale);
        assert_eq!(stale.recipes(), fresh.recipes());
        assert_eq!(stale.fetched_at(), fresh.fetched_at());

        let cached = CatalogSnapshot::cached(vec![recipe("a", "A")], 42);
        assert_eq!(cached.freshness(), Freshness::Stale);
        assert_eq!(cached.fetched_at(), 42);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = CatalogSnapshot::default();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.fetched_at(), 0);
        assert!(!snapshot.is_fresh());
    }

    #[test]
    fn test_filters_and_search() {
        let mut wo = recipe("1", "Wô");
        wo.category = "Plat".into();
        wo.region = "Sud".into();
        wo.alias = Some("Pâte de maïs".into());
        let mut amiwo = recipe("2", "Amiwô");
        amiwo.category = "plat".into();
        amiwo.region = "Sud".into();
        let mut tchoukoutou = recipe("3", "Tchoukoutou");
        tchoukoutou.category = "Boisson".into();
        tchoukoutou.region = "Nord".into();

        let snapshot = CatalogSnapshot::fresh(vec![wo, amiwo, tchoukoutou]);

        assert_eq!(snapshot.by_category("PLAT").len(), 2);
        assert_eq!(snapshot.by_region("nord")[0].id, "3");
        assert_eq!(snapshot.search("wô").len(), 2);
        assert_eq!(snapshot.search("maïs")[0].id, "1");
        assert_eq!(snapshot.search("   ").len(), 3);
        assert_eq!(snapshot.categories(), vec!["Plat", "plat", "Boisson"]);
        assert_eq!(snapshot.regions(), vec!["Sud", "Nord"]);
    }

    #[test]
    fn test_recipe_json_shape() {
        let mut r = recipe("a", "Wô");
        r.prep_time = "10 min".into();
        r.technique_title = Some("Tourner".into());
        r.kind = Some("salé".into());
        r.ingredients = vec![Ingredient::new("maïs", "500 g")];

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["prepTime"], "10 min");
        assert_eq!(json["techniqueTitle"], "Tourner");
        assert_eq!(json["type"], "salé");
        assert_eq!(json["difficulty"], "Facile");
        assert_eq!(json["ingredients"][0]["item"], "maïs");
        assert!(json.get("alias").is_none());

        let back: Recipe = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_difficulty_accepts_english_aliases() {
        let d: Difficulty = serde_json::from_str("\"hard\"").unwrap();
        assert_eq!(d, Difficulty::Hard);
        assert_eq!(d.to_string(), "Difficile");
        assert!(serde_json::from_str::<Difficulty>("\"extreme\"").is_err());
    }
}
