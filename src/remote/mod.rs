// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote catalog source.
//!
//! [`RemoteCatalogSource::fetch_all`] performs one full-catalog read and
//! returns a fresh [`CatalogSnapshot`]. Sources never fall back to the local
//! cache; a failure is reported as [`RemoteFetchError`] and the coordinator
//! decides what to serve.
//!
//! # Row mapping
//!
//! Remote rows use snake_case for the multi-word fields; everything else maps
//! by identical name:
//!
//! | remote                  | internal               |
//! |-------------------------|------------------------|
//! | `prep_time`             | `prep_time` (`prepTime`) |
//! | `cook_time`             | `cook_time` (`cookTime`) |
//! | `technique_title`       | `technique_title`      |
//! | `technique_description` | `technique_description`|
//! | `type`                  | `kind`                 |
//!
//! `null` text columns read as empty, `null` arrays as empty. Decoding is
//! strict otherwise: one undecodable row fails the whole fetch, so a
//! half-understood catalog is never published.

pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::recipe::{CatalogSnapshot, Difficulty, Ingredient, Recipe};

pub use rest::RestCatalogSource;

/// A failed full-catalog fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteFetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response, including auth rejections
    #[error("Remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Catalog payload does not decode: {reason}")]
    Decode { reason: String },

    #[error("Invalid remote configuration: {0}")]
    InvalidConfig(String),
}

impl RemoteFetchError {
    /// Metric label for this failure.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status { status, .. } if *status == 401 || *status == 403 => "auth",
            Self::Status { .. } => "status",
            Self::Decode { .. } => "decode",
            Self::InvalidConfig(_) => "config",
        }
    }
}

/// Anything that can produce the full catalog.
#[async_trait]
pub trait RemoteCatalogSource: Send + Sync {
    /// Fetch every recipe, ordered by name as the remote returns them.
    async fn fetch_all(&self) -> Result<CatalogSnapshot, RemoteFetchError>;
}

/// Catalog row as the remote service sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRecipeRow {
    pub id: RowId,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub region: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    pub difficulty: Difficulty,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prep_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cook_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ingredients: Vec<RemoteIngredient>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub benefits: Option<String>,
    #[serde(default)]
    pub technique_title: Option<String>,
    #[serde(default)]
    pub technique_description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

/// Primary key as text or integer; always a string internally.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Text(String),
    Number(i64),
}

impl From<RowId> for String {
    fn from(id: RowId) -> Self {
        match id {
            RowId::Text(s) => s,
            RowId::Number(n) => n.to_string(),
        }
    }
}

/// Ingredient as stored remotely: structured, or a bare item name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RemoteIngredient {
    Structured(Ingredient),
    Plain(String),
}

impl From<RemoteIngredient> for Ingredient {
    fn from(ingredient: RemoteIngredient) -> Self {
        match ingredient {
            RemoteIngredient::Structured(i) => i,
            RemoteIngredient::Plain(item) => Ingredient::new(item, ""),
        }
    }
}

impl From<RemoteRecipeRow> for Recipe {
    fn from(row: RemoteRecipeRow) -> Self {
        Recipe {
            id: row.id.into(),
            name: row.name,
            region: row.region,
            category: row.category,
            difficulty: row.difficulty,
            prep_time: row.prep_time,
            cook_time: row.cook_time,
            image: row.image,
            ingredients: row.ingredients.into_iter().map(Ingredient::from).collect(),
            steps: row.steps,
            alias: row.alias,
            benefits: row.benefits,
            technique_title: row.technique_title,
            technique_description: row.technique_description,
            kind: row.kind,
            base: row.base,
            style: row.style,
        }
    }
}

/// Decode a full-table response body into recipes, in payload order.
pub fn decode_rows(body: &[u8]) -> Result<Vec<Recipe>, RemoteFetchError> {
    let rows: Vec<RemoteRecipeRow> =
        serde_json::from_slice(body).map_err(|e| RemoteFetchError::Decode {
            reason: e.to_string(),
        })?;
    Ok(rows.into_iter().map(Recipe::from).collect())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_mapping() {
        let body = br#"[{
            "id": 7,
            "name": "Wo",
            "region": "Sud",
            "category": "Plat",
            "difficulty": "Moyen",
            "prep_time": "10 min",
            "cook_time": "30 min",
            "image": null,
            "ingredients": [{"item": "mais", "amount": "500 g"}, "sel"],
            "steps": ["Bouillir", "Tourner"],
            "technique_title": "Tourner",
            "technique_description": "Sans arret",
            "type": "sale",
            "created_at": "2024-01-01T00:00:00Z"
        }]"#;

        let recipes = decode_rows(body).unwrap();
        let r = &recipes[0];
        assert_eq!(r.id, "7");
        assert_eq!(r.prep_time, "10 min");
        assert_eq!(r.cook_time, "30 min");
        assert_eq!(r.image, "");
        assert_eq!(r.difficulty, Difficulty::Medium);
        assert_eq!(r.ingredients[1], Ingredient::new("sel", ""));
        assert_eq!(r.technique_title.as_deref(), Some("Tourner"));
        assert_eq!(r.technique_description.as_deref(), Some("Sans arret"));
        assert_eq!(r.kind.as_deref(), Some("sale"));
        assert!(r.alias.is_none());
    }

    #[test]
    fn test_null_collections_read_empty() {
        let body = br#"[{"id": "a", "name": "A", "difficulty": "Facile", "ingredients": null, "steps": null}]"#;
        let recipes = decode_rows(body).unwrap();
        assert!(recipes[0].ingredients.is_empty());
        assert!(recipes[0].steps.is_empty());
    }

    #[test]
    fn test_one_bad_row_fails_the_fetch() {
        let body = br#"[
            {"id": "a", "name": "A", "difficulty": "Facile"},
            {"id": "b", "name": "B", "difficulty": "Impossible"}
        ]"#;
        assert!(matches!(decode_rows(body), Err(RemoteFetchError::Decode { .. })));
        assert!(matches!(decode_rows(b"{\"message\": \"nope\"}"), Err(RemoteFetchError::Decode { .. })));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(RemoteFetchError::Transport("x".into()).kind(), "transport");
        assert_eq!(RemoteFetchError::Status { status: 401, body: String::new() }.kind(), "auth");
        assert_eq!(RemoteFetchError::Status { status: 503, body: String::new() }.kind(), "status");
        assert_eq!(RemoteFetchError::Decode { reason: String::new() }.kind(), "decode");
    }
}
