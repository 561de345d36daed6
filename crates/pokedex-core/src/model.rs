//! Wire-shaped domain types.
//!
//! Serialized field names are part of the public API contract with the
//! client application and must not change casually; several of them carry
//! historical capitalization (`Text`, `Stats`, `Name`) that clients already
//! depend on.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Abridged entry sent to the client on a range load.
///
/// One summary per upstream identifier; immutable once constructed from an
/// upstream payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PokemonSummary {
    /// Upstream resource URL this summary was fetched from.
    pub url: String,
    /// Upstream-assigned numeric identifier.
    pub id: u32,
    /// Canonical lowercase name.
    pub name: String,
    /// Front sprite image URL.
    pub sprite: String,
    /// Type names in upstream slot order.
    pub types: Vec<String>,
}

/// One flavor-text row from the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FlavorText {
    /// Game version the text belongs to.
    #[serde(rename = "Version")]
    pub version: i64,
    /// The description text itself.
    #[serde(rename = "Text")]
    pub text: String,
}

/// A name/value reference as the upstream API nests them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NamedRef {
    /// Referenced resource name.
    pub name: String,
}

/// Front/back sprite URLs for the detail view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DetailSprites {
    /// Front sprite URL, if the upstream has one.
    #[serde(rename = "front_default", default)]
    pub front: Option<String>,
    /// Back sprite URL, if the upstream has one.
    #[serde(rename = "back_default", default)]
    pub back: Option<String>,
}

/// One base-stat entry for the detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DetailStat {
    /// Base stat value.
    #[serde(rename = "base_stat")]
    pub value: i64,
    /// Which stat this value belongs to.
    pub stat: NamedRef,
}

/// One type slot for the detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DetailType {
    /// The referenced type.
    #[serde(rename = "type")]
    pub kind: NamedRef,
}

/// In-depth data sent for a single pokemon.
///
/// Combines the upstream detail payload with flavor-text rows from the
/// local store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PokemonDetail {
    /// Flavor-text rows, empty when the store has none.
    #[serde(rename = "Text", default)]
    pub text: Vec<FlavorText>,
    /// Sprite URLs.
    #[serde(rename = "sprites", default)]
    pub sprites: DetailSprites,
    /// Base stats.
    #[serde(rename = "Stats", default)]
    pub stats: Vec<DetailStat>,
    /// Type slots.
    #[serde(rename = "Types", default)]
    pub types: Vec<DetailType>,
}

/// One autocomplete match from the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct SearchMatch {
    /// Matched name.
    pub name: String,
    /// Height in upstream units.
    pub height: i64,
    /// Weight in upstream units.
    pub weight: i64,
}

/// A single identifier whose fetch did not produce a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    /// The identifier that failed.
    pub id: u32,
    /// Human-readable failure reason.
    pub reason: String,
}

impl FetchFailure {
    /// Creates a failure record for the given identifier.
    #[must_use]
    pub fn new(id: u32, reason: impl Into<String>) -> Self {
        Self {
            id,
            reason: reason.into(),
        }
    }
}

/// Result of aggregating one identifier range.
///
/// `entries` is sorted ascending by id. On full success its length equals
/// the range span and `failures` is empty; otherwise each failed identifier
/// appears exactly once in `failures`.
#[derive(Debug, Clone, Default)]
pub struct RangeOutcome {
    /// Successfully fetched summaries, sorted ascending by id.
    pub entries: Vec<PokemonSummary>,
    /// Identifiers that produced no summary, with reasons.
    pub failures: Vec<FetchFailure>,
}

impl RangeOutcome {
    /// Returns true when every dispatched fetch produced a summary.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
