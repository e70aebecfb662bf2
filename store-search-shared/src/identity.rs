//! Document identity scheme.
//!
//! Catalog entities are replicated per region. Region-partitioned kinds are
//! addressed as `{kind}-{region}-{id}`; the remaining kinds use the bare
//! numeric id. A lookup without a region fans out over every valid region.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kinds of catalog entities stored in the search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Track,
    Album,
    Singer,
    Video,
    InterviewVideo,
}

impl EntityKind {
    /// Every kind, in declaration order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Track,
        EntityKind::Album,
        EntityKind::Singer,
        EntityKind::Video,
        EntityKind::InterviewVideo,
    ];

    /// Name used in composite ids and configuration keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Track => "track",
            EntityKind::Album => "album",
            EntityKind::Singer => "singer",
            EntityKind::Video => "video",
            EntityKind::InterviewVideo => "interview_video",
        }
    }

    /// Whether documents of this kind carry the region in their id.
    pub fn is_region_partitioned(&self) -> bool {
        matches!(
            self,
            EntityKind::Track | EntityKind::Album | EntityKind::Singer
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown entity kind: {}", s))
    }
}

/// Build the engine document id for an entity in a region.
///
/// The region is ignored for kinds that are not region-partitioned.
pub fn composite_id(kind: EntityKind, region: i32, numeric_id: i64) -> String {
    if kind.is_region_partitioned() {
        format!("{}-{}-{}", kind, region, numeric_id)
    } else {
        numeric_id.to_string()
    }
}

/// Composite ids for one entity across every region, in region order.
pub fn fan_out_ids(kind: EntityKind, numeric_id: i64, regions: &[i32]) -> Vec<String> {
    regions
        .iter()
        .map(|region| composite_id(kind, *region, numeric_id))
        .collect()
}

/// How a lookup must be issued against the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLookup {
    /// A single document get.
    Single(String),
    /// A multi-get over candidate ids; any subset may exist.
    Multi(Vec<String>),
}

/// Resolve the ids to look up for `numeric_id`.
///
/// With a region (or for a kind without regions) this is a single id.
/// Without one, a region-partitioned kind fans out over `valid_regions`.
pub fn resolve_lookup(
    kind: EntityKind,
    region: Option<i32>,
    numeric_id: i64,
    valid_regions: &[i32],
) -> DocumentLookup {
    match region {
        Some(region) => DocumentLookup::Single(composite_id(kind, region, numeric_id)),
        None if !kind.is_region_partitioned() => {
            DocumentLookup::Single(numeric_id.to_string())
        }
        None => DocumentLookup::Multi(fan_out_ids(kind, numeric_id, valid_regions)),
    }
}
