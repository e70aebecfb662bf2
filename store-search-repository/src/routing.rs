//! Index routing for catalog entities.
//!
//! Maps each [`EntityKind`] to the index (and document type) it is stored
//! in. Typed and typeless clusters use different layouts, so the default
//! table depends on the engine protocol.

use std::collections::BTreeMap;

use store_search_shared::declaration::normalize_doc_type;
use store_search_shared::EntityKind;

use crate::config::EngineProtocol;
use crate::errors::SearchError;

/// Suffix of the regional indices.
pub const DEFAULT_REGIONAL_SUFFIX: &str = "_th";

/// An index plus the document type used inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRoute {
    pub index: String,
    pub doc_type: String,
}

impl IndexRoute {
    /// Create a route; an empty type becomes the default type.
    pub fn new(index: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: normalize_doc_type(doc_type.into()),
        }
    }

    /// Parse `index` or `index/type`.
    pub fn parse(raw: &str) -> Result<Self, SearchError> {
        let raw = raw.trim();
        let (index, doc_type) = match raw.split_once('/') {
            Some((index, doc_type)) => (index.trim(), doc_type.trim()),
            None => (raw, ""),
        };
        if index.is_empty() {
            return Err(SearchError::invalid_input(format!(
                "index route '{}' has no index name",
                raw
            )));
        }
        Ok(Self::new(index, doc_type))
    }

    /// The same route on an index carrying `suffix`.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            index: format!("{}{}", self.index, suffix),
            doc_type: self.doc_type.clone(),
        }
    }
}

/// Routing table from entity kind to index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRoutes {
    routes: BTreeMap<EntityKind, IndexRoute>,
    regional_suffix: Option<String>,
}

impl IndexRoutes {
    /// Layout of the typed cluster: one shared music index with a type per
    /// kind, and a separate video index.
    pub fn typed() -> Self {
        let routes = BTreeMap::from([
            (EntityKind::Track, IndexRoute::new("joox_music", "tracks")),
            (EntityKind::Album, IndexRoute::new("joox_music", "albums")),
            (EntityKind::Singer, IndexRoute::new("joox_music", "singers")),
            (EntityKind::Video, IndexRoute::new("video", "music_mv")),
            (EntityKind::InterviewVideo, IndexRoute::new("video", "interview_mv")),
        ]);
        Self {
            routes,
            regional_suffix: Some(DEFAULT_REGIONAL_SUFFIX.to_string()),
        }
    }

    /// Layout of the typeless cluster: one index per kind.
    pub fn typeless() -> Self {
        let routes = BTreeMap::from([
            (EntityKind::Track, IndexRoute::new("joox_tracks", "")),
            (EntityKind::Album, IndexRoute::new("joox_albums", "")),
            (EntityKind::Singer, IndexRoute::new("joox_singers", "")),
            (EntityKind::Video, IndexRoute::new("music_mv", "")),
            (EntityKind::InterviewVideo, IndexRoute::new("interview_mv", "")),
        ]);
        Self {
            routes,
            regional_suffix: Some(DEFAULT_REGIONAL_SUFFIX.to_string()),
        }
    }

    /// Default layout for a protocol generation.
    pub fn for_protocol(protocol: EngineProtocol) -> Self {
        match protocol {
            EngineProtocol::Typed => Self::typed(),
            EngineProtocol::Typeless => Self::typeless(),
        }
    }

    /// Override the route of one kind.
    pub fn with_route(mut self, kind: EntityKind, route: IndexRoute) -> Self {
        self.routes.insert(kind, route);
        self
    }

    /// Set or clear the regional index suffix.
    pub fn with_regional_suffix(mut self, suffix: Option<String>) -> Self {
        self.regional_suffix = suffix.filter(|s| !s.is_empty());
        self
    }

    /// Route of a kind.
    pub fn route(&self, kind: EntityKind) -> Result<&IndexRoute, SearchError> {
        self.routes
            .get(&kind)
            .ok_or_else(|| SearchError::invalid_input(format!("no index route for {}", kind)))
    }

    /// Regional route of a kind: its index with the regional suffix.
    pub fn regional(&self, kind: EntityKind) -> Result<IndexRoute, SearchError> {
        let suffix = self.regional_suffix.as_deref().ok_or_else(|| {
            SearchError::invalid_input(format!("no regional index configured for {}", kind))
        })?;
        Ok(self.route(kind)?.with_suffix(suffix))
    }

    /// Primary or regional route of a kind, as chosen by the caller.
    pub fn select(&self, kind: EntityKind, regional: bool) -> Result<IndexRoute, SearchError> {
        if regional {
            self.regional(kind)
        } else {
            self.route(kind).cloned()
        }
    }
}
