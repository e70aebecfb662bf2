//! # Store Search Shared
//!
//! Types shared between the search repository, the bulk pipeline and the
//! process wiring: document declarations and the identity scheme used to
//! address catalog entities across regions.

pub mod declaration;
pub mod identity;

pub use declaration::{DocumentDeclaration, DEFAULT_DOC_TYPE};
pub use identity::{composite_id, fan_out_ids, resolve_lookup, DocumentLookup, EntityKind};
