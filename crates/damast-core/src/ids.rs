//! Entity identifiers

use std::collections::BTreeSet;

pub type PlaceId = u32;
pub type ReligionId = u32;
pub type SourceId = u32;
pub type TagId = u32;
pub type TupleId = u32;

/// Ordered id set. Ordered so that payloads serialize deterministically.
pub type IdSet<T> = BTreeSet<T>;
