//! Tag list counts

use serde::{Deserialize, Serialize};

use damast_core::{IdSet, TagId};
use damast_data::model::Tag;
use damast_data::DatasetSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRow {
    pub tag_id: TagId,
    pub name: String,
    pub active_tuples: usize,
    pub total_tuples: usize,
    pub brushed: bool,
}

/// Active and total tuple count per tag, sorted by name
pub fn tag_counts(snapshot: &DatasetSnapshot, brushed: Option<&IdSet<TagId>>) -> Vec<TagRow> {
    let mut rows: Vec<TagRow> = snapshot
        .tags
        .values()
        .map(|tag: &Tag| {
            let tuples = snapshot.index.tuple_ids_for_tag_id(tag.id);
            TagRow {
                tag_id: tag.id,
                name: tag.name.clone(),
                active_tuples: tuples
                    .iter()
                    .filter(|id| snapshot.tuple(**id).is_some_and(|t| t.active))
                    .count(),
                total_tuples: tuples.len(),
                brushed: brushed.is_some_and(|ids| ids.contains(&tag.id)),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then(a.tag_id.cmp(&b.tag_id)));
    rows
}
