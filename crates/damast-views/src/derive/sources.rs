//! Source list stacking

use std::collections::BTreeMap;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use damast_core::{IdSet, ReligionId, SourceId, ViewSettings};
use damast_data::model::{Source, Tuple};

use super::{bucket_keys, key_rank, BucketKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSegment {
    pub key: String,
    pub bucket: BucketKey,
    pub active: bool,
    pub amount: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    pub source_id: SourceId,
    pub name: String,
    pub short_name: Option<String>,
    pub active_tuples: usize,
    pub total_tuples: usize,
    pub segments: Vec<SourceSegment>,
    pub brushed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStack {
    pub rows: Vec<SourceRow>,
    /// Longest stack, for the shared x scale
    pub max_total: usize,
}

/// Stack the tuples of every source by bucket key, active before inactive.
///
/// Amounts are raw tuple counts; with `show_only_active` inactive segments
/// are left out.
pub fn source_stack_data<'a>(
    sources: impl IntoIterator<Item = &'a Source>,
    tuples: &[Tuple],
    religion_order: &[ReligionId],
    brushed: Option<&IdSet<SourceId>>,
    settings: &ViewSettings,
) -> SourceStack {
    let mut per_source: AHashMap<SourceId, BTreeMap<(usize, BucketKey), [usize; 2]>> = AHashMap::new();
    let mut totals: AHashMap<SourceId, (usize, usize)> = AHashMap::new();

    for tuple in tuples {
        let keys = bucket_keys(tuple, settings.display_mode, settings.confidence_aspect);
        for source_id in &tuple.source_ids {
            let total = totals.entry(*source_id).or_default();
            total.1 += 1;
            if tuple.active {
                total.0 += 1;
            }
            let stack = per_source.entry(*source_id).or_default();
            for key in &keys {
                stack.entry(key_rank(key, religion_order)).or_default()[usize::from(!tuple.active)] += 1;
            }
        }
    }

    let rows: Vec<SourceRow> = sources
        .into_iter()
        .map(|source| {
            let mut offset = 0;
            let mut segments = Vec::new();
            if let Some(stack) = per_source.get(&source.id) {
                for ((_, bucket), halves) in stack {
                    for (half, active) in [(0, true), (1, false)] {
                        if halves[half] == 0 || (!active && settings.show_only_active) {
                            continue;
                        }
                        segments.push(SourceSegment {
                            key: bucket.layer(active),
                            bucket: *bucket,
                            active,
                            amount: halves[half],
                            offset,
                        });
                        offset += halves[half];
                    }
                }
            }
            let (active_tuples, total_tuples) = totals.get(&source.id).copied().unwrap_or_default();
            SourceRow {
                source_id: source.id,
                name: source.name.clone(),
                short_name: source.short_name.clone(),
                active_tuples,
                total_tuples,
                segments,
                brushed: brushed.is_some_and(|ids| ids.contains(&source.id)),
            }
        })
        .collect();

    let max_total = rows
        .iter()
        .map(|row| row.segments.iter().map(|s| s.amount).sum::<usize>())
        .max()
        .unwrap_or(0);
    SourceStack { rows, max_total }
}
