//! Religion hierarchy glyphs
//!
//! Every node gets one glyph: a placeholder when no tuple references the
//! religion, otherwise an active/inactive split (religion mode) or a
//! normalized confidence breakdown (confidence mode).

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use damast_core::{DisplayMode, IdSet, ReligionId, ViewSettings};
use damast_data::index::HierarchyNode;
use damast_data::model::{Confidence, Tuple};

/// One stacked segment of a glyph, in unit space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphField {
    pub key: String,
    pub active: bool,
    pub amount: f64,
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Glyph {
    /// No tuple references the religion. `exists` tells "zero data but
    /// still allowed by the filter" from "filtered out entirely".
    Placeholder { exists: bool },
    Religion { active_scale: f64, fields: Vec<GlyphField> },
    Confidence { fields: Vec<GlyphField> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub active: usize,
    pub inactive: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.active + self.inactive
    }

    fn add(&mut self, other: Counts) {
        self.active += other.active;
        self.inactive += other.inactive;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyEntry {
    pub id: ReligionId,
    pub name: String,
    pub parent_id: Option<ReligionId>,
    pub depth: usize,
    pub glyph: Glyph,
    pub counts: Counts,
    /// The node and all its descendants
    pub subtree: Counts,
    pub brushed: bool,
}

/// Active share of a node. Binary presence when only active tuples count;
/// `0/0` yields 0.
pub fn active_scale(counts: Counts, brush_only_active: bool) -> f64 {
    if brush_only_active {
        return if counts.active > 0 { 1.0 } else { 0.0 };
    }
    let scale = counts.active as f64 / counts.total() as f64;
    if scale.is_nan() {
        0.0
    } else {
        scale
    }
}

fn religion_fields(scale: f64) -> Vec<GlyphField> {
    vec![
        GlyphField { key: "active".into(), active: true, amount: scale, offset: 0.0 },
        GlyphField { key: "inactive".into(), active: false, amount: 1.0 - scale, offset: scale },
    ]
}

fn confidence_fields(tuples: &[&Tuple], settings: &ViewSettings) -> Vec<GlyphField> {
    // [rank][0 = active, 1 = inactive]
    let mut counts = [[0usize; 2]; 6];
    for tuple in tuples {
        for value in tuple.confidence.values(settings.confidence_aspect) {
            counts[Confidence::rank(*value)][usize::from(!tuple.active)] += 1;
        }
    }
    let total: usize = counts.iter().flatten().sum();
    if total == 0 {
        return Vec::new();
    }

    let mut offset = 0.0;
    let mut fields = Vec::new();
    for (value, halves) in Confidence::ORDER.into_iter().zip(counts) {
        for (half, active) in [(0, true), (1, false)] {
            if halves[half] == 0 {
                continue;
            }
            let amount = halves[half] as f64 / total as f64;
            fields.push(GlyphField {
                key: format!("{}{}", Confidence::key(value), if active { 'a' } else { 'i' }),
                active,
                amount,
                offset,
            });
            offset += amount;
        }
    }
    fields
}

/// Glyph and rollup counts for every hierarchy node, in hierarchy order.
///
/// `exists` reports whether a religion is still allowed by the current
/// filters; `brushed` marks the nodes of the current brush.
pub fn hierarchy_glyphs(
    nodes: &[HierarchyNode],
    tuples: &[Tuple],
    exists: impl Fn(ReligionId) -> bool,
    brushed: Option<&IdSet<ReligionId>>,
    settings: &ViewSettings,
) -> Vec<HierarchyEntry> {
    let mut by_religion: AHashMap<ReligionId, Vec<&Tuple>> = AHashMap::new();
    for tuple in tuples {
        by_religion.entry(tuple.religion_id).or_default().push(tuple);
    }

    let mut entries: Vec<HierarchyEntry> = nodes
        .iter()
        .map(|node| {
            let own = by_religion.get(&node.id).map_or(&[][..], Vec::as_slice);
            let counts = Counts {
                active: own.iter().filter(|t| t.active).count(),
                inactive: own.iter().filter(|t| !t.active).count(),
            };
            let glyph = if own.is_empty() {
                Glyph::Placeholder { exists: exists(node.id) }
            } else {
                match settings.display_mode {
                    DisplayMode::Religion => {
                        let scale = active_scale(counts, settings.show_only_active);
                        Glyph::Religion { active_scale: scale, fields: religion_fields(scale) }
                    }
                    DisplayMode::Confidence => Glyph::Confidence { fields: confidence_fields(own, settings) },
                }
            };
            HierarchyEntry {
                id: node.id,
                name: node.name.clone(),
                parent_id: node.parent_id,
                depth: node.depth,
                glyph,
                counts,
                subtree: counts,
                brushed: brushed.is_some_and(|ids| ids.contains(&node.id)),
            }
        })
        .collect();

    // Nodes come in pre-order, so walking backwards visits children first
    let position: AHashMap<ReligionId, usize> = entries.iter().enumerate().map(|(i, e)| (e.id, i)).collect();
    for i in (0..entries.len()).rev() {
        let Some(parent) = entries[i].parent_id.and_then(|p| position.get(&p).copied()) else {
            continue;
        };
        let subtree = entries[i].subtree;
        entries[parent].subtree.add(subtree);
    }

    entries
}
