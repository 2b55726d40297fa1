//! Relational indices built once per dataset load
//!
//! Brushing resolves an origin selection into every other entity type by
//! walking these maps, so all lookups here are O(1) per id.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use damast_core::{IdSet, PlaceId, ReligionId, SourceId, TagId, TupleId};

use crate::model::{Religion, Tag, Tuple};

/// One religion in the hierarchy tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: ReligionId,
    pub name: String,
    pub parent_id: Option<ReligionId>,
    /// Top-level ancestor; the node itself for roots
    pub main_religion_id: ReligionId,
    pub depth: usize,
    pub children: Vec<ReligionId>,
}

/// Index for efficient relational lookup
#[derive(Debug, Clone, Default)]
pub struct DatasetIndex {
    tuple_pos: AHashMap<TupleId, usize>,
    tuple_ids_for_religion_id: AHashMap<ReligionId, Vec<TupleId>>,
    tuple_ids_for_location_id: AHashMap<PlaceId, Vec<TupleId>>,
    tuple_ids_for_source_id: AHashMap<SourceId, Vec<TupleId>>,
    tuple_ids_for_tag_id: AHashMap<TagId, Vec<TupleId>>,
    tag_ids_for_tuple_id: AHashMap<TupleId, Vec<TagId>>,
    location_ids_for_religion_id: AHashMap<ReligionId, IdSet<PlaceId>>,
    source_ids_for_tag_id: AHashMap<TagId, IdSet<SourceId>>,
    main_religion: AHashMap<ReligionId, ReligionId>,
    hierarchy: Vec<HierarchyNode>,
    religion_order: Vec<ReligionId>,
    year_range: Option<(i32, i32)>,
}

impl DatasetIndex {
    /// Build the index. Tag references to unknown tuples are dropped.
    pub fn build(religions: &[Religion], tags: &[Tag], tuples: &[Tuple]) -> Self {
        let mut index = Self::default();

        for (pos, tuple) in tuples.iter().enumerate() {
            index.tuple_pos.insert(tuple.tuple_id, pos);
            index
                .tuple_ids_for_religion_id
                .entry(tuple.religion_id)
                .or_default()
                .push(tuple.tuple_id);
            index
                .tuple_ids_for_location_id
                .entry(tuple.place_id)
                .or_default()
                .push(tuple.tuple_id);
            for source_id in &tuple.source_ids {
                index
                    .tuple_ids_for_source_id
                    .entry(*source_id)
                    .or_default()
                    .push(tuple.tuple_id);
            }
            index
                .location_ids_for_religion_id
                .entry(tuple.religion_id)
                .or_default()
                .insert(tuple.place_id);

            if let Some(span) = tuple.time_span {
                index.year_range = Some(match index.year_range {
                    Some((lo, hi)) => (lo.min(span.start), hi.max(span.end)),
                    None => (span.start, span.end),
                });
            }
        }

        for tag in tags {
            // a tuple listed twice counts once
            let listed: IdSet<TupleId> = tag.tuple_ids.iter().copied().collect();
            let mut known = Vec::with_capacity(listed.len());
            for tuple_id in listed {
                let Some(&pos) = index.tuple_pos.get(&tuple_id) else {
                    warn!(tag = tag.id, tuple = tuple_id, "tag references unknown tuple");
                    continue;
                };
                known.push(tuple_id);
                index.tag_ids_for_tuple_id.entry(tuple_id).or_default().push(tag.id);
                index
                    .source_ids_for_tag_id
                    .entry(tag.id)
                    .or_default()
                    .extend(tuples[pos].source_ids.iter().copied());
            }
            index.tuple_ids_for_tag_id.insert(tag.id, known);
        }

        index.build_hierarchy(religions);
        index
    }

    fn build_hierarchy(&mut self, religions: &[Religion]) {
        let known: AHashMap<ReligionId, &Religion> = religions.iter().map(|r| (r.id, r)).collect();

        // Main religion per node, walking parents once at load time
        for religion in religions {
            let mut current = religion;
            let mut steps = 0;
            while let Some(parent) = current.parent_id.and_then(|p| known.get(&p)) {
                current = parent;
                steps += 1;
                if steps > religions.len() {
                    warn!(religion = religion.id, "cycle in religion hierarchy");
                    current = religion;
                    break;
                }
            }
            self.main_religion.insert(religion.id, current.id);
        }

        let mut children: AHashMap<Option<ReligionId>, Vec<ReligionId>> = AHashMap::new();
        for religion in religions {
            let parent = religion
                .parent_id
                .filter(|p| known.contains_key(p) && self.main_religion[&religion.id] != religion.id);
            children.entry(parent).or_default().push(religion.id);
        }
        for ids in children.values_mut() {
            ids.sort_unstable();
        }

        // Depth-first pre-order gives the religion ordering
        let mut stack: Vec<(ReligionId, usize)> = children
            .get(&None)
            .map(|roots| roots.iter().rev().map(|id| (*id, 0)).collect())
            .unwrap_or_default();
        while let Some((id, depth)) = stack.pop() {
            let religion = known[&id];
            let kids = children.get(&Some(id)).cloned().unwrap_or_default();
            stack.extend(kids.iter().rev().map(|k| (*k, depth + 1)));
            self.religion_order.push(id);
            self.hierarchy.push(HierarchyNode {
                id,
                name: religion.name.clone(),
                parent_id: religion.parent_id.filter(|p| known.contains_key(p)),
                main_religion_id: self.main_religion[&id],
                depth,
                children: kids,
            });
        }
    }

    pub fn tuple_position(&self, tuple_id: TupleId) -> Option<usize> {
        self.tuple_pos.get(&tuple_id).copied()
    }

    pub fn tuple_ids_for_religion_id(&self, id: ReligionId) -> &[TupleId] {
        self.tuple_ids_for_religion_id.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn tuple_ids_for_location_id(&self, id: PlaceId) -> &[TupleId] {
        self.tuple_ids_for_location_id.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn tuple_ids_for_source_id(&self, id: SourceId) -> &[TupleId] {
        self.tuple_ids_for_source_id.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn tuple_ids_for_tag_id(&self, id: TagId) -> &[TupleId] {
        self.tuple_ids_for_tag_id.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn tag_ids_for_tuple_id(&self, id: TupleId) -> &[TagId] {
        self.tag_ids_for_tuple_id.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn location_ids_for_religion_id(&self, id: ReligionId) -> Option<&IdSet<PlaceId>> {
        self.location_ids_for_religion_id.get(&id)
    }

    pub fn source_ids_for_tag_id(&self, id: TagId) -> Option<&IdSet<SourceId>> {
        self.source_ids_for_tag_id.get(&id)
    }

    pub fn main_religion(&self, id: ReligionId) -> Option<ReligionId> {
        self.main_religion.get(&id).copied()
    }

    pub fn main_religions(&self) -> &AHashMap<ReligionId, ReligionId> {
        &self.main_religion
    }

    pub fn hierarchy(&self) -> &[HierarchyNode] {
        &self.hierarchy
    }

    pub fn religion_order(&self) -> &[ReligionId] {
        &self.religion_order
    }

    pub fn year_range(&self) -> Option<(i32, i32)> {
        self.year_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TimeSpan, TupleConfidence};

    fn religion(id: u32, parent: Option<u32>) -> Religion {
        Religion { id, name: format!("r{id}"), parent_id: parent, confidence: None }
    }

    fn tuple(id: u32, place: u32, religion: u32, sources: Vec<u32>, span: Option<(i32, i32)>) -> Tuple {
        Tuple {
            tuple_id: id,
            place_id: place,
            religion_id: religion,
            source_ids: sources,
            time_span: span.map(|(a, b)| TimeSpan::new(a, b)),
            confidence: TupleConfidence::default(),
            active: true,
        }
    }

    #[test]
    fn test_hierarchy_order_and_main_religion() {
        let religions = vec![
            religion(1, None),
            religion(4, Some(2)),
            religion(2, Some(1)),
            religion(3, Some(1)),
            religion(5, None),
        ];
        let index = DatasetIndex::build(&religions, &[], &[]);
        assert_eq!(index.religion_order(), &[1, 2, 4, 3, 5]);
        assert_eq!(index.main_religion(4), Some(1));
        assert_eq!(index.main_religion(5), Some(5));
        let node = index.hierarchy().iter().find(|n| n.id == 4).unwrap();
        assert_eq!(node.depth, 2);
        assert_eq!(node.parent_id, Some(2));
    }

    #[test]
    fn test_cycle_does_not_hang() {
        let religions = vec![religion(1, Some(2)), religion(2, Some(1))];
        let index = DatasetIndex::build(&religions, &[], &[]);
        assert_eq!(index.main_religion(1), Some(1));
        assert_eq!(index.main_religion(2), Some(2));
        assert_eq!(index.religion_order().len(), 2);
    }

    #[test]
    fn test_relations() {
        let tuples = vec![
            tuple(10, 100, 1, vec![7], Some((800, 820))),
            tuple(11, 101, 1, vec![7, 8], None),
        ];
        let tags = vec![Tag { id: 3, name: "t".into(), tuple_ids: vec![11, 99] }];
        let index = DatasetIndex::build(&[religion(1, None)], &tags, &tuples);

        assert_eq!(index.tuple_ids_for_source_id(7), &[10, 11]);
        assert_eq!(index.tag_ids_for_tuple_id(11), &[3]);
        assert_eq!(index.tuple_ids_for_tag_id(3), &[11]);
        assert_eq!(index.source_ids_for_tag_id(3), Some(&IdSet::from([7, 8])));
        assert_eq!(index.location_ids_for_religion_id(1), Some(&IdSet::from([100, 101])));
        assert_eq!(index.year_range(), Some((800, 820)));
    }

    #[test]
    fn test_repeated_tag_members_count_once() {
        let tuples = vec![tuple(10, 100, 1, vec![7], None), tuple(11, 100, 1, vec![], None)];
        let tags = vec![Tag { id: 3, name: "t".into(), tuple_ids: vec![11, 10, 11] }];
        let index = DatasetIndex::build(&[religion(1, None)], &tags, &tuples);

        assert_eq!(index.tuple_ids_for_tag_id(3), &[10, 11]);
        assert_eq!(index.tag_ids_for_tuple_id(11), &[3]);
    }
}
