//! Location list rows, search ranking and ordering

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use damast_core::{IdSet, PlaceId};
use damast_data::DatasetSnapshot;

/// How well a location matched the search, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchRank {
    Exact,
    Prefix,
    WordPrefix,
    Substring,
    AlternativeName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRow {
    pub place_id: PlaceId,
    pub name: String,
    pub place_type: String,
    pub active: bool,
    pub geolocated: bool,
    pub active_tuples: usize,
    pub total_tuples: usize,
    pub brushed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<MatchRank>,
}

/// Rank `name` against an already lowercased, trimmed query
pub fn rank_name(name: &str, query: &str) -> Option<MatchRank> {
    if query.is_empty() {
        return None;
    }
    let name = name.to_lowercase();
    if name == query {
        Some(MatchRank::Exact)
    } else if name.starts_with(query) {
        Some(MatchRank::Prefix)
    } else if name
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| !word.is_empty() && word.starts_with(query))
    {
        Some(MatchRank::WordPrefix)
    } else if name.contains(query) {
        Some(MatchRank::Substring)
    } else {
        None
    }
}

/// One row per place with tuple counts
pub fn location_rows(snapshot: &DatasetSnapshot) -> Vec<LocationRow> {
    snapshot
        .places
        .values()
        .map(|place| {
            let tuple_ids = snapshot.index.tuple_ids_for_location_id(place.id);
            LocationRow {
                place_id: place.id,
                name: place.name.clone(),
                place_type: place.place_type.clone(),
                active: snapshot.active_places.contains(&place.id),
                geolocated: place.geoloc.is_some(),
                active_tuples: tuple_ids
                    .iter()
                    .filter(|id| snapshot.tuple(**id).is_some_and(|t| t.active))
                    .count(),
                total_tuples: tuple_ids.len(),
                brushed: false,
                rank: None,
            }
        })
        .collect()
}

/// Search state of the list: the query and the places whose alternative
/// names matched it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationSearch {
    pub query: String,
    pub alternative_matches: IdSet<PlaceId>,
}

impl LocationSearch {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            alternative_matches: IdSet::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    fn rank(&self, row: &LocationRow) -> Option<MatchRank> {
        rank_name(&row.name, &self.query).or_else(|| {
            self.alternative_matches
                .contains(&row.place_id)
                .then_some(MatchRank::AlternativeName)
        })
    }
}

/// Apply brush and search to the rows and sort them for display.
///
/// With an active search only matching rows remain. Brushed rows come
/// first, then better matches, then active before inactive, then by name.
pub fn arrange(mut rows: Vec<LocationRow>, brushed: Option<&IdSet<PlaceId>>, search: &LocationSearch) -> Vec<LocationRow> {
    for row in &mut rows {
        row.brushed = brushed.is_some_and(|ids| ids.contains(&row.place_id));
        row.rank = search.rank(row);
    }
    if search.is_active() {
        rows.retain(|row| row.rank.is_some());
    }
    rows.sort_by(compare_rows);
    rows
}

fn compare_rows(a: &LocationRow, b: &LocationRow) -> Ordering {
    b.brushed
        .cmp(&a.brushed)
        .then_with(|| a.rank.map_or(usize::MAX, |r| r as usize).cmp(&b.rank.map_or(usize::MAX, |r| r as usize)))
        .then_with(|| b.active.cmp(&a.active))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.place_id.cmp(&b.place_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(place_id: PlaceId, name: &str, active: bool) -> LocationRow {
        LocationRow {
            place_id,
            name: name.to_string(),
            place_type: "city".into(),
            active,
            geolocated: true,
            active_tuples: 0,
            total_tuples: 0,
            brushed: false,
            rank: None,
        }
    }

    #[test]
    fn test_rank_name() {
        assert_eq!(rank_name("Mosul", "mosul"), Some(MatchRank::Exact));
        assert_eq!(rank_name("Mosul", "mos"), Some(MatchRank::Prefix));
        assert_eq!(rank_name("Dayr al-Qiyara", "qiy"), Some(MatchRank::WordPrefix));
        assert_eq!(rank_name("Baghdad", "hda"), Some(MatchRank::Substring));
        assert_eq!(rank_name("Baghdad", "x"), None);
        assert_eq!(rank_name("Baghdad", ""), None);
    }

    #[test]
    fn test_search_ranks_and_filters() {
        let rows = vec![
            row(1, "Karka d-Beth Slokh", true),
            row(2, "Karka", true),
            row(3, "Beth Lapat", true),
            row(4, "Gundishapur", false),
            row(5, "Arbela", true),
        ];
        let mut search = LocationSearch::new("  Karka ");
        search.alternative_matches.insert(4);
        let out = arrange(rows, None, &search);
        let ids: Vec<_> = out.iter().map(|r| r.place_id).collect();
        assert_eq!(ids, [2, 1, 4]);
        assert_eq!(out[2].rank, Some(MatchRank::AlternativeName));
    }

    #[test]
    fn test_brushed_first_then_active_then_name() {
        let rows = vec![row(1, "b", false), row(2, "a", true), row(3, "c", true), row(4, "d", false)];
        let brushed = IdSet::from([4]);
        let out = arrange(rows, Some(&brushed), &LocationSearch::default());
        let ids: Vec<_> = out.iter().map(|r| r.place_id).collect();
        assert_eq!(ids, [4, 2, 3, 1]);
        assert!(out[0].brushed);
    }
}
