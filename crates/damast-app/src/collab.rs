//! Collaborators the coordinator and the location list call out to
//!
//! Both stand in for remote endpoints: the alternative-name search and the
//! filter description renderer. The implementations here answer from the
//! loaded dataset itself.

use std::fmt::Write as _;

use async_trait::async_trait;
use parking_lot::RwLock;
use regex::RegexBuilder;
use tracing::debug;

use damast_core::{IdSet, PlaceId};
use damast_data::{ConfidenceFilter, DatasetSnapshot, FilterState, Location, ReligionFilter};
use damast_views::{AltNameQuery, AlternativeNameSearch};

/// Renders the current filters as descriptive HTML
#[async_trait]
pub trait FilterDescriber: Send + Sync {
    async fn describe(&self, snapshot: &DatasetSnapshot) -> anyhow::Result<String>;
}

/// Regex search over the alternative names of the loaded places
#[derive(Default)]
pub struct RegexNameSearch {
    names: RwLock<Vec<(PlaceId, Vec<String>)>>,
}

impl RegexNameSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the searchable names after a dataset load
    pub fn index<'a>(&self, places: impl IntoIterator<Item = &'a Location>) {
        let names: Vec<_> = places
            .into_iter()
            .filter(|p| !p.alternative_names.is_empty())
            .map(|p| (p.id, p.alternative_names.clone()))
            .collect();
        debug!(places = names.len(), "indexed alternative names");
        *self.names.write() = names;
    }
}

#[async_trait]
impl AlternativeNameSearch for RegexNameSearch {
    async fn search(&self, query: AltNameQuery) -> anyhow::Result<IdSet<PlaceId>> {
        let regex = RegexBuilder::new(&query.regex)
            .case_insensitive(query.ignore_case)
            .build()?;
        Ok(self
            .names
            .read()
            .iter()
            .filter(|(_, names)| names.iter().any(|name| regex.is_match(name)))
            .map(|(id, _)| *id)
            .collect())
    }
}

/// Describes every restricted filter dimension as an HTML list
#[derive(Debug, Default)]
pub struct HtmlFilterDescriber;

fn names<'a>(ids: impl IntoIterator<Item = &'a u32>, lookup: impl Fn(u32) -> Option<&'a str>) -> String {
    ids.into_iter()
        .map(|id| lookup(*id).map_or_else(|| format!("#{id}"), escape))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[async_trait]
impl FilterDescriber for HtmlFilterDescriber {
    async fn describe(&self, snapshot: &DatasetSnapshot) -> anyhow::Result<String> {
        let FilterState { religion, location, source, tags, time, confidence } = &snapshot.filters;
        let religion_name = |id: u32| snapshot.religions.get(&id).map(|r| r.name.as_str());
        let mut items = Vec::new();

        match religion {
            ReligionFilter::All => {}
            ReligionFilter::Simple(ids) => items.push(format!("Religions: {}", names(ids, religion_name))),
            ReligionFilter::Complex(groups) => {
                let groups: Vec<_> = groups.iter().map(|g| format!("({})", names(g, religion_name))).collect();
                items.push(format!("Places with evidence of all of: {}", groups.join(" or ")));
            }
        }
        if let Some(ids) = location {
            items.push(format!(
                "Places: {}",
                names(ids, |id: u32| snapshot.places.get(&id).map(|p| p.name.as_str()))
            ));
        }
        if let Some(ids) = source {
            items.push(format!(
                "Sources: {}",
                names(ids, |id: u32| snapshot.sources.get(&id).map(|s| s.name.as_str()))
            ));
        }
        if let Some(ids) = tags {
            items.push(format!(
                "Tags: {}",
                names(ids, |id: u32| snapshot.tags.get(&id).map(|t| t.name.as_str()))
            ));
        }
        if let Some(window) = time {
            items.push(format!("Time: {} to {}", window.start, window.end));
        }
        if *confidence != ConfidenceFilter::default() {
            items.push("Confidence: restricted".to_string());
        }

        if items.is_empty() {
            return Ok("<p>No filters are active.</p>".to_string());
        }
        let mut html = String::from("<ul>");
        for item in items {
            write!(html, "<li>{item}</li>")?;
        }
        html.push_str("</ul>");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use damast_data::{Dataset, RawDataset, Religion, TimeSpan};

    fn place(id: PlaceId, name: &str, alternative_names: &[&str]) -> Location {
        Location {
            id,
            name: name.to_string(),
            geoloc: None,
            place_type: "city".to_string(),
            confidence: None,
            alternative_names: alternative_names.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_regex_search_over_alternative_names() {
        let search = RegexNameSearch::new();
        let places = [place(1, "Baghdad", &["Madinat al-Salam"]), place(2, "Mosul", &["Nineveh"])];
        search.index(&places);

        let query = |regex: &str, ignore_case| AltNameQuery { regex: regex.to_string(), ignore_case };
        assert_eq!(search.search(query("salam", true)).await.unwrap(), IdSet::from([1]));
        assert!(search.search(query("salam", false)).await.unwrap().is_empty());
        assert_eq!(search.search(query("^N", false)).await.unwrap(), IdSet::from([2]));
        assert!(search.search(query("(", true)).await.is_err());
    }

    #[tokio::test]
    async fn test_describe_lists_restricted_dimensions() {
        let mut dataset = Dataset::default();
        let raw = RawDataset {
            places: vec![place(1, "Baghdad", &[])],
            religions: vec![Religion { id: 1, name: "Church <East>".to_string(), parent_id: None, confidence: None }],
            ..RawDataset::default()
        };
        dataset.load(raw).unwrap();

        let describer = HtmlFilterDescriber;
        let html = describer.describe(&dataset.snapshot()).await.unwrap();
        assert_eq!(html, "<p>No filters are active.</p>");

        dataset.set_religion_filter(ReligionFilter::Simple(IdSet::from([1])));
        dataset.set_time_filter(Some(TimeSpan::new(800, 900)));
        let html = describer.describe(&dataset.snapshot()).await.unwrap();
        assert_eq!(html, "<ul><li>Religions: Church &lt;East&gt;</li><li>Time: 800 to 900</li></ul>");
    }
}
