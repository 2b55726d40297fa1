//! Confidence view: per-aspect histogram next to the current filter ranges

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use damast_core::ConfidenceAspect;
use damast_data::{confidence_counts, ConfidenceCount, ConfidenceFilter, DatasetSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceViewData {
    /// Aspect currently used for coloring
    pub aspect: ConfidenceAspect,
    pub counts: BTreeMap<ConfidenceAspect, Vec<ConfidenceCount>>,
    pub filter: ConfidenceFilter,
}

pub fn confidence_view_data(snapshot: &DatasetSnapshot) -> ConfidenceViewData {
    ConfidenceViewData {
        aspect: snapshot.settings.confidence_aspect,
        counts: confidence_counts(&snapshot.tuples),
        filter: snapshot.filters.confidence.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::fixtures::raw;
    use damast_data::model::Confidence;
    use damast_data::Dataset;

    #[test]
    fn test_counts_split_by_active() {
        let mut dataset = Dataset::default();
        dataset.load(raw()).unwrap();
        dataset.set_confidence_range(ConfidenceAspect::Interpretation, [Some(Confidence::Certain)].into());

        let data = confidence_view_data(&dataset.snapshot());
        let interpretation = &data.counts[&ConfidenceAspect::Interpretation];
        assert_eq!(interpretation[0].value, Some(Confidence::Certain));
        assert_eq!((interpretation[0].active, interpretation[0].inactive), (1, 0));
        assert_eq!((interpretation[1].active, interpretation[1].inactive), (0, 1));
        assert_eq!((interpretation[5].active, interpretation[5].inactive), (0, 2));
        assert_eq!(data.filter.range(ConfidenceAspect::Interpretation).len(), 1);
    }
}
