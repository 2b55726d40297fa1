//! Timed distribution: stacked per-year layers

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use damast_core::{ReligionId, TimelineMode, ViewSettings};
use damast_data::model::Tuple;

use super::{bucket_keys, ordered_keys, BucketKey};

/// Lower and upper edge of one layer at one year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StackPoint {
    pub year: i32,
    pub y0: f64,
    pub y1: f64,
}

impl StackPoint {
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// One `{key}{a|i}` layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackLayer {
    pub key: String,
    pub bucket: BucketKey,
    pub active: bool,
    pub points: Vec<StackPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverviewPoint {
    pub year: i32,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineData {
    pub mode: TimelineMode,
    pub x_domain: (i32, i32),
    pub y_domain: (f64, f64),
    pub layers: Vec<StackLayer>,
    /// Top of the stack per year, for the minimap
    pub overview: Vec<OverviewPoint>,
}

/// Height of the band given to each key with data in qualitative mode
const QUALITATIVE_BAND: f64 = 3.0;

/// Widest year range laid out; a wider range keeps its first years
pub const MAX_TIMELINE_YEARS: usize = 10_000;

/// Stack the timed tuples over the inclusive year `range`.
///
/// Untimed tuples are ignored. A tuple contributes to every year of its
/// span that lies inside the range, once per bucket key.
pub fn timed_from_tuples(
    tuples: &[Tuple],
    religion_order: &[ReligionId],
    settings: &ViewSettings,
    range: (i32, i32),
) -> TimelineData {
    let lo = range.0.min(range.1);
    let width = i64::from(range.0.max(range.1)) - i64::from(lo) + 1;
    let years = match usize::try_from(width) {
        Ok(years) if years <= MAX_TIMELINE_YEARS => years,
        _ => {
            warn!(lo, width, "year range too wide, truncating the timeline");
            MAX_TIMELINE_YEARS
        }
    };
    // years is at most MAX_TIMELINE_YEARS and hi never passes the requested upper bound
    let hi = lo + (years as i32 - 1);

    let mut keys = ordered_keys(settings.display_mode, religion_order);
    let mut slot: AHashMap<BucketKey, usize> = keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();

    // counts[key][0 = active, 1 = inactive][year]
    let mut counts: Vec<[Vec<u32>; 2]> = vec![[vec![0; years], vec![0; years]]; keys.len()];

    for tuple in tuples {
        let Some(span) = tuple.time_span else { continue };
        let first = span.start.max(lo);
        let last = span.end.min(hi);
        if first > last {
            continue;
        }
        let half = usize::from(!tuple.active);
        for key in bucket_keys(tuple, settings.display_mode, settings.confidence_aspect) {
            let idx = *slot.entry(key).or_insert_with(|| {
                keys.push(key);
                counts.push([vec![0; years], vec![0; years]]);
                keys.len() - 1
            });
            for year in first..=last {
                counts[idx][half][(year - lo) as usize] += 1;
            }
        }
    }

    let (layers, y_max) = match settings.timeline_mode {
        TimelineMode::Quantitative => quantitative(&keys, &counts, lo, years),
        TimelineMode::Qualitative => qualitative(&keys, &counts, lo, years),
    };

    let overview = (0..years)
        .map(|i| OverviewPoint {
            year: lo + i as i32,
            total: layers.iter().map(|layer| layer.points[i].y1).fold(0.0, f64::max),
        })
        .collect();

    TimelineData {
        mode: settings.timeline_mode,
        x_domain: (lo, hi),
        y_domain: (0.0, y_max),
        layers,
        overview,
    }
}

fn quantitative(keys: &[BucketKey], counts: &[[Vec<u32>; 2]], lo: i32, years: usize) -> (Vec<StackLayer>, f64) {
    let mut baseline = vec![0.0; years];
    let mut layers = Vec::with_capacity(keys.len() * 2);

    for (key, halves) in keys.iter().zip(counts) {
        for (half, active) in [(0, true), (1, false)] {
            let points = (0..years)
                .map(|i| {
                    let y0 = baseline[i];
                    baseline[i] += f64::from(halves[half][i]);
                    StackPoint { year: lo + i as i32, y0, y1: baseline[i] }
                })
                .collect();
            layers.push(StackLayer { key: key.layer(active), bucket: *key, active, points });
        }
    }

    let y_max = baseline.iter().copied().fold(0.0, f64::max);
    (layers, y_max)
}

fn qualitative(keys: &[BucketKey], counts: &[[Vec<u32>; 2]], lo: i32, years: usize) -> (Vec<StackLayer>, f64) {
    let mut band = 0usize;
    let mut layers = Vec::with_capacity(keys.len() * 2);

    for (key, [active, inactive]) in keys.iter().zip(counts) {
        let has_data = active.iter().chain(inactive).any(|c| *c > 0);
        let base = if has_data {
            QUALITATIVE_BAND * band as f64 + 1.0
        } else {
            QUALITATIVE_BAND * band as f64
        };

        let mut active_points = Vec::with_capacity(years);
        let mut inactive_points = Vec::with_capacity(years);
        for i in 0..years {
            let year = lo + i as i32;
            let total = active[i] + inactive[i];
            let split = if total > 0 { f64::from(active[i]) / f64::from(total) } else { 0.0 };
            let top = if total > 0 { base + 1.0 } else { base };
            active_points.push(StackPoint { year, y0: base, y1: base + split });
            inactive_points.push(StackPoint { year, y0: base + split, y1: top });
        }

        layers.push(StackLayer { key: key.layer(true), bucket: *key, active: true, points: active_points });
        layers.push(StackLayer { key: key.layer(false), bucket: *key, active: false, points: inactive_points });

        if has_data {
            band += 1;
        }
    }

    (layers, QUALITATIVE_BAND * band as f64)
}
