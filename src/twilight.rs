//! # Twilight Interval Search
//!
//! This module turns a raw light record into sunset/sunrise events. It finds
//! every threshold crossing, pairs crossings into nights, keeps the nights
//! that are anchored by caller-supplied instants (plus those reachable from
//! them in ±24 h steps) and interpolates the exact crossing instants.
//!
//! ## Processing Pipeline
//! 1. **Edges**: scan consecutive sample pairs for light→dark (fall) and
//!    dark→light (rise) crossings of the threshold
//! 2. **Pair**: match each fall with the next rise; a rise before the first
//!    fall cannot open a night and is skipped
//! 3. **Filter**: drop nights that contain an excluded instant, last 24 h or
//!    more, or are shorter than `dark_min`
//! 4. **Seed**: keep nights whose span contains an `include` instant
//! 5. **Expand**: from every newly kept night's midpoint, probe ±24 h and
//!    keep any night whose span (widened by `extend`) holds a probe; repeat
//!    until a pass adds nothing
//! 6. **Interpolate**: place each crossing linearly between its two samples
//!
//! ## Night Spans
//! A night found at fall index `a` and rise index `b` lasts
//! `time[b] - time[a]`; the 24 h limit, `dark_min` and the midpoint all use
//! that duration. Containment (exclusion, anchoring and the widened ±24 h
//! probes) uses the inclusive span `[time[a], time[b + 1]]`, i.e. from the
//! last light sample before darkness to the first light sample after it.
//!
//! ## Error Handling
//! Invalid input fails fast through [`TwilightError`]. Finding no nights is not
//! an error: the result is simply empty.

use crate::{LightSample, LightSeries, TwilightEvent};
use chrono::{DateTime, Duration, Utc};
use log::{debug, trace};
use thiserror::Error;

/// Validation failures for a twilight search.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TwilightError {
    /// The light series holds no samples
    #[error("light series is empty")]
    EmptySeries,

    /// An intensity is NaN or infinite
    #[error("non-finite intensity at sample {index}")]
    NonFiniteIntensity { index: usize },

    /// A timestamp does not strictly follow its predecessor
    #[error("timestamp {time} at sample {index} does not follow the previous sample")]
    NonMonotonicTime { index: usize, time: DateTime<Utc> },

    /// The threshold is NaN or infinite
    #[error("threshold must be finite, got {0}")]
    NonFiniteThreshold(f64),

    /// The threshold cannot separate day from night for this record
    #[error("threshold {threshold} outside observed intensity range [{min}, {max}]")]
    ThresholdOutOfRange { threshold: f64, min: f64, max: f64 },

    /// `extend` or `dark_min` is negative
    #[error("{name} must not be negative, got {minutes} minutes")]
    NegativeDuration { name: &'static str, minutes: i64 },

    /// A configured duration does not fit in a `chrono::Duration`
    #[error("{name} of {minutes} minutes is out of range")]
    DurationOutOfRange { name: &'static str, minutes: i64 },
}

/// Parameters of a twilight search.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use geolight_lib::twilight::SearchOptions;
///
/// let anchor = Utc.with_ymd_and_hms(2021, 8, 1, 23, 0, 0).unwrap();
/// let options = SearchOptions::new(1.5, vec![anchor])
///     .with_extend(Duration::minutes(30))
///     .with_dark_min(Duration::hours(2));
///
/// assert_eq!(options.include.len(), 1);
/// assert!(options.exclude.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Intensity separating day (`>=`) from night (`<`)
    pub threshold: f64,
    /// Instants known to fall inside nights of interest
    pub include: Vec<DateTime<Utc>>,
    /// Instants whose containing night must be dropped
    pub exclude: Vec<DateTime<Utc>>,
    /// Tolerance on both ends of a night when probing ±24 h
    pub extend: Duration,
    /// Minimum night span
    pub dark_min: Duration,
}

impl SearchOptions {
    pub fn new(threshold: f64, include: Vec<DateTime<Utc>>) -> Self {
        SearchOptions {
            threshold,
            include,
            exclude: Vec::new(),
            extend: Duration::zero(),
            dark_min: Duration::zero(),
        }
    }

    pub fn with_exclude(mut self, exclude: Vec<DateTime<Utc>>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_extend(mut self, extend: Duration) -> Self {
        self.extend = extend;
        self
    }

    pub fn with_dark_min(mut self, dark_min: Duration) -> Self {
        self.dark_min = dark_min;
        self
    }

    fn validate(&self) -> Result<(), TwilightError> {
        if !self.threshold.is_finite() {
            return Err(TwilightError::NonFiniteThreshold(self.threshold));
        }
        for (name, value) in [("extend", self.extend), ("dark_min", self.dark_min)] {
            if value < Duration::zero() {
                return Err(TwilightError::NegativeDuration {
                    name,
                    minutes: value.num_minutes(),
                });
            }
        }
        Ok(())
    }
}

/// Find the twilights of every anchored night in `light`.
///
/// Returns events sorted by instant, each kept night contributing a sunset
/// followed by its sunrise.
///
/// # Errors
/// Any [`TwilightError`] describing invalid input. Never partial: either the
/// whole record is searched or nothing is returned.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use geolight_lib::twilight::{find_twilights, SearchOptions};
/// use geolight_lib::{LightSample, LightSeries};
///
/// let t0 = Utc.with_ymd_and_hms(2021, 8, 1, 18, 0, 0).unwrap();
/// let levels = [10.0, 10.0, 0.0, 0.0, 0.0, 10.0];
/// let series = LightSeries::new(
///     levels
///         .iter()
///         .enumerate()
///         .map(|(i, &intensity)| LightSample { time: t0 + Duration::hours(i as i64), intensity })
///         .collect(),
/// );
///
/// let options = SearchOptions::new(5.0, vec![t0 + Duration::hours(3)]);
/// let twilights = find_twilights(&series, &options).unwrap();
///
/// assert_eq!(twilights.len(), 2);
/// assert!(!twilights[0].is_sunrise);
/// assert_eq!(twilights[0].instant, t0 + Duration::minutes(90));
/// assert_eq!(twilights[1].instant, t0 + Duration::minutes(270));
/// ```
pub fn find_twilights(
    light: &LightSeries,
    options: &SearchOptions,
) -> Result<Vec<TwilightEvent>, TwilightError> {
    light.validate()?;
    options.validate()?;

    let (min, max) = light
        .intensity_range()
        .ok_or(TwilightError::EmptySeries)?;
    if options.threshold < min || options.threshold > max {
        return Err(TwilightError::ThresholdOutOfRange {
            threshold: options.threshold,
            min,
            max,
        });
    }

    let samples = &light.samples;
    let (falls, rises) = crossing_edges(samples, options.threshold);
    debug!(
        "{} samples: {} fall edges, {} rise edges",
        samples.len(),
        falls.len(),
        rises.len()
    );

    let nights: Vec<NightInterval> = pair_edges(&falls, &rises)
        .into_iter()
        .map(|(fall_index, rise_index)| NightInterval::new(samples, fall_index, rise_index))
        .filter(|night| night.is_admissible(options))
        .collect();
    debug!("{} admissible nights", nights.len());

    let kept = expand_from_anchors(&nights, options);
    debug!("{} nights kept after ±24 h expansion", kept.len());

    let mut events = Vec::with_capacity(kept.len() * 2);
    for night in kept {
        let fall = night.fall_index;
        let rise = night.rise_index;
        events.push(TwilightEvent {
            instant: interpolate_crossing(&samples[fall], &samples[fall + 1], options.threshold),
            is_sunrise: false,
        });
        events.push(TwilightEvent {
            instant: interpolate_crossing(&samples[rise], &samples[rise + 1], options.threshold),
            is_sunrise: true,
        });
    }

    // Expansion discovers nights out of order.
    events.sort_by_key(|event| event.instant);
    Ok(events)
}

// -- Private Implementation --

/// One candidate night, indexed into the sample slice.
#[derive(Debug, Clone, Copy, PartialEq)]
struct NightInterval {
    /// Last sample at or above threshold before darkness
    fall_index: usize,
    /// Last sample below threshold before light returns
    rise_index: usize,
    fall_time: DateTime<Utc>,
    rise_time: DateTime<Utc>,
    /// First light sample after the night
    end: DateTime<Utc>,
}

impl NightInterval {
    fn new(samples: &[LightSample], fall_index: usize, rise_index: usize) -> Self {
        NightInterval {
            fall_index,
            rise_index,
            fall_time: samples[fall_index].time,
            rise_time: samples[rise_index].time,
            end: samples[rise_index + 1].time,
        }
    }

    fn duration(&self) -> Duration {
        self.rise_time - self.fall_time
    }

    fn midpoint(&self) -> DateTime<Utc> {
        self.fall_time + self.duration() / 2
    }

    fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.fall_time <= instant && instant <= self.end
    }

    /// Span test widened by `margin`; a bound past the representable range
    /// is open.
    fn contains_with_margin(&self, instant: DateTime<Utc>, margin: Duration) -> bool {
        let after_start = self
            .fall_time
            .checked_sub_signed(margin)
            .map_or(true, |lo| lo <= instant);
        let before_end = self
            .end
            .checked_add_signed(margin)
            .map_or(true, |hi| instant <= hi);
        after_start && before_end
    }

    /// Whole-night filter: nothing is ever trimmed, only dropped.
    fn is_admissible(&self, options: &SearchOptions) -> bool {
        let duration = self.duration();
        duration < Duration::hours(24)
            && duration >= options.dark_min
            && !options.exclude.iter().any(|&t| self.contains(t))
    }
}

/// Indices `i` where `samples[i] -> samples[i + 1]` crosses the threshold,
/// split into falls and rises.
fn crossing_edges(samples: &[LightSample], threshold: f64) -> (Vec<usize>, Vec<usize>) {
    let mut falls = Vec::new();
    let mut rises = Vec::new();

    for (i, pair) in samples.windows(2).enumerate() {
        let dark_before = pair[0].intensity < threshold;
        let dark_after = pair[1].intensity < threshold;
        match (dark_before, dark_after) {
            (false, true) => falls.push(i),
            (true, false) => rises.push(i),
            _ => {}
        }
    }

    (falls, rises)
}

/// Pair each fall with the next rise after it.
///
/// Rises that precede the first fall (the record started in darkness) are
/// skipped, and a trailing fall with no later rise is left unpaired.
fn pair_edges(falls: &[usize], rises: &[usize]) -> Vec<(usize, usize)> {
    let mut pending = rises.iter().copied().peekable();
    let mut pairs = Vec::with_capacity(falls.len());

    for &fall in falls {
        while pending.next_if(|&rise| rise < fall).is_some() {}
        match pending.next() {
            Some(rise) => pairs.push((fall, rise)),
            None => break,
        }
    }

    pairs
}

/// Keep anchored nights, then grow the kept set in ±24 h steps to a fixpoint.
///
/// Returns kept nights in chronological order.
fn expand_from_anchors<'a>(
    nights: &'a [NightInterval],
    options: &SearchOptions,
) -> Vec<&'a NightInterval> {
    let mut kept = vec![false; nights.len()];
    let mut frontier: Vec<usize> = Vec::new();

    for (k, night) in nights.iter().enumerate() {
        if options.include.iter().any(|&t| night.contains(t)) {
            kept[k] = true;
            frontier.push(k);
        }
    }
    trace!("seeded {} nights from include", frontier.len());

    // Each productive pass keeps at least one more night.
    let day = Duration::hours(24);
    let max_passes = nights.len() + 1;
    let mut passes = 0;

    while !frontier.is_empty() && passes < max_passes {
        passes += 1;

        let probes: Vec<DateTime<Utc>> = frontier
            .iter()
            .flat_map(|&k| {
                let mid = nights[k].midpoint();
                [mid.checked_sub_signed(day), mid.checked_add_signed(day)]
                    .into_iter()
                    .flatten()
            })
            .collect();

        let mut added = Vec::new();
        for (k, night) in nights.iter().enumerate() {
            if kept[k] {
                continue;
            }
            if probes
                .iter()
                .any(|&probe| night.contains_with_margin(probe, options.extend))
            {
                kept[k] = true;
                added.push(k);
            }
        }
        trace!("pass {passes}: {} nights added", added.len());
        frontier = added;
    }

    nights
        .iter()
        .zip(kept)
        .filter_map(|(night, keep)| keep.then_some(night))
        .collect()
}

/// Linear crossing instant between two samples straddling `threshold`.
fn interpolate_crossing(a: &LightSample, b: &LightSample, threshold: f64) -> DateTime<Utc> {
    let fraction = (threshold - a.intensity) / (b.intensity - a.intensity);
    let step_ms = (b.time - a.time).num_milliseconds() as f64;
    a.time + Duration::milliseconds((fraction * step_ms).round() as i64)
}
