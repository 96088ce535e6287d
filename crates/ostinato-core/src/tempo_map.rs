//! Piecewise-linear tempo curves over the measure timeline.
//!
//! Tempo varies linearly *in measure space* between breakpoints, so the
//! elapsed-time integral of `60 * beats_per_measure / tempo(m)` has a closed
//! form involving `ln(tempo_end / tempo_start) / slope`. The degenerate
//! cases (zero-length segment, constant-tempo segment) fall back to the
//! plain linear formulas to avoid dividing by a zero slope.

use serde::{Deserialize, Serialize};

/// Tempo assumed when a curve has no breakpoints.
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Beats per measure used for all time conversions unless overridden.
pub const DEFAULT_BEATS_PER_MEASURE: f64 = 4.0;

/// One breakpoint of a tempo curve. Measures are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoPoint {
    pub measure: f64,
    pub tempo: f64,
}

impl TempoPoint {
    pub const fn new(measure: f64, tempo: f64) -> Self {
        Self { measure, tempo }
    }
}

/// Seconds per measure at a constant tempo.
#[inline]
fn tempo_to_delta_time(tempo: f64, beats_per_measure: f64) -> f64 {
    60.0 * beats_per_measure / tempo
}

/// Seconds elapsed along the linear segment from `start` to `end` by
/// `current` (a measure inside the segment).
fn measure_to_delta_time(start: TempoPoint, end: TempoPoint, current: f64, bpm: f64) -> f64 {
    if start.measure == end.measure {
        // Past the last breakpoint the tempo is held constant.
        (current - end.measure) * tempo_to_delta_time(end.tempo, bpm)
    } else if start.tempo == end.tempo {
        // Constant-tempo segment; the log form below would be 0/0.
        60.0 * bpm / start.tempo * (current - start.measure)
    } else {
        let slope = (end.tempo - start.tempo) / (end.measure - start.measure);
        let current_tempo = start.tempo + slope * (current - start.measure);
        60.0 * bpm / slope * (current_tempo / start.tempo).ln()
    }
}

/// Inverse of [`measure_to_delta_time`]: solve for the measure reached after
/// `delta` seconds into the segment.
fn delta_time_to_measure(start: TempoPoint, end: TempoPoint, delta: f64, bpm: f64) -> f64 {
    if start.measure == end.measure {
        end.measure + delta / tempo_to_delta_time(end.tempo, bpm)
    } else if start.tempo == end.tempo {
        start.measure + delta / bpm / 60.0 * start.tempo
    } else {
        let slope = (end.tempo - start.tempo) / (end.measure - start.measure);
        start.measure + ((delta / bpm / 60.0 * slope).exp() * start.tempo - start.tempo) / slope
    }
}

/// A piecewise-linear tempo curve with bidirectional measure/time mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoMap {
    points: Vec<TempoPoint>,
    beats_per_measure: f64,
}

impl TempoMap {
    /// Build a map from breakpoints, canonicalizing the representation:
    /// leading points that share a measure have no effect on the curve and
    /// only complicate interpolation, so all but the last are dropped.
    pub fn new(points: Vec<TempoPoint>) -> Self {
        let mut points = points;
        while points.len() > 1 && points[0].measure == points[1].measure {
            points.remove(0);
        }
        Self {
            points,
            beats_per_measure: DEFAULT_BEATS_PER_MEASURE,
        }
    }

    /// A flat curve at the given tempo.
    pub fn constant(tempo: f64) -> Self {
        Self::new(vec![TempoPoint::new(1.0, tempo)])
    }

    pub fn with_beats_per_measure(mut self, beats_per_measure: f64) -> Self {
        self.beats_per_measure = beats_per_measure;
        self
    }

    pub fn points(&self) -> &[TempoPoint] {
        &self.points
    }

    pub fn beats_per_measure(&self) -> f64 {
        self.beats_per_measure
    }

    /// Elapsed seconds from measure 1 and instantaneous tempo at `measure`.
    pub fn point_at_measure(&self, measure: f64) -> (f64, f64) {
        let mut time = 0.0;
        let mut prev = TempoPoint::new(1.0, DEFAULT_TEMPO);
        let mut point = prev;
        for &p in &self.points {
            point = p;
            if measure < p.measure {
                break;
            }
            // Integrate delta time between the previous breakpoint and this one.
            time += measure_to_delta_time(prev, p, p.measure, self.beats_per_measure);
            prev = p;
        }
        time += measure_to_delta_time(prev, point, measure, self.beats_per_measure);

        if point.measure == prev.measure {
            // No more breakpoints: the last tempo is held constant.
            return (time, point.tempo);
        }
        let slope = (point.tempo - prev.tempo) / (point.measure - prev.measure);
        (time, prev.tempo + slope * (measure - prev.measure))
    }

    /// Inverse lookup: measure reached and instantaneous tempo after `time`
    /// seconds from measure 1.
    pub fn point_at_time(&self, time: f64) -> (f64, f64) {
        let mut prev_time = 0.0;
        let mut next_time = 0.0;
        let mut prev = TempoPoint::new(1.0, DEFAULT_TEMPO);
        let mut point = prev;
        for &p in &self.points {
            point = p;
            next_time += measure_to_delta_time(prev, p, p.measure, self.beats_per_measure);
            if time < next_time {
                break;
            }
            prev_time = next_time;
            prev = p;
        }
        let measure = delta_time_to_measure(prev, point, time - prev_time, self.beats_per_measure);

        if point.measure == prev.measure {
            return (measure, point.tempo);
        }
        let slope = (point.tempo - prev.tempo) / (point.measure - prev.measure);
        (measure, prev.tempo + slope * (measure - prev.measure))
    }

    #[inline]
    pub fn measure_to_time(&self, measure: f64) -> f64 {
        self.point_at_measure(measure).0
    }

    #[inline]
    pub fn time_to_measure(&self, time: f64) -> f64 {
        self.point_at_time(time).0
    }

    #[inline]
    pub fn tempo_at_measure(&self, measure: f64) -> f64 {
        self.point_at_measure(measure).1
    }

    #[inline]
    pub fn tempo_at_time(&self, time: f64) -> f64 {
        self.point_at_time(time).1
    }

    /// Extract the curve between `start_measure` and `end_measure` as a new
    /// map starting at measure 1, bracketed by interpolated endpoints. Used
    /// when only a sub-range (a loop region) is being time-stretched.
    pub fn slice(&self, start_measure: f64, end_measure: f64) -> TempoMap {
        let start_tempo = self.tempo_at_measure(start_measure);
        let end_tempo = self.tempo_at_measure(end_measure);

        let mut points = vec![TempoPoint::new(1.0, start_tempo)];
        for &p in &self.points {
            if p.measure > start_measure && p.measure < end_measure {
                points.push(TempoPoint::new(p.measure - start_measure + 1.0, p.tempo));
            }
        }
        points.push(TempoPoint::new(
            end_measure - start_measure + 1.0,
            end_tempo,
        ));
        TempoMap::new(points).with_beats_per_measure(self.beats_per_measure)
    }
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::constant(DEFAULT_TEMPO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_constant_tempo_time() {
        // 120 BPM, 4 beats per measure: 2 seconds per measure.
        let map = TempoMap::constant(120.0);
        assert_relative_eq!(map.measure_to_time(1.0), 0.0);
        assert_relative_eq!(map.measure_to_time(5.0), 8.0);
        assert_relative_eq!(map.measure_to_time(2.5), 3.0);
        assert_relative_eq!(map.time_to_measure(8.0), 5.0);
    }

    #[test]
    fn test_linear_tempo_interpolation() {
        let map = TempoMap::new(vec![
            TempoPoint::new(1.0, 120.0),
            TempoPoint::new(5.0, 240.0),
        ]);
        assert_relative_eq!(map.tempo_at_measure(3.0), 180.0);
        // Tempo increases, so less time elapses than at constant 120.
        let constant = TempoMap::constant(120.0);
        assert!(map.measure_to_time(5.0) < constant.measure_to_time(5.0));
    }

    #[test]
    fn test_hold_after_last_point() {
        let map = TempoMap::new(vec![
            TempoPoint::new(1.0, 120.0),
            TempoPoint::new(3.0, 60.0),
        ]);
        assert_relative_eq!(map.tempo_at_measure(10.0), 60.0);
        // Past measure 3, each measure takes 4 seconds at 60 BPM.
        let t3 = map.measure_to_time(3.0);
        assert_relative_eq!(map.measure_to_time(4.0), t3 + 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_round_trip_across_segments() {
        let map = TempoMap::new(vec![
            TempoPoint::new(1.0, 90.0),
            TempoPoint::new(4.0, 180.0),
            TempoPoint::new(9.0, 60.0),
        ]);
        for m in [1.0, 1.5, 3.999, 4.0, 6.25, 9.0, 12.5] {
            let t = map.measure_to_time(m);
            assert_relative_eq!(map.time_to_measure(t), m, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_canonicalize_leading_duplicates() {
        let map = TempoMap::new(vec![
            TempoPoint::new(1.0, 100.0),
            TempoPoint::new(1.0, 140.0),
            TempoPoint::new(5.0, 140.0),
        ]);
        assert_eq!(map.points().len(), 2);
        assert_relative_eq!(map.tempo_at_measure(1.0), 140.0);
    }

    #[test]
    fn test_zero_length_segment_no_division() {
        // Interior duplicate measures must not produce NaN/inf.
        let map = TempoMap::new(vec![
            TempoPoint::new(1.0, 120.0),
            TempoPoint::new(4.0, 120.0),
            TempoPoint::new(4.0, 240.0),
        ]);
        let t = map.measure_to_time(6.0);
        assert!(t.is_finite());
    }

    #[test]
    fn test_slice_matches_parent_curve() {
        let map = TempoMap::new(vec![
            TempoPoint::new(1.0, 120.0),
            TempoPoint::new(5.0, 240.0),
            TempoPoint::new(9.0, 90.0),
        ]);
        let sliced = map.slice(3.0, 7.0);
        assert_relative_eq!(sliced.tempo_at_measure(1.0), map.tempo_at_measure(3.0));
        for m in [1.0, 2.0, 3.5, 5.0] {
            let expected = map.measure_to_time(m + 2.0) - map.measure_to_time(3.0);
            assert_relative_eq!(sliced.measure_to_time(m), expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_slice_of_constant_is_constant() {
        let sliced = TempoMap::constant(100.0).slice(2.0, 6.0);
        assert_relative_eq!(sliced.tempo_at_measure(1.0), 100.0);
        assert_relative_eq!(sliced.tempo_at_measure(5.0), 100.0);
    }

    #[test]
    fn test_custom_beats_per_measure() {
        // 3/4 at 180 BPM: 1 second per measure.
        let map = TempoMap::constant(180.0).with_beats_per_measure(3.0);
        assert_relative_eq!(map.measure_to_time(4.0), 3.0);
    }

    proptest! {
        #[test]
        fn prop_time_round_trips_to_measure(
            tempos in proptest::collection::vec(30.0f64..300.0, 1..6),
            measure in 1.0f64..32.0,
        ) {
            let points = tempos
                .iter()
                .enumerate()
                .map(|(i, &t)| TempoPoint::new(1.0 + 3.0 * i as f64, t))
                .collect();
            let map = TempoMap::new(points);
            let time = map.measure_to_time(measure);
            prop_assert!((map.time_to_measure(time) - measure).abs() < 1e-6);
        }
    }
}
