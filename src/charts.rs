use itertools::{Itertools, MinMaxResult};

use crate::store::SampleStore;

pub const CHART_REFRESH_MS: u64 = 1000;

/// The three quantities plotted by the monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    Temperature,
    Conductance,
    HeartRate,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Conductance, Metric::HeartRate];

    /// Legend entry
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Conductance => "GSR",
            Metric::HeartRate => "BPM",
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temp (°C)",
            Metric::Conductance => "GSR",
            Metric::HeartRate => "BPM",
        }
    }

    fn values<'a>(&self, store: &'a SampleStore) -> &'a [f64] {
        match self {
            Metric::Temperature => store.temperature(),
            Metric::Conductance => store.conductance(),
            Metric::HeartRate => store.heart_rate(),
        }
    }
}

/// One plotted line: `[sample index, value]` pairs plus the value range, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartSeries {
    pub metric: Metric,
    pub points: Vec<[f64; 2]>,
    pub value_range: Option<(f64, f64)>,
}

impl ChartSeries {
    pub fn from_store(metric: Metric, store: &SampleStore) -> Self {
        let values = metric.values(store);
        let points = store
            .index()
            .iter()
            .zip(values)
            .map(|(index, value)| [*index as f64, *value])
            .collect();
        let value_range = match values.iter().copied().minmax_by(f64::total_cmp) {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(v) => Some((v, v)),
            MinMaxResult::MinMax(min, max) => Some((min, max)),
        };
        Self {
            metric,
            points,
            value_range,
        }
    }
}

/// Everything the chart view draws, rebuilt from the whole sample store on each refresh.
///
/// Building a snapshot only reads the store, so two builds without new samples in between
/// are identical.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartSnapshot {
    pub series: [ChartSeries; 3],
}

impl ChartSnapshot {
    pub fn from_store(store: &SampleStore) -> Self {
        Self {
            series: Metric::ALL.map(|metric| ChartSeries::from_store(metric, store)),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.series[0].points.len()
    }
}

impl Default for ChartSnapshot {
    fn default() -> Self {
        Self::from_store(&SampleStore::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::Reading;

    fn store_with(readings: &[(f64, f64, f64)]) -> SampleStore {
        let mut store = SampleStore::new();
        for (t, g, b) in readings {
            store.push(Reading::new(*t, *g, *b));
        }
        store
    }

    #[test]
    fn test_series_follow_store() {
        let store = store_with(&[(20., 1., 60.), (21., 3., 58.)]);
        let snapshot = ChartSnapshot::from_store(&store);

        assert_eq!(snapshot.sample_count(), 2);
        let [temperature, conductance, heart_rate] = &snapshot.series;
        assert_eq!(temperature.metric, Metric::Temperature);
        assert_eq!(temperature.points, vec![[1., 20.], [2., 21.]]);
        assert_eq!(conductance.points, vec![[1., 1.], [2., 3.]]);
        assert_eq!(heart_rate.points, vec![[1., 60.], [2., 58.]]);
        assert_eq!(heart_rate.value_range, Some((58., 60.)));
    }

    #[test]
    fn test_rebuild_without_new_samples_is_identical() {
        let store = store_with(&[(20., 1., 60.), (21., 3., 58.), (22., 2., 59.)]);
        let first = ChartSnapshot::from_store(&store);
        let second = ChartSnapshot::from_store(&store);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_store() {
        let snapshot = ChartSnapshot::default();
        assert_eq!(snapshot.sample_count(), 0);
        assert!(snapshot.series.iter().all(|s| s.value_range.is_none()));
    }

    #[test]
    fn test_single_sample_range() {
        let store = store_with(&[(20., 1., 60.)]);
        let snapshot = ChartSnapshot::from_store(&store);
        assert_eq!(snapshot.series[0].value_range, Some((20., 20.)));
    }

    #[test]
    fn test_labels() {
        let names: Vec<_> = Metric::ALL.iter().map(Metric::name).collect();
        assert_eq!(names, vec!["Temperature", "GSR", "BPM"]);
        assert_eq!(Metric::Temperature.axis_label(), "Temp (°C)");
    }
}
