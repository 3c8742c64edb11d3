//! Where readings come from.
//!
//! The dashboard only ever sees a [`ReadingSource`]; the bundled station
//! sample is one implementation, a live feed would be another.

use std::collections::HashSet;

use crate::error::DashboardError;
use crate::model::{Reading, ReadingRecord};

pub trait ReadingSource: Send + Sync {
    /// Snapshot of the readings currently known, newest first.
    fn fetch_readings(&self) -> Vec<Reading>;
}

/// Station capture from the evening of 2024-12-18, newest first.
const SAMPLE_READINGS_JSON: &str = r#"[
    {"id": 5, "timestamp": "2024-12-18T20:45:17.094Z", "temperature": 21.7, "humidity": 63.1, "air_quality": 2955, "gas_mq2": 2979, "gas_mq4": 3274, "dust": 0},
    {"id": 4, "timestamp": "2024-12-18T20:45:12.853Z", "temperature": 21.7, "humidity": 63.2, "air_quality": 2960, "gas_mq2": 2989, "gas_mq4": 3269, "dust": 0},
    {"id": 3, "timestamp": "2024-12-18T20:45:08.595Z", "temperature": 21.7, "humidity": 63.2, "air_quality": 2959, "gas_mq2": 2977, "gas_mq4": 3283, "dust": 0},
    {"id": 2, "timestamp": "2024-12-18T20:45:04.342Z", "temperature": 21.8, "humidity": 63.5, "air_quality": 2960, "gas_mq2": 2985, "gas_mq4": 3293, "dust": 0},
    {"id": 1, "timestamp": "2024-12-18T20:44:59.960Z", "temperature": 21.7, "humidity": 64.4, "air_quality": 2962, "gas_mq2": 2979, "gas_mq4": 3281, "dust": 0}
]"#;

/// Immutable, in-memory set of readings.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    readings: Vec<Reading>,
}

impl StaticSource {
    /// Readings repeating an earlier id are dropped.
    #[must_use]
    pub fn new(readings: Vec<Reading>) -> Self {
        Self {
            readings: unique_ids(readings),
        }
    }

    /// The bundled five-reading station sample.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Dataset` if the bundled JSON does not parse.
    pub fn sample() -> Result<Self, DashboardError> {
        Self::from_json(SAMPLE_READINGS_JSON)
    }

    /// Load readings from their JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Dataset` if `json` is not an array of records.
    /// Individual records with bad timestamps are dropped, not reported.
    pub fn from_json(json: &str) -> Result<Self, DashboardError> {
        let records: Vec<ReadingRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = ReadingRecord>) -> Self {
        Self {
            readings: load_records(records),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl ReadingSource for StaticSource {
    fn fetch_readings(&self) -> Vec<Reading> {
        self.readings.clone()
    }
}

/// Convert raw records, dropping any whose timestamp does not parse and any
/// that repeat an id already loaded.
pub fn load_records(records: impl IntoIterator<Item = ReadingRecord>) -> Vec<Reading> {
    unique_ids(records.into_iter().filter_map(|record| match Reading::try_from(record) {
        Ok(reading) => Some(reading),
        Err(e) => {
            tracing::warn!(error = %e, "dropping reading");
            None
        }
    }))
}

fn unique_ids(readings: impl IntoIterator<Item = Reading>) -> Vec<Reading> {
    let mut seen = HashSet::new();
    readings
        .into_iter()
        .filter(|reading| {
            let first = seen.insert(reading.id);
            if !first {
                tracing::warn!(id = reading.id, "dropping reading with duplicate id");
            }
            first
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_has_five_readings_newest_first() {
        let source = StaticSource::sample().unwrap();
        let ids: Vec<i64> = source.fetch_readings().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn sample_values_are_carried_through() {
        let readings = StaticSource::sample().unwrap().fetch_readings();
        let first = &readings[0];
        assert_eq!(first.temperature, 21.7);
        assert_eq!(first.humidity, 63.1);
        assert_eq!(first.air_quality, 2955.0);
        assert_eq!(first.gas_mq2, 2979.0);
        assert_eq!(first.gas_mq4, 3274.0);
        assert_eq!(first.dust, 0.0);
    }

    #[test]
    fn bad_timestamps_are_dropped_and_the_rest_kept() {
        let json = r#"[
            {"id": 2, "timestamp": "not a time", "temperature": 1, "humidity": 1, "air_quality": 1, "gas_mq2": 1, "gas_mq4": 1, "dust": 1},
            {"id": 1, "timestamp": "2024-12-18T20:44:59.960Z", "temperature": 1, "humidity": 1, "air_quality": 1, "gas_mq2": 1, "gas_mq4": 1, "dust": 1}
        ]"#;
        let source = StaticSource::from_json(json).unwrap();
        assert_eq!(source.len(), 1);
        assert_eq!(source.fetch_readings()[0].id, 1);
    }

    #[test]
    fn repeated_ids_keep_the_first_reading() {
        let json = r#"[
            {"id": 1, "timestamp": "2024-12-18T20:45:04.342Z", "temperature": 2, "humidity": 1, "air_quality": 1, "gas_mq2": 1, "gas_mq4": 1, "dust": 1},
            {"id": 1, "timestamp": "2024-12-18T20:44:59.960Z", "temperature": 1, "humidity": 1, "air_quality": 1, "gas_mq2": 1, "gas_mq4": 1, "dust": 1},
            {"id": 7, "timestamp": "2024-12-18T20:44:55.000Z", "temperature": 3, "humidity": 1, "air_quality": 1, "gas_mq2": 1, "gas_mq4": 1, "dust": 1}
        ]"#;
        let source = StaticSource::from_json(json).unwrap();
        let readings = source.fetch_readings();
        assert_eq!(readings.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 7]);
        assert_eq!(readings[0].temperature, 2.0);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(matches!(
            StaticSource::from_json("{\"id\": 1}"),
            Err(DashboardError::Dataset(_))
        ));
    }
}
