//! Sensor readings and the selection vocabulary used to chart them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DashboardError;

/// One timestamped measurement from the weather/pollution station.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Reading {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub air_quality: f64,
    pub gas_mq2: f64,
    pub gas_mq4: f64,
    pub dust: f64,
}

/// A reading as it arrives from a feed, timestamp still unparsed.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingRecord {
    pub id: i64,
    pub timestamp: String,
    pub temperature: f64,
    pub humidity: f64,
    pub air_quality: f64,
    pub gas_mq2: f64,
    pub gas_mq4: f64,
    pub dust: f64,
}

impl TryFrom<ReadingRecord> for Reading {
    type Error = DashboardError;

    fn try_from(record: ReadingRecord) -> Result<Self, Self::Error> {
        let timestamp = DateTime::parse_from_rfc3339(record.timestamp.trim())
            .map_err(|source| DashboardError::InvalidTimestamp {
                id: record.id,
                value: record.timestamp.clone(),
                source,
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id: record.id,
            timestamp,
            temperature: record.temperature,
            humidity: record.humidity,
            air_quality: record.air_quality,
            gas_mq2: record.gas_mq2,
            gas_mq4: record.gas_mq4,
            dust: record.dust,
        })
    }
}

impl Reading {
    /// Value of a single measurement field. `Metric::All` names no field.
    #[must_use]
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => Some(self.temperature),
            Metric::Humidity => Some(self.humidity),
            Metric::AirQuality => Some(self.air_quality),
            Metric::GasMq2 => Some(self.gas_mq2),
            Metric::GasMq4 => Some(self.gas_mq4),
            Metric::Dust => Some(self.dust),
            Metric::All => None,
        }
    }
}

/// Chartable field of a [`Reading`], plus the `all` overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Temperature,
    Humidity,
    AirQuality,
    GasMq2,
    GasMq4,
    Dust,
    All,
}

impl Metric {
    /// Selector order on the dashboard.
    pub const ALL: [Self; 7] = [
        Self::Temperature,
        Self::Humidity,
        Self::AirQuality,
        Self::GasMq2,
        Self::GasMq4,
        Self::Dust,
        Self::All,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::AirQuality => "air_quality",
            Self::GasMq2 => "gas_mq2",
            Self::GasMq4 => "gas_mq4",
            Self::Dust => "dust",
            Self::All => "all",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::AirQuality => "Air Quality",
            Self::GasMq2 => "Gas MQ2",
            Self::GasMq4 => "Gas MQ4",
            Self::Dust => "Dust",
            Self::All => "All Data",
        }
    }

    #[must_use]
    pub const fn unit(self) -> Option<&'static str> {
        match self {
            Self::Temperature => Some("°C"),
            Self::Humidity => Some("%"),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Metric {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.key() == s.trim())
            .ok_or_else(|| DashboardError::UnknownMetric(s.to_string()))
    }
}

/// Relative window a reading's timestamp must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
}

impl TimeRange {
    pub const ALL: [Self; 4] = [
        Self::Today,
        Self::Yesterday,
        Self::Last7Days,
        Self::Last30Days,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Last7Days => "last7days",
            Self::Last30Days => "last30days",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::Last7Days => "Last 7 Days",
            Self::Last30Days => "Last 30 Days",
        }
    }

    /// Parse a range key, failing open: unknown or empty input yields `None`,
    /// which the filter treats as "no filtering".
    #[must_use]
    pub fn parse_lenient(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse() {
            Ok(range) => Some(range),
            Err(e) => {
                tracing::debug!(error = %e, "time range not recognised, showing all readings");
                None
            }
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TimeRange {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.key() == s.trim())
            .ok_or_else(|| DashboardError::UnknownTimeRange(s.to_string()))
    }
}

/// What the dashboard is currently showing. `time_range: None` means unfiltered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Selection {
    pub metric: Metric,
    pub time_range: Option<TimeRange>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            metric: Metric::Temperature,
            time_range: Some(TimeRange::Today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: &str) -> ReadingRecord {
        ReadingRecord {
            id: 9,
            timestamp: timestamp.to_string(),
            temperature: 20.5,
            humidity: 60.0,
            air_quality: 2950.0,
            gas_mq2: 2980.0,
            gas_mq4: 3270.0,
            dust: 0.0,
        }
    }

    #[test]
    fn record_with_iso_timestamp_converts() {
        let reading = Reading::try_from(record("2024-12-18T20:45:17.094Z")).unwrap();
        assert_eq!(reading.id, 9);
        assert_eq!(reading.timestamp.to_rfc3339(), "2024-12-18T20:45:17.094+00:00");
    }

    #[test]
    fn record_with_offset_timestamp_is_normalised_to_utc() {
        let reading = Reading::try_from(record("2024-12-18T21:45:17+01:00")).unwrap();
        assert_eq!(reading.timestamp.to_rfc3339(), "2024-12-18T20:45:17+00:00");
    }

    #[test]
    fn record_with_garbage_timestamp_is_rejected() {
        let err = Reading::try_from(record("yesterday-ish")).unwrap_err();
        assert!(matches!(err, DashboardError::InvalidTimestamp { id: 9, .. }));
    }

    #[test]
    fn metric_keys_round_trip_through_from_str() {
        for metric in Metric::ALL {
            assert_eq!(metric.key().parse::<Metric>().unwrap(), metric);
        }
        assert!(matches!(
            "pressure".parse::<Metric>(),
            Err(DashboardError::UnknownMetric(_))
        ));
    }

    #[test]
    fn serde_uses_the_same_keys_as_from_str() {
        assert_eq!(serde_json::to_value(Metric::AirQuality).unwrap(), "air_quality");
        assert_eq!(serde_json::to_value(TimeRange::Last7Days).unwrap(), "last7days");
        assert_eq!(serde_json::to_value(TimeRange::Last30Days).unwrap(), "last30days");
    }

    #[test]
    fn unknown_ranges_fail_open() {
        assert_eq!(TimeRange::parse_lenient(Some("yesterday")), Some(TimeRange::Yesterday));
        assert_eq!(TimeRange::parse_lenient(Some("lastweek")), None);
        assert_eq!(TimeRange::parse_lenient(Some("")), None);
        assert_eq!(TimeRange::parse_lenient(None), None);
    }

    #[test]
    fn all_metric_has_no_single_value() {
        let reading = Reading::try_from(record("2024-12-18T20:45:17Z")).unwrap();
        assert_eq!(reading.value(Metric::GasMq4), Some(3270.0));
        assert_eq!(reading.value(Metric::All), None);
    }

    #[test]
    fn default_selection_is_todays_temperature() {
        let selection = Selection::default();
        assert_eq!(selection.metric, Metric::Temperature);
        assert_eq!(selection.time_range, Some(TimeRange::Today));
    }
}
