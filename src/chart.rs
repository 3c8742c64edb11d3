//! Turning filtered readings into chart series and a Chart.js configuration.

use std::fmt::Display;

use chrono::TimeZone;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{Metric, Reading};

const TEAL: SeriesStyle = SeriesStyle::new("rgba(75, 192, 192, 1)", "rgba(75, 192, 192, 0.2)");
const PINK: SeriesStyle = SeriesStyle::new("rgba(255, 99, 132, 1)", "rgba(255, 99, 132, 0.2)");
const PURPLE: SeriesStyle = SeriesStyle::new("rgba(153, 102, 255, 1)", "rgba(153, 102, 255, 0.2)");

pub const CHART_TITLE: &str = "Weather Data Performance";

/// Labels plus one or more value series of the same length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub unit: Option<String>,
    /// One value per label, null where the reading has no such field
    pub values: Vec<Option<f64>>,
    pub style: SeriesStyle,
}

impl Series {
    /// Text shown in the chart legend.
    #[must_use]
    pub fn legend_label(&self) -> String {
        match &self.unit {
            Some(unit) => format!("{} ({unit})", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStyle {
    pub border_color: &'static str,
    pub background_color: &'static str,
    pub border_width: u32,
    pub tension: f64,
    pub point_radius: u32,
}

impl SeriesStyle {
    const fn new(border_color: &'static str, background_color: &'static str) -> Self {
        Self {
            border_color,
            background_color,
            border_width: 2,
            tension: 0.4,
            point_radius: 3,
        }
    }
}

/// Build chart series for `metric` from readings already filtered and ordered.
///
/// `All` always yields temperature and humidity; any other metric yields a
/// single series. Labels are times of day in `tz`.
pub fn assemble<Tz>(readings: &[Reading], metric: Metric, tz: &Tz) -> ChartData
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let labels = readings.iter().map(|r| time_label(r, tz)).collect();

    let series = if metric == Metric::All {
        vec![
            overview_series(readings, Metric::Temperature, TEAL),
            overview_series(readings, Metric::Humidity, PINK),
        ]
    } else {
        vec![Series {
            name: format!("{} Data", capitalize(metric.key())),
            unit: None,
            values: readings.iter().map(|r| r.value(metric)).collect(),
            style: PURPLE,
        }]
    };

    ChartData { labels, series }
}

fn overview_series(readings: &[Reading], metric: Metric, style: SeriesStyle) -> Series {
    Series {
        name: metric.display_name().to_string(),
        unit: metric.unit().map(str::to_string),
        values: readings.iter().map(|r| r.value(metric)).collect(),
        style,
    }
}

/// Wall-clock time of a reading in `tz`, e.g. `8:45:17 PM`.
pub fn time_label<Tz>(reading: &Reading, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    reading
        .timestamp
        .with_timezone(tz)
        .format("%-I:%M:%S %p")
        .to_string()
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
}

/// A complete Chart.js document: `new Chart(ctx, config)`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub data: ChartJsData,
    pub options: ChartOptions,
}

impl ChartConfig {
    #[must_use]
    pub fn line(data: &ChartData) -> Self {
        Self {
            chart_type: ChartType::Line,
            data: ChartJsData {
                labels: data.labels.clone(),
                datasets: data.series.iter().map(Dataset::from).collect(),
            },
            options: ChartOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChartJsData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<Option<f64>>,
    pub border_color: String,
    pub background_color: String,
    pub border_width: u32,
    pub tension: f64,
    pub point_radius: u32,
    pub point_background_color: String,
}

impl From<&Series> for Dataset {
    fn from(series: &Series) -> Self {
        Self {
            label: series.legend_label(),
            data: series.values.clone(),
            border_color: series.style.border_color.to_string(),
            background_color: series.style.background_color.to_string(),
            border_width: series.style.border_width,
            tension: series.style.tension,
            point_radius: series.style.point_radius,
            point_background_color: series.style.border_color.to_string(),
        }
    }
}

/// Fixed presentation options: legend on top, titled, x-axis pan and zoom.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChartOptions {
    pub responsive: bool,
    pub plugins: Plugins,
    pub scales: Scales,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            responsive: true,
            plugins: Plugins {
                legend: Legend {
                    position: "top".to_string(),
                },
                title: Title::shown(CHART_TITLE),
                zoom: ZoomPlugin {
                    pan: Pan {
                        enabled: true,
                        mode: AxisMode::X,
                    },
                    zoom: Zoom {
                        wheel: Toggle { enabled: true },
                        pinch: Toggle { enabled: true },
                        mode: AxisMode::X,
                    },
                },
            },
            scales: Scales {
                x: Axis {
                    title: Title::shown("Timestamp"),
                },
                y: Axis {
                    title: Title::shown("Values"),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Plugins {
    pub legend: Legend,
    pub title: Title,
    pub zoom: ZoomPlugin,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Legend {
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Title {
    pub display: bool,
    pub text: String,
}

impl Title {
    fn shown(text: &str) -> Self {
        Self {
            display: true,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ZoomPlugin {
    pub pan: Pan,
    pub zoom: Zoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AxisMode {
    X,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Pan {
    pub enabled: bool,
    pub mode: AxisMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Zoom {
    pub wheel: Toggle,
    pub pinch: Toggle,
    pub mode: AxisMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Toggle {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Scales {
    pub x: Axis,
    pub y: Axis,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Axis {
    pub title: Title,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ReadingSource, StaticSource};
    use chrono::{FixedOffset, Utc};

    fn sample() -> Vec<Reading> {
        StaticSource::sample().unwrap().fetch_readings()
    }

    fn assert_aligned(data: &ChartData) {
        for series in &data.series {
            assert_eq!(series.values.len(), data.labels.len(), "series {}", series.name);
        }
    }

    #[test]
    fn temperature_series_keeps_input_order() {
        let data = assemble(&sample(), Metric::Temperature, &Utc);
        assert_eq!(data.series.len(), 1);
        assert_eq!(data.series[0].name, "Temperature Data");
        assert_eq!(
            data.series[0].values,
            vec![Some(21.7), Some(21.7), Some(21.7), Some(21.8), Some(21.7)]
        );
        assert_aligned(&data);
    }

    #[test]
    fn labels_are_times_of_day_in_the_given_zone() {
        let data = assemble(&sample(), Metric::Humidity, &Utc);
        assert_eq!(data.labels[0], "8:45:17 PM");
        assert_eq!(data.labels[4], "8:44:59 PM");

        let cet = FixedOffset::east_opt(3600).unwrap();
        let data = assemble(&sample(), Metric::Humidity, &cet);
        assert_eq!(data.labels[0], "9:45:17 PM");
    }

    #[test]
    fn single_metric_names_capitalise_only_the_first_letter() {
        let data = assemble(&sample(), Metric::AirQuality, &Utc);
        assert_eq!(data.series[0].name, "Air_quality Data");
        assert_eq!(data.series[0].values[0], Some(2955.0));

        let data = assemble(&sample(), Metric::GasMq2, &Utc);
        assert_eq!(data.series[0].name, "Gas_mq2 Data");
    }

    #[test]
    fn all_yields_temperature_and_humidity() {
        let data = assemble(&sample(), Metric::All, &Utc);
        let names: Vec<&str> = data.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Temperature", "Humidity"]);
        assert_eq!(
            data.series[1].values,
            vec![Some(63.1), Some(63.2), Some(63.2), Some(63.5), Some(64.4)]
        );
        assert_eq!(data.series[0].legend_label(), "Temperature (°C)");
        assert_eq!(data.series[1].legend_label(), "Humidity (%)");
        assert_aligned(&data);
    }

    #[test]
    fn empty_input_gives_empty_but_present_series() {
        for metric in Metric::ALL {
            let data = assemble(&[], metric, &Utc);
            assert!(data.labels.is_empty());
            let expected = if metric == Metric::All { 2 } else { 1 };
            assert_eq!(data.series.len(), expected, "metric {metric}");
            assert!(data.series.iter().all(|s| s.values.is_empty()));
        }
    }

    #[test]
    fn every_metric_keeps_labels_and_values_aligned() {
        let readings = sample();
        for n in 0..=readings.len() {
            for metric in Metric::ALL {
                assert_aligned(&assemble(&readings[..n], metric, &Utc));
            }
        }
    }

    #[test]
    fn config_serialises_in_chartjs_shape() {
        let data = assemble(&sample(), Metric::All, &Utc);
        let json = serde_json::to_value(ChartConfig::line(&data)).unwrap();

        assert_eq!(json["type"], "line");
        assert_eq!(json["data"]["labels"].as_array().unwrap().len(), 5);
        assert_eq!(json["data"]["datasets"][0]["label"], "Temperature (°C)");
        assert_eq!(json["data"]["datasets"][0]["borderColor"], "rgba(75, 192, 192, 1)");
        assert_eq!(json["data"]["datasets"][1]["pointBackgroundColor"], "rgba(255, 99, 132, 1)");
        assert_eq!(json["data"]["datasets"][1]["tension"], 0.4);

        let options = &json["options"];
        assert_eq!(options["plugins"]["legend"]["position"], "top");
        assert_eq!(options["plugins"]["title"]["text"], "Weather Data Performance");
        assert_eq!(options["plugins"]["zoom"]["pan"]["mode"], "x");
        assert_eq!(options["plugins"]["zoom"]["zoom"]["wheel"]["enabled"], true);
        assert_eq!(options["plugins"]["zoom"]["zoom"]["pinch"]["enabled"], true);
        assert_eq!(options["scales"]["x"]["title"]["text"], "Timestamp");
        assert_eq!(options["scales"]["y"]["title"]["text"], "Values");
    }
}
