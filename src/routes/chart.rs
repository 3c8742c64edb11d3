use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::chart::ChartConfig;
use crate::common::AppState;
use crate::error::AppResult;
use crate::model::{Metric, Selection, TimeRange};
use crate::routes::{parse_metric, resolve_offset};

/// Canvas id used by the dashboard page.
pub const DEFAULT_CANVAS: &str = "weather-chart";

fn default_canvas() -> String {
    DEFAULT_CANVAS.to_string()
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ChartQuery {
    /// Metric key (temperature, humidity, air_quality, gas_mq2, gas_mq4, dust, all). Default: temperature
    pub metric: Option<String>,
    /// Time range key (today, yesterday, last7days, last30days). Unknown values show everything. Default: today
    pub range: Option<String>,
    /// Client UTC offset in minutes east of UTC (browser: -getTimezoneOffset())
    pub tz_offset: Option<i32>,
    /// Canvas element the chart is drawn on. Empty means no surface.
    #[serde(default = "default_canvas")]
    pub canvas: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChartResponse {
    pub canvas: String,
    pub selection: Selection,
    /// Chart.js configuration, ready for `new Chart(ctx, config)`
    pub config: ChartConfig,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MetricOption {
    pub key: Metric,
    pub name: String,
    pub unit: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RangeOption {
    pub key: TimeRange,
    pub name: String,
}

/// Build the chart for a metric and time range
///
/// Filters the readings to the range as seen from the client's time zone,
/// assembles the series and returns the Chart.js configuration.
#[utoipa::path(
    get,
    path = "/api/chart",
    params(ChartQuery),
    responses(
        (status = 200, description = "Chart built", body = ChartResponse),
        (status = 204, description = "No canvas given, nothing drawn"),
        (status = 400, description = "Unknown metric or bad time zone offset"),
    ),
    tag = "chart"
)]
pub async fn get_chart(
    State(state): State<AppState>,
    Query(query): Query<ChartQuery>,
) -> AppResult<Response> {
    let selection = Selection {
        metric: parse_metric(query.metric.as_deref())?,
        time_range: match query.range.as_deref() {
            None => Some(TimeRange::default()),
            raw => TimeRange::parse_lenient(raw),
        },
    };
    let offset = resolve_offset(query.tz_offset, &state.config)?;

    let canvas = query.canvas.trim().to_string();
    let surface = (!canvas.is_empty()).then(|| canvas.clone());

    let mut view = state.chart_view(selection, offset);
    view.mount(surface);
    let config = view.chart().map(|chart| chart.config.clone());
    view.unmount();

    let Some(config) = config else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    tracing::debug!(
        metric = %selection.metric,
        range = ?selection.time_range,
        points = config.data.labels.len(),
        "chart_built"
    );

    Ok(Json(ChartResponse {
        canvas,
        selection,
        config,
    })
    .into_response())
}

/// List chartable metrics
#[utoipa::path(
    get,
    path = "/api/metrics",
    responses(
        (status = 200, description = "Metrics in selector order", body = Vec<MetricOption>),
    ),
    tag = "chart"
)]
pub async fn list_metrics() -> Json<Vec<MetricOption>> {
    Json(
        Metric::ALL
            .into_iter()
            .map(|m| MetricOption {
                key: m,
                name: m.display_name().to_string(),
                unit: m.unit().map(str::to_string),
            })
            .collect(),
    )
}

/// List time ranges
#[utoipa::path(
    get,
    path = "/api/ranges",
    responses(
        (status = 200, description = "Time ranges in selector order", body = Vec<RangeOption>),
    ),
    tag = "chart"
)]
pub async fn list_ranges() -> Json<Vec<RangeOption>> {
    Json(
        TimeRange::ALL
            .into_iter()
            .map(|r| RangeOption {
                key: r,
                name: r.display_name().to_string(),
            })
            .collect(),
    )
}
