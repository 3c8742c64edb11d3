use axum::{
    extract::{Query, State},
    http::header::{self, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use utoipa::{IntoParams, ToSchema};

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::filter::filter_readings;
use crate::model::{Reading, TimeRange};
use crate::routes::resolve_offset;

fn default_format() -> String {
    "json".to_string()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadingsResponse {
    /// Range applied (null when unfiltered)
    pub range: Option<TimeRange>,
    pub count: usize,
    /// Readings in source order
    pub readings: Vec<Reading>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReadingsQuery {
    /// Time range key (today, yesterday, last7days, last30days). Omitted or unknown: all readings
    pub range: Option<String>,
    /// Client UTC offset in minutes east of UTC
    pub tz_offset: Option<i32>,
    /// Response format: json (default), ndjson, csv
    #[serde(default = "default_format")]
    pub format: String,
}

fn determine_format(query_format: &str, headers: &HeaderMap) -> String {
    // Query parameter takes precedence
    if query_format != "json" {
        return query_format.to_lowercase();
    }

    if let Some(accept) = headers.get(header::ACCEPT)
        && let Ok(accept_str) = accept.to_str()
    {
        if accept_str.contains("application/x-ndjson") {
            return "ndjson".to_string();
        }
        if accept_str.contains("text/csv") {
            return "csv".to_string();
        }
    }

    "json".to_string()
}

const CSV_HEADER: [&str; 8] = [
    "id",
    "timestamp",
    "temperature",
    "humidity",
    "air_quality",
    "gas_mq2",
    "gas_mq4",
    "dust",
];

fn csv_line(fields: &[String]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(fields)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
}

fn csv_fields(reading: &Reading) -> Vec<String> {
    vec![
        reading.id.to_string(),
        reading.timestamp.to_rfc3339(),
        reading.temperature.to_string(),
        reading.humidity.to_string(),
        reading.air_quality.to_string(),
        reading.gas_mq2.to_string(),
        reading.gas_mq4.to_string(),
        reading.dust.to_string(),
    ]
}

fn build_csv_response(readings: Vec<Reading>) -> AppResult<Response> {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, std::io::Error>>(100);

    let header_line = csv_line(&CSV_HEADER.map(str::to_string))?;

    tokio::spawn(async move {
        if tx.send(Ok(header_line)).await.is_err() {
            return;
        }
        for reading in &readings {
            let line = csv_line(&csv_fields(reading))
                .map_err(|e| std::io::Error::other(e.to_string()));
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let stream = ReceiverStream::new(rx);
    let body = axum::body::Body::from_stream(stream);

    Response::builder()
        .header(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"))
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn build_ndjson_response(readings: Vec<Reading>) -> AppResult<Response> {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, std::io::Error>>(100);

    tokio::spawn(async move {
        for reading in &readings {
            let line = serde_json::to_string(reading)
                .map(|json| format!("{json}\n"))
                .map_err(std::io::Error::other);
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let stream = ReceiverStream::new(rx);
    let body = axum::body::Body::from_stream(stream);

    Response::builder()
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-ndjson"),
        )
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Get readings in a time range
///
/// Returns the raw readings behind the chart, using the chart's range keys.
/// Unlike the chart, an omitted range means every reading, not today's.
/// Supports JSON, CSV, and NDJSON formats.
#[utoipa::path(
    get,
    path = "/api/readings",
    params(ReadingsQuery),
    responses(
        (status = 200, description = "Readings retrieved successfully", body = ReadingsResponse),
        (status = 400, description = "Invalid query parameters"),
    ),
    tag = "readings"
)]
pub async fn get_readings(
    State(state): State<AppState>,
    Query(query): Query<ReadingsQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let range = TimeRange::parse_lenient(query.range.as_deref());
    let offset = resolve_offset(query.tz_offset, &state.config)?;
    let format = determine_format(&query.format, &headers);

    let now = state.clock.now().with_timezone(&offset);
    let readings = filter_readings(&state.source.fetch_readings(), range, &now);

    match format.as_str() {
        "csv" => build_csv_response(readings),
        "ndjson" => build_ndjson_response(readings),
        "json" => Ok(Json(ReadingsResponse {
            range,
            count: readings.len(),
            readings,
        })
        .into_response()),
        other => Err(AppError::BadRequest(format!(
            "Unsupported format '{other}', expected json, csv or ndjson"
        ))),
    }
}
