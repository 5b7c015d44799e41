//! Axum + Askama dashboard for the accumulated facility dataset.
//!
//! Every handler reloads the dataset and recomputes its aggregation on the
//! request path; the dataset is small and the aggregation is one pass, so
//! there is no cache to invalidate. Chart and map endpoints return plotly
//! figure payloads as JSON. A missing or malformed county GeoJSON degrades
//! the map surfaces only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use geojson::GeoJson;
use pvtrack_core::FacilityRecord;
use pvtrack_merge::{
    annual_capacity_mw, annual_system_counts, capacity_summary_table, county_capacity_mw,
    county_system_counts, cumulative_over_years, dataset_stats, latest_certification_date,
    load_site_registry, MergeConfig, SiteRegistry,
};
use pvtrack_store::load_dataset;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::warn;

pub const CRATE_NAME: &str = "pvtrack-web";

#[derive(Clone)]
pub struct AppState {
    pub config: MergeConfig,
}

impl AppState {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/charts", get(charts_page_handler))
        .route("/charts/annual-capacity", get(annual_capacity_handler))
        .route("/charts/cumulative-capacity", get(cumulative_capacity_handler))
        .route("/charts/annual-systems", get(annual_systems_handler))
        .route("/charts/cumulative-systems", get(cumulative_systems_handler))
        .route("/map", get(map_page_handler))
        .route("/map/capacity", get(map_capacity_handler))
        .route("/map/systems", get(map_systems_handler))
        .route("/table", get(table_page_handler))
        .route("/table/download", get(table_download_handler))
        .route("/assets/static/app.css", get(app_css_handler))
        .with_state(Arc::new(state))
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let port: u16 = std::env::var("PVTRACK_WEB_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let state = AppState::new(MergeConfig::from_env());
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

struct DashboardData {
    records: Vec<FacilityRecord>,
    registry: SiteRegistry,
}

fn load_dashboard_data(config: &MergeConfig) -> anyhow::Result<DashboardData> {
    let records = load_dataset(&config.dataset_path)?;
    let registry = load_site_registry(&config.workspace_root)?;
    Ok(DashboardData { records, registry })
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    title: String,
    rows: usize,
    counties: usize,
    span_text: String,
    latest_date_text: String,
    total_capacity_text: String,
}

#[derive(Template)]
#[template(path = "charts.html")]
struct ChartsTemplate {
    title: String,
}

#[derive(Template)]
#[template(path = "map.html")]
struct MapTemplate {
    title: String,
    geojson_ok: bool,
    error_message: String,
}

#[derive(Debug, Clone)]
struct TableRowView {
    label: String,
    systems: u64,
    total_mw: i64,
    css_class: &'static str,
}

#[derive(Template)]
#[template(path = "table.html")]
struct TableTemplate {
    title: String,
    rows: Vec<TableRowView>,
    total_systems: u64,
    total_mw: i64,
    caption: String,
}

#[derive(Template)]
#[template(path = "table_document.html")]
struct TableDocumentTemplate {
    rows: Vec<TableRowView>,
    total_systems: u64,
    total_mw: i64,
    caption: String,
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    match load_dashboard_data(&state.config) {
        Ok(data) => {
            let stats = dataset_stats(&data.records);
            let span_text = match (stats.first_year, stats.last_year) {
                (Some(first), Some(last)) => format!("{first}–{last}"),
                _ => "n/a".to_string(),
            };
            let latest_date_text = stats
                .latest_date
                .map(|d| d.format("%m/%d/%Y").to_string())
                .unwrap_or_else(|| "n/a".to_string());
            render_html(IndexTemplate {
                title: data.registry.site.title,
                rows: stats.rows,
                counties: stats.counties,
                span_text,
                latest_date_text,
                total_capacity_text: format!("{:.1}", stats.total_capacity_mw),
            })
        }
        Err(err) => server_error(err),
    }
}

async fn charts_page_handler(State(state): State<Arc<AppState>>) -> Response {
    match load_site_registry(&state.config.workspace_root) {
        Ok(registry) => render_html(ChartsTemplate {
            title: registry.site.title,
        }),
        Err(err) => server_error(err),
    }
}

async fn annual_capacity_handler(State(state): State<Arc<AppState>>) -> Response {
    figure_response(&state.config, annual_capacity_figure)
}

async fn cumulative_capacity_handler(State(state): State<Arc<AppState>>) -> Response {
    figure_response(&state.config, cumulative_capacity_figure)
}

async fn annual_systems_handler(State(state): State<Arc<AppState>>) -> Response {
    figure_response(&state.config, annual_systems_figure)
}

async fn cumulative_systems_handler(State(state): State<Arc<AppState>>) -> Response {
    figure_response(&state.config, cumulative_systems_figure)
}

fn figure_response(
    config: &MergeConfig,
    figure: fn(&[FacilityRecord]) -> serde_json::Value,
) -> Response {
    match load_dataset(&config.dataset_path) {
        Ok(records) => Json(figure(&records)).into_response(),
        Err(err) => server_error(err),
    }
}

async fn map_page_handler(State(state): State<Arc<AppState>>) -> Response {
    let registry = match load_site_registry(&state.config.workspace_root) {
        Ok(registry) => registry,
        Err(err) => return server_error(err),
    };
    // A broken boundary file degrades the map page; everything else renders.
    let (geojson_ok, error_message) = match load_county_geojson(&state.config.geojson_path) {
        Ok(_) => (true, String::new()),
        Err(err) => {
            warn!("county geojson unavailable: {err:#}");
            (false, format!("Error loading county GeoJSON: {err:#}"))
        }
    };
    render_html(MapTemplate {
        title: registry.site.title,
        geojson_ok,
        error_message,
    })
}

async fn map_capacity_handler(State(state): State<Arc<AppState>>) -> Response {
    choropleth_response(&state.config, MapMetric::Capacity)
}

async fn map_systems_handler(State(state): State<Arc<AppState>>) -> Response {
    choropleth_response(&state.config, MapMetric::Systems)
}

#[derive(Debug, Clone, Copy)]
enum MapMetric {
    Capacity,
    Systems,
}

fn choropleth_response(config: &MergeConfig, metric: MapMetric) -> Response {
    let data = match load_dashboard_data(config) {
        Ok(data) => data,
        Err(err) => return server_error(err),
    };
    let geojson = match load_county_geojson(&config.geojson_path) {
        Ok(geojson) => geojson,
        Err(err) => {
            warn!("county geojson unavailable: {err:#}");
            return server_error(err);
        }
    };
    let feature_id_key = &data.registry.map.feature_id_key;
    let figure = match metric {
        MapMetric::Capacity => county_choropleth_figure(
            &geojson,
            &county_capacity_mw(&data.records),
            feature_id_key,
            "Total Solar PV Capacity (MW in DC) by County in PA",
            "Blues",
        ),
        MapMetric::Systems => {
            let series: Vec<(String, f64)> = county_system_counts(&data.records)
                .into_iter()
                .map(|(county, count)| (county, count as f64))
                .collect();
            county_choropleth_figure(
                &geojson,
                &series,
                feature_id_key,
                "Total Number of Solar PV Systems Installed by County in PA",
                "Purples",
            )
        }
    };
    Json(figure).into_response()
}

async fn table_page_handler(State(state): State<Arc<AppState>>) -> Response {
    match load_dashboard_data(&state.config) {
        Ok(data) => {
            let (rows, total_systems, total_mw, caption) = table_view(&data);
            render_html(TableTemplate {
                title: data.registry.site.title,
                rows,
                total_systems,
                total_mw,
                caption,
            })
        }
        Err(err) => server_error(err),
    }
}

async fn table_download_handler(State(state): State<Arc<AppState>>) -> Response {
    match load_dashboard_data(&state.config) {
        Ok(data) => {
            let (rows, total_systems, total_mw, caption) = table_view(&data);
            let document = TableDocumentTemplate {
                rows,
                total_systems,
                total_mw,
                caption,
            };
            match document.render() {
                Ok(html) => (
                    [
                        (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                        (
                            header::CONTENT_DISPOSITION,
                            "attachment; filename=\"summary_table.html\"",
                        ),
                    ],
                    html,
                )
                    .into_response(),
                Err(err) => server_error(anyhow::anyhow!(err.to_string())),
            }
        }
        Err(err) => server_error(err),
    }
}

async fn app_css_handler(State(state): State<Arc<AppState>>) -> Response {
    let css_path = state.config.workspace_root.join("assets/static/app.css");
    match tokio::fs::read_to_string(&css_path).await {
        Ok(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, Html("/* missing app.css */".to_string())).into_response(),
    }
}

fn table_view(data: &DashboardData) -> (Vec<TableRowView>, u64, i64, String) {
    let table = capacity_summary_table(&data.records);
    let rows = table
        .rows
        .iter()
        .map(|row| TableRowView {
            label: row.label.to_string(),
            systems: row.systems,
            total_mw: row.total_mw,
            // Heavy rules split the residential / commercial / utility bands.
            css_class: match row.label {
                "≤ 15 kW" | "> 1 MW to ≤ 3 MW" => "rule-below",
                _ => "",
            },
        })
        .collect();
    let as_of = latest_certification_date(&data.records)
        .map(|d| d.format("%m/%d/%Y").to_string())
        .unwrap_or_else(|| "n/a".to_string());
    let caption = format!("*As of {} ({})", as_of, data.registry.site.attribution);
    (rows, table.total_systems, table.total_mw, caption)
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}

/// Parse and validate the county boundary file, returning it as plain JSON
/// for embedding into plotly payloads.
pub fn load_county_geojson(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))?;
    Ok(serde_json::to_value(&geojson)?)
}

// ---------------------------------------------------------------------------
// Plotly figure payloads. Pure data in, JSON out.
// ---------------------------------------------------------------------------

pub fn annual_capacity_figure(records: &[FacilityRecord]) -> serde_json::Value {
    let series = annual_capacity_mw(records);
    bar_figure(
        &series,
        "Annual Solar PV Capacity (MWdc) Installed in PA",
        "Solar Capacity (MWdc)",
    )
}

pub fn cumulative_capacity_figure(records: &[FacilityRecord]) -> serde_json::Value {
    let series = cumulative_over_years(&annual_capacity_mw(records));
    line_figure(
        &series,
        "Cumulative Solar PV Capacity (MWdc) Installed in PA",
        "Cumulative Capacity (MWdc)",
    )
}

pub fn annual_systems_figure(records: &[FacilityRecord]) -> serde_json::Value {
    let series: Vec<(i32, f64)> = annual_system_counts(records)
        .into_iter()
        .map(|(year, count)| (year, count as f64))
        .collect();
    bar_figure(
        &series,
        "Annual Number of Solar PV Systems Installed in PA",
        "Number of Systems",
    )
}

pub fn cumulative_systems_figure(records: &[FacilityRecord]) -> serde_json::Value {
    let series: Vec<(i32, f64)> = annual_system_counts(records)
        .into_iter()
        .map(|(year, count)| (year, count as f64))
        .collect();
    let series = cumulative_over_years(&series);
    line_figure(
        &series,
        "Cumulative Number of Solar PV Systems Installed in PA",
        "Cumulative Number of Systems",
    )
}

fn bar_figure(series: &[(i32, f64)], title: &str, y_title: &str) -> serde_json::Value {
    let (x, y) = split_series(series);
    json!({
        "data": [{
            "type": "bar",
            "x": x,
            "y": y,
            "marker": {"color": "#0ea5e9"}
        }],
        "layout": layout(title, y_title)
    })
}

fn line_figure(series: &[(i32, f64)], title: &str, y_title: &str) -> serde_json::Value {
    let (x, y) = split_series(series);
    json!({
        "data": [{
            "type": "scatter",
            "mode": "lines+markers",
            "x": x,
            "y": y,
            "line": {"color": "#0ea5e9"}
        }],
        "layout": layout(title, y_title)
    })
}

fn split_series(series: &[(i32, f64)]) -> (Vec<i32>, Vec<f64>) {
    (
        series.iter().map(|&(x, _)| x).collect(),
        series.iter().map(|&(_, y)| y).collect(),
    )
}

fn layout(title: &str, y_title: &str) -> serde_json::Value {
    json!({
        "title": {"text": title, "x": 0.5, "xanchor": "center"},
        "xaxis": {"title": "Year", "tickmode": "linear", "dtick": 1},
        "yaxis": {"title": y_title},
        "paper_bgcolor": "#ffffff",
        "plot_bgcolor": "#f8fafc"
    })
}

pub fn county_choropleth_figure(
    geojson: &serde_json::Value,
    series: &[(String, f64)],
    feature_id_key: &str,
    title: &str,
    colorscale: &str,
) -> serde_json::Value {
    let locations: Vec<&str> = series.iter().map(|(county, _)| county.as_str()).collect();
    let z: Vec<f64> = series.iter().map(|&(_, value)| value).collect();
    json!({
        "data": [{
            "type": "choropleth",
            "geojson": geojson,
            "locations": locations,
            "z": z,
            "featureidkey": feature_id_key,
            "colorscale": colorscale
        }],
        "layout": {
            "title": {"text": title, "x": 0.5, "y": 0.9, "xanchor": "center"},
            "geo": {"fitbounds": "locations", "visible": false},
            "width": 1000,
            "height": 500
        }
    })
}

// ---------------------------------------------------------------------------
// Standalone report documents (plotly.js via CDN, same payloads as the web
// endpoints). Written by `pvtrack-cli report`.
// ---------------------------------------------------------------------------

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.32.0.min.js";

pub fn write_report_documents(config: &MergeConfig, out_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let records = load_dataset(&config.dataset_path)?;
    let registry = load_site_registry(&config.workspace_root)?;
    std::fs::create_dir_all(out_dir)
        .map_err(|e| anyhow::anyhow!("creating {}: {e}", out_dir.display()))?;

    let mut written = Vec::new();

    let charts_path = out_dir.join("charts.html");
    std::fs::write(
        &charts_path,
        plotly_document(
            &registry.site.title,
            &[
                ("annual-capacity", annual_capacity_figure(&records)),
                ("cumulative-capacity", cumulative_capacity_figure(&records)),
                ("annual-systems", annual_systems_figure(&records)),
                ("cumulative-systems", cumulative_systems_figure(&records)),
            ],
        ),
    )?;
    written.push(charts_path);

    let data = DashboardData {
        records,
        registry,
    };
    let (rows, total_systems, total_mw, caption) = table_view(&data);
    let table_path = out_dir.join("summary_table.html");
    let table_html = TableDocumentTemplate {
        rows,
        total_systems,
        total_mw,
        caption,
    }
    .render()
    .map_err(|e| anyhow::anyhow!("rendering summary table: {e}"))?;
    std::fs::write(&table_path, table_html)?;
    written.push(table_path);

    match load_county_geojson(&config.geojson_path) {
        Ok(geojson) => {
            let feature_id_key = &data.registry.map.feature_id_key;
            let capacity_path = out_dir.join("map_capacity.html");
            std::fs::write(
                &capacity_path,
                plotly_document(
                    "Total Solar PV Capacity (MW in DC) by County in PA",
                    &[(
                        "map-capacity",
                        county_choropleth_figure(
                            &geojson,
                            &county_capacity_mw(&data.records),
                            feature_id_key,
                            "Total Solar PV Capacity (MW in DC) by County in PA",
                            "Blues",
                        ),
                    )],
                ),
            )?;
            written.push(capacity_path);

            let systems_series: Vec<(String, f64)> = county_system_counts(&data.records)
                .into_iter()
                .map(|(county, count)| (county, count as f64))
                .collect();
            let systems_path = out_dir.join("map_systems.html");
            std::fs::write(
                &systems_path,
                plotly_document(
                    "Total Number of Solar PV Systems Installed by County in PA",
                    &[(
                        "map-systems",
                        county_choropleth_figure(
                            &geojson,
                            &systems_series,
                            feature_id_key,
                            "Total Number of Solar PV Systems Installed by County in PA",
                            "Purples",
                        ),
                    )],
                ),
            )?;
            written.push(systems_path);
        }
        Err(err) => {
            // Maps are skipped; charts and the table were still written.
            warn!("county geojson unavailable, skipping map documents: {err:#}");
        }
    }

    Ok(written)
}

fn plotly_document(title: &str, figures: &[(&str, serde_json::Value)]) -> String {
    let mut divs = String::new();
    let mut scripts = String::new();
    for (div_id, figure) in figures {
        divs.push_str(&format!("    <div id=\"{div_id}\"></div>\n"));
        scripts.push_str(&format!(
            "      Plotly.newPlot(\"{div_id}\", {figure});\n"
        ));
    }
    format!(
        "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\">\n    <title>{title}</title>\n    <script src=\"{PLOTLY_CDN}\"></script>\n  </head>\n  <body>\n{divs}    <script>\n{scripts}    </script>\n  </body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    fn record(id: &str, year: i32, capacity: f64, county: &str) -> FacilityRecord {
        FacilityRecord {
            certification_id: id.to_string(),
            state: "PA".into(),
            fuel_type: "SUN".into(),
            certification_start_date: chrono::NaiveDate::from_ymd_opt(year, 1, 1),
            year: Some(year),
            capacity_mw_dc: Some(capacity),
            county: county.to_string(),
            extra: BTreeMap::new(),
        }
    }

    fn fixture_config(dir: &Path) -> MergeConfig {
        let config = MergeConfig {
            dataset_path: dir.join("processed_data.csv"),
            snapshot_path: dir.join("snapshot.csv"),
            archive_dir: dir.join("artifacts"),
            geojson_path: dir.join("pa_counties.geojson"),
            workspace_root: dir.to_path_buf(),
        };
        let records = vec![
            record("PA-1", 2020, 0.01, "York"),
            record("PA-2", 2021, 2.0, "Lancaster"),
        ];
        pvtrack_store::save_dataset(&config.dataset_path, &records).expect("seed dataset");
        config
    }

    fn write_fixture_geojson(path: &Path) {
        std::fs::write(
            path,
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{"COUNTY_NAM":"YORK"},"geometry":{"type":"Polygon","coordinates":[[[-77.0,40.0],[-76.5,40.0],[-76.5,39.7],[-77.0,40.0]]]}}]}"#,
        )
        .expect("write geojson");
    }

    #[tokio::test]
    async fn handler_smoke_get_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = app(AppState::new(fixture_config(dir.path())));
        let resp = app
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("PA Solar PV Data Dashboard"));
    }

    #[tokio::test]
    async fn chart_endpoints_return_plotly_payloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = app(AppState::new(fixture_config(dir.path())));
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/charts/annual-capacity")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "application/json"
        );
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["data"][0]["type"], "bar");
        assert_eq!(value["data"][0]["x"][0], 2020);
    }

    #[tokio::test]
    async fn map_page_degrades_without_geojson() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = app(AppState::new(fixture_config(dir.path())));
        let resp = app
            .oneshot(axum::http::Request::builder().uri("/map").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("Error loading county GeoJSON"));
    }

    #[tokio::test]
    async fn map_endpoint_inlines_geojson_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = fixture_config(dir.path());
        write_fixture_geojson(&config.geojson_path);
        let app = app(AppState::new(config));
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/map/capacity")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["data"][0]["type"], "choropleth");
        assert_eq!(value["data"][0]["featureidkey"], "properties.COUNTY_NAM");
        assert_eq!(value["data"][0]["geojson"]["type"], "FeatureCollection");
    }

    #[tokio::test]
    async fn table_download_sets_attachment_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = app(AppState::new(fixture_config(dir.path())));
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/table/download")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("summary_table.html"));
    }

    #[tokio::test]
    async fn report_documents_skip_maps_without_geojson() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = fixture_config(dir.path());
        let out_dir = dir.path().join("report");
        let written = write_report_documents(&config, &out_dir).expect("report");
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names.contains(&"charts.html".to_string()));
        assert!(names.contains(&"summary_table.html".to_string()));
        assert!(!names.contains(&"map_capacity.html".to_string()));
    }

    #[test]
    fn cumulative_figure_accumulates() {
        let records = vec![
            record("PA-1", 2020, 0.01, "York"),
            record("PA-2", 2021, 2.0, "Lancaster"),
        ];
        let figure = cumulative_capacity_figure(&records);
        let y = figure["data"][0]["y"].as_array().unwrap();
        assert!((y[1].as_f64().unwrap() - 2.01).abs() < 1e-9);
    }
}
