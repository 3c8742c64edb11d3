use axum::{
    http::header,
    response::{Html, IntoResponse},
};

use crate::model::{Metric, Selection, TimeRange};
use crate::routes::chart::DEFAULT_CANVAS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Home,
    Dashboard,
    About,
}

impl Page {
    const ALL: [Self; 3] = [Self::Home, Self::Dashboard, Self::About];

    const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Dashboard => "/dashboard",
            Self::About => "/about",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Dashboard => "Dashboard",
            Self::About => "About",
        }
    }
}

pub async fn home() -> impl IntoResponse {
    render(Page::Home, HOME_HTML.to_string())
}

pub async fn about() -> impl IntoResponse {
    render(Page::About, ABOUT_HTML.to_string())
}

pub async fn dashboard() -> impl IntoResponse {
    render(Page::Dashboard, dashboard_body())
}

fn render(page: Page, content: String) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "public, max-age=60")],
        Html(layout(page, &content)),
    )
}

fn layout(active: Page, content: &str) -> String {
    let menu: String = Page::ALL
        .into_iter()
        .map(|page| {
            let class = if page == active { "menu-link active" } else { "menu-link" };
            format!(
                r#"<li class="menu-item"><a href="{}" class="{class}">{}</a></li>"#,
                page.path(),
                page.label()
            )
        })
        .collect();

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} | Simple Dashboard</title>
    <style>{STYLE}</style>
</head>
<body>
<div class="App">
    <header class="App-header">
        <h1 class="app-title">Simple Dashboard</h1>
        <nav class="menu-bar">
            <ul class="menu-list">{menu}</ul>
        </nav>
    </header>
    <main class="main-content">
{content}
    </main>
    <footer class="footer">
        <p>&copy; 2024 Simple Dashboard. All rights reserved.</p>
    </footer>
</div>
</body>
</html>"##,
        title = active.label(),
    )
}

fn options<T: Copy + PartialEq>(
    items: &[T],
    selected: T,
    key: impl Fn(T) -> &'static str,
    name: impl Fn(T) -> &'static str,
) -> String {
    items
        .iter()
        .map(|&item| {
            let selected = if item == selected { " selected" } else { "" };
            format!(r#"<option value="{}"{selected}>{}</option>"#, key(item), name(item))
        })
        .collect()
}

fn dashboard_body() -> String {
    let defaults = Selection::default();
    let metric_options = options(&Metric::ALL, defaults.metric, Metric::key, Metric::display_name);
    let range_options = options(
        &TimeRange::ALL,
        defaults.time_range.unwrap_or_default(),
        TimeRange::key,
        TimeRange::display_name,
    );

    format!(
        r##"<div class="dashboard-container">
    <h2>Dashboard</h2>
    <p>Here is your main dashboard content.</p>

    <div class="dropdown-container">
        <label for="data-selector">Select Data Type: </label>
        <select id="data-selector">{metric_options}</select>

        <label for="days-selector">Select Time Range: </label>
        <select id="days-selector">{range_options}</select>
    </div>

    <div class="chart-container">
        <canvas id="{DEFAULT_CANVAS}"></canvas>
        <p class="chart-hint">Scroll or pinch to zoom, drag to pan</p>
    </div>
</div>
<script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.7/dist/chart.umd.min.js"></script>
<script src="https://cdn.jsdelivr.net/npm/hammerjs@2.0.8/hammer.min.js"></script>
<script src="https://cdn.jsdelivr.net/npm/chartjs-plugin-zoom@2.2.0/dist/chartjs-plugin-zoom.min.js"></script>
<script>{DASHBOARD_JS}</script>"##
    )
}

const HOME_HTML: &str = r#"<div class="home-container">
    <h2>Welcome to the Dashboard</h2>
    <p>This is the home page of your dashboard application.</p>
</div>"#;

const ABOUT_HTML: &str = r#"<div class="about-container">
    <h2>About</h2>
    <p>This dashboard application is designed to showcase weather data performance with interactive visualizations and user-friendly navigation.</p>
    <h3>Group Members</h3>
    <ul>
        <li>Shimul Paul - Matriculation No: 1441927</li>
        <li>Abu Sayeed Bin Mozahid - Matriculation No: 1504365</li>
        <li>Md Shahab Uddin - Matriculation No: 1505119</li>
    </ul>
    <h3>Summary</h3>
    <p>The Weather and Pollution Monitoring System is an IoT-based solution that uses NodeMCU and environmental sensors to collect real-time weather and pollution data. This data includes parameters such as temperature, humidity, air quality, and specific pollutants like particulate matter and gases. The system leverages cloud storage for data collection and analysis, and a web dashboard for visualization and monitoring. Alerts are triggered for high pollution levels or severe weather events, making it a valuable tool for urban, industrial, or residential environments.</p>
</div>"#;

// One Chart.js instance at a time: the previous one is destroyed before the
// next is created, and responses to superseded selections are ignored.
const DASHBOARD_JS: &str = r#"
(() => {
    const metricSelect = document.getElementById('data-selector');
    const rangeSelect = document.getElementById('days-selector');
    const canvas = document.querySelector('.chart-container canvas');
    let chartInstance = null;
    let generation = 0;

    const destroyChart = () => {
        if (chartInstance) {
            chartInstance.destroy();
            chartInstance = null;
        }
    };

    const render = async () => {
        const current = ++generation;
        const params = new URLSearchParams({
            metric: metricSelect.value,
            range: rangeSelect.value,
            tz_offset: String(-new Date().getTimezoneOffset()),
            canvas: canvas.id,
        });

        let body = null;
        try {
            const res = await fetch(`/api/chart?${params}`);
            if (res.status === 200) {
                body = await res.json();
            } else if (res.status !== 204) {
                console.error('Chart request failed:', res.status);
            }
        } catch (e) {
            console.error('Failed to fetch chart:', e);
        }

        if (current !== generation) return;
        destroyChart();
        if (body) {
            chartInstance = new Chart(canvas.getContext('2d'), body.config);
        }
    };

    metricSelect.addEventListener('change', render);
    rangeSelect.addEventListener('change', render);
    window.addEventListener('pagehide', destroyChart);
    render();
})();
"#;

const STYLE: &str = r#"
    :root {
        --bg: #f8fafc;
        --surface: #ffffff;
        --border: #e2e8f0;
        --text: #1e293b;
        --muted: #64748b;
        --accent: #2563eb;
    }
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body { font-family: system-ui, -apple-system, sans-serif; background: var(--bg); color: var(--text); min-height: 100vh; }
    .App { display: flex; flex-direction: column; min-height: 100vh; }
    .App-header {
        display: flex;
        justify-content: space-between;
        align-items: center;
        flex-wrap: wrap;
        gap: 1rem;
        padding: 1rem 1.5rem;
        background: var(--surface);
        border-bottom: 1px solid var(--border);
    }
    .app-title { font-size: 1.25rem; font-weight: 600; }
    .menu-list { display: flex; gap: 0.5rem; list-style: none; }
    .menu-link {
        display: inline-block;
        padding: 0.5rem 1rem;
        border: 1px solid var(--border);
        border-radius: 0.375rem;
        font-size: 0.875rem;
        color: var(--text);
        text-decoration: none;
        transition: all 0.15s;
    }
    .menu-link:hover { border-color: var(--accent); color: var(--accent); }
    .menu-link.active { background: var(--accent); border-color: var(--accent); color: white; }
    .main-content { flex: 1; width: 100%; max-width: 1200px; margin: 0 auto; padding: 1.5rem; }
    .main-content h2 { font-size: 1.125rem; margin-bottom: 0.75rem; }
    .main-content h3 { font-size: 1rem; margin: 1rem 0 0.5rem; }
    .main-content p, .main-content li { line-height: 1.6; color: var(--muted); }
    .main-content ul { padding-left: 1.25rem; }
    .dropdown-container {
        display: flex;
        flex-wrap: wrap;
        align-items: center;
        gap: 0.75rem;
        margin: 1rem 0;
        padding: 0.75rem 1rem;
        background: var(--surface);
        border: 1px solid var(--border);
        border-radius: 0.5rem;
        font-size: 0.875rem;
    }
    .dropdown-container select {
        padding: 0.375rem 0.5rem;
        border: 1px solid var(--border);
        border-radius: 0.375rem;
        background: var(--surface);
    }
    .chart-container {
        background: var(--surface);
        border: 1px solid var(--border);
        border-radius: 0.5rem;
        padding: 1rem;
    }
    .chart-hint { text-align: center; font-size: 0.7rem; margin-top: 0.5rem; }
    .footer {
        padding: 1rem;
        text-align: center;
        font-size: 0.75rem;
        color: var(--muted);
        border-top: 1px solid var(--border);
    }
"#;
