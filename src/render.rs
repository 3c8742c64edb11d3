//! Chart render lifecycle.
//!
//! A [`ChartView`] owns at most one live chart, bound to the surface it was
//! mounted on. Any selection change destroys that chart and builds a new one
//! from scratch; nothing is patched in place, so plugin state (zoom, pan)
//! never survives a rebuild. Unmounting, remounting and dropping the view
//! all release the chart.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::chart::{assemble, ChartConfig};
use crate::error::DashboardError;
use crate::filter::filter_readings;
use crate::model::{Metric, Selection, TimeRange};
use crate::source::ReadingSource;

/// Source of "now" for relative time ranges.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for reproducible charts.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Something that can draw a chart on a surface and later tear it down.
pub trait ChartBackend {
    type Surface;
    type Chart;

    /// # Errors
    ///
    /// Returns a `DashboardError` if the chart cannot be bound to `surface`.
    fn create(
        &mut self,
        surface: &Self::Surface,
        config: ChartConfig,
    ) -> Result<Self::Chart, DashboardError>;

    fn destroy(&mut self, chart: Self::Chart);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Unmounted,
    /// Mounted, but nothing drawn (no surface, or the last build failed).
    Mounted,
    Active,
}

pub struct ChartView<B: ChartBackend> {
    backend: B,
    source: Arc<dyn ReadingSource>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    selection: Selection,
    mounted: bool,
    surface: Option<B::Surface>,
    chart: Option<B::Chart>,
}

impl<B: ChartBackend> ChartView<B> {
    pub fn new(
        backend: B,
        source: Arc<dyn ReadingSource>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            backend,
            source,
            clock,
            offset,
            selection: Selection::default(),
            mounted: false,
            surface: None,
            chart: None,
        }
    }

    #[must_use]
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn state(&self) -> ViewState {
        match (self.mounted, self.chart.is_some()) {
            (false, _) => ViewState::Unmounted,
            (true, false) => ViewState::Mounted,
            (true, true) => ViewState::Active,
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn chart(&self) -> Option<&B::Chart> {
        self.chart.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Attach to `surface` and draw the current selection.
    ///
    /// Mounting an already mounted view moves it to the new surface.
    pub fn mount(&mut self, surface: Option<B::Surface>) {
        self.mounted = true;
        self.surface = surface;
        self.redraw();
    }

    pub fn select_metric(&mut self, metric: Metric) {
        self.select(Selection {
            metric,
            ..self.selection
        });
    }

    pub fn select_time_range(&mut self, time_range: Option<TimeRange>) {
        self.select(Selection {
            time_range,
            ..self.selection
        });
    }

    /// Change what is shown. An unchanged selection does not redraw.
    pub fn select(&mut self, selection: Selection) {
        if selection == self.selection {
            return;
        }
        self.selection = selection;
        if self.mounted {
            self.redraw();
        }
    }

    pub fn unmount(&mut self) {
        self.release();
        self.surface = None;
        self.mounted = false;
    }

    /// Configuration for the current selection, as of the clock's `now`.
    pub fn chart_config(&self) -> ChartConfig {
        let now = self.clock.now().with_timezone(&self.offset);
        let readings = self.source.fetch_readings();
        let visible = filter_readings(&readings, self.selection.time_range, &now);
        ChartConfig::line(&assemble(&visible, self.selection.metric, &self.offset))
    }

    fn redraw(&mut self) {
        self.release();

        let Some(surface) = &self.surface else {
            tracing::warn!(error = %DashboardError::MissingSurface, "chart not drawn");
            return;
        };

        let config = self.chart_config();
        match self.backend.create(surface, config) {
            Ok(chart) => self.chart = Some(chart),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    metric = %self.selection.metric,
                    "chart build failed"
                );
            }
        }
    }

    fn release(&mut self) {
        if let Some(chart) = self.chart.take() {
            self.backend.destroy(chart);
        }
    }
}

impl<B: ChartBackend> Drop for ChartView<B> {
    fn drop(&mut self) {
        self.release();
    }
}

/// A Chart.js configuration bound to a canvas element.
#[derive(Debug, Clone)]
pub struct ChartJsInstance {
    pub canvas: String,
    pub config: ChartConfig,
}

/// Backend whose charts are Chart.js documents rendered by the browser.
///
/// Clones share one live-instance count, which is how leaks show up.
#[derive(Debug, Clone, Default)]
pub struct ChartJsBackend {
    live: Arc<AtomicUsize>,
}

impl ChartJsBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances created and not yet destroyed.
    #[must_use]
    pub fn live_charts(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

impl ChartBackend for ChartJsBackend {
    type Surface = String;
    type Chart = ChartJsInstance;

    fn create(
        &mut self,
        canvas: &String,
        config: ChartConfig,
    ) -> Result<ChartJsInstance, DashboardError> {
        if canvas.trim().is_empty() {
            return Err(DashboardError::MissingSurface);
        }
        self.live.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(canvas = %canvas, datasets = config.data.datasets.len(), "chart created");
        Ok(ChartJsInstance {
            canvas: canvas.clone(),
            config,
        })
    }

    fn destroy(&mut self, chart: ChartJsInstance) {
        let _ = self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        tracing::debug!(canvas = %chart.canvas, "chart destroyed");
    }
}
