use chrono::FixedOffset;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::model::Selection;
use crate::proxy::PollutionProxy;
use crate::render::{ChartJsBackend, ChartView, Clock, SystemClock};
use crate::source::ReadingSource;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub source: Arc<dyn ReadingSource>,
    pub clock: Arc<dyn Clock>,
    /// Shared by every per-request chart view so live charts are counted globally
    pub charts: ChartJsBackend,
    pub pollution_proxy: Arc<PollutionProxy>,
}

impl AppState {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the upstream HTTP client cannot be built.
    pub fn new(config: Config, source: Arc<dyn ReadingSource>) -> AppResult<Self> {
        let pollution_proxy = PollutionProxy::new(&config)?;

        Ok(Self {
            config: Arc::new(config),
            source,
            clock: Arc::new(SystemClock),
            charts: ChartJsBackend::new(),
            pollution_proxy: Arc::new(pollution_proxy),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// A fresh, unmounted chart view over this state's data and clock.
    #[must_use]
    pub fn chart_view(&self, selection: Selection, offset: FixedOffset) -> ChartView<ChartJsBackend> {
        ChartView::new(
            self.charts.clone(),
            self.source.clone(),
            self.clock.clone(),
            offset,
        )
        .with_selection(selection)
    }
}
