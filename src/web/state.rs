use std::sync::Arc;

use super::view::DashboardView;
use crate::config::AppConfig;
use crate::dashboard::DashboardController;

const RECENT_NOTICES: usize = 20;

/// Shared handler state for the dashboard server.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<DashboardController>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(controller: Arc<DashboardController>, config: Arc<AppConfig>) -> Self {
        Self { controller, config }
    }

    /// Builds the page view model from the current snapshot.
    pub async fn view(&self) -> DashboardView {
        let data = self.controller.snapshot().await;
        let notifications = self.controller.notifications();
        let errors = notifications.get_unacknowledged_errors().await;
        let recent = notifications.get_recent(RECENT_NOTICES).await;

        DashboardView::build(&data, &errors, &recent, &self.config.chart, &self.config.ticks)
    }
}
