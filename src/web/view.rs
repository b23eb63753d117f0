use askama::Template;
use serde::Serialize;

use crate::chart::{PredictionChart, TickBars};
use crate::client::SocketState;
use crate::config::{ChartSettings, TickSettings};
use crate::dashboard::DashboardData;
use crate::notifications::Notification;
use crate::types::{Frequency, ProcessCommand, Signal, Tick};

const IDLE_TEXT: &str = "No ongoing processes.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Desktop,
    Mobile,
}

impl Layout {
    pub const DESKTOP_MIN_WIDTH: u32 = 1200;

    pub fn for_width(px: u32) -> Self {
        if px >= Self::DESKTOP_MIN_WIDTH {
            Layout::Desktop
        } else {
            Layout::Mobile
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FrequencyOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// One row of the signal feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedEntry {
    pub signal: String,
    pub css_class: &'static str,
    pub profit: String,
    pub time: String,
}

impl From<&Signal> for FeedEntry {
    fn from(signal: &Signal) -> Self {
        Self {
            signal: signal.signal.to_string(),
            css_class: signal.signal.css_class(),
            profit: signal.profit_label(),
            time: signal.time.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NoticeView {
    pub id: String,
    pub severity: &'static str,
    pub title: String,
    pub detail: String,
    pub timestamp: String,
    pub acknowledged: bool,
    pub occurrences: u32,
}

impl From<&Notification> for NoticeView {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.clone(),
            severity: n.severity.css_class(),
            title: n.alert_type.title(),
            detail: n.alert_type.detail(),
            timestamp: n.timestamp.format("%H:%M:%S").to_string(),
            acknowledged: n.acknowledged,
            occurrences: n.occurrences,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionPayload {
    pub times: Vec<String>,
    pub historic: Vec<Option<f64>>,
    pub future: Vec<Option<f64>>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
}

impl From<PredictionChart> for PredictionPayload {
    fn from(chart: PredictionChart) -> Self {
        Self {
            times: chart.series.times,
            historic: chart.series.historic,
            future: chart.series.future,
            y_min: chart.y_min,
            y_max: chart.y_max,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BarsPayload {
    pub times: Vec<String>,
    pub heights: Vec<Option<f64>>,
}

impl From<TickBars> for BarsPayload {
    fn from(bars: TickBars) -> Self {
        let heights = bars.heights_or_gaps();
        Self {
            times: bars.times,
            heights,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartPayload {
    pub prediction: PredictionPayload,
    pub bars: BarsPayload,
}

/// Everything the page renders, precomputed from a state snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub running: bool,
    pub button_label: String,
    pub status_text: String,
    pub frequency: Frequency,
    pub frequencies: Vec<FrequencyOption>,
    pub feed: Vec<FeedEntry>,
    /// Latest ticker price, two decimals.
    pub latest_price: Option<String>,
    pub ticks: Vec<Tick>,
    pub chart: ChartPayload,
    pub socket: SocketState,
    pub socket_label: String,
    pub last_error: Option<String>,
    /// Unacknowledged errors, newest first; drives the banner.
    pub errors: Vec<NoticeView>,
    pub notices: Vec<NoticeView>,
}

impl DashboardView {
    pub fn build(
        data: &DashboardData,
        errors: &[Notification],
        recent: &[Notification],
        chart: &ChartSettings,
        ticks: &TickSettings,
    ) -> Self {
        let prediction = PredictionChart::for_current(&data.signals, chart.truncate_tail, chart.padding_pct);
        let bars = TickBars::from_buffer(&data.ticks, ticks.bar_min, ticks.bar_max);

        let status_text = if data.running {
            format!("Prediction running ({})", data.frequency.label())
        } else {
            IDLE_TEXT.to_string()
        };

        Self {
            running: data.running,
            button_label: ProcessCommand::toggle_from(data.running).to_string(),
            status_text,
            frequency: data.frequency,
            frequencies: Frequency::all()
                .iter()
                .map(|f| FrequencyOption {
                    value: f.as_str(),
                    label: f.label(),
                    selected: *f == data.frequency,
                })
                .collect(),
            feed: data.signals.iter().map(FeedEntry::from).collect(),
            latest_price: data
                .ticks
                .last()
                .and_then(Tick::price_decimal)
                .map(|p| format!("${:.2}", p)),
            ticks: data.ticks.to_vec(),
            chart: ChartPayload {
                prediction: prediction.into(),
                bars: bars.into(),
            },
            socket: data.socket,
            socket_label: data.socket.label(),
            last_error: data.last_error.clone(),
            errors: errors.iter().map(NoticeView::from).collect(),
            notices: recent.iter().map(NoticeView::from).collect(),
        }
    }

    pub fn latest_price_label(&self) -> &str {
        self.latest_price.as_deref().unwrap_or("--")
    }

    /// Chart data for an inline `<script>` block.
    pub fn chart_json(&self) -> String {
        serde_json::to_string(&self.chart)
            .unwrap_or_else(|_| "{}".to_string())
            .replace('<', "\\u003c")
    }
}

#[derive(Template)]
#[template(path = "desktop.html")]
pub struct DesktopPage<'a> {
    pub view: &'a DashboardView,
    pub chart_json: String,
}

#[derive(Template)]
#[template(path = "mobile.html")]
pub struct MobilePage<'a> {
    pub view: &'a DashboardView,
    pub chart_json: String,
}

pub fn render_page(layout: Layout, view: &DashboardView) -> Result<String, askama::Error> {
    let chart_json = view.chart_json();
    match layout {
        Layout::Desktop => DesktopPage { view, chart_json }.render(),
        Layout::Mobile => MobilePage { view, chart_json }.render(),
    }
}
