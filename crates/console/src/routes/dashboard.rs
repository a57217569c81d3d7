//! Dashboard route handler.

use askama::Template;
use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use tracing::instrument;

use serviceflow_core::{TicketPriority, TicketStatus};

use crate::api::ApiError;
use crate::api::types::{DashboardOverview, Kpis};
use crate::components::BarChart;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireLogin;
use crate::state::AppState;

use super::{FlashQuery, Layout, render};

/// SLA compliance target, in percent.
pub const SLA_TARGET_PCT: i64 = 90;

/// Weeks of resolution trend shown.
const TREND_WEEKS: usize = 4;

/// Technicians shown in the performance chart.
const TOP_TECHS: usize = 5;

/// KPI cards.
#[derive(Debug, Clone)]
pub struct KpiView {
    pub total: u64,
    pub open: u64,
    pub in_progress: u64,
    pub closed: u64,
    pub sla_pct: i64,
    pub sla_target_pct: i64,
    pub sla_met: bool,
}

impl From<&Kpis> for KpiView {
    fn from(kpis: &Kpis) -> Self {
        let sla_pct = sla_percent(kpis.sla);
        Self {
            total: kpis.total,
            open: kpis.open,
            in_progress: kpis.in_progress,
            closed: kpis.closed,
            sla_pct,
            sla_target_pct: SLA_TARGET_PCT,
            sla_met: sla_pct >= SLA_TARGET_PCT,
        }
    }
}

/// Dashboard template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub kpis: Option<KpiView>,
    pub by_status: BarChart,
    pub by_priority: BarChart,
    pub trend: BarChart,
    pub techs: BarChart,
    pub load_error: bool,
}

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

/// Render the dashboard.
///
/// GET /
#[instrument(skip(state, viewer, flash), fields(user_id = %viewer.user.id))]
async fn dashboard(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let layout = Layout::new(&viewer, "/", flash);

    let template = match state.api().dashboard_overview(&viewer.credentials).await {
        Ok(overview) => build(layout, &overview),
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load dashboard overview");
            DashboardTemplate {
                layout,
                kpis: None,
                by_status: BarChart::default(),
                by_priority: BarChart::default(),
                trend: BarChart::default(),
                techs: BarChart::default(),
                load_error: true,
            }
        }
    };

    Ok(render(&template))
}

fn build(layout: Layout, overview: &DashboardOverview) -> DashboardTemplate {
    let by_status = BarChart::from_counts(overview.by_status.iter().map(|(status, count)| {
        (
            TicketStatus::from(status.clone()).chart_label().to_string(),
            *count,
        )
    }));

    let by_priority = BarChart::from_counts(overview.by_priority.iter().map(|(priority, count)| {
        (
            TicketPriority::from(priority.clone()).label().to_string(),
            *count,
        )
    }));

    let skip = overview.resolution_trend.len().saturating_sub(TREND_WEEKS);
    let trend = BarChart::from_values(
        overview
            .resolution_trend
            .iter()
            .skip(skip)
            .map(|p| (p.label.clone(), p.avg_hours)),
        " h",
    );

    let techs = BarChart::from_top_counts(
        overview
            .tech_performance
            .iter()
            .map(|(name, count)| (name.clone(), *count)),
        TOP_TECHS,
    );

    DashboardTemplate {
        layout,
        kpis: Some(KpiView::from(&overview.kpis)),
        by_status: by_status.with_classes(status_bar_class),
        by_priority: by_priority.with_classes(priority_bar_class),
        trend,
        techs,
        load_error: false,
    }
}

/// SLA fraction as a rounded percentage.
#[allow(clippy::cast_possible_truncation)]
fn sla_percent(sla: f64) -> i64 {
    if sla.is_finite() {
        (sla * 100.0).round() as i64
    } else {
        0
    }
}

fn status_bar_class(label: &str) -> &'static str {
    TicketStatus::ALL
        .iter()
        .find(|s| s.label() == label)
        .map_or("bar-slate", |s| s.badge().bar_class())
}

fn priority_bar_class(label: &str) -> &'static str {
    TicketPriority::ALL
        .iter()
        .find(|p| p.label() == label)
        .map_or("bar-slate", |p| p.badge().bar_class())
}
