// Report service - Use cases for the daily detail grid, tip report and approvals
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ticket_repository::TicketRepository;
use crate::domain::permissions::Action;
use crate::domain::report::{TechnicianDetail, TipReport, build_daily_detail, build_tip_report};
use crate::domain::session::RequestContext;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

const AUTO_APPROVAL_SOURCE: &str = "api";

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub timezone: Tz,
    /// How many days back roles without unlimited history may look
    pub history_days: i64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            history_days: 14,
        }
    }
}

#[derive(Clone)]
pub struct ReportService {
    repository: Arc<dyn TicketRepository>,
    settings: ReportSettings,
}

impl ReportService {
    pub fn new(repository: Arc<dyn TicketRepository>, settings: ReportSettings) -> Self {
        Self { repository, settings }
    }

    /// Business date of `now` in the store's time zone
    pub fn business_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.settings.timezone).date_naive()
    }

    pub async fn daily_detail(
        &self,
        ctx: &RequestContext,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> ServiceResult<Vec<TechnicianDetail>> {
        ctx.require(Action::ViewTickets)?;

        let tickets = self.repository.tickets_for_date(&ctx.store_id, date).await?;
        let view_all = ctx.allows(Action::ViewAllTickets);

        tracing::debug!(
            store_id = %ctx.store_id,
            %date,
            tickets = tickets.len(),
            view_all,
            "Building daily detail"
        );

        Ok(build_daily_detail(&tickets, |id| view_all || ctx.is_self(id), now))
    }

    pub async fn tip_report(
        &self,
        ctx: &RequestContext,
        date: NaiveDate,
        today: NaiveDate,
    ) -> ServiceResult<TipReport> {
        ctx.require(Action::ViewTipReport)?;
        self.check_history_window(ctx, date, today)?;

        let tickets = self.repository.tickets_for_date(&ctx.store_id, date).await?;
        let view_all = ctx.allows(Action::ViewAllTipReport);

        tracing::debug!(
            store_id = %ctx.store_id,
            %date,
            tickets = tickets.len(),
            view_all,
            "Building tip report"
        );

        Ok(build_tip_report(date, &tickets, |id| view_all || ctx.is_self(id)))
    }

    pub async fn trigger_auto_approval(&self, ctx: &RequestContext) -> ServiceResult<u64> {
        ctx.require(Action::TriggerAutoApproval)?;

        let approved = self.repository.run_auto_approval(AUTO_APPROVAL_SOURCE).await?;
        tracing::info!(
            employee_id = %ctx.employee_id,
            approved,
            "Auto-approval completed"
        );
        Ok(approved)
    }

    fn check_history_window(
        &self,
        ctx: &RequestContext,
        date: NaiveDate,
        today: NaiveDate,
    ) -> ServiceResult<()> {
        if date > today {
            return Err(ServiceError::InvalidRequest(format!(
                "date {} is after the current business date {}",
                date, today
            )));
        }

        let earliest = today - Duration::days(self.settings.history_days);
        if date < earliest && !ctx.allows(Action::ViewTipReportUnlimitedHistory) {
            return Err(ServiceError::Forbidden(Action::ViewTipReportUnlimitedHistory));
        }

        Ok(())
    }
}
