// Sale ticket domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::completion::{CompletionStatus, ServiceItemDetail, item_completion_status};
use super::timer::{TimerReading, TimerServiceItem, compute_elapsed_minutes, has_active_timer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    PendingApproval,
    Approved,
    AutoApproved,
    Rejected,
}

/// Tickets without an approval status predate the approval workflow and count as approved.
pub fn counts_as_approved(status: Option<ApprovalStatus>) -> bool {
    matches!(
        status,
        None | Some(ApprovalStatus::Approved) | Some(ApprovalStatus::AutoApproved)
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaleTicket {
    pub id: String,
    pub store_id: String,
    pub store_code: String,
    pub payment_method: String,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub approval_status: Option<ApprovalStatus>,
    pub items: Vec<TicketItem>,
}

impl SaleTicket {
    /// Timer inputs for the lines worked by `employee_id`, or every line when `None`.
    pub fn timer_items_for(&self, employee_id: Option<&str>) -> Vec<TimerServiceItem> {
        self.items
            .iter()
            .filter(|item| employee_id.is_none() || item.employee_id.as_deref() == employee_id)
            .map(|item| item.timer_view(self))
            .collect()
    }

    pub fn is_approved(&self) -> bool {
        counts_as_approved(self.approval_status)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TicketItem {
    pub id: String,
    pub employee_id: Option<String>,
    pub technician_name: Option<String>,
    pub service_code: String,
    pub service_name: String,
    pub duration_min: i64,
    pub qty: f64,
    pub price_each: f64,
    pub addon_price: f64,
    pub tip_customer_cash: f64,
    pub tip_customer_card: f64,
    pub tip_receptionist: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub timer_stopped_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TicketItem {
    pub fn service_revenue(&self) -> f64 {
        self.qty * self.price_each
    }

    pub fn addon_revenue(&self) -> f64 {
        self.addon_price
    }

    pub fn revenue(&self) -> f64 {
        self.service_revenue() + self.addon_revenue()
    }

    pub fn tips(&self) -> TipBreakdown {
        TipBreakdown::from_item(self)
    }

    pub fn timer_view(&self, ticket: &SaleTicket) -> TimerServiceItem {
        TimerServiceItem {
            started_at: self.started_at,
            timer_stopped_at: self.timer_stopped_at,
            completed_at: self.completed_at,
            ticket_completed_at: ticket.completed_at,
            ticket_closed_at: ticket.closed_at,
        }
    }

    pub fn completion_view(&self, ticket: &SaleTicket) -> ServiceItemDetail {
        ServiceItemDetail {
            duration_min: self.duration_min,
            started_at: self.started_at,
            completed_at: self.completed_at,
            opened_at: Some(ticket.opened_at),
            ticket_completed_at: ticket.completed_at,
            closed_at: ticket.closed_at,
        }
    }
}

/// Tips on one service line and how they are paid out.
///
/// Customer cash tips go out as cash; customer card tips and receptionist
/// tips go out on card.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TipBreakdown {
    pub customer: f64,
    pub receptionist: f64,
    pub cash: f64,
    pub card: f64,
}

impl TipBreakdown {
    pub fn from_item(item: &TicketItem) -> Self {
        let customer = item.tip_customer_cash + item.tip_customer_card;
        Self {
            customer,
            receptionist: item.tip_receptionist,
            cash: item.tip_customer_cash,
            card: item.tip_customer_card + item.tip_receptionist,
        }
    }

    pub fn total(&self) -> f64 {
        self.customer + self.receptionist
    }

    pub fn accumulate(&mut self, other: &TipBreakdown) {
        self.customer += other.customer;
        self.receptionist += other.receptionist;
        self.cash += other.cash;
        self.card += other.card;
    }
}

/// One service line as shown inside a ticket group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceLine {
    pub item_id: String,
    pub service_code: String,
    pub service_name: String,
    pub duration_min: i64,
    pub service_revenue: f64,
    pub addon_revenue: f64,
    pub timer: TimerReading,
    pub completion: CompletionStatus,
}

impl ServiceLine {
    pub fn build(item: &TicketItem, ticket: &SaleTicket, now: DateTime<Utc>) -> Self {
        Self {
            item_id: item.id.clone(),
            service_code: item.service_code.clone(),
            service_name: item.service_name.clone(),
            duration_min: item.duration_min,
            service_revenue: item.service_revenue(),
            addon_revenue: item.addon_revenue(),
            timer: TimerReading::of(&item.timer_view(ticket), now),
            completion: item_completion_status(&item.completion_view(ticket)),
        }
    }
}

/// A technician's services on one ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketGroup {
    pub ticket_id: String,
    pub opened_at: DateTime<Utc>,
    pub store_code: String,
    pub approval_status: Option<ApprovalStatus>,
    pub total_minutes: u32,
    pub total_revenue: f64,
    pub has_active_timer: bool,
    pub services: Vec<ServiceLine>,
}

impl TicketGroup {
    pub fn new(ticket: &SaleTicket) -> Self {
        Self {
            ticket_id: ticket.id.clone(),
            opened_at: ticket.opened_at,
            store_code: ticket.store_code.clone(),
            approval_status: ticket.approval_status,
            total_minutes: 0,
            total_revenue: 0.0,
            has_active_timer: false,
            services: Vec::new(),
        }
    }

    pub fn push(&mut self, item: &TicketItem, ticket: &SaleTicket, now: DateTime<Utc>) {
        let timer = item.timer_view(ticket);
        self.total_minutes = self
            .total_minutes
            .saturating_add(compute_elapsed_minutes(&timer, now));
        self.total_revenue += item.revenue();
        self.has_active_timer |= has_active_timer(&timer);
        self.services.push(ServiceLine::build(item, ticket, now));
    }
}
