// Report domain models - daily detail grid and tip report
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::completion::{CompletionStatus, completion_duration_minutes, item_completion_status};
use super::ticket::{SaleTicket, TicketGroup, TicketItem, TipBreakdown};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicianDetail {
    pub technician_id: String,
    pub technician_name: String,
    pub services_count: u32,
    pub service_revenue: f64,
    pub addon_revenue: f64,
    pub total_revenue: f64,
    pub approved_revenue: f64,
    pub tickets: Vec<TicketGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TipLine {
    pub ticket_id: String,
    pub service_code: String,
    pub service_name: String,
    pub price: f64,
    pub tips: TipBreakdown,
    pub payment_method: String,
    pub opened_at: DateTime<Utc>,
    pub store_code: String,
    pub completion_minutes: u32,
    pub completion: CompletionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicianTips {
    pub technician_id: String,
    pub technician_name: String,
    pub services_count: u32,
    pub revenue: f64,
    pub tips: TipBreakdown,
    pub tips_total: f64,
    pub items: Vec<TipLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TipTotals {
    pub tips: f64,
    pub tips_cash: f64,
    pub tips_card: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TipReport {
    pub date: NaiveDate,
    pub technicians: Vec<TechnicianTips>,
    pub totals: TipTotals,
}

/// Service lines that belong to a technician, paired with their ticket.
/// Lines without a technician are dropped.
fn attributed_lines<'a, F>(
    tickets: &'a [SaleTicket],
    include: &'a F,
) -> impl Iterator<Item = (&'a SaleTicket, &'a TicketItem, &'a str)> + 'a
where
    F: Fn(&str) -> bool + 'a,
{
    tickets.iter().flat_map(move |ticket| {
        ticket.items.iter().filter_map(move |item| {
            let employee_id = item.employee_id.as_deref()?;
            item.technician_name.as_ref()?;
            include(employee_id).then_some((ticket, item, employee_id))
        })
    })
}

fn technician_name(item: &TicketItem) -> String {
    item.technician_name.clone().unwrap_or_default()
}

pub fn build_daily_detail<F>(
    tickets: &[SaleTicket],
    include: F,
    now: DateTime<Utc>,
) -> Vec<TechnicianDetail>
where
    F: Fn(&str) -> bool,
{
    let mut technicians: HashMap<String, TechnicianDetail> = HashMap::new();

    for (ticket, item, employee_id) in attributed_lines(tickets, &include) {
        let detail = technicians
            .entry(employee_id.to_string())
            .or_insert_with(|| TechnicianDetail {
                technician_id: employee_id.to_string(),
                technician_name: technician_name(item),
                services_count: 0,
                service_revenue: 0.0,
                addon_revenue: 0.0,
                total_revenue: 0.0,
                approved_revenue: 0.0,
                tickets: Vec::new(),
            });

        detail.services_count += 1;
        detail.service_revenue += item.service_revenue();
        detail.addon_revenue += item.addon_revenue();
        detail.total_revenue += item.revenue();
        if ticket.is_approved() {
            detail.approved_revenue += item.revenue();
        }

        let position = detail.tickets.iter().position(|g| g.ticket_id == ticket.id);
        let group = match position {
            Some(idx) => &mut detail.tickets[idx],
            None => {
                detail.tickets.push(TicketGroup::new(ticket));
                let last = detail.tickets.len() - 1;
                &mut detail.tickets[last]
            }
        };
        group.push(item, ticket, now);
    }

    let mut details: Vec<TechnicianDetail> = technicians.into_values().collect();
    for detail in &mut details {
        detail.tickets.sort_by_key(|g| g.opened_at);
    }
    details.sort_by(|a, b| {
        a.technician_name
            .cmp(&b.technician_name)
            .then_with(|| a.technician_id.cmp(&b.technician_id))
    });
    details
}

pub fn build_tip_report<F>(date: NaiveDate, tickets: &[SaleTicket], include: F) -> TipReport
where
    F: Fn(&str) -> bool,
{
    let mut technicians: HashMap<String, TechnicianTips> = HashMap::new();
    let mut totals = TipTotals::default();

    for (ticket, item, employee_id) in attributed_lines(tickets, &include) {
        let summary = technicians
            .entry(employee_id.to_string())
            .or_insert_with(|| TechnicianTips {
                technician_id: employee_id.to_string(),
                technician_name: technician_name(item),
                services_count: 0,
                revenue: 0.0,
                tips: TipBreakdown::default(),
                tips_total: 0.0,
                items: Vec::new(),
            });

        let tips = item.tips();
        summary.services_count += 1;
        summary.revenue += item.revenue();
        summary.tips.accumulate(&tips);
        summary.tips_total += tips.total();

        totals.tips += tips.total();
        totals.tips_cash += tips.cash;
        totals.tips_card += tips.card;

        let completion = item.completion_view(ticket);
        summary.items.push(TipLine {
            ticket_id: ticket.id.clone(),
            service_code: item.service_code.clone(),
            service_name: item.service_name.clone(),
            price: item.revenue(),
            tips,
            payment_method: ticket.payment_method.clone(),
            opened_at: ticket.opened_at,
            store_code: ticket.store_code.clone(),
            completion_minutes: completion_duration_minutes(&completion),
            completion: item_completion_status(&completion),
        });
    }

    let mut summaries: Vec<TechnicianTips> = technicians.into_values().collect();
    for summary in &mut summaries {
        summary.items.sort_by_key(|line| line.opened_at);
    }
    summaries.sort_by(|a, b| {
        a.technician_name
            .cmp(&b.technician_name)
            .then_with(|| a.technician_id.cmp(&b.technician_id))
    });

    TipReport {
        date,
        technicians: summaries,
        totals,
    }
}
