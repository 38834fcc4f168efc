// PostgREST repository implementation for the hosted backend
use crate::application::ticket_repository::TicketRepository;
use crate::domain::ticket::{ApprovalStatus, SaleTicket, TicketItem};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

const TICKET_SELECT: &str = "id,payment_method,opened_at,closed_at,completed_at,store_id,approval_status,\
store:stores!sale_tickets_store_id_fkey(code),\
ticket_items(id,employee_id,custom_service_name,qty,price_each,addon_price,\
tip_customer_cash,tip_customer_card,tip_receptionist,started_at,timer_stopped_at,completed_at,\
service:store_services!ticket_items_store_service_id_fkey(code,name,duration_min),\
employee:employees!ticket_items_employee_id_fkey(id,display_name))";

const AUTO_APPROVE_RPC: &str = "auto_approve_with_monitoring";

#[derive(Debug, Clone)]
pub struct PostgrestRepository {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TicketRow {
    id: String,
    store_id: String,
    #[serde(default)]
    payment_method: Option<String>,
    opened_at: DateTime<Utc>,
    #[serde(default)]
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    approval_status: Option<ApprovalStatus>,
    #[serde(default)]
    store: Option<StoreRow>,
    #[serde(default)]
    ticket_items: Vec<ItemRow>,
}

#[derive(Debug, Deserialize)]
struct StoreRow {
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemRow {
    id: String,
    #[serde(default)]
    employee_id: Option<String>,
    #[serde(default)]
    custom_service_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    qty: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    price_each: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    addon_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    tip_customer_cash: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    tip_customer_card: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    tip_receptionist: f64,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    timer_stopped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    service: Option<ServiceRow>,
    #[serde(default)]
    employee: Option<EmployeeRow>,
}

#[derive(Debug, Deserialize)]
struct ServiceRow {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    duration_min: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EmployeeRow {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct AutoApprovalResult {
    #[serde(default)]
    count: u64,
}

/// Numeric columns may arrive as JSON numbers, numeric strings or null.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

impl From<TicketRow> for SaleTicket {
    fn from(row: TicketRow) -> Self {
        let store_code = row.store.and_then(|s| s.code).unwrap_or_default();

        SaleTicket {
            id: row.id,
            store_id: row.store_id,
            store_code,
            payment_method: row.payment_method.unwrap_or_default(),
            opened_at: row.opened_at,
            closed_at: row.closed_at,
            completed_at: row.completed_at,
            approval_status: row.approval_status,
            items: row.ticket_items.into_iter().map(TicketItem::from).collect(),
        }
    }
}

impl From<ItemRow> for TicketItem {
    fn from(row: ItemRow) -> Self {
        let service = row.service.unwrap_or(ServiceRow {
            code: None,
            name: None,
            duration_min: None,
        });
        let service_name = service
            .name
            .or(row.custom_service_name)
            .unwrap_or_default();

        TicketItem {
            id: row.id,
            employee_id: row.employee_id,
            technician_name: row.employee.map(|e| e.display_name),
            service_code: service.code.unwrap_or_default(),
            service_name,
            duration_min: service.duration_min.unwrap_or(0),
            qty: row.qty,
            price_each: row.price_each,
            addon_price: row.addon_price,
            tip_customer_cash: row.tip_customer_cash,
            tip_customer_card: row.tip_customer_card,
            tip_receptionist: row.tip_receptionist,
            started_at: row.started_at,
            timer_stopped_at: row.timer_stopped_at,
            completed_at: row.completed_at,
        }
    }
}

impl PostgrestRepository {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn table_url(&self, table: &str, filters: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}/rest/v1/{}?select={}",
            self.base_url,
            table,
            urlencoding::encode(TICKET_SELECT)
        );
        for (column, filter) in filters {
            url.push('&');
            url.push_str(column);
            url.push('=');
            url.push_str(&urlencoding::encode(filter));
        }
        url
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
    }

    async fn fetch_tickets(&self, filters: &[(&str, String)]) -> Result<Vec<SaleTicket>> {
        let url = self.table_url("sale_tickets", filters);
        tracing::debug!(%url, "Querying backend");

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .context("Failed to send request to backend")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Backend query failed with status {}: {}", status, body);
        }

        let rows = response
            .json::<Vec<TicketRow>>()
            .await
            .context("Failed to parse backend ticket rows")?;

        Ok(rows.into_iter().map(SaleTicket::from).collect())
    }
}

#[async_trait]
impl TicketRepository for PostgrestRepository {
    async fn tickets_for_date(&self, store_id: &str, date: NaiveDate) -> Result<Vec<SaleTicket>> {
        let tickets = self
            .fetch_tickets(&[
                ("ticket_date", format!("eq.{}", date)),
                ("store_id", format!("eq.{}", store_id)),
                ("order", "opened_at.asc".to_string()),
            ])
            .await?;

        tracing::debug!(store_id, %date, count = tickets.len(), "Fetched tickets");
        Ok(tickets)
    }

    async fn ticket_by_id(&self, store_id: &str, ticket_id: &str) -> Result<Option<SaleTicket>> {
        let mut tickets = self
            .fetch_tickets(&[
                ("id", format!("eq.{}", ticket_id)),
                ("store_id", format!("eq.{}", store_id)),
                ("limit", "1".to_string()),
            ])
            .await?;
        Ok(tickets.pop())
    }

    async fn run_auto_approval(&self, source: &str) -> Result<u64> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, AUTO_APPROVE_RPC);

        let response = self
            .authorized(self.client.post(&url))
            .json(&serde_json::json!({ "p_source": source }))
            .send()
            .await
            .context("Failed to call auto-approval procedure")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Auto-approval failed with status {}: {}", status, body);
        }

        let result = response
            .json::<Option<AutoApprovalResult>>()
            .await
            .context("Failed to parse auto-approval result")?;

        Ok(result.map(|r| r.count).unwrap_or(0))
    }
}
