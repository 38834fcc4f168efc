// Repository trait for ticket data held by the hosted backend
use crate::domain::ticket::SaleTicket;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// All tickets of a store for one business day, with their service lines
    async fn tickets_for_date(&self, store_id: &str, date: NaiveDate) -> anyhow::Result<Vec<SaleTicket>>;

    /// A single ticket of the store with its service lines, if it exists there
    async fn ticket_by_id(&self, store_id: &str, ticket_id: &str) -> anyhow::Result<Option<SaleTicket>>;

    /// Run the backend procedure that approves eligible pending tickets.
    /// Returns how many tickets were approved.
    async fn run_auto_approval(&self, source: &str) -> anyhow::Result<u64>;
}
