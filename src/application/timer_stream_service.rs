// Timer stream service - Live timer snapshots for one ticket
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::refresh::{RefreshScheduler, RefreshTask, TickOutcome};
use crate::application::ticket_repository::TicketRepository;
use crate::domain::permissions::Action;
use crate::domain::session::RequestContext;
use crate::domain::ticket::SaleTicket;
use crate::domain::timer::TimerSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const STREAM_BUFFER: usize = 16;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerStreamMessage {
    Snapshot {
        ticket_id: String,
        snapshot: TimerSnapshot,
    },
    Complete {
        ticket_id: String,
        ticks: u32,
        duration_ms: i64,
    },
    NotFound {
        ticket_id: String,
    },
    Error {
        ticket_id: String,
        message: String,
    },
}

/// Messages of one live timer stream. Dropping it stops the refresh task.
pub struct TimerStream {
    messages: mpsc::Receiver<TimerStreamMessage>,
    scheduler: RefreshScheduler,
}

impl Stream for TimerStream {
    type Item = TimerStreamMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.messages.poll_recv(cx)
    }
}

impl Drop for TimerStream {
    fn drop(&mut self) {
        if self.scheduler.is_running() {
            tracing::debug!("Timer stream closed by client, stopping refresh");
            self.scheduler.stop();
        }
    }
}

#[derive(Clone)]
pub struct TimerStreamService {
    repository: Arc<dyn TicketRepository>,
    refresh_interval: Duration,
}

impl TimerStreamService {
    pub fn new(repository: Arc<dyn TicketRepository>, refresh_interval: Duration) -> Self {
        Self {
            repository,
            refresh_interval,
        }
    }

    /// Emit a snapshot per refresh tick until no visible timer on the ticket is running.
    ///
    /// The ticket must belong to the caller's store. Callers without
    /// `ViewAllTickets` only see their own service lines, and a ticket with
    /// none of their lines is reported as not found.
    pub async fn stream_ticket_timers(
        &self,
        ctx: &RequestContext,
        ticket_id: &str,
    ) -> ServiceResult<TimerStream> {
        ctx.require(Action::ViewTickets)?;

        let technician = (!ctx.allows(Action::ViewAllTickets)).then(|| ctx.employee_id.clone());
        let ticket = self
            .repository
            .ticket_by_id(&ctx.store_id, ticket_id)
            .await?
            .filter(|t| t.store_id == ctx.store_id)
            .filter(|t| technician.is_none() || !t.timer_items_for(technician.as_deref()).is_empty())
            .ok_or_else(|| ServiceError::NotFound(format!("ticket {}", ticket_id)))?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let scheduler = RefreshScheduler::new(self.refresh_interval);

        tracing::info!(
            ticket_id,
            store_id = %ctx.store_id,
            employee_id = %ctx.employee_id,
            own_lines_only = technician.is_some(),
            interval_secs = scheduler.interval().as_secs(),
            "Starting timer stream"
        );

        scheduler.start(TicketTimerTask {
            repository: self.repository.clone(),
            store_id: ctx.store_id.clone(),
            ticket_id: ticket_id.to_string(),
            technician,
            prefetched: Some(ticket),
            tx,
            ticks: 0,
            started: Instant::now(),
        });

        Ok(TimerStream {
            messages: rx,
            scheduler,
        })
    }
}

struct TicketTimerTask {
    repository: Arc<dyn TicketRepository>,
    store_id: String,
    ticket_id: String,
    technician: Option<String>,
    prefetched: Option<SaleTicket>,
    tx: mpsc::Sender<TimerStreamMessage>,
    ticks: u32,
    started: Instant,
}

impl TicketTimerTask {
    async fn send(&self, msg: TimerStreamMessage) -> TickOutcome {
        match self.tx.send(msg).await {
            Ok(()) => TickOutcome::Continue,
            Err(_) => {
                tracing::debug!(ticket_id = %self.ticket_id, "Timer stream receiver dropped");
                TickOutcome::Stop
            }
        }
    }

    async fn fetch(&mut self) -> anyhow::Result<Option<SaleTicket>> {
        if let Some(ticket) = self.prefetched.take() {
            return Ok(Some(ticket));
        }
        self.repository
            .ticket_by_id(&self.store_id, &self.ticket_id)
            .await
    }
}

#[async_trait]
impl RefreshTask for TicketTimerTask {
    async fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        self.ticks += 1;
        let ticket_id = self.ticket_id.clone();

        let ticket = match self.fetch().await {
            Ok(Some(ticket)) => ticket,
            Ok(None) => {
                self.send(TimerStreamMessage::NotFound { ticket_id }).await;
                return TickOutcome::Stop;
            }
            Err(e) => {
                tracing::warn!(ticket_id = %ticket_id, error = %e, "Failed to refresh ticket timers");
                self.send(TimerStreamMessage::Error {
                    ticket_id,
                    message: e.to_string(),
                })
                .await;
                return TickOutcome::Stop;
            }
        };

        let items = ticket.timer_items_for(self.technician.as_deref());
        let snapshot = TimerSnapshot::evaluate(&items, now);
        let any_active = snapshot.any_active;

        let msg = TimerStreamMessage::Snapshot {
            ticket_id: ticket_id.clone(),
            snapshot,
        };
        if self.send(msg).await == TickOutcome::Stop {
            return TickOutcome::Stop;
        }

        if any_active {
            return TickOutcome::Continue;
        }

        let duration_ms = self.started.elapsed().as_millis() as i64;
        self.send(TimerStreamMessage::Complete {
            ticket_id,
            ticks: self.ticks,
            duration_ms,
        })
        .await;
        TickOutcome::Stop
    }
}
