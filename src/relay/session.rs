// src/relay/session.rs
//! In-memory chat session: ordered exchange log plus supersession of in-flight queries.
//!
//! Starting a query cancels whatever query is still running. A completion that
//! arrives after it was superseded is dropped instead of being appended.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::relay::{ClassifiedResponse, QueryRelay};

pub const GREETING: &str = "Hey there! How may I assist with your data analysis?";

/// Exchanges kept per session before the oldest are dropped.
pub const DEFAULT_SESSION_CAP: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatExchange {
    /// Monotonic within the session.
    pub seq: u64,
    pub query: String,
    pub response: ClassifiedResponse,
    pub asked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Handle for one started query.
#[derive(Debug)]
pub struct QueryTicket {
    seq: u64,
    asked_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl QueryTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AskOutcome {
    Answered(ChatExchange),
    Superseded { seq: u64 },
}

#[derive(Debug, Default)]
struct SessionInner {
    exchanges: Vec<ChatExchange>,
    next_seq: u64,
    in_flight: Option<(u64, CancellationToken)>,
}

#[derive(Debug)]
pub struct ChatSession {
    inner: Mutex<SessionInner>,
    cap: usize,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SESSION_CAP)
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                next_seq: 1,
                ..Default::default()
            }),
            cap: cap.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a query, cancelling the one still in flight (if any).
    pub fn begin(&self) -> QueryTicket {
        let mut inner = self.lock();
        if let Some((seq, token)) = inner.in_flight.take() {
            token.cancel();
            counter!("relay_superseded_total").increment(1);
            tracing::debug!(target: "chat", superseded = seq, "query superseded");
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let cancel = CancellationToken::new();
        inner.in_flight = Some((seq, cancel.clone()));
        QueryTicket {
            seq,
            asked_at: Utc::now(),
            cancel,
        }
    }

    /// Record the response for `ticket`; `None` when a newer query took over.
    pub fn finish(
        &self,
        ticket: QueryTicket,
        query: &str,
        response: ClassifiedResponse,
    ) -> Option<ChatExchange> {
        let mut inner = self.lock();
        let current = matches!(&inner.in_flight, Some((seq, _)) if *seq == ticket.seq);
        if !current || ticket.cancel.is_cancelled() {
            tracing::debug!(target: "chat", seq = ticket.seq, "dropping stale response");
            return None;
        }
        inner.in_flight = None;

        let exchange = ChatExchange {
            seq: ticket.seq,
            query: query.to_string(),
            response,
            asked_at: ticket.asked_at,
        };
        inner.exchanges.push(exchange.clone());
        if inner.exchanges.len() > self.cap {
            let excess = inner.exchanges.len() - self.cap;
            inner.exchanges.drain(0..excess);
        }
        Some(exchange)
    }

    /// Run one query through `relay`, honouring supersession.
    pub async fn ask(&self, relay: &dyn QueryRelay, query: &str) -> AskOutcome {
        let ticket = self.begin();
        let seq = ticket.seq;
        let _guard = InFlightGuard { session: self, seq };
        let history = self.exchanges();
        let cancel = ticket.cancel.clone();

        tracing::info!(target: "chat", seq, relay = relay.name(), "query started");
        let response = tokio::select! {
            _ = cancel.cancelled() => return AskOutcome::Superseded { seq },
            r = relay.relay(query, &history) => r,
        };

        match self.finish(ticket, query, response) {
            Some(exchange) => {
                tracing::info!(target: "chat", seq, kind = exchange.response.kind(), "query answered");
                AskOutcome::Answered(exchange)
            }
            None => AskOutcome::Superseded { seq },
        }
    }

    pub fn exchanges(&self) -> Vec<ChatExchange> {
        self.lock().exchanges.clone()
    }

    pub fn latest(&self) -> Option<ChatExchange> {
        self.lock().exchanges.last().cloned()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// Greeting followed by alternating user/assistant turns.
    pub fn transcript(&self) -> Vec<ChatMessage> {
        let inner = self.lock();
        let mut out = Vec::with_capacity(1 + inner.exchanges.len() * 2);
        out.push(ChatMessage::assistant(GREETING));
        for ex in &inner.exchanges {
            out.push(ChatMessage {
                role: Role::User,
                content: ex.query.clone(),
            });
            out.push(ChatMessage::assistant(assistant_line(&ex.response)));
        }
        out
    }
}

/// Clears `in_flight` if the query that set it never finished, e.g. because the
/// caller dropped the `ask` future.
struct InFlightGuard<'a> {
    session: &'a ChatSession,
    seq: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.lock();
        if matches!(&inner.in_flight, Some((seq, _)) if *seq == self.seq) {
            inner.in_flight = None;
            tracing::debug!(target: "chat", seq = self.seq, "query abandoned");
        }
    }
}

fn assistant_line(response: &ClassifiedResponse) -> String {
    match response {
        ClassifiedResponse::Error { message, .. } => format!("Error: {message}"),
        ClassifiedResponse::Text { text } => text.clone(),
        ClassifiedResponse::Number { value } => value.to_string(),
        ClassifiedResponse::Unsupported { kind } => {
            format!("I received a \"{kind}\" response that cannot be displayed.")
        }
        other => format!("See the {} below!", other.kind()),
    }
}
