//! Kiwi Latest Query
//! Copyright (c) 2026 Mamy Ratsimbazafy
//! Licensed and distributed under either of
//!   * MIT license (license terms at the root of the package or at http://opensource.org/licenses/MIT).
//!   * Apache v2 license (license terms at the root of the package or at http://www.apache.org/licenses/LICENSE-2.0).
//! at your option. This file may not be copied, modified, or distributed except according to those terms.

//! kiwi-internals/latest-query
//! A latest-wins gate for user-driven queries: when a newer query is issued,
//! the result of any older one is discarded once it resolves.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Custom error for the gate
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LatestQueryError {
    #[error("query {ticket} superseded by query {latest}")]
    Superseded { ticket: u64, latest: u64 },
}

/// Handle identifying one issued query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Tracks which query is the latest one.
///
/// Cloning is cheap and clones share the same counter, so a clone handed to
/// another task still supersedes (and is superseded by) the original.
///
/// # Examples
///
/// ```ignore
/// let latest = LatestQuery::new();
/// match latest.run(fetch()).await {
///     Ok(deals) => render(deals),
///     Err(LatestQueryError::Superseded { .. }) => {} // a newer search owns the screen
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct LatestQuery {
    generation: Arc<AtomicU64>,
}

impl LatestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket, superseding every ticket issued before it
    pub fn issue(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Id of the most recently issued ticket (0 if none)
    pub fn latest(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest() == ticket.0
    }

    /// Abandon the outstanding query without starting a new one
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Check a ticket after its work completed
    pub fn settle<T>(&self, ticket: Ticket, output: T) -> Result<T, LatestQueryError> {
        let latest = self.latest();
        if latest == ticket.0 {
            Ok(output)
        } else {
            Err(LatestQueryError::Superseded {
                ticket: ticket.0,
                latest,
            })
        }
    }

    /// Run `fut` as the latest query.
    ///
    /// The future always runs to completion; its output is only returned if no
    /// other query was issued (and no `invalidate`) while it was pending.
    pub async fn run<T, Fut>(&self, fut: Fut) -> Result<T, LatestQueryError>
    where
        Fut: Future<Output = T>,
    {
        let ticket = self.issue();
        let output = fut.await;
        self.settle(ticket, output)
    }
}
