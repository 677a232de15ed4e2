// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Thread-safe resource arbiter
//!
//! Wraps a [`ResourceLedger`] for use by several worker threads. A request
//! holds the write lock for its whole check, speculate, evaluate and
//! commit-or-rollback cycle, so no reader ever sees a speculative grant.
//! Safety queries take the read lock. Nothing here blocks waiting for units
//! to become free: retry policy belongs to the caller.

use deadlock_common::{LedgerError, LedgerResult};
use parking_lot::{Mutex, RwLock};

use super::resource_ledger::{Grant, LedgerSnapshot, ResourceLedger};
use super::safety::SafetyReport;

/// Outcome of the most recent query or request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastOutcome {
    /// A safety check
    Safety(SafetyReport),
    /// A resource request, granted or denied
    Request(Result<Grant, LedgerError>),
}

/// Counters kept by the arbiter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArbiterStatistics {
    /// Total number of requests received
    pub requests: u64,
    /// Requests granted
    pub granted: u64,
    /// Requests denied for exceeding the declared need
    pub denied_exceeds_need: u64,
    /// Requests told to wait for free units
    pub denied_insufficient: u64,
    /// Requests denied because the grant would be unsafe
    pub denied_unsafe: u64,
    /// Requests rejected for malformed input
    pub rejected: u64,
    /// Successful releases
    pub releases: u64,
    /// Safety checks run outside of requests
    pub safety_checks: u64,
}

/// Shared, serialized access to a resource ledger
pub struct ResourceArbiter {
    ledger: RwLock<ResourceLedger>,
    statistics: Mutex<ArbiterStatistics>,
    last_outcome: Mutex<Option<LastOutcome>>,
}

impl ResourceArbiter {
    /// Take ownership of a configured ledger
    pub fn new(ledger: ResourceLedger) -> Self {
        Self {
            ledger: RwLock::new(ledger),
            statistics: Mutex::new(ArbiterStatistics::default()),
            last_outcome: Mutex::new(None),
        }
    }

    /// Grant or deny a request atomically
    pub fn request_resources(&self, process: usize, request: &[u32]) -> LedgerResult<Grant> {
        let mut ledger = self.ledger.write();
        let result = ledger.request_resources(process, request);

        {
            let mut stats = self.statistics.lock();
            stats.requests += 1;
            match &result {
                Ok(_) => stats.granted += 1,
                Err(LedgerError::ExceedsNeed { .. }) => stats.denied_exceeds_need += 1,
                Err(LedgerError::InsufficientAvailable { .. }) => stats.denied_insufficient += 1,
                Err(LedgerError::WouldBeUnsafe { .. }) => stats.denied_unsafe += 1,
                Err(_) => stats.rejected += 1,
            }
        }
        *self.last_outcome.lock() = Some(LastOutcome::Request(result.clone()));

        result
    }

    /// Return units held by a process
    pub fn release_resources(&self, process: usize, release: &[u32]) -> LedgerResult<()> {
        let mut ledger = self.ledger.write();
        ledger.release_resources(process, release)?;
        self.statistics.lock().releases += 1;
        Ok(())
    }

    /// Run the safety algorithm under a shared lock
    pub fn is_safe(&self) -> SafetyReport {
        let ledger = self.ledger.read();
        let report = ledger.is_safe();
        self.statistics.lock().safety_checks += 1;
        *self.last_outcome.lock() = Some(LastOutcome::Safety(report.clone()));
        report
    }

    /// Mutate the ledger directly, e.g. to load new claims
    pub fn update<R>(&self, f: impl FnOnce(&mut ResourceLedger) -> R) -> R {
        let mut ledger = self.ledger.write();
        f(&mut ledger)
    }

    /// Read the ledger under a shared lock
    pub fn read<R>(&self, f: impl FnOnce(&ResourceLedger) -> R) -> R {
        let ledger = self.ledger.read();
        f(&ledger)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.read().snapshot()
    }

    pub fn last_outcome(&self) -> Option<LastOutcome> {
        self.last_outcome.lock().clone()
    }

    pub fn statistics(&self) -> ArbiterStatistics {
        self.statistics.lock().clone()
    }

    /// Release the ledger
    pub fn into_inner(self) -> ResourceLedger {
        self.ledger.into_inner()
    }
}
