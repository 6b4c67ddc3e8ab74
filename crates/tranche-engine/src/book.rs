//! Escrow book — a registry of independent escrows.
//!
//! Each escrow sits behind its own lock, so operations on different escrows
//! never contend and operations on the same escrow are serialized. The book
//! itself only guards membership. Parties are fixed at creation, so the
//! book records them beside each handle and party listings take no escrow
//! lock.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use tranche_types::{
    EscrowId, EscrowStatus, EscrowTerms, PartyId, Result, TrancheError, constants,
};

use crate::controller::Escrow;

/// Shared handle to one escrow.
pub type EscrowHandle = Arc<Mutex<Escrow>>;

/// Which side of an escrow a party is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Client,
    ServiceProvider,
}

/// One registered escrow and its parties.
#[derive(Debug)]
struct Entry {
    handle: EscrowHandle,
    client: PartyId,
    service_provider: PartyId,
}

impl Entry {
    fn party(&self, role: PartyRole) -> PartyId {
        match role {
            PartyRole::Client => self.client,
            PartyRole::ServiceProvider => self.service_provider,
        }
    }
}

/// All live escrows, indexed by id.
#[derive(Debug)]
pub struct EscrowBook {
    escrows: HashMap<EscrowId, Entry>,
}

impl Default for EscrowBook {
    fn default() -> Self {
        Self::new()
    }
}

impl EscrowBook {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(constants::DEFAULT_BOOK_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            escrows: HashMap::with_capacity(capacity),
        }
    }

    /// Register a new escrow under `id`.
    ///
    /// # Errors
    /// `DuplicateEscrow` if `id` is taken; `InvalidConfiguration` for bad
    /// terms. Nothing is registered on error.
    pub fn open(&mut self, id: EscrowId, terms: EscrowTerms) -> Result<EscrowHandle> {
        if self.escrows.contains_key(&id) {
            tracing::warn!(escrow = %id, "Escrow id already registered");
            return Err(TrancheError::DuplicateEscrow(id));
        }
        let (client, service_provider) = (terms.client, terms.service_provider);
        let handle = Arc::new(Mutex::new(Escrow::create(id, terms)?));
        self.escrows.insert(
            id,
            Entry {
                handle: Arc::clone(&handle),
                client,
                service_provider,
            },
        );
        Ok(handle)
    }

    /// Register a new escrow under a fresh id.
    pub fn open_new(&mut self, terms: EscrowTerms) -> Result<(EscrowId, EscrowHandle)> {
        let id = EscrowId::new();
        let handle = self.open(id, terms)?;
        Ok((id, handle))
    }

    /// Shared handle for `id`.
    pub fn handle(&self, id: EscrowId) -> Result<EscrowHandle> {
        self.escrows
            .get(&id)
            .map(|entry| Arc::clone(&entry.handle))
            .ok_or(TrancheError::EscrowNotFound(id))
    }

    /// Point-in-time copy of one escrow, for read-only inspection.
    ///
    /// Locks the escrow, so it must not be called for the same id from
    /// inside [`with_escrow`](Self::with_escrow).
    pub fn get(&self, id: EscrowId) -> Result<Escrow> {
        let handle = self.handle(id)?;
        let escrow = handle.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(escrow.clone())
    }

    /// Run `f` with exclusive access to one escrow.
    ///
    /// A lock poisoned by a panicking holder is recovered: every operation
    /// commits its ledger in a single assignment, so the escrow inside is
    /// always a committed state.
    ///
    /// The escrow's lock is held while `f` runs: `f` may list parties but
    /// must not re-enter `get` or `with_escrow` for the same id.
    pub fn with_escrow<T>(
        &self,
        id: EscrowId,
        f: impl FnOnce(&mut Escrow) -> Result<T>,
    ) -> Result<T> {
        let handle = self.handle(id)?;
        let mut escrow = handle.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut escrow)
    }

    /// Ids of every escrow where `party` plays `role`, sorted. Takes no
    /// escrow lock.
    #[must_use]
    pub fn ids_for_party(&self, party: PartyId, role: PartyRole) -> Vec<EscrowId> {
        let mut ids: Vec<EscrowId> = self
            .escrows
            .iter()
            .filter(|(_, entry)| entry.party(role) == party)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Drop every closed escrow from the book, returning their ids sorted.
    pub fn close_out(&mut self) -> Vec<EscrowId> {
        let mut closed: Vec<EscrowId> = self
            .escrows
            .iter()
            .filter(|(_, entry)| {
                entry
                    .handle
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .status()
                    == EscrowStatus::Closed
            })
            .map(|(id, _)| *id)
            .collect();
        closed.sort();
        for id in &closed {
            self.escrows.remove(id);
        }
        if !closed.is_empty() {
            tracing::info!(
                count = closed.len(),
                remaining = self.escrows.len(),
                "Closed escrows removed"
            );
        }
        closed
    }

    #[must_use]
    pub fn contains(&self, id: EscrowId) -> bool {
        self.escrows.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.escrows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.escrows.is_empty()
    }
}
