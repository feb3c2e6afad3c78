// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory cat store
//!
//! Mirrors the semantics of the PostgreSQL store (store-assigned ids, silent
//! no-op on updates of unknown ids) and adds the hooks tests need: a call
//! counter, a switch that makes every operation fail, and a close counter.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

use dashmap::DashMap;
use shared_types::{Cat, CatId, NewCat, UpdateCat};
use tracing::debug;

use crate::{CatStore, StoreError};

/// Cat store holding rows in a concurrent map
#[derive(Debug, Default)]
pub struct MemoryCatStore {
    cats: DashMap<CatId, Cat>,
    last_id: AtomicI32,
    calls: AtomicUsize,
    closes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryCatStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of [`CatStore`] operations invoked so far, `close` excluded
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of times `close` has been invoked
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Make every subsequent operation fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Rows currently stored, ordered by identifier
    ///
    /// Does not count as a store call.
    pub fn snapshot(&self) -> Vec<Cat> {
        let mut cats: Vec<Cat> = self.cats.iter().map(|entry| entry.value().clone()).collect();
        cats.sort_by_key(|cat| cat.cat_id);
        cats
    }

    fn begin(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                message: "memory store is in failing mode".to_string(),
            });
        }
        Ok(())
    }
}

impl CatStore for MemoryCatStore {
    async fn get_cat(&self, cat_id: CatId) -> Result<Cat, StoreError> {
        self.begin()?;
        self.cats
            .get(&cat_id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound { cat_id })
    }

    async fn add_cat(&self, params: NewCat) -> Result<Cat, StoreError> {
        self.begin()?;
        let cat_id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let cat = Cat::from_new(cat_id, params);
        self.cats.insert(cat_id, cat.clone());
        Ok(cat)
    }

    async fn update_cat(&self, params: UpdateCat) -> Result<(), StoreError> {
        self.begin()?;
        match self.cats.get_mut(&params.cat_id) {
            Some(mut entry) => entry.value_mut().apply(params.changes),
            None => debug!(cat_id = params.cat_id, "update matched no rows"),
        }
        Ok(())
    }

    async fn list_cats(&self) -> Result<Vec<Cat>, StoreError> {
        self.begin()?;
        Ok(self.snapshot())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.begin()
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
