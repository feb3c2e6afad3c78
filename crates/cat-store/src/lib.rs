// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Data-access layer for cat records
//!
//! This crate provides the [`CatStore`] abstraction the HTTP layer talks to,
//! together with two implementations:
//!
//! - [`PgCatStore`]: PostgreSQL backed store on a `sqlx` connection pool
//! - [`MemoryCatStore`]: in-process store used by tests and local runs, which
//!   also counts calls and can be switched into a failing mode
//!
//! Every operation is attempted exactly once; there is no retry policy here.

use std::fmt;

use shared_types::{Cat, CatId, NewCat, UpdateCat};
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryCatStore;
pub use postgres::{PgCatStore, PgStoreConfig};

/// Operations the service needs from a relational cat store
pub trait CatStore: Send + Sync + fmt::Debug + 'static {
    /// Fetch a single cat by identifier
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no row carries `cat_id`, or another
    /// variant if the store could not be queried.
    fn get_cat(&self, cat_id: CatId) -> impl Future<Output = Result<Cat, StoreError>> + Send;

    /// Insert a new cat and return the stored record
    ///
    /// # Errors
    ///
    /// Returns an error if the row could not be inserted.
    fn add_cat(&self, params: NewCat) -> impl Future<Output = Result<Cat, StoreError>> + Send;

    /// Overwrite the mutable fields of an existing cat
    ///
    /// An identifier that matches no row is accepted silently: nothing is
    /// inserted and `Ok(())` is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the update statement failed.
    fn update_cat(&self, params: UpdateCat) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// List every stored cat ordered by identifier
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be queried.
    fn list_cats(&self) -> impl Future<Output = Result<Vec<Cat>, StoreError>> + Send;

    /// Lightweight connection round-trip used by the health check
    ///
    /// # Errors
    ///
    /// Returns an error if no connection could be acquired or pinged.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Release the underlying connections
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Errors reported by a [`CatStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched the requested identifier
    #[error("cat {cat_id} not found")]
    NotFound {
        /// Identifier that was looked up
        cat_id: CatId,
    },

    /// Query or connection failure reported by the database driver
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Store refused the operation without a driver error
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Error message
        message: String,
    },
}

impl StoreError {
    /// Whether this error signals an absent row rather than a backend failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
