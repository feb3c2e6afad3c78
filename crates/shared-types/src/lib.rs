// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the cat API service
//!
//! This crate provides the record and parameter types that are shared between
//! the data-access layer and the HTTP server, avoiding circular dependencies.

pub mod cat;

pub use cat::{Cat, CatChanges, CatId, NewCat, UpdateCat};
