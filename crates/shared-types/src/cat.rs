// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Cat record and parameter types
//!
//! Every request-facing shape rejects fields it does not declare, so a typo in
//! a client payload surfaces as a decoding error instead of being dropped.

use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a cat row
pub type CatId = i32;

/// A stored cat record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Cat {
    /// Identifier assigned by the store on creation, immutable afterwards
    pub cat_id: CatId,
    /// Display name
    pub name: String,
    /// Breed description
    pub breed: String,
    /// Age in years
    pub age: i32,
}

/// Parameters required to insert a new cat
///
/// Carries no identifier, the store assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCat {
    /// Display name
    pub name: String,
    /// Breed description
    pub breed: String,
    /// Age in years
    pub age: i32,
}

/// Mutable fields of a cat, as decoded from an update request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatChanges {
    /// Display name
    pub name: String,
    /// Breed description
    pub breed: String,
    /// Age in years
    pub age: i32,
}

/// Parameters for overwriting an existing cat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCat {
    /// Target row, always taken from the request path
    pub cat_id: CatId,
    /// New values for the mutable fields
    pub changes: CatChanges,
}

impl UpdateCat {
    /// Bind decoded changes to the target identifier
    pub fn new(cat_id: CatId, changes: CatChanges) -> Self {
        Self { cat_id, changes }
    }
}

impl Cat {
    /// Build the record the store would hold for `params` under `cat_id`
    pub fn from_new(cat_id: CatId, params: NewCat) -> Self {
        Self {
            cat_id,
            name: params.name,
            breed: params.breed,
            age: params.age,
        }
    }

    /// Overwrite the mutable fields in place
    pub fn apply(&mut self, changes: CatChanges) {
        self.name = changes.name;
        self.breed = changes.breed;
        self.age = changes.age;
    }
}
