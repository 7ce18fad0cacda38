// This file is part of midnight-ledger.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fail-fast requirement chains.
//!
//! ```
//! # use ashlar_ledger::requirements::require_that;
//! # use ashlar_ledger::structure::ContractId;
//! # const DEMO: ContractId = ContractId("demo");
//! # fn check(inputs: &[u32]) -> Result<(), ashlar_ledger::error::ContractRejection> {
//! require_that(DEMO)
//!     .that("there is at least one input", !inputs.is_empty())?
//!     .that("no input is zero", inputs.iter().all(|i| *i > 0))?;
//! # Ok(())
//! # }
//! # assert!(check(&[]).is_err());
//! ```
//!
//! Requirements are checked in order and the first failing one becomes the
//! rejection. Because each link is followed by `?`, the predicates after a
//! failure are never evaluated.

use crate::error::ContractRejection;
use crate::structure::ContractId;

/// Starts a requirement chain on behalf of `contract`.
pub fn require_that(contract: ContractId) -> Requirements {
    Requirements { contract }
}

#[derive(Copy, Clone, Debug)]
pub struct Requirements {
    contract: ContractId,
}

impl Requirements {
    /// Requires `condition`, described by `clause`.
    pub fn that(self, clause: &str, condition: bool) -> Result<Self, ContractRejection> {
        self.that_with(|| clause.to_owned(), condition)
    }

    /// The rejection for `clause`, for requirements that must destructure
    /// their subject rather than test a predicate.
    pub fn failed(self, clause: &str) -> ContractRejection {
        trace!(contract = %self.contract, "requirement failed");
        ContractRejection::Requirement {
            contract: self.contract,
            clause: clause.to_owned(),
        }
    }

    /// Like [`Self::that`], only rendering the description if it is needed.
    pub fn that_with(
        self,
        clause: impl FnOnce() -> String,
        condition: bool,
    ) -> Result<Self, ContractRejection> {
        if condition {
            Ok(self)
        } else {
            Err(self.failed(&clause()))
        }
    }
}
