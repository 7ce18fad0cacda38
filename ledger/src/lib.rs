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

#![deny(unreachable_pub)]
#![deny(warnings)]

//! This crate decides whether a proposed transition of a UTXO-style ledger is
//! valid, and builds new transitions by selecting and re-partitioning existing
//! value.
//!
//! Verification is a pure function of a [`structure::TransactionForVerification`]:
//! the [`verify::Verifier`] dispatches each contract named by the transaction's
//! states to its registered [`verify::Contract`], which groups its states with
//! [`group::group_states`] and checks every group through a fail-fast
//! [`requirements::require_that`] chain. [`construct`] is the upstream
//! producer of transactions this engine accepts.

#[macro_use]
extern crate tracing;

pub mod construct;
pub mod contracts;
pub mod error;
pub mod group;
#[path = "tracing.rs"]
mod ledger_tracing;
pub mod requirements;
pub mod structure;
pub mod verify;

pub use ledger_tracing::{
    ENGINE_TARGET, LogLevel, contract_target, init_logger, init_logger_with, log_filter,
};
pub use verify::verify;

#[cfg(feature = "test-utilities")]
pub mod test_utilities;
