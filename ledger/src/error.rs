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

use crate::structure::ContractId;
use coin_structure::coin::{Amount, AmountError, Currency};
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Why a transaction was refused. Every variant is terminal: verification is a
/// pure function, so the same transaction is refused the same way everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContractRejection {
    /// A named invariant of a contract did not hold. `clause` is the
    /// description of the first failing requirement.
    Requirement {
        contract: ContractId,
        clause: String,
    },
    MissingCommand {
        contract: ContractId,
        command: &'static str,
    },
    AmbiguousCommand {
        contract: ContractId,
        command: &'static str,
        found: usize,
    },
    UnknownContract(ContractId),
    /// Amount arithmetic overflowed, underflowed or mixed tokens while
    /// checking a group.
    Arithmetic {
        contract: ContractId,
        error: AmountError,
    },
    LimitExceeded {
        what: &'static str,
        limit: u32,
        found: usize,
    },
}

impl ContractRejection {
    /// The failed clause, for requirement failures.
    pub fn clause(&self) -> Option<&str> {
        match self {
            ContractRejection::Requirement { clause, .. } => Some(clause.as_str()),
            _ => None,
        }
    }

    /// The contract that refused the transaction, if any did.
    pub fn contract(&self) -> Option<ContractId> {
        match self {
            ContractRejection::Requirement { contract, .. }
            | ContractRejection::MissingCommand { contract, .. }
            | ContractRejection::AmbiguousCommand { contract, .. }
            | ContractRejection::Arithmetic { contract, .. } => Some(*contract),
            ContractRejection::UnknownContract(contract) => Some(*contract),
            ContractRejection::LimitExceeded { .. } => None,
        }
    }

    pub(crate) fn arithmetic(contract: ContractId) -> impl FnOnce(AmountError) -> Self {
        move |error| ContractRejection::Arithmetic { contract, error }
    }
}

impl Display for ContractRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ContractRejection::Requirement { contract, clause } => {
                write!(f, "contract {contract} failed requirement: {clause}")
            }
            ContractRejection::MissingCommand { contract, command } => write!(
                f,
                "contract {contract} requires a {command} command, but none was present"
            ),
            ContractRejection::AmbiguousCommand {
                contract,
                command,
                found,
            } => write!(
                f,
                "contract {contract} requires a single {command} command, but {found} were present"
            ),
            ContractRejection::UnknownContract(contract) => {
                write!(f, "no verifier is registered for contract {contract}")
            }
            ContractRejection::Arithmetic { contract, error } => {
                write!(f, "contract {contract} could not be checked: {error}")
            }
            ContractRejection::LimitExceeded { what, limit, found } => write!(
                f,
                "transaction has {found} {what}, exceeding the limit of {limit}"
            ),
        }
    }
}

impl Error for ContractRejection {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ContractRejection::Arithmetic { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Why coin selection could not produce a spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpendError {
    /// The eligible states do not cover the target; `shortfall` is exactly
    /// what is missing.
    InsufficientBalance { shortfall: Amount<Currency> },
    /// The eligible states cover the total, but no single deposit covers
    /// `payment` on its own.
    Fragmented { payment: Amount<Currency> },
    Arithmetic(AmountError),
}

impl Display for SpendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SpendError::InsufficientBalance { shortfall } => {
                write!(f, "insufficient balance: missing {shortfall}")
            }
            SpendError::Fragmented { payment } => {
                write!(f, "no single deposit can pay {payment}")
            }
            SpendError::Arithmetic(e) => write!(f, "coin selection arithmetic failed: {e}"),
        }
    }
}

impl Error for SpendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SpendError::Arithmetic(e) => Some(e),
            SpendError::InsufficientBalance { .. } | SpendError::Fragmented { .. } => None,
        }
    }
}

impl From<AmountError> for SpendError {
    fn from(err: AmountError) -> SpendError {
        SpendError::Arithmetic(err)
    }
}
