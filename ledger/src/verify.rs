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

use crate::contracts::{cash::Cash, commercial_paper::CommercialPaper, crowdfund::Crowdfund};
use crate::error::ContractRejection;
use crate::structure::{
    AuthenticatedCommand, ContractCommand, ContractId, INITIAL_PARAMETERS, LedgerParameters,
    TransactionForVerification,
};
use lazy_static::lazy_static;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug, Formatter};

/// The rules governing one family of states.
///
/// Implementations must be pure: the verdict may depend on nothing but the
/// transaction, so that every node reaches the same one.
pub trait Contract: Send + Sync {
    fn id(&self) -> ContractId;

    fn verify(&self, tx: &TransactionForVerification) -> Result<(), ContractRejection>;
}

/// Extracts the only command of family `C`, rejecting if there are none or
/// several.
pub fn expect_single<'a, C: ContractCommand + 'a>(
    commands: impl IntoIterator<Item = AuthenticatedCommand<'a, C>>,
    command: &'static str,
) -> Result<AuthenticatedCommand<'a, C>, ContractRejection> {
    expect_at_most_one(commands, command)?.ok_or(ContractRejection::MissingCommand {
        contract: C::CONTRACT,
        command,
    })
}

/// Extracts the command of family `C` if there is one, rejecting if there
/// are several.
pub fn expect_at_most_one<'a, C: ContractCommand + 'a>(
    commands: impl IntoIterator<Item = AuthenticatedCommand<'a, C>>,
    command: &'static str,
) -> Result<Option<AuthenticatedCommand<'a, C>>, ContractRejection> {
    let mut commands = commands.into_iter();
    let first = commands.next();
    let rest = commands.count();
    if rest > 0 {
        return Err(ContractRejection::AmbiguousCommand {
            contract: C::CONTRACT,
            command,
            found: rest + 1,
        });
    }
    Ok(first)
}

/// Dispatches transactions to the contracts their states name.
pub struct Verifier {
    parameters: LedgerParameters,
    contracts: BTreeMap<ContractId, Box<dyn Contract>>,
}

impl Debug for Verifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("parameters", &self.parameters)
            .field("contracts", &self.contracts.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Verifier {
    /// A verifier with no contracts registered; every state is unknown to it.
    pub fn new(parameters: LedgerParameters) -> Self {
        Verifier {
            parameters,
            contracts: BTreeMap::new(),
        }
    }

    /// A verifier knowing cash, commercial paper and crowdfunding campaigns.
    pub fn with_standard_contracts(parameters: LedgerParameters) -> Self {
        let mut verifier = Verifier::new(parameters);
        verifier.register(Cash);
        verifier.register(CommercialPaper);
        verifier.register(Crowdfund);
        verifier
    }

    /// Registers `contract` under its id, returning any contract it replaces.
    pub fn register(&mut self, contract: impl Contract + 'static) -> Option<Box<dyn Contract>> {
        self.contracts.insert(contract.id(), Box::new(contract))
    }

    pub fn parameters(&self) -> &LedgerParameters {
        &self.parameters
    }

    pub fn contract_ids(&self) -> impl Iterator<Item = ContractId> + '_ {
        self.contracts.keys().copied()
    }

    fn check_limits(&self, tx: &TransactionForVerification) -> Result<(), ContractRejection> {
        let limits = &self.parameters.limits;
        let check = |what, limit: u32, found: usize| {
            if found > limit as usize {
                Err(ContractRejection::LimitExceeded { what, limit, found })
            } else {
                Ok(())
            }
        };
        check("inputs", limits.max_inputs, tx.inputs.len())?;
        check("outputs", limits.max_outputs, tx.outputs.len())?;
        check("commands", limits.max_commands, tx.commands.len())?;
        for command in tx.commands.iter() {
            check(
                "signers on one command",
                limits.max_signers_per_command,
                command.signers.len(),
            )?;
        }
        Ok(())
    }

    /// Accepts `tx` only if every contract named by its states accepts it.
    ///
    /// All contracts must be known before any runs; the first rejection, in
    /// contract id order, is returned.
    pub fn verify(&self, tx: &TransactionForVerification) -> Result<(), ContractRejection> {
        self.check_limits(tx)?;
        let named = tx
            .inputs
            .iter()
            .chain(tx.outputs.iter())
            .map(|state| state.contract())
            .collect::<BTreeSet<_>>();
        let contracts = named
            .into_iter()
            .map(|id| {
                self.contracts
                    .get(&id)
                    .ok_or(ContractRejection::UnknownContract(id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        for contract in contracts {
            trace!(tx = %tx.id, contract = %contract.id(), "dispatching");
            contract.verify(tx)?;
        }
        debug!(tx = %tx.id, "transaction accepted");
        Ok(())
    }

    /// Verifies independent transactions in parallel, returning one verdict
    /// per transaction, in order.
    pub fn verify_all(
        &self,
        txs: &[TransactionForVerification],
    ) -> Vec<Result<(), ContractRejection>> {
        txs.par_iter().map(|tx| self.verify(tx)).collect()
    }
}

lazy_static! {
    static ref STANDARD_VERIFIER: Verifier = Verifier::with_standard_contracts(INITIAL_PARAMETERS);
}

/// Verifies `tx` against the standard contracts under the initial
/// parameters.
pub fn verify(tx: &TransactionForVerification) -> Result<(), ContractRejection> {
    STANDARD_VERIFIER.verify(tx)
}
