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

use crate::contracts::{cash, commercial_paper, crowdfund};
use crate::group::{InOutGroup, group_states};
use base_crypto::hash::HashOutput;
use base_crypto::signatures::VerifyingKey;
use base_crypto::time::Timestamp;
use derive_where::derive_where;
use fake::Dummy;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::Hash;

/// The tag a state declares to name the contract that governs it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContractId(pub &'static str);

impl Display for ContractId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Names one output of one earlier transaction.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Dummy,
)]
pub struct StateRef {
    pub txhash: HashOutput,
    pub index: u32,
}

impl Display for StateRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.txhash, self.index)
    }
}

/// A state together with the reference that consumes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAndRef<S> {
    pub state: S,
    pub reference: StateRef,
}

impl<S: Into<LedgerState>> StateAndRef<S> {
    pub fn erase(self) -> StateAndRef<LedgerState> {
        StateAndRef {
            state: self.state.into(),
            reference: self.reference,
        }
    }
}

/// Every kind of state the ledger knows about.
///
/// States are immutable: a transaction consumes some as inputs and creates
/// new ones as outputs, and never edits one in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerState {
    Cash(cash::State),
    CommercialPaper(commercial_paper::State),
    Crowdfund(crowdfund::CampaignState),
}

impl LedgerState {
    pub fn contract(&self) -> ContractId {
        match self {
            LedgerState::Cash(_) => cash::CASH_PROGRAM_ID,
            LedgerState::CommercialPaper(_) => commercial_paper::CP_PROGRAM_ID,
            LedgerState::Crowdfund(_) => crowdfund::CROWDFUND_PROGRAM_ID,
        }
    }
}

/// A state type governed by a single contract.
pub trait ContractState: Clone + Debug + Into<LedgerState> {
    const CONTRACT: ContractId;

    fn select(state: &LedgerState) -> Option<&Self>;
}

/// A state with a single owner, who must sign to move it.
pub trait OwnableState: ContractState {
    fn owner(&self) -> &VerifyingKey;

    /// Returns the command authorising the ownership change, together with
    /// the re-owned state.
    fn with_new_owner(&self, new_owner: VerifyingKey) -> (CommandData, Self);
}

/// Command payloads of every contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandData {
    Cash(cash::Commands),
    CommercialPaper(commercial_paper::Commands),
    Crowdfund(crowdfund::Commands),
}

/// A command payload of a single contract's command family.
pub trait ContractCommand: Debug {
    const CONTRACT: ContractId;

    fn select(data: &CommandData) -> Option<&Self>;
}

/// A command, with the keys that signed it.
///
/// Signature checking happens before verification; `signers` is the already
/// verified set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub data: CommandData,
    pub signers: Vec<VerifyingKey>,
}

impl Command {
    pub fn new(data: impl Into<CommandData>, signers: impl IntoIterator<Item = VerifyingKey>) -> Self {
        Command {
            data: data.into(),
            signers: signers.into_iter().collect(),
        }
    }
}

/// A typed view of a command of the contract family `C`.
#[derive(Debug)]
#[derive_where(Clone, Copy)]
pub struct AuthenticatedCommand<'a, C> {
    pub value: &'a C,
    pub signers: &'a [VerifyingKey],
}

impl<C> AuthenticatedCommand<'_, C> {
    pub fn signed_by(&self, key: &VerifyingKey) -> bool {
        self.signers.contains(key)
    }

    pub fn signed_by_all<'k>(&self, mut keys: impl Iterator<Item = &'k VerifyingKey>) -> bool {
        keys.all(|key| self.signed_by(key))
    }
}

/// The read-only envelope handed to contracts: resolved inputs, proposed
/// outputs, commands with their signers, and the attested time, if any.
///
/// Any notion of "now" comes from `timestamp`; any uniqueness nonce comes from
/// command data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionForVerification {
    pub id: HashOutput,
    pub inputs: Vec<LedgerState>,
    pub outputs: Vec<LedgerState>,
    pub commands: Vec<Command>,
    pub timestamp: Option<Timestamp>,
}

impl TransactionForVerification {
    pub fn inputs_of<'a, S: ContractState + 'a>(&'a self) -> impl Iterator<Item = &'a S> {
        self.inputs.iter().filter_map(S::select)
    }

    pub fn outputs_of<'a, S: ContractState + 'a>(&'a self) -> impl Iterator<Item = &'a S> {
        self.outputs.iter().filter_map(S::select)
    }

    pub fn commands_of<'a, C: ContractCommand + 'a>(
        &'a self,
    ) -> impl Iterator<Item = AuthenticatedCommand<'a, C>> {
        self.commands.iter().filter_map(|command| {
            C::select(&command.data).map(|value| AuthenticatedCommand {
                value,
                signers: &command.signers,
            })
        })
    }

    /// Partitions this transaction's states of type `S` by `key_of`.
    pub fn group_states<'a, S: ContractState + 'a, K: Eq + Hash + Clone>(
        &'a self,
        key_of: impl Fn(&S) -> K,
    ) -> Vec<InOutGroup<'a, S, K>> {
        group_states(self.inputs_of::<S>(), self.outputs_of::<S>(), key_of)
    }

    /// A reference to this transaction's output at `index`, for use as an
    /// input of a later transaction.
    pub fn out_ref(&self, index: u32) -> Option<StateAndRef<LedgerState>> {
        self.outputs
            .get(index as usize)
            .map(|state| StateAndRef {
                state: state.clone(),
                reference: StateRef {
                    txhash: self.id,
                    index,
                },
            })
    }

    /// Like [`Self::out_ref`], but only if the output is an `S`.
    pub fn out_ref_of<S: ContractState>(&self, index: u32) -> Option<StateAndRef<S>> {
        let erased = self.out_ref(index)?;
        S::select(&erased.state).map(|state| StateAndRef {
            state: state.clone(),
            reference: erased.reference,
        })
    }

    /// All outputs of type `S`, with their references.
    pub fn out_refs_of<S: ContractState>(&self) -> Vec<StateAndRef<S>> {
        (0..self.outputs.len() as u32)
            .filter_map(|index| self.out_ref_of(index))
            .collect()
    }
}

/// Upper bounds on the size of a transaction, keeping the work done per
/// verification bounded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLimits {
    pub max_inputs: u32,
    pub max_outputs: u32,
    pub max_commands: u32,
    pub max_signers_per_command: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParameters {
    pub limits: TransactionLimits,
}

pub const INITIAL_TRANSACTION_LIMITS: TransactionLimits = TransactionLimits {
    max_inputs: 1 << 10,
    max_outputs: 1 << 10,
    max_commands: 64,
    max_signers_per_command: 256,
};

pub const INITIAL_PARAMETERS: LedgerParameters = LedgerParameters {
    limits: INITIAL_TRANSACTION_LIMITS,
};

impl Default for LedgerParameters {
    fn default() -> Self {
        INITIAL_PARAMETERS
    }
}
