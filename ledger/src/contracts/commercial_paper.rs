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

//! Commercial paper: a promise by an issuer to pay the holder a face value
//! once the paper matures.
//!
//! A paper is issued to its issuer, may change hands any number of times, and
//! is redeemed once by being consumed against a cash payment of its face
//! value to its holder.

use crate::construct::{TransactionBuilder, generate_spend};
use crate::contracts::cash;
use crate::error::{ContractRejection, SpendError};
use crate::group::InOutGroup;
use crate::requirements::require_that;
use crate::structure::{
    AuthenticatedCommand, Command, CommandData, ContractCommand, ContractId, ContractState,
    LedgerState, OwnableState, StateAndRef, TransactionForVerification,
};
use crate::verify::{Contract, expect_single};
use base_crypto::signatures::VerifyingKey;
use base_crypto::time::Timestamp;
use coin_structure::coin::{Amount, Currency};
use coin_structure::party::PartyAndReference;
use serde::{Deserialize, Serialize};

pub const CP_PROGRAM_ID: ContractId = ContractId("commercial-paper");

/// Group checks of this contract are logged under this target.
pub const LOG_TARGET: &str = module_path!();

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub issuance: PartyAndReference,
    pub owner: VerifyingKey,
    pub face_value: Amount<Currency>,
    pub maturity_date: Timestamp,
}

/// A paper with its owner erased. Papers with equal terms are grouped
/// together, so that a move stays one group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PaperTerms {
    pub issuance: PartyAndReference,
    pub face_value: Amount<Currency>,
    pub maturity_date: Timestamp,
}

impl State {
    pub fn terms(&self) -> PaperTerms {
        PaperTerms {
            issuance: self.issuance.clone(),
            face_value: self.face_value.clone(),
            maturity_date: self.maturity_date,
        }
    }

    pub fn owned_by(&self, owner: VerifyingKey) -> State {
        State {
            owner,
            ..self.clone()
        }
    }
}

impl From<State> for LedgerState {
    fn from(state: State) -> LedgerState {
        LedgerState::CommercialPaper(state)
    }
}

impl ContractState for State {
    const CONTRACT: ContractId = CP_PROGRAM_ID;

    fn select(state: &LedgerState) -> Option<&Self> {
        match state {
            LedgerState::CommercialPaper(state) => Some(state),
            _ => None,
        }
    }
}

impl OwnableState for State {
    fn owner(&self) -> &VerifyingKey {
        &self.owner
    }

    fn with_new_owner(&self, new_owner: VerifyingKey) -> (CommandData, Self) {
        (Commands::Move.into(), self.owned_by(new_owner))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Commands {
    Issue,
    Move,
    Redeem,
}

impl From<Commands> for CommandData {
    fn from(command: Commands) -> CommandData {
        CommandData::CommercialPaper(command)
    }
}

impl ContractCommand for Commands {
    const CONTRACT: ContractId = CP_PROGRAM_ID;

    fn select(data: &CommandData) -> Option<&Self> {
        match data {
            CommandData::CommercialPaper(command) => Some(command),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct CommercialPaper;

type PaperGroup<'a> = InOutGroup<'a, State, PaperTerms>;
type PaperCommand<'a> = AuthenticatedCommand<'a, Commands>;

impl Contract for CommercialPaper {
    fn id(&self) -> ContractId {
        CP_PROGRAM_ID
    }

    fn verify(&self, tx: &TransactionForVerification) -> Result<(), ContractRejection> {
        let command = expect_single(tx.commands_of::<Commands>(), "commercial paper")?;
        for group in tx.group_states(State::terms) {
            trace!(
                issuance = %group.key.issuance,
                command = ?command.value,
                "checking commercial paper group"
            );
            match command.value {
                Commands::Issue => verify_issue(tx, &group, command)?,
                Commands::Move => verify_move(&group, command)?,
                Commands::Redeem => verify_redeem(tx, &group, command)?,
            }
        }
        Ok(())
    }
}

fn verify_issue(
    tx: &TransactionForVerification,
    group: &PaperGroup<'_>,
    command: PaperCommand<'_>,
) -> Result<(), ContractRejection> {
    let terms = &group.key;
    require_that(CP_PROGRAM_ID)
        .that("the face value is not zero", !terms.face_value.is_zero())?
        .that("can't reissue an existing state", group.inputs.is_empty())?
        .that("there is exactly one output", group.outputs.len() == 1)?
        .that("issuance must be timestamped", tx.timestamp.is_some())?
        .that(
            "output states are issued by a command signer",
            command.signed_by(&terms.issuance.party.owning_key),
        )?
        .that(
            "the maturity date is not in the past",
            tx.timestamp.is_some_and(|now| terms.maturity_date > now),
        )?;
    Ok(())
}

fn verify_move(group: &PaperGroup<'_>, command: PaperCommand<'_>) -> Result<(), ContractRejection> {
    let require = require_that(CP_PROGRAM_ID);
    let [input] = group.inputs[..] else {
        return Err(require.failed("there is exactly one input"));
    };
    require
        .that(
            "the transaction is signed by the owner of the paper",
            command.signed_by(&input.owner),
        )?
        .that("the state is propagated", group.outputs.len() == 1)?;
    Ok(())
}

fn verify_redeem(
    tx: &TransactionForVerification,
    group: &PaperGroup<'_>,
    command: PaperCommand<'_>,
) -> Result<(), ContractRejection> {
    let require = require_that(CP_PROGRAM_ID);
    let [input] = group.inputs[..] else {
        return Err(require.failed("there is exactly one input"));
    };
    let received = cash::sum_cash_by(
        tx.outputs_of::<cash::State>(),
        &input.owner,
        input.face_value.token,
    )
    .map_err(ContractRejection::arithmetic(CP_PROGRAM_ID))?;
    require
        .that("the paper must be destroyed", group.outputs.is_empty())?
        .that("redemptions must be timestamped", tx.timestamp.is_some())?
        .that(
            "the paper must have matured",
            tx.timestamp.is_some_and(|now| now > input.maturity_date),
        )?
        .that(
            "the received amount equals the face value",
            received == input.face_value,
        )?
        .that(
            "the transaction is signed by the owner of the paper",
            command.signed_by(&input.owner),
        )?;
    Ok(())
}

/// Issues a paper to its issuer. The transaction must also be timestamped
/// before `maturity_date`.
pub fn generate_issue(
    builder: &mut TransactionBuilder,
    issuance: PartyAndReference,
    face_value: Amount<Currency>,
    maturity_date: Timestamp,
) {
    let issuer = issuance.party.owning_key.clone();
    builder.add_output_state(State {
        issuance,
        owner: issuer.clone(),
        face_value,
        maturity_date,
    });
    builder.add_command(Command::new(Commands::Issue, [issuer]));
}

pub fn generate_move(
    builder: &mut TransactionBuilder,
    paper: StateAndRef<State>,
    new_owner: VerifyingKey,
) {
    let owner = paper.state.owner.clone();
    let (command, moved) = paper.state.with_new_owner(new_owner);
    builder.add_input_state(paper);
    builder.add_output_state(moved);
    builder.add_command(Command::new(command, [owner]));
}

/// Redeems `paper`, paying its face value to its holder out of `wallet`.
///
/// The holder and the owners of the cash spent must sign, and the
/// transaction must be timestamped after maturity.
pub fn generate_redeem(
    builder: &mut TransactionBuilder,
    paper: StateAndRef<State>,
    wallet: &[StateAndRef<cash::State>],
) -> Result<(), SpendError> {
    let owner = paper.state.owner.clone();
    generate_spend(builder, &paper.state.face_value, &owner, wallet, None)?;
    builder.add_input_state(paper);
    builder.add_command(Command::new(Commands::Redeem, [owner]));
    Ok(())
}
