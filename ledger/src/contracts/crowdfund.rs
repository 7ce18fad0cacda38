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

//! Crowdfunding campaigns.
//!
//! A campaign is registered with a target and a closing time, collects
//! pledges until it closes, and is then closed either as funded, or as
//! unfunded with every pledge refunded in the closing transaction. Each step
//! consumes the previous version of the campaign and produces the next.

use crate::construct::{TransactionBuilder, generate_separate_payments, generate_spend};
use crate::contracts::cash;
use crate::error::{ContractRejection, SpendError};
use crate::group::InOutGroup;
use crate::requirements::{Requirements, require_that};
use crate::structure::{
    AuthenticatedCommand, Command, CommandData, ContractCommand, ContractId, ContractState,
    LedgerState, StateAndRef, TransactionForVerification,
};
use crate::verify::{Contract, expect_single};
use base_crypto::signatures::VerifyingKey;
use base_crypto::time::Timestamp;
use coin_structure::coin::{Amount, Currency};
use serde::{Deserialize, Serialize};

pub const CROWDFUND_PROGRAM_ID: ContractId = ContractId("crowdfund");

/// Group checks of this contract are logged under this target.
pub const LOG_TARGET: &str = module_path!();

/// The fixed terms of a campaign.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Campaign {
    pub owner: VerifyingKey,
    pub name: String,
    pub target: Amount<Currency>,
    pub closing_time: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pledge {
    pub owner: VerifyingKey,
    pub amount: Amount<Currency>,
}

/// One version of a campaign. `pledged_amount` and `pledge_count` are kept
/// equal to the total and number of `pledges`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignState {
    pub campaign: Campaign,
    pub closed: bool,
    pub pledged_amount: Amount<Currency>,
    pub pledge_count: u32,
    pub pledges: Vec<Pledge>,
}

impl CampaignState {
    /// A freshly registered campaign, with nothing pledged.
    pub fn new(campaign: Campaign) -> Self {
        let pledged_amount = Amount::zero(campaign.target.token);
        CampaignState {
            campaign,
            closed: false,
            pledged_amount,
            pledge_count: 0,
            pledges: Vec::new(),
        }
    }

    /// Campaigns are identified by owner and name across versions.
    pub fn key(&self) -> (VerifyingKey, String) {
        (self.campaign.owner.clone(), self.campaign.name.clone())
    }

    pub fn is_funded(&self) -> bool {
        self.pledged_amount >= self.campaign.target
    }

    fn unchanged_but_closed(&self, next: &CampaignState) -> bool {
        next.campaign == self.campaign
            && next.pledged_amount == self.pledged_amount
            && next.pledge_count == self.pledge_count
            && next.pledges == self.pledges
    }
}

impl From<CampaignState> for LedgerState {
    fn from(state: CampaignState) -> LedgerState {
        LedgerState::Crowdfund(state)
    }
}

impl ContractState for CampaignState {
    const CONTRACT: ContractId = CROWDFUND_PROGRAM_ID;

    fn select(state: &LedgerState) -> Option<&Self> {
        match state {
            LedgerState::Crowdfund(state) => Some(state),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Commands {
    Register,
    Fund,
    Funded,
    Unfunded,
}

impl From<Commands> for CommandData {
    fn from(command: Commands) -> CommandData {
        CommandData::Crowdfund(command)
    }
}

impl ContractCommand for Commands {
    const CONTRACT: ContractId = CROWDFUND_PROGRAM_ID;

    fn select(data: &CommandData) -> Option<&Self> {
        match data {
            CommandData::Crowdfund(command) => Some(command),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Crowdfund;

type CampaignGroup<'a> = InOutGroup<'a, CampaignState, (VerifyingKey, String)>;
type CampaignCommand<'a> = AuthenticatedCommand<'a, Commands>;

impl Contract for Crowdfund {
    fn id(&self) -> ContractId {
        CROWDFUND_PROGRAM_ID
    }

    fn verify(&self, tx: &TransactionForVerification) -> Result<(), ContractRejection> {
        let command = expect_single(tx.commands_of::<Commands>(), "crowdfund")?;
        for group in tx.group_states(CampaignState::key) {
            trace!(
                campaign = %group.key.1,
                command = ?command.value,
                "checking campaign group"
            );
            match command.value {
                Commands::Register => verify_register(tx, &group, command)?,
                Commands::Fund => verify_fund(tx, &group, command)?,
                Commands::Funded => verify_funded(tx, &group)?,
                Commands::Unfunded => verify_unfunded(tx, &group)?,
            }
        }
        Ok(())
    }
}

/// The single input and output version of a campaign.
fn transition<'a>(
    require: Requirements,
    group: &CampaignGroup<'a>,
) -> Result<(&'a CampaignState, &'a CampaignState), ContractRejection> {
    match (&group.inputs[..], &group.outputs[..]) {
        ([input], [output]) => Ok((*input, *output)),
        _ => Err(require.failed(
            "there is exactly one input and one output version of the campaign",
        )),
    }
}

fn verify_register(
    tx: &TransactionForVerification,
    group: &CampaignGroup<'_>,
    command: CampaignCommand<'_>,
) -> Result<(), ContractRejection> {
    let require = require_that(CROWDFUND_PROGRAM_ID)
        .that("the campaign has no input state", group.inputs.is_empty())?;
    let [output] = group.outputs[..] else {
        return Err(require.failed("the registration has exactly one output"));
    };
    let campaign = &output.campaign;
    require
        .that("the registration is not closed", !output.closed)?
        .that(
            "the registration has an empty list of pledges",
            output.pledges.is_empty(),
        )?
        .that(
            "the registration has a zero starting pledge total",
            output.pledged_amount.is_zero() && output.pledge_count == 0,
        )?
        .that(
            "the pledge total is in the target currency",
            output.pledged_amount.token == campaign.target.token,
        )?
        .that(
            "the registration has a non-zero target",
            !campaign.target.is_zero(),
        )?
        .that(
            "the registration has a name",
            !campaign.name.trim().is_empty(),
        )?
        .that("registration must be timestamped", tx.timestamp.is_some())?
        .that(
            "the closing time is in the future",
            tx.timestamp.is_some_and(|now| campaign.closing_time > now),
        )?
        .that(
            "the registration is signed by the campaign owner",
            command.signed_by(&campaign.owner),
        )?;
    Ok(())
}

fn verify_fund(
    tx: &TransactionForVerification,
    group: &CampaignGroup<'_>,
    command: CampaignCommand<'_>,
) -> Result<(), ContractRejection> {
    let require = require_that(CROWDFUND_PROGRAM_ID);
    let (input, output) = transition(require, group)?;
    let campaign = &input.campaign;
    let require = require
        .that("the campaign is still open", !input.closed && !output.closed)?
        .that("funding must be timestamped", tx.timestamp.is_some())?
        .that(
            "the closing time has not passed",
            tx.timestamp.is_some_and(|now| now <= campaign.closing_time),
        )?
        .that(
            "the campaign details are unchanged",
            output.campaign == *campaign,
        )?
        .that(
            "exactly one pledge is appended",
            output.pledges.len() == input.pledges.len() + 1
                && output.pledges.starts_with(&input.pledges),
        )?;
    let Some(pledge) = output.pledges.last() else {
        return Err(require.failed("exactly one pledge is appended"));
    };

    let total = input
        .pledged_amount
        .checked_add(&pledge.amount)
        .map_err(ContractRejection::arithmetic(CROWDFUND_PROGRAM_ID))?;
    let paid = cash::sum_cash_by(
        tx.outputs_of::<cash::State>(),
        &campaign.owner,
        campaign.target.token,
    )
    .map_err(ContractRejection::arithmetic(CROWDFUND_PROGRAM_ID))?;
    require
        .that(
            "the pledge is signed by its owner",
            command.signed_by(&pledge.owner),
        )?
        .that(
            "the pledge is in the target currency",
            pledge.amount.token == campaign.target.token,
        )?
        .that("the pledge is not zero", !pledge.amount.is_zero())?
        .that("the pledge total is updated", output.pledged_amount == total)?
        .that(
            "the pledge count is updated",
            u64::from(output.pledge_count) == u64::from(input.pledge_count) + 1,
        )?
        .that(
            "the pledged cash is paid to the campaign owner",
            paid == pledge.amount,
        )?;
    Ok(())
}

fn verify_closing(
    tx: &TransactionForVerification,
    input: &CampaignState,
    output: &CampaignState,
) -> Result<Requirements, ContractRejection> {
    require_that(CROWDFUND_PROGRAM_ID)
        .that("closing must be timestamped", tx.timestamp.is_some())?
        .that(
            "the closing time has passed",
            tx.timestamp
                .is_some_and(|now| now >= input.campaign.closing_time),
        )?
        .that("the input campaign is open", !input.closed)?
        .that("the output campaign is closed", output.closed)?
        .that(
            "the campaign is otherwise unchanged",
            input.unchanged_but_closed(output),
        )
}

fn verify_funded(
    tx: &TransactionForVerification,
    group: &CampaignGroup<'_>,
) -> Result<(), ContractRejection> {
    let (input, output) = transition(require_that(CROWDFUND_PROGRAM_ID), group)?;
    verify_closing(tx, input, output)?.that("the target has been met", input.is_funded())?;
    Ok(())
}

fn verify_unfunded(
    tx: &TransactionForVerification,
    group: &CampaignGroup<'_>,
) -> Result<(), ContractRejection> {
    let (input, output) = transition(require_that(CROWDFUND_PROGRAM_ID), group)?;
    let require = verify_closing(tx, input, output)?
        .that("the target has not been met", !input.is_funded())?;

    // Each cash output refunds at most one pledge.
    let mut unmatched = tx.outputs_of::<cash::State>().collect::<Vec<_>>();
    let mut refunds = Vec::new();
    let all_refunded = input.pledges.iter().all(|pledge| {
        match unmatched
            .iter()
            .position(|r| r.owner == pledge.owner && r.amount == pledge.amount)
        {
            Some(i) => {
                refunds.push(unmatched.swap_remove(i));
                true
            }
            None => false,
        }
    });
    let refunded = Amount::sum_or_zero(
        refunds.iter().map(|r| &r.amount),
        input.campaign.target.token,
    )
    .map_err(ContractRejection::arithmetic(CROWDFUND_PROGRAM_ID))?;
    require
        .that("every pledge is refunded", all_refunded)?
        .that(
            "the refunds total the pledges",
            refunded == input.pledged_amount,
        )?;
    Ok(())
}

/// Registers a campaign. The transaction must be timestamped before
/// `campaign.closing_time`.
pub fn generate_register(builder: &mut TransactionBuilder, campaign: Campaign) {
    let owner = campaign.owner.clone();
    builder.add_output_state(CampaignState::new(campaign));
    builder.add_command(Command::new(Commands::Register, [owner]));
}

/// Pledges `amount` by `pledger`, paying it to the campaign owner out of
/// `wallet`.
pub fn generate_pledge(
    builder: &mut TransactionBuilder,
    campaign: StateAndRef<CampaignState>,
    pledger: VerifyingKey,
    amount: Amount<Currency>,
    wallet: &[StateAndRef<cash::State>],
) -> Result<(), SpendError> {
    let state = &campaign.state;
    generate_spend(builder, &amount, &state.campaign.owner, wallet, None)?;
    let mut next = state.clone();
    next.pledged_amount = next.pledged_amount.checked_add(&amount)?;
    next.pledge_count += 1;
    next.pledges.push(Pledge {
        owner: pledger.clone(),
        amount,
    });
    builder.add_input_state(campaign);
    builder.add_output_state(next);
    builder.add_command(Command::new(Commands::Fund, [pledger]));
    Ok(())
}

/// Closes a campaign after its closing time. An unfunded campaign refunds
/// every pledge out of `wallet`, which should hold the pledged cash. Each
/// refund is paid whole from a single deposit.
pub fn generate_close(
    builder: &mut TransactionBuilder,
    campaign: StateAndRef<CampaignState>,
    wallet: &[StateAndRef<cash::State>],
) -> Result<(), SpendError> {
    let state = &campaign.state;
    let command = if state.is_funded() {
        Commands::Funded
    } else {
        let refunds = state
            .pledges
            .iter()
            .map(|pledge| (pledge.owner.clone(), pledge.amount.clone()))
            .collect::<Vec<_>>();
        generate_separate_payments(builder, &refunds, wallet, None)?;
        Commands::Unfunded
    };
    let next = CampaignState {
        closed: true,
        ..state.clone()
    };
    let owner = state.campaign.owner.clone();
    builder.add_input_state(campaign);
    builder.add_output_state(next);
    builder.add_command(Command::new(command, [owner]));
    Ok(())
}
