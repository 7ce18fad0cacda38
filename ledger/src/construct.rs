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

//! Assembling transactions.
//!
//! Nothing here is consulted during verification: a [`TransactionBuilder`]
//! only produces the [`TransactionForVerification`] that verification is then
//! run on.

use crate::contracts::cash;
use crate::error::SpendError;
use crate::structure::{
    Command, LedgerState, StateAndRef, StateRef, TransactionForVerification,
};
use base_crypto::hash::{HashOutput, PersistentHashWriter};
use base_crypto::signatures::VerifyingKey;
use base_crypto::time::Timestamp;
use coin_structure::coin::{Amount, Currency};
use coin_structure::party::{Party, PartyAndReference};
use itertools::Itertools;
use rand::Rng;
use std::cmp::Reverse;
use std::collections::BTreeSet;

/// A transaction under construction.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    nonce: HashOutput,
    inputs: Vec<StateAndRef<LedgerState>>,
    outputs: Vec<LedgerState>,
    commands: Vec<Command>,
    timestamp: Option<Timestamp>,
}

impl TransactionBuilder {
    /// An empty transaction. The nonce drawn from `rng` keeps the ids of
    /// transactions without inputs distinct.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        TransactionBuilder {
            nonce: rng.r#gen(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            commands: Vec::new(),
            timestamp: None,
        }
    }

    pub fn add_input_state<S: Into<LedgerState>>(&mut self, input: StateAndRef<S>) -> &mut Self {
        self.inputs.push(input.erase());
        self
    }

    pub fn add_output_state(&mut self, output: impl Into<LedgerState>) -> &mut Self {
        self.outputs.push(output.into());
        self
    }

    /// Adds `command`. If an identical command is already present, its
    /// signers are extended instead, so a transaction never carries the same
    /// command twice.
    pub fn add_command(&mut self, command: Command) -> &mut Self {
        match self.commands.iter_mut().find(|c| c.data == command.data) {
            Some(existing) => {
                for signer in command.signers {
                    if !existing.signers.contains(&signer) {
                        existing.signers.push(signer);
                    }
                }
            }
            None => self.commands.push(command),
        }
        self
    }

    pub fn set_time(&mut self, time: Timestamp) -> &mut Self {
        self.timestamp = Some(time);
        self
    }

    pub fn inputs(&self) -> &[StateAndRef<LedgerState>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[LedgerState] {
        &self.outputs
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    /// Whether `reference` is already consumed by this transaction.
    pub fn spends(&self, reference: &StateRef) -> bool {
        self.inputs.iter().any(|i| &i.reference == reference)
    }

    /// The transaction's id, committing to the builder nonce and the inputs
    /// consumed.
    pub fn id(&self) -> HashOutput {
        let mut writer = PersistentHashWriter::new();
        writer.update(b"ashlar:transaction:");
        writer.update(&self.nonce.0);
        for input in self.inputs.iter() {
            writer.update(&input.reference.txhash.0);
            writer.update(&input.reference.index.to_le_bytes());
        }
        writer.finalize()
    }

    pub fn to_verification(&self) -> TransactionForVerification {
        TransactionForVerification {
            id: self.id(),
            inputs: self.inputs.iter().map(|i| i.state.clone()).collect(),
            outputs: self.outputs.clone(),
            commands: self.commands.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// The fragments of a cash payment: the states to consume, the states to
/// create, and the keys that must sign the `Move`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpendPlan {
    pub inputs: Vec<StateAndRef<cash::State>>,
    pub outputs: Vec<cash::State>,
    pub signers: Vec<VerifyingKey>,
}

impl SpendPlan {
    pub fn command(&self) -> Command {
        Command::new(cash::Commands::Move, self.signers.iter().cloned())
    }

    /// Adds the plan to `builder`. An empty plan adds nothing.
    pub fn apply_to(self, builder: &mut TransactionBuilder) {
        if self.inputs.is_empty() {
            return;
        }
        let command = self.command();
        for input in self.inputs {
            builder.add_input_state(input);
        }
        for output in self.outputs {
            builder.add_output_state(output);
        }
        builder.add_command(command);
    }
}

/// Selects cash from `available` to pay `target` to `to`.
///
/// Only cash in the target's currency, and, if `allowed_issuers` is given,
/// issued by one of those parties, is considered. States are taken first-fit
/// in the order given until they cover the target; the selection is not
/// optimised for fewer inputs or less change.
///
/// Each deposit drawn on produces one output to `to`. Any excess is taken
/// off the output of the last deposit drawn on, and returned in a change
/// output of that deposit, owned by the owner of the first state taken.
pub fn select_spend(
    available: &[StateAndRef<cash::State>],
    target: &Amount<Currency>,
    to: &VerifyingKey,
    allowed_issuers: Option<&BTreeSet<Party>>,
) -> Result<SpendPlan, SpendError> {
    select_payments(available, &[(to.clone(), target.clone())], allowed_issuers)
}

/// Like [`select_spend`], paying several parties in one go.
///
/// The gathered cash is pooled per deposit, in the order deposits were first
/// drawn on, and the payments are paid out of the pools in order. Whatever is
/// left in a pool returns as change. A payment lands in a single output
/// unless it straddles two pools.
pub fn select_payments(
    available: &[StateAndRef<cash::State>],
    payments: &[(VerifyingKey, Amount<Currency>)],
    allowed_issuers: Option<&BTreeSet<Party>>,
) -> Result<SpendPlan, SpendError> {
    let Some((_, first)) = payments.first() else {
        return Ok(SpendPlan::default());
    };
    let target = Amount::sum_or_zero(payments.iter().map(|(_, amount)| amount), first.token)?;

    let eligible = available
        .iter()
        .filter(|coin| is_eligible(coin, target.token, allowed_issuers));
    let mut gathered: Vec<&StateAndRef<cash::State>> = Vec::new();
    let mut gathered_amount = Amount::zero(target.token);
    for coin in eligible {
        if gathered_amount.quantity >= target.quantity {
            break;
        }
        gathered_amount = gathered_amount.checked_add(&coin.state.amount)?;
        gathered.push(coin);
    }
    if gathered_amount.quantity < target.quantity {
        let shortfall = target.checked_sub(&gathered_amount)?;
        debug!(%target, %shortfall, "insufficient balance for spend");
        return Err(SpendError::InsufficientBalance { shortfall });
    }

    let mut pools: Vec<(&PartyAndReference, Amount<Currency>)> = Vec::new();
    for coin in gathered.iter() {
        match pools.iter_mut().find(|(d, _)| **d == coin.state.deposit) {
            Some((_, pooled)) => *pooled = pooled.checked_add(&coin.state.amount)?,
            None => pools.push((&coin.state.deposit, coin.state.amount.clone())),
        }
    }

    let mut outputs: Vec<cash::State> = Vec::new();
    let mut pool = 0;
    for (payee, amount) in payments {
        let mut owed = amount.quantity;
        while owed > 0 {
            let Some((deposit, left)) = pools.get_mut(pool) else {
                break;
            };
            let take = owed.min(left.quantity);
            owed -= take;
            left.quantity -= take;
            if left.is_zero() {
                pool += 1;
            }
            if take == 0 {
                continue;
            }
            match outputs
                .last_mut()
                .filter(|o| o.deposit == **deposit && &o.owner == payee)
            {
                Some(output) => output.amount.quantity += take,
                None => outputs.push(cash::State::new(
                    (*deposit).clone(),
                    Amount::new(take, target.token),
                    payee.clone(),
                )),
            }
        }
    }
    if let Some(first) = gathered.first() {
        for (deposit, left) in pools.into_iter().filter(|(_, left)| !left.is_zero()) {
            outputs.push(cash::State::new(
                deposit.clone(),
                left,
                first.state.owner.clone(),
            ));
        }
    }

    let signers = gathered
        .iter()
        .map(|coin| coin.state.owner.clone())
        .unique()
        .collect::<Vec<_>>();
    trace!(
        inputs = gathered.len(),
        outputs = outputs.len(),
        "selected cash for spend"
    );
    Ok(SpendPlan {
        inputs: gathered.into_iter().cloned().collect(),
        outputs,
        signers,
    })
}

fn is_eligible(
    coin: &StateAndRef<cash::State>,
    token: Currency,
    allowed_issuers: Option<&BTreeSet<Party>>,
) -> bool {
    coin.state.amount.token == token
        && !coin.state.amount.is_zero()
        && allowed_issuers.is_none_or(|issuers| issuers.contains(&coin.state.deposit.party))
}

/// Like [`select_payments`], but every payment lands in an output of its own,
/// drawn from a single deposit, so each payment can be matched to exactly one
/// output.
///
/// Payments are assigned largest first, each to the deposit with the least
/// left that still covers it. Each deposit is then drawn on first-fit for the
/// payments assigned to it, and its excess returns as change owned by the
/// owner of the first state taken. Outputs keep the order of `payments`
/// within a deposit. Fails with [`SpendError::Fragmented`] if no deposit has
/// enough left for a payment, even when the total would suffice.
pub fn select_separate_payments(
    available: &[StateAndRef<cash::State>],
    payments: &[(VerifyingKey, Amount<Currency>)],
    allowed_issuers: Option<&BTreeSet<Party>>,
) -> Result<SpendPlan, SpendError> {
    let Some((_, first)) = payments.first() else {
        return Ok(SpendPlan::default());
    };
    let token = first.token;
    let target = Amount::sum_or_zero(payments.iter().map(|(_, amount)| amount), token)?;

    let mut deposits: Vec<Deposit<'_>> = Vec::new();
    for coin in available
        .iter()
        .filter(|coin| is_eligible(coin, token, allowed_issuers))
    {
        match deposits
            .iter_mut()
            .find(|d| *d.deposit == coin.state.deposit)
        {
            Some(d) => {
                d.unassigned = d.unassigned.checked_add(&coin.state.amount)?;
                d.coins.push(coin);
            }
            None => deposits.push(Deposit {
                deposit: &coin.state.deposit,
                coins: vec![coin],
                unassigned: coin.state.amount.clone(),
                payments: Vec::new(),
            }),
        }
    }
    let held = Amount::sum_or_zero(deposits.iter().map(|d| &d.unassigned), token)?;
    if held.quantity < target.quantity {
        let shortfall = target.checked_sub(&held)?;
        debug!(%target, %shortfall, "insufficient balance for separate payments");
        return Err(SpendError::InsufficientBalance { shortfall });
    }

    let mut largest_first = (0..payments.len())
        .filter(|i| !payments[*i].1.is_zero())
        .collect::<Vec<_>>();
    largest_first.sort_by_key(|i| Reverse(payments[*i].1.quantity));
    for i in largest_first {
        let amount = &payments[i].1;
        let Some(d) = deposits
            .iter_mut()
            .filter(|d| d.unassigned.quantity >= amount.quantity)
            .min_by_key(|d| d.unassigned.quantity)
        else {
            debug!(payment = %amount, "no single deposit covers payment");
            return Err(SpendError::Fragmented {
                payment: amount.clone(),
            });
        };
        d.unassigned = d.unassigned.checked_sub(amount)?;
        d.payments.push(i);
    }

    let mut gathered: Vec<&StateAndRef<cash::State>> = Vec::new();
    let mut outputs: Vec<cash::State> = Vec::new();
    let mut change: Vec<(&PartyAndReference, Amount<Currency>)> = Vec::new();
    for d in deposits.iter_mut().filter(|d| !d.payments.is_empty()) {
        d.payments.sort_unstable();
        let owed = Amount::sum_or_zero(d.payments.iter().map(|i| &payments[*i].1), token)?;
        let mut taken = Amount::zero(token);
        for &coin in d.coins.iter() {
            if taken.quantity >= owed.quantity {
                break;
            }
            taken = taken.checked_add(&coin.state.amount)?;
            gathered.push(coin);
        }
        for (payee, amount) in d.payments.iter().map(|i| &payments[*i]) {
            outputs.push(cash::State::new(
                d.deposit.clone(),
                amount.clone(),
                payee.clone(),
            ));
        }
        let left = taken.checked_sub(&owed)?;
        if !left.is_zero() {
            change.push((d.deposit, left));
        }
    }
    if let Some(first) = gathered.first() {
        for (deposit, left) in change {
            outputs.push(cash::State::new(
                deposit.clone(),
                left,
                first.state.owner.clone(),
            ));
        }
    }

    let signers = gathered
        .iter()
        .map(|coin| coin.state.owner.clone())
        .unique()
        .collect::<Vec<_>>();
    trace!(
        inputs = gathered.len(),
        outputs = outputs.len(),
        "selected cash for separate payments"
    );
    Ok(SpendPlan {
        inputs: gathered.into_iter().cloned().collect(),
        outputs,
        signers,
    })
}

/// The eligible coins of one deposit, and the indices of the payments
/// assigned to it.
struct Deposit<'a> {
    deposit: &'a PartyAndReference,
    coins: Vec<&'a StateAndRef<cash::State>>,
    unassigned: Amount<Currency>,
    payments: Vec<usize>,
}

/// Pays `amount` to `to` out of `available`, skipping anything
/// `builder` already consumes.
pub fn generate_spend(
    builder: &mut TransactionBuilder,
    amount: &Amount<Currency>,
    to: &VerifyingKey,
    available: &[StateAndRef<cash::State>],
    allowed_issuers: Option<&BTreeSet<Party>>,
) -> Result<(), SpendError> {
    generate_payments(
        builder,
        &[(to.clone(), amount.clone())],
        available,
        allowed_issuers,
    )
}

/// Like [`generate_spend`], paying several parties in one go.
pub fn generate_payments(
    builder: &mut TransactionBuilder,
    payments: &[(VerifyingKey, Amount<Currency>)],
    available: &[StateAndRef<cash::State>],
    allowed_issuers: Option<&BTreeSet<Party>>,
) -> Result<(), SpendError> {
    let unspent = available
        .iter()
        .filter(|coin| !builder.spends(&coin.reference))
        .cloned()
        .collect::<Vec<_>>();
    select_payments(&unspent, payments, allowed_issuers)?.apply_to(builder);
    Ok(())
}

/// Like [`generate_payments`], with one output per payment as in
/// [`select_separate_payments`].
pub fn generate_separate_payments(
    builder: &mut TransactionBuilder,
    payments: &[(VerifyingKey, Amount<Currency>)],
    available: &[StateAndRef<cash::State>],
    allowed_issuers: Option<&BTreeSet<Party>>,
) -> Result<(), SpendError> {
    let unspent = available
        .iter()
        .filter(|coin| !builder.spends(&coin.reference))
        .cloned()
        .collect::<Vec<_>>();
    select_separate_payments(&unspent, payments, allowed_issuers)?.apply_to(builder);
    Ok(())
}
