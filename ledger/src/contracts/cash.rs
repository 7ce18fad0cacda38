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

//! Fungible cash, backed by deposits at an issuer.
//!
//! Cash states of the same deposit and currency are interchangeable. Value in
//! such a group is conserved by every transaction, except that an `Issue`
//! signed by the issuer creates it and an `Exit` signed by the issuer
//! destroys it.

use crate::construct::TransactionBuilder;
use crate::error::{ContractRejection, SpendError};
use crate::group::InOutGroup;
use crate::requirements::require_that;
use crate::structure::{
    AuthenticatedCommand, Command, CommandData, ContractCommand, ContractId, ContractState,
    LedgerState, OwnableState, StateAndRef, TransactionForVerification,
};
use crate::verify::{Contract, expect_at_most_one, expect_single};
use base_crypto::signatures::VerifyingKey;
use coin_structure::coin::{Amount, AmountError, Currency, Issued};
use coin_structure::party::PartyAndReference;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const CASH_PROGRAM_ID: ContractId = ContractId("cash");

/// Group checks of this contract are logged under this target.
pub const LOG_TARGET: &str = module_path!();

/// An amount of currency owned by `owner`, redeemable at `deposit`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub deposit: PartyAndReference,
    pub amount: Amount<Currency>,
    pub owner: VerifyingKey,
}

impl State {
    pub fn new(deposit: PartyAndReference, amount: Amount<Currency>, owner: VerifyingKey) -> Self {
        State {
            deposit,
            amount,
            owner,
        }
    }

    /// What this cash is, ignoring who owns it and how much there is. This is
    /// the grouping key: states with equal definitions are fungible.
    pub fn issuance_def(&self) -> Issued<Currency> {
        Issued {
            issuer: self.deposit.clone(),
            product: self.amount.token,
        }
    }

    pub fn issued_amount(&self) -> Amount<Issued<Currency>> {
        self.amount.issued_by(self.deposit.clone())
    }

    pub fn owned_by(&self, owner: VerifyingKey) -> State {
        State {
            owner,
            ..self.clone()
        }
    }

    pub fn issued_by(&self, deposit: PartyAndReference) -> State {
        State {
            deposit,
            ..self.clone()
        }
    }
}

impl From<State> for LedgerState {
    fn from(state: State) -> LedgerState {
        LedgerState::Cash(state)
    }
}

impl ContractState for State {
    const CONTRACT: ContractId = CASH_PROGRAM_ID;

    fn select(state: &LedgerState) -> Option<&Self> {
        match state {
            LedgerState::Cash(state) => Some(state),
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
    /// Creates cash on the issuer's signature. The nonce keeps otherwise
    /// identical issuances distinct, and is never zero.
    Issue { nonce: u64 },
    /// Moves cash between owners, on every input owner's signature.
    Move,
    /// Destroys `amount` of one issuance, on the issuer's signature.
    Exit { amount: Amount<Issued<Currency>> },
}

impl From<Commands> for CommandData {
    fn from(command: Commands) -> CommandData {
        CommandData::Cash(command)
    }
}

impl ContractCommand for Commands {
    const CONTRACT: ContractId = CASH_PROGRAM_ID;

    fn select(data: &CommandData) -> Option<&Self> {
        match data {
            CommandData::Cash(command) => Some(command),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Cash;

impl Contract for Cash {
    fn id(&self) -> ContractId {
        CASH_PROGRAM_ID
    }

    fn verify(&self, tx: &TransactionForVerification) -> Result<(), ContractRejection> {
        let issues = tx
            .commands_of::<Commands>()
            .filter(|c| matches!(c.value, Commands::Issue { .. }))
            .collect::<Vec<_>>();
        for group in tx.group_states(State::issuance_def) {
            trace!(
                deposit = %group.key.issuer,
                currency = %group.key.product,
                inputs = group.inputs.len(),
                outputs = group.outputs.len(),
                "checking cash group"
            );
            let issuer = &group.key.issuer.party.owning_key;
            match issues.as_slice() {
                [issue] if !group.outputs.is_empty() && issue.signed_by(issuer) => {
                    verify_issue(&group, issue)?
                }
                _ => verify_move(tx, &group)?,
            }
        }
        Ok(())
    }
}

type CashGroup<'a> = InOutGroup<'a, State, Issued<Currency>>;

fn verify_issue(
    group: &CashGroup<'_>,
    issue: &AuthenticatedCommand<'_, Commands>,
) -> Result<(), ContractRejection> {
    let nonce = match issue.value {
        Commands::Issue { nonce } => *nonce,
        _ => 0,
    };
    require_that(CASH_PROGRAM_ID)
        .that(
            "there are no inputs in an issuance group",
            group.inputs.is_empty(),
        )?
        .that("the issue command has a nonce", nonce != 0)?
        .that(
            "there are no zero sized outputs",
            group.outputs.iter().all(|s| !s.amount.is_zero()),
        )?;
    Ok(())
}

fn verify_move(
    tx: &TransactionForVerification,
    group: &CashGroup<'_>,
) -> Result<(), ContractRejection> {
    let currency = group.key.product;
    let issuer = &group.key.issuer.party.owning_key;
    let require = require_that(CASH_PROGRAM_ID)
        .that(
            "there is at least one cash input for this group",
            !group.inputs.is_empty(),
        )?
        .that(
            "there are no zero sized inputs",
            group.inputs.iter().all(|s| !s.amount.is_zero()),
        )?
        .that(
            "there are no zero sized outputs",
            group.outputs.iter().all(|s| !s.amount.is_zero()),
        )?
        .that(
            "all outputs are in the input currency",
            group.outputs.iter().all(|s| s.amount.token == currency),
        )?;

    let exit = expect_at_most_one(
        tx.commands_of::<Commands>().filter(|c| {
            matches!(c.value, Commands::Exit { amount } if amount.token == group.key)
                && c.signed_by(issuer)
        }),
        "Exit",
    )?;
    let exited = match exit.map(|c| c.value) {
        Some(Commands::Exit { amount }) => amount.without_issuer(),
        _ => Amount::zero(currency),
    };

    let inputs = Amount::sum_or_zero(group.inputs.iter().map(|s| &s.amount), currency)
        .map_err(ContractRejection::arithmetic(CASH_PROGRAM_ID))?;
    let outputs = Amount::sum_or_zero(group.outputs.iter().map(|s| &s.amount), currency)
        .map_err(ContractRejection::arithmetic(CASH_PROGRAM_ID))?;
    let accounted = outputs
        .checked_add(&exited)
        .map_err(ContractRejection::arithmetic(CASH_PROGRAM_ID))?;
    let require = require.that_with(
        || format!("the amounts balance for deposit {}", group.key.issuer),
        inputs == accounted,
    )?;

    let movement = expect_single(
        tx.commands_of::<Commands>()
            .filter(|c| matches!(c.value, Commands::Move)),
        "Move",
    )?;
    require.that(
        "the owning keys are a subset of the signing keys",
        movement.signed_by_all(group.inputs.iter().map(|s| &s.owner)),
    )?;
    Ok(())
}

/// Sums cash of a single currency, regardless of issuer. `None` if there
/// is no cash at all.
pub fn sum_cash<'a>(
    states: impl IntoIterator<Item = &'a State>,
) -> Result<Option<Amount<Currency>>, AmountError> {
    Amount::sum_or_none(states.into_iter().map(|s| &s.amount))
}

/// Sums the `currency` cash owned by `owner`, regardless of issuer.
pub fn sum_cash_by<'a>(
    states: impl IntoIterator<Item = &'a State>,
    owner: &VerifyingKey,
    currency: Currency,
) -> Result<Amount<Currency>, AmountError> {
    Amount::sum_or_zero(
        states
            .into_iter()
            .filter(|s| &s.owner == owner && s.amount.token == currency)
            .map(|s| &s.amount),
        currency,
    )
}

/// The balance per currency of a wallet, regardless of issuer.
pub fn cash_balances<'a>(
    states: impl IntoIterator<Item = &'a State>,
) -> Result<BTreeMap<Currency, Amount<Currency>>, AmountError> {
    let mut balances: BTreeMap<Currency, Amount<Currency>> = BTreeMap::new();
    for state in states {
        let token = state.amount.token;
        let balance = balances.entry(token).or_insert(Amount::zero(token));
        *balance = balance.checked_add(&state.amount)?;
    }
    Ok(balances)
}

/// Issues `amount` to `owner`. The issuer named by `amount` must sign.
pub fn generate_issue<R: Rng + ?Sized>(
    builder: &mut TransactionBuilder,
    rng: &mut R,
    amount: &Amount<Issued<Currency>>,
    owner: VerifyingKey,
) {
    let nonce = rng.gen_range(1..=u64::MAX);
    let deposit = amount.token.issuer.clone();
    let issuer = deposit.party.owning_key.clone();
    builder.add_output_state(State::new(deposit, amount.without_issuer(), owner));
    builder.add_command(Command::new(Commands::Issue { nonce }, [issuer]));
}

/// Removes `amount` from the ledger, consuming cash of exactly that issuance
/// from `available` and returning any change to the first owner consumed.
///
/// Both the issuer and the owners of the consumed cash must sign.
pub fn generate_exit(
    builder: &mut TransactionBuilder,
    amount: &Amount<Issued<Currency>>,
    available: &[StateAndRef<State>],
) -> Result<(), SpendError> {
    let wanted = amount.without_issuer();
    let mut gathered: Vec<&StateAndRef<State>> = Vec::new();
    let mut total = Amount::zero(wanted.token);
    for coin in available
        .iter()
        .filter(|c| c.state.issuance_def() == amount.token && !builder.spends(&c.reference))
    {
        if total.quantity >= wanted.quantity {
            break;
        }
        total = total.checked_add(&coin.state.amount)?;
        gathered.push(coin);
    }
    if total.quantity < wanted.quantity {
        return Err(SpendError::InsufficientBalance {
            shortfall: wanted.checked_sub(&total)?,
        });
    }
    let change = total.checked_sub(&wanted)?;

    let mut owners = BTreeSet::new();
    for coin in gathered.iter() {
        owners.insert(coin.state.owner.clone());
        builder.add_input_state((*coin).clone());
    }
    if let Some(first) = gathered.first().filter(|_| !change.is_zero()) {
        builder.add_output_state(State::new(
            amount.token.issuer.clone(),
            change,
            first.state.owner.clone(),
        ));
    }
    builder.add_command(Command::new(
        Commands::Exit {
            amount: amount.clone(),
        },
        [amount.token.issuer.party.owning_key.clone()],
    ));
    builder.add_command(Command::new(Commands::Move, owners));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coin_structure::coin::{dollars, pennies};
    use coin_structure::party::Party;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn wallet(rng: &mut StdRng) -> (VerifyingKey, Vec<State>) {
        let bank = Party::new("Mega Bank", rng.r#gen());
        let owner: VerifyingKey = rng.r#gen();
        let other: VerifyingKey = rng.r#gen();
        let states = vec![
            State::new(bank.reference([1u8]), dollars(100), owner.clone()),
            State::new(bank.reference([2u8]), dollars(50), owner.clone()),
            State::new(bank.reference([1u8]), pennies(700, Currency::GBP), owner.clone()),
            State::new(bank.reference([1u8]), dollars(1000), other),
        ];
        (owner, states)
    }

    #[test]
    fn cash_is_summed_across_deposits() {
        let mut rng = StdRng::seed_from_u64(0x42);
        let (owner, states) = wallet(&mut rng);
        assert_eq!(
            sum_cash_by(&states, &owner, Currency::USD).unwrap(),
            dollars(150)
        );
        assert_eq!(
            sum_cash_by(&states, &rng.r#gen(), Currency::USD).unwrap(),
            dollars(0)
        );
        assert_eq!(sum_cash(&states[..2]).unwrap(), Some(dollars(150)));
        assert_eq!(sum_cash(&[]).unwrap(), None);
        assert_eq!(sum_cash(&states[..3]), Err(AmountError::TokenMismatch));
    }

    #[test]
    fn balances_are_per_currency() {
        let mut rng = StdRng::seed_from_u64(0x42);
        let (_, states) = wallet(&mut rng);
        let balances = cash_balances(&states).unwrap();
        assert_eq!(
            balances.into_iter().collect::<Vec<_>>(),
            vec![
                (Currency::GBP, pennies(700, Currency::GBP)),
                (Currency::USD, dollars(1150)),
            ]
        );
    }

    #[test]
    fn reowning_keeps_the_issuance() {
        let mut rng = StdRng::seed_from_u64(0x42);
        let (_, states) = wallet(&mut rng);
        let new_owner: VerifyingKey = rng.r#gen();
        let (command, moved) = states[0].with_new_owner(new_owner.clone());
        assert_eq!(command, CommandData::Cash(Commands::Move));
        assert_eq!(moved.owner, new_owner);
        assert_eq!(moved.issuance_def(), states[0].issuance_def());
        assert_eq!(moved.issued_amount(), states[0].issued_amount());
        assert_ne!(states[0].issuance_def(), states[1].issuance_def());
    }
}
