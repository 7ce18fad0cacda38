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

use crate::construct::TransactionBuilder;
use crate::contracts::cash;
use crate::error::ContractRejection;
use crate::structure::{
    Command, CommandData, ContractState, INITIAL_PARAMETERS, LedgerState, StateAndRef, StateRef,
    TransactionForVerification,
};
use crate::verify::Verifier;
use base_crypto::signatures::{SigningKey, VerifyingKey};
use base_crypto::time::{Duration, Timestamp};
use coin_structure::coin::{Amount, Currency};
use coin_structure::party::{Party, PartyAndReference};
use fake::faker::company::en::CompanyName;
use fake::{Fake, Faker};
use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// A deterministic key, distinct for each seed.
pub fn test_key(seed: u64) -> VerifyingKey {
    SigningKey::sample(StdRng::seed_from_u64(seed)).verifying_key()
}

lazy_static! {
    pub static ref MEGA_CORP: Party = Party::new("MegaCorp", test_key(1));
    pub static ref MINI_CORP: Party = Party::new("MiniCorp", test_key(2));
    pub static ref ALICE: VerifyingKey = test_key(3);
    pub static ref BOB: VerifyingKey = test_key(4);
    pub static ref CHARLIE: VerifyingKey = test_key(5);
    /// A deposit at MegaCorp.
    pub static ref DUMMY_DEPOSIT: PartyAndReference = MEGA_CORP.reference([1u8]);
    /// Noon on 1 January 2025.
    pub static ref TEST_TIME: Timestamp = Timestamp::from_secs(1_735_732_800);
}

pub fn random_ref<R: Rng + ?Sized>(rng: &mut R) -> StateRef {
    Faker.fake_with_rng(rng)
}

/// A party with a made up company name and a fresh key.
pub fn random_party<R: Rng + ?Sized>(rng: &mut R) -> Party {
    let name: String = CompanyName().fake_with_rng(rng);
    Party::new(name, rng.r#gen())
}

/// Gives each state a fresh reference, as if it were an output of some
/// earlier transaction.
pub fn with_refs<R: Rng + ?Sized, S>(
    rng: &mut R,
    states: impl IntoIterator<Item = S>,
) -> Vec<StateAndRef<S>> {
    states
        .into_iter()
        .map(|state| StateAndRef {
            state,
            reference: random_ref(rng),
        })
        .collect()
}

/// Cash of `amounts`, all at `deposit` and owned by `owner`.
pub fn cash_wallet<R: Rng + ?Sized>(
    rng: &mut R,
    deposit: &PartyAndReference,
    amounts: impl IntoIterator<Item = Amount<Currency>>,
    owner: &VerifyingKey,
) -> Vec<StateAndRef<cash::State>> {
    let states = amounts
        .into_iter()
        .map(|amount| cash::State::new(deposit.clone(), amount, owner.clone()))
        .collect::<Vec<_>>();
    with_refs(rng, states)
}

pub fn command(data: impl Into<CommandData>, signers: &[&VerifyingKey]) -> Command {
    Command::new(data, signers.iter().map(|k| (*k).clone()))
}

/// A transaction made up directly of its parts, for contract tests that do
/// not go through a builder.
pub fn tfv(
    inputs: Vec<LedgerState>,
    outputs: Vec<LedgerState>,
    commands: Vec<Command>,
    timestamp: Option<Timestamp>,
) -> TransactionForVerification {
    TransactionForVerification {
        id: Faker.fake(),
        inputs,
        outputs,
        commands,
        timestamp,
    }
}

/// Asserts that `result` is a failed requirement with exactly `clause`.
#[track_caller]
pub fn assert_rejected_with(result: Result<(), ContractRejection>, clause: &str) {
    match result {
        Err(ContractRejection::Requirement { clause: found, .. }) => assert_eq!(found, clause),
        other => panic!("expected rejection with {clause:?}, got {other:?}"),
    }
}

/// A ledger for tests: the set of unspent states and the current time,
/// advanced by verified transactions.
pub struct TestState {
    pub rng: StdRng,
    pub time: Timestamp,
    pub unspent: BTreeMap<StateRef, LedgerState>,
    pub verifier: Verifier,
}

impl TestState {
    pub fn new(seed: u64) -> Self {
        TestState {
            rng: StdRng::seed_from_u64(seed),
            time: *TEST_TIME,
            unspent: BTreeMap::new(),
            verifier: Verifier::with_standard_contracts(INITIAL_PARAMETERS),
        }
    }

    /// A fresh builder, timestamped at the current time.
    pub fn builder(&mut self) -> TransactionBuilder {
        let mut builder = TransactionBuilder::new(&mut self.rng);
        builder.set_time(self.time);
        builder
    }

    pub fn fast_forward(&mut self, dur: Duration) {
        self.time = self.time + dur;
    }

    /// Verifies the built transaction and, if it is accepted, consumes its
    /// inputs and records its outputs.
    ///
    /// Panics if an input is not unspent; double spends are not this
    /// engine's to catch, and a test producing one is broken.
    pub fn apply(
        &mut self,
        builder: &TransactionBuilder,
    ) -> Result<TransactionForVerification, ContractRejection> {
        for input in builder.inputs() {
            assert_eq!(
                self.unspent.get(&input.reference),
                Some(&input.state),
                "input {} is not unspent",
                input.reference
            );
        }
        let tx = builder.to_verification();
        self.verifier.verify(&tx)?;
        for input in builder.inputs() {
            self.unspent.remove(&input.reference);
        }
        for index in 0..tx.outputs.len() as u32 {
            if let Some(output) = tx.out_ref(index) {
                self.unspent.insert(output.reference, output.state);
            }
        }
        Ok(tx)
    }

    #[track_caller]
    pub fn assert_apply(&mut self, builder: &TransactionBuilder) -> TransactionForVerification {
        match self.apply(builder) {
            Ok(tx) => tx,
            Err(e) => panic!("transaction was rejected: {e}"),
        }
    }

    pub fn unspent_of<S: ContractState>(&self) -> Vec<StateAndRef<S>> {
        self.unspent
            .iter()
            .filter_map(|(reference, state)| {
                S::select(state).map(|state| StateAndRef {
                    state: state.clone(),
                    reference: *reference,
                })
            })
            .collect()
    }

    /// The unspent cash owned by `owner`.
    pub fn cash_of(&self, owner: &VerifyingKey) -> Vec<StateAndRef<cash::State>> {
        self.unspent_of::<cash::State>()
            .into_iter()
            .filter(|coin| &coin.state.owner == owner)
            .collect()
    }

    /// Issues `amount` at `deposit` to `owner`, returning the new state.
    pub fn issue_cash(
        &mut self,
        deposit: &PartyAndReference,
        amount: Amount<Currency>,
        owner: &VerifyingKey,
    ) -> StateAndRef<cash::State> {
        let mut builder = self.builder();
        cash::generate_issue(
            &mut builder,
            &mut self.rng,
            &amount.issued_by(deposit.clone()),
            owner.clone(),
        );
        let tx = self.assert_apply(&builder);
        let issued = tx.out_ref_of::<cash::State>(0);
        match issued {
            Some(issued) => issued,
            None => panic!("issuance produced no cash"),
        }
    }
}
