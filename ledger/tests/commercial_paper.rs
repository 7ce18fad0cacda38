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

#![deny(warnings)]

use ashlar_ledger::contracts::cash;
use ashlar_ledger::contracts::commercial_paper::{self, CP_PROGRAM_ID, Commands, State};
use ashlar_ledger::error::ContractRejection;
use ashlar_ledger::structure::LedgerState;
use ashlar_ledger::test_utilities::{
    ALICE, BOB, DUMMY_DEPOSIT, MEGA_CORP, MINI_CORP, TEST_TIME, TestState, assert_rejected_with,
    command, tfv,
};
use ashlar_ledger::verify;
use base_crypto::signatures::VerifyingKey;
use base_crypto::time::{Duration, Timestamp};
use coin_structure::coin::{Amount, Currency, dollars, pennies};
use proptest::prelude::*;

fn paper(face_value: Amount<Currency>, maturity_date: Timestamp, owner: &VerifyingKey) -> State {
    State {
        issuance: MEGA_CORP.reference([9u8]),
        owner: owner.clone(),
        face_value,
        maturity_date,
    }
}

fn maturity() -> Timestamp {
    *TEST_TIME + Duration::from_days(30)
}

fn issuer() -> &'static VerifyingKey {
    &MEGA_CORP.owning_key
}

fn issue(state: State, signer: &VerifyingKey, at: Option<Timestamp>) -> Result<(), ContractRejection> {
    verify(&tfv(
        vec![],
        vec![state.into()],
        vec![command(Commands::Issue, &[signer])],
        at,
    ))
}

#[test]
fn issue_is_accepted() {
    let issued = paper(dollars(1000), maturity(), issuer());
    assert_eq!(issue(issued, issuer(), Some(*TEST_TIME)), Ok(()));
}

#[test]
fn issue_checks_its_terms() {
    assert_rejected_with(
        issue(paper(dollars(1000), maturity(), issuer()), issuer(), None),
        "issuance must be timestamped",
    );
    assert_rejected_with(
        issue(paper(dollars(1000), maturity(), issuer()), &ALICE, Some(*TEST_TIME)),
        "output states are issued by a command signer",
    );
    assert_rejected_with(
        issue(paper(dollars(1000), *TEST_TIME, issuer()), issuer(), Some(*TEST_TIME)),
        "the maturity date is not in the past",
    );
}

proptest! {
    #[test]
    fn zero_face_value_is_never_issued(
        signer in any::<VerifyingKey>(),
        maturity_secs in any::<u64>(),
        time in prop::option::of(any::<u64>()),
        sign_as_issuer in any::<bool>(),
    ) {
        let signer = if sign_as_issuer { issuer().clone() } else { signer };
        let result = issue(
            paper(dollars(0), Timestamp::from_secs(maturity_secs), issuer()),
            &signer,
            time.map(Timestamp::from_secs),
        );
        let rejection = result.unwrap_err();
        prop_assert_eq!(rejection.clause(), Some("the face value is not zero"));
    }
}

#[test]
fn papers_with_equal_terms_share_a_group() {
    // The grouping key ignores the owner, so two papers with equal terms are
    // one group and can't be issued together.
    let tx = tfv(
        vec![],
        vec![
            paper(dollars(1000), maturity(), issuer()).into(),
            paper(dollars(1000), maturity(), issuer()).into(),
        ],
        vec![command(Commands::Issue, &[issuer()])],
        Some(*TEST_TIME),
    );
    assert_rejected_with(verify(&tx), "there is exactly one output");

    let mut other = paper(dollars(1000), maturity(), issuer());
    other.issuance = MEGA_CORP.reference([10u8]);
    let tx = tfv(
        vec![],
        vec![paper(dollars(1000), maturity(), issuer()).into(), other.into()],
        vec![command(Commands::Issue, &[issuer()])],
        Some(*TEST_TIME),
    );
    assert_eq!(verify(&tx), Ok(()));
}

#[test]
fn moves_need_the_owner() {
    let held = paper(dollars(1000), maturity(), &ALICE);
    let moved = paper(dollars(1000), maturity(), &BOB);
    let tx = |signer: &VerifyingKey, outputs: Vec<LedgerState>| {
        tfv(
            vec![held.clone().into()],
            outputs,
            vec![command(Commands::Move, &[signer])],
            None,
        )
    };
    assert_eq!(verify(&tx(&*ALICE, vec![moved.clone().into()])), Ok(()));
    assert_rejected_with(
        verify(&tx(&*BOB, vec![moved.clone().into()])),
        "the transaction is signed by the owner of the paper",
    );
    assert_rejected_with(
        verify(&tx(&*ALICE, vec![moved.clone().into(), moved.into()])),
        "the state is propagated",
    );
}

#[test]
fn exactly_one_command_is_expected() {
    let held: LedgerState = paper(dollars(1000), maturity(), &ALICE).into();
    let moved: LedgerState = paper(dollars(1000), maturity(), &BOB).into();
    let tx = tfv(vec![held.clone()], vec![moved.clone()], vec![], None);
    assert_eq!(
        verify(&tx),
        Err(ContractRejection::MissingCommand {
            contract: CP_PROGRAM_ID,
            command: "commercial paper"
        })
    );
    let tx = tfv(
        vec![held],
        vec![moved],
        vec![
            command(Commands::Move, &[&ALICE]),
            command(Commands::Redeem, &[&ALICE]),
        ],
        None,
    );
    assert!(matches!(
        verify(&tx),
        Err(ContractRejection::AmbiguousCommand { found: 2, .. })
    ));
}

/// A redemption of a $1000 paper held by Alice, paying her `paid` out of
/// MegaCorp's $2000.
fn redemption(paid: Amount<Currency>, at: Option<Timestamp>) -> Result<(), ContractRejection> {
    let change = dollars(2000).quantity - paid.quantity;
    let mut outputs = vec![cash::State::new(DUMMY_DEPOSIT.clone(), paid, ALICE.clone()).into()];
    if change > 0 {
        outputs.push(
            cash::State::new(
                DUMMY_DEPOSIT.clone(),
                pennies(change, Currency::USD),
                issuer().clone(),
            )
            .into(),
        );
    }
    verify(&tfv(
        vec![
            paper(dollars(1000), maturity(), &ALICE).into(),
            cash::State::new(DUMMY_DEPOSIT.clone(), dollars(2000), issuer().clone()).into(),
        ],
        outputs,
        vec![
            command(Commands::Redeem, &[&ALICE]),
            command(cash::Commands::Move, &[issuer()]),
        ],
        at,
    ))
}

proptest! {
    #[test]
    fn redemption_waits_for_maturity(offset in -1_000_000i64..1_000_000) {
        let at = Timestamp::from_secs((maturity().to_secs() as i64 + offset) as u64);
        let result = redemption(dollars(1000), Some(at));
        if offset > 0 {
            prop_assert_eq!(result, Ok(()));
        } else {
            let rejection = result.unwrap_err();
            prop_assert_eq!(rejection.clause(), Some("the paper must have matured"));
        }
    }

    #[test]
    fn redemption_pays_exactly_the_face_value(paid in 1u128..200_000) {
        prop_assume!(paid != 100_000);
        let at = maturity() + Duration::from_secs(1);
        let rejection = redemption(pennies(paid, Currency::USD), Some(at)).unwrap_err();
        prop_assert_eq!(
            rejection.clause(),
            Some("the received amount equals the face value")
        );
    }
}

#[test]
fn redemption_needs_a_timestamp() {
    assert_rejected_with(
        redemption(dollars(1000), None),
        "redemptions must be timestamped",
    );
}

#[test]
fn paper_lifecycle() {
    let mut state = TestState::new(0x42);
    let mut builder = state.builder();
    commercial_paper::generate_issue(
        &mut builder,
        MEGA_CORP.reference([9u8]),
        dollars(1000),
        maturity(),
    );
    let tx = state.assert_apply(&builder);
    let issued = tx.out_ref_of::<State>(0).unwrap();

    let mut builder = state.builder();
    commercial_paper::generate_move(&mut builder, issued, ALICE.clone());
    let tx = state.assert_apply(&builder);
    let held = tx.out_ref_of::<State>(0).unwrap();
    assert_eq!(held.state.owner, *ALICE);

    state.issue_cash(&DUMMY_DEPOSIT, dollars(1500), issuer());

    let mut builder = state.builder();
    let wallet = state.cash_of(issuer());
    commercial_paper::generate_redeem(&mut builder, held.clone(), &wallet).unwrap();
    assert_rejected_with(
        state.apply(&builder).map(|_| ()),
        "the paper must have matured",
    );

    state.fast_forward(Duration::from_days(31));
    let mut builder = state.builder();
    commercial_paper::generate_redeem(&mut builder, held, &wallet).unwrap();
    state.assert_apply(&builder);

    assert!(state.unspent_of::<State>().is_empty());
    let received = state.cash_of(&ALICE);
    assert_eq!(
        cash::sum_cash(received.iter().map(|c| &c.state)),
        Ok(Some(dollars(1000)))
    );
    assert_eq!(
        cash::sum_cash_by(state.cash_of(issuer()).iter().map(|c| &c.state), issuer(), Currency::USD),
        Ok(dollars(500))
    );
}

#[test]
fn redemption_draws_on_cash_from_two_issuers() {
    let mut state = TestState::new(0x42);
    let mut builder = state.builder();
    commercial_paper::generate_issue(
        &mut builder,
        MEGA_CORP.reference([9u8]),
        dollars(1000),
        maturity(),
    );
    let tx = state.assert_apply(&builder);
    let issued = tx.out_ref_of::<State>(0).unwrap();
    let mut builder = state.builder();
    commercial_paper::generate_move(&mut builder, issued, ALICE.clone());
    let tx = state.assert_apply(&builder);
    let held = tx.out_ref_of::<State>(0).unwrap();

    // Neither deposit covers the face value alone.
    let mini = MINI_CORP.reference([1u8]);
    state.issue_cash(&DUMMY_DEPOSIT, dollars(600), issuer());
    state.issue_cash(&mini, dollars(600), issuer());

    state.fast_forward(Duration::from_days(31));
    let mut builder = state.builder();
    let wallet = state.cash_of(issuer());
    commercial_paper::generate_redeem(&mut builder, held, &wallet).unwrap();
    state.assert_apply(&builder);

    let received = state.cash_of(&ALICE);
    assert_eq!(
        cash::sum_cash(received.iter().map(|c| &c.state)),
        Ok(Some(dollars(1000)))
    );
    assert!(received.iter().any(|c| c.state.deposit == mini));
    assert!(received.iter().any(|c| c.state.deposit == *DUMMY_DEPOSIT));
    assert_eq!(
        cash::sum_cash_by(state.cash_of(issuer()).iter().map(|c| &c.state), issuer(), Currency::USD),
        Ok(dollars(200))
    );
}
