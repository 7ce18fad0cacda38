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
use ashlar_ledger::contracts::crowdfund::{
    self, CROWDFUND_PROGRAM_ID, Campaign, CampaignState, Commands, Pledge,
};
use ashlar_ledger::error::{ContractRejection, SpendError};
use ashlar_ledger::structure::{LedgerState, StateAndRef};
use ashlar_ledger::test_utilities::{
    ALICE, BOB, CHARLIE, DUMMY_DEPOSIT, MINI_CORP, TEST_TIME, TestState, assert_rejected_with,
    command, tfv,
};
use ashlar_ledger::verify;
use base_crypto::signatures::VerifyingKey;
use base_crypto::time::{Duration, Timestamp};
use coin_structure::coin::{Amount, Currency, dollars, pennies};
use coin_structure::party::PartyAndReference;
use proptest::prelude::*;
use std::cmp::Reverse;

fn closing_time() -> Timestamp {
    *TEST_TIME + Duration::from_days(7)
}

fn campaign() -> Campaign {
    Campaign {
        owner: CHARLIE.clone(),
        name: "Solar Roof".into(),
        target: dollars(1000),
        closing_time: closing_time(),
    }
}

fn with_pledges(pledges: &[(&VerifyingKey, Amount<Currency>)]) -> CampaignState {
    let mut state = CampaignState::new(campaign());
    for (owner, amount) in pledges {
        state.pledged_amount = state.pledged_amount.checked_add(amount).unwrap();
        state.pledge_count += 1;
        state.pledges.push(Pledge {
            owner: (*owner).clone(),
            amount: amount.clone(),
        });
    }
    state
}

fn coin(amount: Amount<Currency>, owner: &VerifyingKey) -> LedgerState {
    cash::State::new(DUMMY_DEPOSIT.clone(), amount, owner.clone()).into()
}

fn register(state: CampaignState, signer: &VerifyingKey, at: Option<Timestamp>) -> Result<(), ContractRejection> {
    verify(&tfv(
        vec![],
        vec![state.into()],
        vec![command(Commands::Register, &[signer])],
        at,
    ))
}

fn registered(seed: u64) -> (TestState, StateAndRef<CampaignState>) {
    let mut state = TestState::new(seed);
    let mut builder = state.builder();
    crowdfund::generate_register(&mut builder, campaign());
    let tx = state.assert_apply(&builder);
    let registered = tx.out_refs_of::<CampaignState>().remove(0);
    (state, registered)
}

/// Gives `pledger` the cash, then pledges it.
fn pledge(
    state: &mut TestState,
    campaign: StateAndRef<CampaignState>,
    pledger: &VerifyingKey,
    amount: Amount<Currency>,
) -> StateAndRef<CampaignState> {
    pledge_from(state, campaign, pledger, amount, &DUMMY_DEPOSIT)
}

/// As [`pledge`], with the cash issued at `deposit`.
fn pledge_from(
    state: &mut TestState,
    campaign: StateAndRef<CampaignState>,
    pledger: &VerifyingKey,
    amount: Amount<Currency>,
    deposit: &PartyAndReference,
) -> StateAndRef<CampaignState> {
    state.issue_cash(deposit, amount.clone(), pledger);
    let mut builder = state.builder();
    let wallet = state.cash_of(pledger);
    crowdfund::generate_pledge(&mut builder, campaign, pledger.clone(), amount, &wallet).unwrap();
    let tx = state.assert_apply(&builder);
    tx.out_refs_of::<CampaignState>().remove(0)
}

#[test]
fn registration_is_accepted() {
    assert_eq!(
        register(CampaignState::new(campaign()), &CHARLIE, Some(*TEST_TIME)),
        Ok(())
    );
}

#[test]
fn registration_checks_the_campaign() {
    let fresh = CampaignState::new(campaign());
    assert_rejected_with(
        register(fresh.clone(), &CHARLIE, None),
        "registration must be timestamped",
    );
    assert_rejected_with(
        register(fresh.clone(), &ALICE, Some(*TEST_TIME)),
        "the registration is signed by the campaign owner",
    );
    assert_rejected_with(
        register(fresh.clone(), &CHARLIE, Some(closing_time())),
        "the closing time is in the future",
    );
    assert_rejected_with(
        register(with_pledges(&[(&ALICE, dollars(1))]), &CHARLIE, Some(*TEST_TIME)),
        "the registration has an empty list of pledges",
    );

    let mut blank = fresh.clone();
    blank.campaign.name = "   ".into();
    assert_rejected_with(
        register(blank, &CHARLIE, Some(*TEST_TIME)),
        "the registration has a name",
    );

    let mut nothing = fresh.clone();
    nothing.campaign.target = dollars(0);
    assert_rejected_with(
        register(nothing, &CHARLIE, Some(*TEST_TIME)),
        "the registration has a non-zero target",
    );

    let mut closed = fresh;
    closed.closed = true;
    assert_rejected_with(
        register(closed, &CHARLIE, Some(*TEST_TIME)),
        "the registration is not closed",
    );
}

/// A pledge of $500 by Alice, moving her cash to the campaign owner.
fn funding(
    next: CampaignState,
    payee: &VerifyingKey,
    signer: &VerifyingKey,
    at: Timestamp,
) -> Result<(), ContractRejection> {
    verify(&tfv(
        vec![
            with_pledges(&[]).into(),
            coin(dollars(500), &ALICE),
        ],
        vec![next.into(), coin(dollars(500), payee)],
        vec![
            command(Commands::Fund, &[signer]),
            command(cash::Commands::Move, &[&ALICE]),
        ],
        Some(at),
    ))
}

#[test]
fn funding_checks_the_pledge() {
    let pledged = with_pledges(&[(&ALICE, dollars(500))]);
    assert_eq!(funding(pledged.clone(), &CHARLIE, &ALICE, *TEST_TIME), Ok(()));
    assert_eq!(
        funding(pledged.clone(), &CHARLIE, &ALICE, closing_time()),
        Ok(())
    );

    assert_rejected_with(
        funding(pledged.clone(), &CHARLIE, &BOB, *TEST_TIME),
        "the pledge is signed by its owner",
    );
    assert_rejected_with(
        funding(pledged.clone(), &BOB, &ALICE, *TEST_TIME),
        "the pledged cash is paid to the campaign owner",
    );
    assert_rejected_with(
        funding(
            pledged.clone(),
            &CHARLIE,
            &ALICE,
            closing_time() + Duration::from_secs(1),
        ),
        "the closing time has not passed",
    );

    let mut untallied = pledged.clone();
    untallied.pledged_amount = dollars(0);
    assert_rejected_with(
        funding(untallied, &CHARLIE, &ALICE, *TEST_TIME),
        "the pledge total is updated",
    );

    let mut uncounted = pledged.clone();
    uncounted.pledge_count = 2;
    assert_rejected_with(
        funding(uncounted, &CHARLIE, &ALICE, *TEST_TIME),
        "the pledge count is updated",
    );

    let mut retargeted = pledged.clone();
    retargeted.campaign.target = dollars(10);
    assert_rejected_with(
        funding(retargeted, &CHARLIE, &ALICE, *TEST_TIME),
        "the campaign details are unchanged",
    );

    let mut renamed = pledged;
    renamed.campaign.name = "Wind Farm".into();
    // A renamed campaign no longer shares a group with its input.
    assert_rejected_with(
        funding(renamed, &CHARLIE, &ALICE, *TEST_TIME),
        "there is exactly one input and one output version of the campaign",
    );

    assert_rejected_with(
        funding(
            with_pledges(&[(&ALICE, dollars(250)), (&ALICE, dollars(250))]),
            &CHARLIE,
            &ALICE,
            *TEST_TIME,
        ),
        "exactly one pledge is appended",
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pledge_totals_track_the_pledges(
        amounts in prop::collection::vec(1u128..100_000, 1..6),
    ) {
        let (mut state, mut current) = registered(0x42);
        for (i, amount) in amounts.iter().enumerate() {
            let pledger = if i % 2 == 0 { &*ALICE } else { &*BOB };
            current = pledge(&mut state, current, pledger, pennies(*amount, Currency::USD));
            let campaign = &current.state;
            let total: u128 = campaign.pledges.iter().map(|p| p.amount.quantity).sum();
            prop_assert_eq!(campaign.pledged_amount.quantity, total);
            prop_assert_eq!(campaign.pledge_count as usize, campaign.pledges.len());
            prop_assert_eq!(campaign.pledges.len(), i + 1);
        }
        let raised = cash::sum_cash_by(
            state.cash_of(&CHARLIE).iter().map(|c| &c.state),
            &CHARLIE,
            Currency::USD,
        );
        prop_assert_eq!(raised, Ok(pennies(amounts.iter().sum(), Currency::USD)));
    }
}

#[test]
fn funded_campaigns_close() {
    let (mut state, current) = registered(0x42);
    let current = pledge(&mut state, current, &ALICE, dollars(600));
    let current = pledge(&mut state, current, &BOB, dollars(400));
    assert!(current.state.is_funded());

    let mut builder = state.builder();
    crowdfund::generate_close(&mut builder, current.clone(), &[]).unwrap();
    assert_rejected_with(
        state.apply(&builder).map(|_| ()),
        "the closing time has passed",
    );

    state.fast_forward(Duration::from_days(8));
    let mut builder = state.builder();
    crowdfund::generate_close(&mut builder, current, &[]).unwrap();
    let tx = state.assert_apply(&builder);
    assert!(tx.out_refs_of::<CampaignState>()[0].state.closed);
    assert_eq!(tx.commands.len(), 1);
}

#[test]
fn closing_requires_the_right_outcome() {
    let short = with_pledges(&[(&ALICE, dollars(400))]);
    let close = |input: CampaignState, outcome: Commands| {
        let output = CampaignState {
            closed: true,
            ..input.clone()
        };
        verify(&tfv(
            vec![input.into()],
            vec![output.into()],
            vec![command(outcome, &[&CHARLIE])],
            Some(closing_time()),
        ))
    };
    assert_rejected_with(close(short.clone(), Commands::Funded), "the target has been met");
    let met = with_pledges(&[(&ALICE, dollars(1000))]);
    assert_rejected_with(
        close(met.clone(), Commands::Unfunded),
        "the target has not been met",
    );
    assert_eq!(close(met, Commands::Funded), Ok(()));
}

#[test]
fn unfunded_campaigns_refund_every_pledge() {
    let (mut state, current) = registered(0x42);
    let current = pledge(&mut state, current, &ALICE, dollars(400));
    let current = pledge(&mut state, current, &BOB, dollars(300));
    assert!(!current.state.is_funded());
    assert!(state.cash_of(&ALICE).is_empty());

    state.fast_forward(Duration::from_days(8));
    let mut builder = state.builder();
    let wallet = state.cash_of(&CHARLIE);
    crowdfund::generate_close(&mut builder, current, &wallet).unwrap();
    state.assert_apply(&builder);

    let refunded = |owner: &VerifyingKey| {
        cash::sum_cash_by(
            state.cash_of(owner).iter().map(|c| &c.state),
            owner,
            Currency::USD,
        )
    };
    assert_eq!(refunded(&*ALICE), Ok(dollars(400)));
    assert_eq!(refunded(&*BOB), Ok(dollars(300)));
    assert_eq!(refunded(&*CHARLIE), Ok(dollars(0)));
}

fn cash_held(state: &TestState, owner: &VerifyingKey) -> Amount<Currency> {
    cash::sum_cash_by(
        state.cash_of(owner).iter().map(|c| &c.state),
        owner,
        Currency::USD,
    )
    .unwrap()
}

#[test]
fn refunds_are_paid_whole_across_deposits() {
    let mini = MINI_CORP.reference([1u8]);
    let (mut state, current) = registered(0x42);
    let current = pledge_from(&mut state, current, &ALICE, dollars(100), &mini);
    let current = pledge_from(&mut state, current, &BOB, dollars(300), &DUMMY_DEPOSIT);
    let current = pledge_from(&mut state, current, &ALICE, dollars(100), &mini);

    state.fast_forward(Duration::from_days(8));
    // Largest coin first, so a pooled first-fit refund would straddle deposits.
    let mut wallet = state.cash_of(&CHARLIE);
    wallet.sort_by_key(|c| Reverse(c.state.amount.quantity));
    let mut builder = state.builder();
    crowdfund::generate_close(&mut builder, current, &wallet).unwrap();
    let tx = state.assert_apply(&builder);

    let refunds = tx.outputs_of::<cash::State>().collect::<Vec<_>>();
    assert_eq!(refunds.len(), 3);
    assert_eq!(refunds.iter().filter(|c| c.deposit == mini).count(), 2);
    assert_eq!(cash_held(&state, &ALICE), dollars(200));
    assert_eq!(cash_held(&state, &BOB), dollars(300));
    assert_eq!(cash_held(&state, &CHARLIE), dollars(0));
}

#[test]
fn refunds_that_no_deposit_covers_are_refused() {
    let mini = MINI_CORP.reference([1u8]);
    let (mut state, current) = registered(0x42);
    state.issue_cash(&mini, dollars(200), &ALICE);
    state.issue_cash(&DUMMY_DEPOSIT, dollars(100), &ALICE);
    let mut builder = state.builder();
    let wallet = state.cash_of(&ALICE);
    crowdfund::generate_pledge(&mut builder, current, ALICE.clone(), dollars(300), &wallet).unwrap();
    let tx = state.assert_apply(&builder);
    let current = tx.out_refs_of::<CampaignState>().remove(0);

    state.fast_forward(Duration::from_days(8));
    let mut builder = state.builder();
    let wallet = state.cash_of(&CHARLIE);
    assert_eq!(
        crowdfund::generate_close(&mut builder, current, &wallet),
        Err(SpendError::Fragmented {
            payment: dollars(300)
        })
    );
}

#[test]
fn unfunded_refunds_are_matched_per_pledge() {
    let input = with_pledges(&[(&ALICE, dollars(300)), (&ALICE, dollars(300))]);
    let output = CampaignState {
        closed: true,
        ..input.clone()
    };
    let close = |outputs: Vec<LedgerState>| {
        let mut all = vec![output.clone().into()];
        all.extend(outputs);
        verify(&tfv(
            vec![input.clone().into(), coin(dollars(600), &CHARLIE)],
            all,
            vec![
                command(Commands::Unfunded, &[&CHARLIE]),
                command(cash::Commands::Move, &[&CHARLIE]),
            ],
            Some(closing_time()),
        ))
    };
    assert_eq!(
        close(vec![coin(dollars(300), &ALICE), coin(dollars(300), &ALICE)]),
        Ok(())
    );
    // One refund can't answer for two equal pledges.
    assert_rejected_with(
        close(vec![coin(dollars(300), &ALICE), coin(dollars(300), &CHARLIE)]),
        "every pledge is refunded",
    );

    let mut mistallied = input.clone();
    mistallied.pledged_amount = dollars(700);
    let output = CampaignState {
        closed: true,
        ..mistallied.clone()
    };
    let tx = tfv(
        vec![mistallied.into(), coin(dollars(600), &CHARLIE)],
        vec![
            output.into(),
            coin(dollars(300), &ALICE),
            coin(dollars(300), &ALICE),
        ],
        vec![
            command(Commands::Unfunded, &[&CHARLIE]),
            command(cash::Commands::Move, &[&CHARLIE]),
        ],
        Some(closing_time()),
    );
    assert_rejected_with(verify(&tx), "the refunds total the pledges");
}

#[test]
fn a_single_campaign_command_is_expected() {
    let tx = tfv(vec![], vec![CampaignState::new(campaign()).into()], vec![], Some(*TEST_TIME));
    assert_eq!(
        verify(&tx),
        Err(ContractRejection::MissingCommand {
            contract: CROWDFUND_PROGRAM_ID,
            command: "crowdfund"
        })
    );
}
