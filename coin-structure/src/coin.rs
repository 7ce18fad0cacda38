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

use crate::party::PartyAndReference;
#[cfg(feature = "proptest")]
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};

/// An ISO 4217 style three letter currency code.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Currency([u8; 3]);

impl Currency {
    pub const USD: Currency = Currency(*b"USD");
    pub const GBP: Currency = Currency(*b"GBP");
    pub const EUR: Currency = Currency(*b"EUR");
    pub const CHF: Currency = Currency(*b"CHF");

    /// Parses a three letter, upper case code.
    pub fn new(code: &str) -> Option<Currency> {
        let bytes: [u8; 3] = code.as_bytes().try_into().ok()?;
        bytes
            .iter()
            .all(u8::is_ascii_uppercase)
            .then_some(Currency(bytes))
    }

    pub fn code(&self) -> &str {
        // Only ever constructed from ASCII.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl Debug for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(feature = "proptest")]
impl Arbitrary for Currency {
    type Parameters = ();
    type Strategy = BoxedStrategy<Currency>;

    fn arbitrary_with(_: ()) -> Self::Strategy {
        prop_oneof![
            Just(Currency::USD),
            Just(Currency::GBP),
            Just(Currency::EUR),
            Just(Currency::CHF),
        ]
        .boxed()
    }
}

/// A product as backed by a specific deposit. Cash from two deposits is never
/// interchangeable, even when the underlying currency is.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Issued<P> {
    pub issuer: PartyAndReference,
    pub product: P,
}

impl<P: Display> Display for Issued<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} issued by {}", self.product, self.issuer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    TokenMismatch,
    Overflow { left: u128, right: u128 },
    Underflow { left: u128, right: u128 },
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::TokenMismatch => {
                write!(f, "attempted arithmetic between amounts of different tokens")
            }
            AmountError::Overflow { left, right } => {
                write!(f, "amount overflow computing {left} + {right}")
            }
            AmountError::Underflow { left, right } => {
                write!(f, "amount underflow computing {left} - {right}")
            }
        }
    }
}

impl Error for AmountError {}

/// A non-negative quantity of some token, counted in its smallest unit (e.g.
/// pennies).
///
/// Amounts of different tokens do not mix: arithmetic between them fails with
/// [`AmountError::TokenMismatch`], and comparing them yields no ordering.
/// Addition and subtraction are checked, and never wrap.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount<T> {
    pub quantity: u128,
    pub token: T,
}

impl<T> Amount<T> {
    pub const fn new(quantity: u128, token: T) -> Self {
        Amount { quantity, token }
    }

    pub const fn zero(token: T) -> Self {
        Amount::new(0, token)
    }

    pub fn is_zero(&self) -> bool {
        self.quantity == 0
    }

    /// The same quantity, of a different token.
    pub fn with_token<U>(&self, token: U) -> Amount<U> {
        Amount::new(self.quantity, token)
    }
}

impl<T: Clone + Eq> Amount<T> {
    pub fn checked_add(&self, other: &Amount<T>) -> Result<Amount<T>, AmountError> {
        if self.token != other.token {
            return Err(AmountError::TokenMismatch);
        }
        let quantity =
            self.quantity
                .checked_add(other.quantity)
                .ok_or(AmountError::Overflow {
                    left: self.quantity,
                    right: other.quantity,
                })?;
        Ok(Amount::new(quantity, self.token.clone()))
    }

    pub fn checked_sub(&self, other: &Amount<T>) -> Result<Amount<T>, AmountError> {
        if self.token != other.token {
            return Err(AmountError::TokenMismatch);
        }
        let quantity =
            self.quantity
                .checked_sub(other.quantity)
                .ok_or(AmountError::Underflow {
                    left: self.quantity,
                    right: other.quantity,
                })?;
        Ok(Amount::new(quantity, self.token.clone()))
    }

    /// Sums the given amounts, yielding `None` for an empty iterator.
    pub fn sum_or_none<'a, I>(amounts: I) -> Result<Option<Amount<T>>, AmountError>
    where
        I: IntoIterator<Item = &'a Amount<T>>,
        T: 'a,
    {
        let mut iter = amounts.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        iter.try_fold(first.clone(), |acc, next| acc.checked_add(next))
            .map(Some)
    }

    /// Sums the given amounts, starting from zero of `token`.
    pub fn sum_or_zero<'a, I>(amounts: I, token: T) -> Result<Amount<T>, AmountError>
    where
        I: IntoIterator<Item = &'a Amount<T>>,
        T: 'a,
    {
        amounts
            .into_iter()
            .try_fold(Amount::zero(token), |acc, next| acc.checked_add(next))
    }
}

impl<T: PartialEq> PartialOrd for Amount<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.token == other.token).then(|| self.quantity.cmp(&other.quantity))
    }
}

impl<T: Display> Display for Amount<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quantity, self.token)
    }
}

impl Amount<Currency> {
    /// Attaches an issuer to a plain currency amount.
    pub fn issued_by(&self, issuer: PartyAndReference) -> Amount<Issued<Currency>> {
        self.with_token(Issued {
            issuer,
            product: self.token,
        })
    }
}

impl<P: Clone> Amount<Issued<P>> {
    /// Drops the issuer, keeping the product.
    pub fn without_issuer(&self) -> Amount<P> {
        self.with_token(self.token.product.clone())
    }
}

/// Shorthand for an amount in the smallest unit of a currency.
pub fn pennies(quantity: u128, currency: Currency) -> Amount<Currency> {
    Amount::new(quantity, currency)
}

/// Shorthand for an amount of whole dollars. Any `u64` count of dollars fits
/// in pennies.
pub fn dollars(whole: u64) -> Amount<Currency> {
    pennies(u128::from(whole) * 100, Currency::USD)
}
