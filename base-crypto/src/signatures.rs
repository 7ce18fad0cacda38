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

//! Party and owner keys.
//!
//! Schnorr over secp256k1, conforming to BIP340. The ledger engine only ever
//! compares verifying keys against the signer sets attached to commands;
//! checking the signatures themselves happens before a transaction reaches it.
use const_hex::ToHexExt;
use k256::schnorr;
#[cfg(feature = "proptest")]
use proptest::prelude::*;
use rand::distributions::{Distribution, Standard};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::Hash;

macro_rules! derive_via_to_bytes {
    ($ty:ty) => {
        impl Hash for $ty {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                state.write(&self.0.to_bytes()[..]);
            }
        }

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &$ty) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &$ty) -> Ordering {
                let left = self.0.to_bytes();
                let right = other.0.to_bytes();
                left.cmp(&right)
            }
        }
    };
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A verifying public key
pub struct VerifyingKey(schnorr::VerifyingKey);
derive_via_to_bytes!(VerifyingKey);

impl Default for VerifyingKey {
    fn default() -> Self {
        // Manually sampled, we want a stand-in without an rng sometimes.
        VerifyingKey(
            schnorr::VerifyingKey::from_bytes(&[
                43, 59, 242, 191, 89, 80, 243, 46, 116, 47, 12, 103, 140, 35, 90, 207, 180, 68,
                188, 10, 108, 126, 200, 195, 239, 14, 120, 114, 89, 188, 199, 38,
            ])
            .expect("static verifying key should be valid"),
        )
    }
}

impl VerifyingKey {
    /// The BIP340 x-only encoding of this key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }

    /// Parses a key from its BIP340 x-only encoding.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        schnorr::VerifyingKey::from_bytes(bytes)
            .ok()
            .map(VerifyingKey)
    }
}

impl Debug for VerifyingKey {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "VerifyingKey({})", self.to_bytes().encode_hex())
    }
}

// Short form, for clause descriptions and logs.
impl Display for VerifyingKey {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "{}", &self.to_bytes().encode_hex()[..10])
    }
}

impl Distribution<VerifyingKey> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> VerifyingKey {
        let signing_key: SigningKey = rng.r#gen();
        signing_key.verifying_key()
    }
}

#[cfg(feature = "proptest")]
impl Arbitrary for VerifyingKey {
    type Parameters = ();
    type Strategy = BoxedStrategy<VerifyingKey>;

    fn arbitrary_with(_: ()) -> Self::Strategy {
        any::<[u8; 32]>()
            .prop_map(|seed| {
                use rand::SeedableRng;
                SigningKey::sample(rand::rngs::StdRng::from_seed(seed)).verifying_key()
            })
            .boxed()
    }
}

#[derive(Clone)]
/// A signing secret key
pub struct SigningKey(schnorr::SigningKey);

impl SigningKey {
    /// Samples a new secret key from secure randomness
    pub fn sample<R: Rng + CryptoRng>(mut rng: R) -> Self {
        SigningKey(schnorr::SigningKey::random(&mut rng))
    }

    /// Returns the corresponding verifying public key
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(*self.0.verifying_key())
    }

    /// Parse signing key from big endian-encoded bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        let signing_key = schnorr::SigningKey::from_bytes(bytes)?;
        Ok(SigningKey(signing_key))
    }
}

impl Distribution<SigningKey> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SigningKey {
        // Rejection sampling keeps this deterministic for seeded rngs; zero and
        // out-of-range scalars are vanishingly rare.
        loop {
            let bytes: [u8; 32] = rng.r#gen();
            if let Ok(key) = SigningKey::from_bytes(&bytes) {
                return key;
            }
        }
    }
}

impl Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<secret key>")
    }
}
