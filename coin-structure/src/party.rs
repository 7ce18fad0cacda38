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

use base_crypto::signatures::VerifyingKey;
use const_hex::ToHexExt;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A named legal identity, and the key it signs with.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub owning_key: VerifyingKey,
}

impl Party {
    pub fn new(name: impl Into<String>, owning_key: VerifyingKey) -> Self {
        Party {
            name: name.into(),
            owning_key,
        }
    }

    /// Qualifies this party with a reference, e.g. the deposit backing an
    /// issuance.
    pub fn reference(&self, reference: impl Into<Vec<u8>>) -> PartyAndReference {
        PartyAndReference {
            party: self.clone(),
            reference: reference.into(),
        }
    }
}

impl Display for Party {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The (issuing party, reference) pair naming a deposit or an issuance.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyAndReference {
    pub party: Party,
    pub reference: Vec<u8>,
}

impl Display for PartyAndReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.party, self.reference.encode_hex())
    }
}
