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

//! Equivalence grouping of a transaction's states.
//!
//! A contract supplies a key that strips ownership from its states; inputs and
//! outputs with equal keys form one group and are checked together, in
//! isolation from every other group. This is what lets unrelated movements
//! share one transaction: value cannot leak between groups without tripping
//! a group's own conservation check.

use std::collections::HashMap;
use std::hash::Hash;

/// The inputs and outputs sharing one grouping key.
///
/// Either side may be empty: a group without inputs is an issuance, a group
/// without outputs is an exit or redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InOutGroup<'a, S, K> {
    pub inputs: Vec<&'a S>,
    pub outputs: Vec<&'a S>,
    pub key: K,
}

/// Partitions `inputs` and `outputs` into groups by `key_of`.
///
/// Every state lands in exactly one group. Groups are ordered by the first
/// appearance of their key, scanning inputs before outputs, and states keep
/// their relative order inside a group, so the result is independent of hash
/// iteration order.
pub fn group_states<'a, S: 'a, K: Eq + Hash + Clone>(
    inputs: impl IntoIterator<Item = &'a S>,
    outputs: impl IntoIterator<Item = &'a S>,
    key_of: impl Fn(&S) -> K,
) -> Vec<InOutGroup<'a, S, K>> {
    let mut groups: Vec<InOutGroup<'a, S, K>> = Vec::new();
    let mut index: HashMap<K, usize> = HashMap::new();

    let mut slot = |key: K, groups: &mut Vec<InOutGroup<'a, S, K>>| -> usize {
        *index.entry(key.clone()).or_insert_with(|| {
            groups.push(InOutGroup {
                inputs: Vec::new(),
                outputs: Vec::new(),
                key,
            });
            groups.len() - 1
        })
    };

    for input in inputs {
        let i = slot(key_of(input), &mut groups);
        groups[i].inputs.push(input);
    }
    for output in outputs {
        let i = slot(key_of(output), &mut groups);
        groups[i].outputs.push(output);
    }
    groups
}
