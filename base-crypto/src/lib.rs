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

#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! This crate collects the primitives the ashlar ledger engine builds on:
//! persistent hashes naming transactions, the public keys that own states and
//! sign commands, and the attested time carried by transactions.
//!
//! Nothing in here reads the wall clock or performs I/O, so everything built
//! on top of it can stay a pure function of its inputs.

pub mod hash;
pub mod signatures;
pub mod time;
