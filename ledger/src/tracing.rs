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

//! Logging for the engine.
//!
//! Verification and selection log under this crate's target. Each contract
//! logs its group checks under its own module, so a single contract can be
//! traced without the noise of the others.

use crate::contracts::{cash, commercial_paper, crowdfund};
use crate::structure::ContractId;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::targets::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

/// The target every event of the engine is logged under, or beneath.
pub const ENGINE_TARGET: &str = "ashlar_ledger";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        use LogLevel::*;
        match level {
            Off => LevelFilter::OFF,
            Trace => LevelFilter::TRACE,
            Debug => LevelFilter::DEBUG,
            Info => LevelFilter::INFO,
            Warn => LevelFilter::WARN,
            Error => LevelFilter::ERROR,
        }
    }
}

/// The target a standard contract logs its group checks under.
pub fn contract_target(contract: ContractId) -> Option<&'static str> {
    match contract {
        cash::CASH_PROGRAM_ID => Some(cash::LOG_TARGET),
        commercial_paper::CP_PROGRAM_ID => Some(commercial_paper::LOG_TARGET),
        crowdfund::CROWDFUND_PROGRAM_ID => Some(crowdfund::LOG_TARGET),
        _ => None,
    }
}

/// The engine at `level`, other crates at warnings only, and every contract
/// in `traced` at full detail.
pub fn log_filter(level: LogLevel, traced: &[ContractId]) -> Targets {
    traced
        .iter()
        .filter_map(|contract| contract_target(*contract))
        .fold(
            Targets::new()
                .with_default(LevelFilter::WARN)
                .with_target(ENGINE_TARGET, level),
            |targets, target| targets.with_target(target, LevelFilter::TRACE),
        )
}

/// Installs a formatting subscriber filtered by [`log_filter`]. Only the
/// first call in a process installs anything, so tests may call it freely.
pub fn init_logger_with(level: LogLevel, traced: &[ContractId]) {
    Registry::default()
        .with(tracing_subscriber::fmt::layer().with_filter(log_filter(level, traced)))
        .try_init()
        .ok();
    info!(?level, ?traced, "ashlar ledger engine v{}", env!("CARGO_PKG_VERSION"));
}

pub fn init_logger(level: LogLevel) {
    init_logger_with(level, &[]);
}
