// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Captures the output of each test in a run, records outcomes, and renders a single
//! self-contained HTML report grouped by test class.
//!
//! The basic flow:
//!
//! 1. An [`ExecutionEngine`](engine::ExecutionEngine) runs tests and reports each lifecycle
//!    to a [`ResultSink`](ledger::ResultSink).
//! 2. The [`RunLedger`](ledger::RunLedger) sink captures console output per test and keeps
//!    an ordered record of outcomes.
//! 3. Records are [grouped](aggregator::group) by class and
//!    [rendered](render::build_report) with `quick-htmlreport`.
//!
//! [`HtmlTestRunner`](runner::HtmlTestRunner) ties these together.

pub mod aggregator;
pub mod capture;
pub mod config;
pub mod engine;
pub mod errors;
mod helpers;
pub mod identity;
pub mod ledger;
pub mod output;
pub mod progress;
pub mod render;
pub mod runner;
pub mod screenshot;
mod time;
