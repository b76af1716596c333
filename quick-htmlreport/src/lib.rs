// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Build and serialize self-contained HTML test reports.
//!
//! A [`Report`] is a plain document tree: a heading, one [`ClassRow`] per test class and one
//! [`CaseRow`] per test nested under it. Assembling the tree and escaping it into markup are
//! separate steps; [`Report::serialize`] does all of the escaping in a single pass.

mod errors;
mod report;
mod serialize;

pub use errors::*;
pub use report::*;
