// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for htmlreport-runner.

/// Utilities for pluralizing various words based on count.
pub(crate) mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub(crate) fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "class" if `count` is 1, otherwise "classes".
    pub(crate) fn classes_str(count: usize) -> &'static str {
        if count == 1 { "class" } else { "classes" }
    }
}
