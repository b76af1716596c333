// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{io, string::FromUtf8Error};
use thiserror::Error;

/// An error that occurs while serializing a [`Report`](crate::Report).
///
/// Returned by [`Report::serialize`](crate::Report::serialize) and
/// [`Report::to_string`](crate::Report::to_string).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerializeError {
    /// The underlying writer failed.
    #[error("error writing HTML report")]
    Io(#[from] io::Error),

    /// The XML writer rejected an event.
    #[error("error encoding HTML report")]
    Xml(#[from] quick_xml::Error),

    /// The serialized report was not valid UTF-8.
    #[error("serialized HTML report is not valid UTF-8")]
    Utf8(#[from] FromUtf8Error),
}
