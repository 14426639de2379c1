// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Block compression for protobuf push bodies. Loki expects the raw snappy
//! block format, not the framed stream format.

use crate::transport::ShippingError;

/// # Errors
///
/// Returns [`ShippingError::Payload`] if the input exceeds snappy's maximum block size.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, ShippingError> {
    snap::raw::Encoder::new()
        .compress_vec(bytes)
        .map_err(|e| ShippingError::Payload(format!("snappy compression failed: {e}")))
}
