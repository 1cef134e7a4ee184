// Copyright (C) 2025, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Required Insert Count encoding (RFC 9204, Section 4.5.1.1).
//!
//! The Required Insert Count of a header block is sent modulo twice the
//! maximum number of entries the dynamic table can hold, and the decoder
//! recovers it from its own insert count.

use crate::Error;
use crate::Result;

/// Encodes `required_insert_count` for the header block prefix.
pub fn encode_required_insert_count(
    required_insert_count: u64, max_entries: u64,
) -> u64 {
    if required_insert_count == 0 {
        return 0;
    }

    debug_assert!(max_entries > 0);

    required_insert_count % (2 * max_entries) + 1
}

/// Recovers the Required Insert Count from its encoded form, given the
/// number of entries inserted so far.
pub fn decode_required_insert_count(
    encoded_required_insert_count: u64, max_entries: u64,
    total_number_of_inserts: u64,
) -> Result<u64> {
    if encoded_required_insert_count == 0 {
        return Ok(0);
    }

    // Without a dynamic table no header block can depend on it.
    if max_entries == 0 {
        return Err(Error::InvalidRequiredInsertCount);
    }

    let full_range = max_entries
        .checked_mul(2)
        .ok_or(Error::InvalidRequiredInsertCount)?;

    if encoded_required_insert_count > full_range {
        return Err(Error::InvalidRequiredInsertCount);
    }

    let max_value = total_number_of_inserts
        .checked_add(max_entries)
        .ok_or(Error::InvalidRequiredInsertCount)?;

    let max_wrapped = max_value / full_range * full_range;

    let mut required_insert_count = max_wrapped
        .checked_add(encoded_required_insert_count - 1)
        .ok_or(Error::InvalidRequiredInsertCount)?;

    // If the result exceeds the largest possible value, the encoder's value
    // must have wrapped one fewer time.
    if required_insert_count > max_value {
        if required_insert_count <= full_range {
            return Err(Error::InvalidRequiredInsertCount);
        }

        required_insert_count -= full_range;
    }

    // Zero must be encoded as zero.
    if required_insert_count == 0 {
        return Err(Error::InvalidRequiredInsertCount);
    }

    Ok(required_insert_count)
}
