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

//! The QPACK static table (RFC 9204, Appendix A).

use std::collections::HashMap;
use std::sync::OnceLock;

type HeaderName = &'static [u8];
type HeaderValue = &'static [u8];

/// The predefined entries, in index order.
const STATIC_ENTRIES: [(HeaderName, HeaderValue); 99] = [
    (b":authority", b""),
    (b":path", b"/"),
    (b"age", b"0"),
    (b"content-disposition", b""),
    (b"content-length", b"0"),
    (b"cookie", b""),
    (b"date", b""),
    (b"etag", b""),
    (b"if-modified-since", b""),
    (b"if-none-match", b""),
    (b"last-modified", b""),
    (b"link", b""),
    (b"location", b""),
    (b"referer", b""),
    (b"set-cookie", b""),
    (b":method", b"CONNECT"),
    (b":method", b"DELETE"),
    (b":method", b"GET"),
    (b":method", b"HEAD"),
    (b":method", b"OPTIONS"),
    (b":method", b"POST"),
    (b":method", b"PUT"),
    (b":scheme", b"http"),
    (b":scheme", b"https"),
    (b":status", b"103"),
    (b":status", b"200"),
    (b":status", b"304"),
    (b":status", b"404"),
    (b":status", b"503"),
    (b"accept", b"*/*"),
    (b"accept", b"application/dns-message"),
    (b"accept-encoding", b"gzip, deflate, br"),
    (b"accept-ranges", b"bytes"),
    (b"access-control-allow-headers", b"cache-control"),
    (b"access-control-allow-headers", b"content-type"),
    (b"access-control-allow-origin", b"*"),
    (b"cache-control", b"max-age=0"),
    (b"cache-control", b"max-age=2592000"),
    (b"cache-control", b"max-age=604800"),
    (b"cache-control", b"no-cache"),
    (b"cache-control", b"no-store"),
    (b"cache-control", b"public, max-age=31536000"),
    (b"content-encoding", b"br"),
    (b"content-encoding", b"gzip"),
    (b"content-type", b"application/dns-message"),
    (b"content-type", b"application/javascript"),
    (b"content-type", b"application/json"),
    (b"content-type", b"application/x-www-form-urlencoded"),
    (b"content-type", b"image/gif"),
    (b"content-type", b"image/jpeg"),
    (b"content-type", b"image/png"),
    (b"content-type", b"text/css"),
    (b"content-type", b"text/html; charset=utf-8"),
    (b"content-type", b"text/plain"),
    (b"content-type", b"text/plain;charset=utf-8"),
    (b"range", b"bytes=0-"),
    (b"strict-transport-security", b"max-age=31536000"),
    (
        b"strict-transport-security",
        b"max-age=31536000; includesubdomains",
    ),
    (
        b"strict-transport-security",
        b"max-age=31536000; includesubdomains; preload",
    ),
    (b"vary", b"accept-encoding"),
    (b"vary", b"origin"),
    (b"x-content-type-options", b"nosniff"),
    (b"x-xss-protection", b"1; mode=block"),
    (b":status", b"100"),
    (b":status", b"204"),
    (b":status", b"206"),
    (b":status", b"302"),
    (b":status", b"400"),
    (b":status", b"403"),
    (b":status", b"421"),
    (b":status", b"425"),
    (b":status", b"500"),
    (b"accept-language", b""),
    (b"access-control-allow-credentials", b"FALSE"),
    (b"access-control-allow-credentials", b"TRUE"),
    (b"access-control-allow-headers", b"*"),
    (b"access-control-allow-methods", b"get"),
    (b"access-control-allow-methods", b"get, post, options"),
    (b"access-control-allow-methods", b"options"),
    (b"access-control-expose-headers", b"content-length"),
    (b"access-control-request-headers", b"content-type"),
    (b"access-control-request-method", b"get"),
    (b"access-control-request-method", b"post"),
    (b"alt-svc", b"clear"),
    (b"authorization", b""),
    (
        b"content-security-policy",
        b"script-src 'none'; object-src 'none'; base-uri 'none'",
    ),
    (b"early-data", b"1"),
    (b"expect-ct", b""),
    (b"forwarded", b""),
    (b"if-range", b""),
    (b"origin", b""),
    (b"purpose", b"prefetch"),
    (b"server", b""),
    (b"timing-allow-origin", b"*"),
    (b"upgrade-insecure-requests", b"1"),
    (b"user-agent", b""),
    (b"x-forwarded-for", b""),
    (b"x-frame-options", b"deny"),
    (b"x-frame-options", b"sameorigin"),
];

/// The read-only table of common header fields shared by every connection.
///
/// The reverse lookup maps are built the first time [`StaticTable::get()`]
/// is called, and never change afterwards.
pub struct StaticTable {
    by_name: HashMap<HeaderName, u64>,
    by_name_value: HashMap<HeaderName, HashMap<HeaderValue, u64>>,
}

impl StaticTable {
    /// Returns the process-wide static table.
    pub fn get() -> &'static StaticTable {
        static TABLE: OnceLock<StaticTable> = OnceLock::new();

        TABLE.get_or_init(StaticTable::build)
    }

    fn build() -> StaticTable {
        let mut by_name = HashMap::with_capacity(STATIC_ENTRIES.len());
        let mut by_name_value: HashMap<HeaderName, HashMap<HeaderValue, u64>> =
            HashMap::new();

        for (idx, &(name, value)) in STATIC_ENTRIES.iter().enumerate() {
            // Keep the lowest index for names appearing more than once.
            by_name.entry(name).or_insert(idx as u64);

            let prev = by_name_value
                .entry(name)
                .or_default()
                .insert(value, idx as u64);
            debug_assert!(prev.is_none());
        }

        StaticTable {
            by_name,
            by_name_value,
        }
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        STATIC_ENTRIES.len()
    }

    /// Always `false`, the static table is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the entry at `index`, if any.
    pub fn lookup(&self, index: u64) -> Option<(&'static [u8], &'static [u8])> {
        let index = usize::try_from(index).ok()?;

        STATIC_ENTRIES.get(index).copied()
    }

    /// Returns the index of the entry matching both `name` and `value`.
    pub fn find_name_value(&self, name: &[u8], value: &[u8]) -> Option<u64> {
        self.by_name_value.get(name)?.get(value).copied()
    }

    /// Returns the lowest index of an entry named `name`.
    pub fn find_name(&self, name: &[u8]) -> Option<u64> {
        self.by_name.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        let table = StaticTable::get();

        assert_eq!(table.len(), 99);
        assert_eq!(table.lookup(0), Some((&b":authority"[..], &b""[..])));
        assert_eq!(table.lookup(17), Some((&b":method"[..], &b"GET"[..])));
        assert_eq!(
            table.lookup(98),
            Some((&b"x-frame-options"[..], &b"sameorigin"[..]))
        );
        assert_eq!(table.lookup(99), None);
        assert_eq!(table.lookup(u64::MAX), None);
    }

    #[test]
    fn find_name_value() {
        let table = StaticTable::get();

        assert_eq!(table.find_name_value(b":method", b"GET"), Some(17));
        assert_eq!(table.find_name_value(b":status", b"200"), Some(25));
        assert_eq!(table.find_name_value(b":authority", b""), Some(0));
        assert_eq!(table.find_name_value(b":method", b"FORGET"), None);
        assert_eq!(table.find_name_value(b"foo", b"bar"), None);
    }

    #[test]
    fn find_name_prefers_lowest_index() {
        let table = StaticTable::get();

        // :method appears at 15..=21.
        assert_eq!(table.find_name(b":method"), Some(15));
        // :status appears at 24..=28 and 63..=71.
        assert_eq!(table.find_name(b":status"), Some(24));
        assert_eq!(table.find_name(b"x-frame-options"), Some(97));
        assert_eq!(table.find_name(b"X-Frame-Options"), None);
    }

    #[test]
    fn shared_instance() {
        assert!(std::ptr::eq(StaticTable::get(), StaticTable::get()));
    }
}
