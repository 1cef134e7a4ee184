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

/// A QPACK configuration, shared by the encoder and the decoder of a
/// connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    max_field_section_size: Option<u64>,
    qpack_max_table_capacity: Option<u64>,
    qpack_blocked_streams: Option<u64>,
    huffman: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl Config {
    /// Creates a new configuration object with default settings.
    pub const fn new() -> Config {
        Config {
            max_field_section_size: None,
            qpack_max_table_capacity: None,
            qpack_blocked_streams: None,
            huffman: true,
        }
    }

    /// Sets the `SETTINGS_MAX_FIELD_SECTION_SIZE` setting.
    ///
    /// By default no limit is enforced. Decoded header lists exceeding the
    /// limit are truncated and flagged with
    /// [`DecodedHeaders::limit_exceeded`].
    ///
    /// [`DecodedHeaders::limit_exceeded`]: struct.DecodedHeaders.html#structfield.limit_exceeded
    pub fn set_max_field_section_size(&mut self, v: u64) {
        self.max_field_section_size = Some(v);
    }

    /// Sets the `SETTINGS_QPACK_MAX_TABLE_CAPACITY` setting.
    ///
    /// The default value is `0`.
    pub fn set_qpack_max_table_capacity(&mut self, v: u64) {
        self.qpack_max_table_capacity = Some(v);
    }

    /// Sets the `SETTINGS_QPACK_BLOCKED_STREAMS` setting.
    ///
    /// The default value is `0`.
    pub fn set_qpack_blocked_streams(&mut self, v: u64) {
        self.qpack_blocked_streams = Some(v);
    }

    /// Configures whether the encoder Huffman-codes string literals when
    /// that makes them shorter.
    ///
    /// The default value is `true`.
    pub fn enable_huffman(&mut self, enabled: bool) {
        self.huffman = enabled;
    }

    pub fn max_field_section_size(&self) -> u64 {
        self.max_field_section_size.unwrap_or(u64::MAX)
    }

    pub fn qpack_max_table_capacity(&self) -> u64 {
        self.qpack_max_table_capacity.unwrap_or(0)
    }

    pub fn qpack_blocked_streams(&self) -> u64 {
        self.qpack_blocked_streams.unwrap_or(0)
    }

    pub fn huffman(&self) -> bool {
        self.huffman
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::new();

        assert_eq!(config.max_field_section_size(), u64::MAX);
        assert_eq!(config.qpack_max_table_capacity(), 0);
        assert_eq!(config.qpack_blocked_streams(), 0);
        assert!(config.huffman());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn setters() {
        let mut config = Config::new();

        config.set_max_field_section_size(16384);
        config.set_qpack_max_table_capacity(4096);
        config.set_qpack_blocked_streams(100);
        config.enable_huffman(false);

        assert_eq!(config.max_field_section_size(), 16384);
        assert_eq!(config.qpack_max_table_capacity(), 4096);
        assert_eq!(config.qpack_blocked_streams(), 100);
        assert!(!config.huffman());
    }
}
