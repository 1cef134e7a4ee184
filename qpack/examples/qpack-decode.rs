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

//! Decodes a file in the QPACK offline interop format.
//!
//! The file is a sequence of records, each made of a 64-bit stream ID and a
//! 32-bit length, both big endian, followed by that many octets of data.
//! Stream 0 carries the encoder stream, all other streams carry one header
//! block each. The dynamic table capacity and the maximum number of blocked
//! streams are taken from the file name, which ends with
//! `.<capacity>.<blocked streams>.<ack mode>`.

#[macro_use]
extern crate log;

use std::fs::File;

use std::io::prelude::*;

use qpack::NameValue;

fn print_headers(stream_id: u64, headers: &[qpack::Header]) {
    println!("# stream {stream_id}");

    for hdr in headers {
        let name = String::from_utf8_lossy(hdr.name());
        let value = String::from_utf8_lossy(hdr.value());
        println!("{name}\t{value}");
    }

    println!();
}

/// Extracts the dynamic table capacity and the maximum number of blocked
/// streams from the file name.
fn params_from_file_name(path: &str) -> (u64, u64) {
    let mut params = path.rsplit('.').skip(1);

    let max_blocked_streams = params.next().and_then(|v| v.parse().ok());
    let max_table_capacity = params.next().and_then(|v| v.parse().ok());

    (max_table_capacity.unwrap_or(0), max_blocked_streams.unwrap_or(0))
}

fn main() {
    env_logger::init();

    let mut args = std::env::args();

    let cmd = &args.next().unwrap();

    if args.len() != 1 {
        println!("Usage: {cmd} FILE");
        return;
    }

    let path = args.next().unwrap();

    let (max_table_capacity, max_blocked_streams) =
        params_from_file_name(&path);

    info!(
        "capacity={} max_blocked_streams={}",
        max_table_capacity, max_blocked_streams
    );

    let mut file = File::open(&path).unwrap();

    let mut dec = qpack::Decoder::new(max_table_capacity, max_blocked_streams);

    loop {
        let mut stream_id: [u8; 8] = [0; 8];
        let mut len: [u8; 4] = [0; 4];

        if file.read_exact(&mut stream_id).is_err() {
            break;
        }

        let stream_id = u64::from_be_bytes(stream_id);

        file.read_exact(&mut len).unwrap();
        let len = u32::from_be_bytes(len) as usize;

        let mut data = vec![0; len];
        file.read_exact(&mut data).unwrap();

        debug!("Got stream={} len={}", stream_id, len);

        if stream_id == 0 {
            dec.on_encoder_stream_data(&data).unwrap();
        } else {
            dec.decode_header_block(stream_id, &data).unwrap();

            if let Some(decoded) = dec.end_header_block(stream_id).unwrap() {
                print_headers(stream_id, &decoded.headers);
            }
        }

        loop {
            match dec.poll() {
                Ok((stream_id, qpack::Event::Headers(decoded))) =>
                    print_headers(stream_id, &decoded.headers),

                Ok((stream_id, qpack::Event::DecodingError(e))) =>
                    error!("stream {} failed: {:?}", stream_id, e),

                Err(qpack::Error::Done) => break,

                Err(e) => panic!("{e:?}"),
            }
        }

        // Instructions would be sent back to the encoder.
        let mut buf = [0; 1024];
        while dec.has_instructions() {
            dec.emit_instructions(&mut buf);
        }
    }

    if dec.blocked_stream_count() > 0 {
        warn!("{} streams still blocked", dec.blocked_stream_count());
    }
}
