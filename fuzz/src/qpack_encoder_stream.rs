#![no_main]

#[macro_use]
extern crate libfuzzer_sys;

fuzz_target!(|data: &[u8]| {
    let mut decoder = qpack::Decoder::new(4096, 16);

    for chunk in data.chunks(7) {
        if decoder.on_encoder_stream_data(chunk).is_err() {
            break;
        }
    }

    let mut encoder = qpack::Encoder::new();

    encoder.on_decoder_stream_data(data).ok();
});
