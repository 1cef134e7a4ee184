#![no_main]

#[macro_use]
extern crate libfuzzer_sys;

// The first octet splits the input between the encoder stream and a header
// block, so that both dynamic and static references get exercised.
fuzz_target!(|data: &[u8]| {
    let Some((&split, data)) = data.split_first() else {
        return;
    };

    let split = (split as usize).min(data.len());
    let (encoder_stream, header_block) = data.split_at(split);

    let mut decoder = qpack::Decoder::new(4096, 16);

    decoder.on_encoder_stream_data(encoder_stream).ok();

    if decoder.decode_header_block(4, header_block).is_ok() {
        decoder.end_header_block(4).ok();
    }

    while decoder.poll().is_ok() {}

    let mut buf = [0; 1024];
    while decoder.has_instructions() {
        decoder.emit_instructions(&mut buf);
    }
});
