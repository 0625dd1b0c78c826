//! Fuzz target for wire message decoding.
//!
//! Arbitrary bytes must decode to a message or an error, never panic, and
//! anything that decodes must re-encode.

#![no_main]

use libfuzzer_sys::fuzz_target;

use armature_ot::WireMessage;

fuzz_target!(|data: &[u8]| {
    if let Ok(msg) = WireMessage::from_bytes(data) {
        let encoded = msg.to_bytes().expect("decoded message must re-encode");
        let _ = serde_json::from_slice::<serde_json::Value>(&encoded);
    }
});
