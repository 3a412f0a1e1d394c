//! Fuzz target for the ASCII armor decoder.
//!
//! Arbitrary bytes must either decode or return an error; decoded blocks must
//! survive a re-encode with the same payload.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run armor_decode
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use relsign_crypto::armor;

fuzz_target!(|data: &[u8]| {
    if let Ok(block) = armor::decode(data) {
        let encoded = armor::encode(block.kind, &block.data);
        let again = armor::decode(encoded.as_bytes()).expect("re-encoded armor must decode");
        assert_eq!(again.kind, block.kind);
        assert_eq!(*again.data, *block.data);
    }
});
