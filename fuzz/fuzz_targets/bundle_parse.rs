//! Fuzz target for the key bundle parser and signing key selection.
//!
//! The input is treated as a binary packet stream. Parsing and selection must
//! never panic, whatever the packets claim.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run bundle_parse
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use relsign_crypto::KeyBundle;

fuzz_target!(|data: &[u8]| {
    let Ok(bundle) = KeyBundle::from_packets(data) else {
        return;
    };
    for entity in bundle.entities() {
        for user_id in &entity.user_ids {
            let _ = bundle.select_signing_key(user_id, 1_800_000_000);
        }
    }
    let _ = bundle.select_signing_key("releases@please.build", i64::MAX);
});
