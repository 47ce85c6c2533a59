#![no_main]
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use oxicalldata::encoder::{Buffer, Indexes};
use oxicalldata::replay::Script;

fuzz_target!(|data: &[u8]| {
    // Parsing and replaying arbitrary scripts must never panic.
    let text = String::from_utf8_lossy(data);
    if let Ok(script) = Script::parse(&text) {
        let mut buf = Buffer::new(Arc::new(Indexes::new()), true);
        let _ = script.run(&mut buf);
        assert!(!buf.data().is_empty());
    }
});
