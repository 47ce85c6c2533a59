#![no_main]
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use oxicalldata::encoder::{Buffer, EncodeType, Indexes};

fuzz_target!(|data: &[u8]| {
    // Each control byte selects an operation; the following bytes are its
    // payload. A plain Vec model tracks what the committed stream must be.
    let mut buf = Buffer::new(Arc::new(Indexes::new()), false);
    let mut model: Vec<u8> = vec![0];
    let mut pending: Vec<u8> = Vec::new();
    let mut checkpoint = None;

    let mut rest = data;
    while let Some((&ctl, tail)) = rest.split_first() {
        let take = (ctl as usize >> 3).min(tail.len());
        let (payload, tail) = tail.split_at(take);
        rest = tail;

        match ctl & 0x7 {
            0 | 1 => {
                buf.write_bytes(payload);
                pending.extend_from_slice(payload);
            }
            2 => {
                let t = EncodeType::ALL[(ctl as usize >> 3) % 3];
                buf.end(payload, t);
                model.append(&mut pending);
            }
            3 => {
                checkpoint = Some((buf.snapshot(), model.clone()));
            }
            4 => {
                if let Some((snap, m)) = checkpoint.take() {
                    buf.restore(snap);
                    model = m;
                }
            }
            5 => {
                buf.discard_pending();
                pending.clear();
            }
            _ => {
                let found = buf.find_past_data(payload);
                if let Some(i) = found {
                    assert!(i + payload.len() < model.len());
                    assert_eq!(&model[i..i + payload.len()], payload);
                }
            }
        }

        assert_eq!(buf.data(), &model[..]);
        assert_eq!(buf.pending(), &pending[..]);
    }
});
