use std::sync::Arc;

use oxicalldata::encoder::{Buffer, EncodeType, FlagNamespace, Indexes, MIN_REFERENCE_LEN};
use proptest::prelude::*;

fn encode_type() -> impl Strategy<Value = EncodeType> {
    prop_oneof![
        Just(EncodeType::ReadStorage),
        Just(EncodeType::Stateless),
        Just(EncodeType::WriteStorage),
    ]
}

/// One commit: staged bytes, original value, tag.
fn commit_strategy() -> impl Strategy<Value = (Vec<u8>, Vec<u8>, EncodeType)> {
    (
        proptest::collection::vec(any::<u8>(), 0..16),
        proptest::collection::vec(0u8..4, 0..6),
        encode_type(),
    )
}

fn new_buf() -> Buffer {
    Buffer::new(Arc::new(Indexes::new()), false)
}

/// Reference search over the stream with its last byte cut off.
fn naive_find(stream: &[u8], pattern: &[u8]) -> Option<usize> {
    let searchable = &stream[..stream.len().saturating_sub(1)];
    if pattern.is_empty() {
        return (!stream.is_empty()).then_some(0);
    }
    searchable.windows(pattern.len()).position(|w| w == pattern)
}

proptest! {
    #[test]
    fn prop_commit_appends_pending(
        commits in proptest::collection::vec(commit_strategy(), 0..32),
    ) {
        let mut buf = new_buf();
        let mut expected = vec![0u8];
        for (bytes, value, t) in &commits {
            let before = buf.len();
            buf.write_bytes(bytes);
            buf.end(value, *t);
            expected.extend_from_slice(bytes);
            prop_assert_eq!(buf.len(), before + bytes.len());
            prop_assert!(buf.pending().is_empty());
        }
        prop_assert_eq!(buf.data(), &expected[..]);
        prop_assert_eq!(buf.data()[0], 0);
    }

    #[test]
    fn prop_flag_caches_follow_last_commit(
        commits in proptest::collection::vec(commit_strategy(), 0..32),
    ) {
        let mut buf = new_buf();
        for (bytes, value, t) in &commits {
            let rindex = buf.len();
            let stateless_before = buf.refs().flag_count(FlagNamespace::Stateless);
            let storage_before = buf.refs().flag_count(FlagNamespace::Storage);
            buf.write_bytes(bytes);
            buf.end(value, *t);

            if value.len() < MIN_REFERENCE_LEN || *t == EncodeType::ReadStorage {
                prop_assert_eq!(buf.refs().flag_count(FlagNamespace::Stateless), stateless_before);
                prop_assert_eq!(buf.refs().flag_count(FlagNamespace::Storage), storage_before);
            } else if *t == EncodeType::Stateless {
                prop_assert_eq!(buf.refs().used_flag(value), rindex + 1);
                prop_assert_eq!(buf.refs().used_storage_flag(value), 0);
            } else {
                prop_assert_eq!(buf.refs().used_storage_flag(value), rindex + 1);
                prop_assert_eq!(buf.refs().used_flag(value), 0);
            }
        }
        // Every stored marker is non-zero and its offset is within the stream.
        for ns in [FlagNamespace::Stateless, FlagNamespace::Storage] {
            for (_, marker) in buf.refs().flags(ns) {
                prop_assert!(marker >= 1 && marker - 1 <= buf.len());
            }
        }
    }

    #[test]
    fn prop_find_past_data_matches_naive_scan(
        stream in proptest::collection::vec(0u8..3, 0..64),
        pattern in proptest::collection::vec(0u8..3, 0..5),
    ) {
        let mut buf = new_buf();
        buf.write_bytes(&stream);
        buf.end(&[], EncodeType::ReadStorage);
        prop_assert_eq!(buf.find_past_data(&pattern), naive_find(buf.data(), &pattern));
    }

    #[test]
    fn prop_snapshot_restore_roundtrip(
        before in proptest::collection::vec(commit_strategy(), 0..16),
        after in proptest::collection::vec(commit_strategy(), 0..16),
    ) {
        let mut buf = new_buf();
        for (bytes, value, t) in &before {
            buf.write_bytes(bytes);
            buf.end(value, *t);
        }
        let data = buf.data().to_vec();
        let refs = buf.refs().clone();
        let snap = buf.snapshot();

        for (bytes, value, t) in &after {
            buf.write_bytes(bytes);
            buf.end(value, *t);
        }
        prop_assert_eq!(snap.data(), &data[..]);
        prop_assert_eq!(snap.refs(), &refs);

        buf.restore(snap);
        prop_assert_eq!(buf.data(), &data[..]);
        prop_assert_eq!(buf.refs(), &refs);
    }
}
