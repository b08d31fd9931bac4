//! Generated checks for `DelimiterCodec` reassembly.

use proptest::{
    collection::vec,
    prelude::{Strategy, prop},
    prop_assert,
    prop_assert_eq,
    test_runner::TestCaseError,
};

use super::shared::{chunked_stream_strategy, deterministic_runner, feed_in_chunks, feed_whole};
use crate::codec::{Codec, DelimiterCodec};

/// Payloads drawn from an alphabet that cannot contain the delimiter.
fn text_payloads() -> impl Strategy<Value = Vec<Vec<u8>>> {
    vec(vec(prop::sample::select(b"abcxyz {}:,\"".to_vec()), 1..48), 1..10)
}

#[test]
fn delimited_reassembly_matches_single_chunk() {
    let mut runner = deterministic_runner(128);
    let strategy = chunked_stream_strategy(text_payloads());

    runner
        .run(&strategy, |(payloads, cuts)| {
            let codec = DelimiterCodec::symmetric(b"\n\n");
            let mut wire = Vec::new();
            for payload in &payloads {
                let framed = codec
                    .marshal(payload)
                    .map_err(|err| TestCaseError::fail(format!("marshal failed: {err}")))?;
                wire.extend_from_slice(&framed);
            }

            let (chunked, chunked_tail) = feed_in_chunks(&codec, &wire, &cuts)?;
            let (whole, _) = feed_whole(&codec, &wire)?;

            prop_assert_eq!(&chunked, &payloads);
            prop_assert_eq!(&whole, &payloads);
            prop_assert!(chunked_tail.is_empty());
            Ok(())
        })
        .expect("delimiter codec reassembly should be chunk-boundary independent");
}
