//! Generated checks for `LengthCodec` reassembly.

use proptest::{prop_assert, prop_assert_eq, test_runner::TestCaseError};
use rstest::rstest;

use super::shared::{
    chunked_stream_strategy,
    deterministic_runner,
    feed_in_chunks,
    feed_whole,
    payload_sequence_strategy,
};
use crate::codec::{Codec, LengthCodec};

#[rstest]
#[case(0, 64, 96)]
#[case(0xAB, 256, 128)]
#[case(0xABAB, 1024, 64)]
fn chunk_boundaries_do_not_change_delivered_frames(
    #[case] magic_number: u16,
    #[case] max_body_size: usize,
    #[case] cases: u32,
) {
    let mut runner = deterministic_runner(cases);
    let strategy = chunked_stream_strategy(payload_sequence_strategy(max_body_size, 1..12));

    runner
        .run(&strategy, |(payloads, cuts)| {
            let codec = LengthCodec::new(magic_number, max_body_size);
            let mut wire = Vec::new();
            for payload in &payloads {
                let framed = codec
                    .marshal(payload)
                    .map_err(|err| TestCaseError::fail(format!("marshal failed: {err}")))?;
                wire.extend_from_slice(&framed);
            }

            let (chunked, chunked_tail) = feed_in_chunks(&codec, &wire, &cuts)?;
            let (whole, whole_tail) = feed_whole(&codec, &wire)?;

            prop_assert_eq!(&chunked, &whole);
            prop_assert_eq!(&chunked, &payloads);
            prop_assert!(chunked_tail.is_empty());
            prop_assert!(whole_tail.is_empty());
            Ok(())
        })
        .expect("length codec reassembly should be chunk-boundary independent");
}

#[rstest]
#[case(0, 128)]
#[case(0xABAB, 128)]
fn truncated_stream_keeps_partial_frame(#[case] magic_number: u16, #[case] cases: u32) {
    let mut runner = deterministic_runner(cases);
    let strategy = chunked_stream_strategy(payload_sequence_strategy(128, 2..6));

    runner
        .run(&strategy, |(payloads, cuts)| {
            let codec = LengthCodec::new(magic_number, 128);
            let mut wire = Vec::new();
            for payload in &payloads {
                wire.extend_from_slice(
                    &codec
                        .marshal(payload)
                        .map_err(|err| TestCaseError::fail(format!("marshal failed: {err}")))?,
                );
            }
            let truncated = &wire[..wire.len() - 1];

            let (frames, tail) = feed_in_chunks(&codec, truncated, &cuts)?;
            prop_assert_eq!(&frames[..], &payloads[..payloads.len() - 1]);
            prop_assert!(!tail.is_empty());
            Ok(())
        })
        .expect("truncated streams should carry the incomplete frame");
}
