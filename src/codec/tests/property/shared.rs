//! Shared proptest helpers for codec property tests.

use std::ops::Range;

use proptest::{
    collection::vec,
    prelude::{Just, Strategy, any, prop_oneof},
    test_runner::{Config as ProptestConfig, RngAlgorithm, TestCaseError, TestRng, TestRunner},
};

use crate::codec::Codec;

pub fn deterministic_runner(cases: u32) -> TestRunner {
    let config = ProptestConfig {
        cases,
        ..ProptestConfig::default()
    };
    let rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    TestRunner::new_with_rng(config, rng)
}

pub fn boundary_length_strategy(max_body_size: usize) -> impl Strategy<Value = usize> {
    prop_oneof![
        Just(1usize),
        Just(max_body_size.saturating_sub(1).max(1)),
        Just(max_body_size),
        1usize..=max_body_size,
    ]
}

/// Non-empty payloads up to `max_body_size`, biased towards the boundaries.
pub fn payload_sequence_strategy(
    max_body_size: usize,
    sequence_lengths: Range<usize>,
) -> impl Strategy<Value = Vec<Vec<u8>>> {
    vec(
        boundary_length_strategy(max_body_size).prop_flat_map(|len| vec(any::<u8>(), len)),
        sequence_lengths,
    )
}

/// Payloads and a list of cut sizes used to slice the encoded stream.
pub fn chunked_stream_strategy(
    payloads: impl Strategy<Value = Vec<Vec<u8>>>,
) -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<usize>)> {
    (payloads, vec(1usize..64, 1..32))
}

/// Feed `wire` to `codec` in chunks of the given sizes, carrying leftover
/// bytes between calls the way a dispatcher does.
pub fn feed_in_chunks(
    codec: &dyn Codec,
    wire: &[u8],
    cuts: &[usize],
) -> Result<(Vec<Vec<u8>>, Vec<u8>), TestCaseError> {
    let mut frames = Vec::new();
    let mut carry: Vec<u8> = Vec::new();
    let mut rest = wire;
    let mut sizes = cuts.iter().copied().cycle();

    while !rest.is_empty() {
        let size = sizes.next().unwrap_or(rest.len()).min(rest.len());
        let (head, tail) = rest.split_at(size);
        rest = tail;

        carry.extend_from_slice(head);
        let leftover = codec
            .unmarshal(&carry, &mut |f| frames.push(f.to_vec()))
            .map_err(|err| TestCaseError::fail(format!("unmarshal failed: {err}")))?;
        carry = leftover.to_vec();
    }
    Ok((frames, carry))
}

/// Decode `wire` in one call.
pub fn feed_whole(codec: &dyn Codec, wire: &[u8]) -> Result<(Vec<Vec<u8>>, Vec<u8>), TestCaseError> {
    let mut frames = Vec::new();
    let leftover = codec
        .unmarshal(wire, &mut |f| frames.push(f.to_vec()))
        .map_err(|err| TestCaseError::fail(format!("unmarshal failed: {err}")))?;
    Ok((frames, leftover.to_vec()))
}
