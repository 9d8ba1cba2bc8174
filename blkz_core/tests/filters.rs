/// Delta and byte-plane filter tests, both standalone and as stream
/// transforms.
use blkz_core::filter::{byteplane, delta, run_stream, DeltaDecoder, DeltaEncoder};
use blkz_core::{BlockFilter, Direction, FilterError, PipelineError};
use proptest::prelude::*;

#[test]
fn test_delta_known_vector() {
    assert_eq!(delta::encode(&[5, 7, 7, 2]), vec![5, 2, 0, 251]);
    assert_eq!(delta::decode(&[5, 2, 0, 251]), vec![5, 7, 7, 2]);
    assert!(delta::encode(&[]).is_empty());
}

#[test]
fn test_byteplane_known_vector() {
    let input = [1u8, 2, 3, 4, 5, 6, 7, 8];
    let planes = byteplane::forward(&input, 4).unwrap();
    assert_eq!(planes, vec![1, 5, 2, 6, 3, 7, 4, 8]);
    assert_eq!(byteplane::reverse(&planes, 4).unwrap(), input);
}

#[test]
fn test_byteplane_rejects_bad_input() {
    assert!(matches!(
        byteplane::forward(&[0u8; 10], 4),
        Err(FilterError::UnalignedLength { len: 10, planes: 4 })
    ));
    assert!(matches!(
        byteplane::reverse(&[0u8; 8], 0),
        Err(FilterError::InvalidPlaneCount(0))
    ));
    assert!(byteplane::forward(&[], 4).unwrap().is_empty());
}

#[test]
fn test_block_filter_keeps_unaligned_tail() {
    let raw: Vec<u8> = (1..=10).collect();
    let filter = BlockFilter::BytePlane(4);
    let forward = filter.forward_block(&raw).unwrap();
    assert_eq!(&forward[8..], &[9u8, 10]);
    assert_eq!(&*filter.reverse_block(&forward).unwrap(), raw.as_slice());
}

#[test]
fn test_run_stream_rejects_bad_chunking() {
    let err = run_stream(BlockFilter::BytePlane(4), Direction::Forward, 4094, &b"abcd"[..], Vec::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::Filter(FilterError::UnalignedLength { .. })));
    assert_eq!(err.exit_code(), 8);

    let err = run_stream(BlockFilter::Delta, Direction::Forward, 0, &b"abcd"[..], Vec::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

fn stream(filter: BlockFilter, direction: Direction, chunk: usize, input: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let n = run_stream(filter, direction, chunk, input, &mut out).unwrap();
    assert_eq!(n, input.len() as u64);
    out
}

#[test]
fn test_run_stream_byteplane_round_trip_with_tail() {
    let data: Vec<u8> = (0..10_001u32).map(|i| (i * 31 % 251) as u8).collect();
    let filter = BlockFilter::BytePlane(4);
    let encoded = stream(filter, Direction::Forward, 4096, &data);
    assert_ne!(encoded, data);
    assert_eq!(stream(filter, Direction::Reverse, 4096, &encoded), data);
}

#[test]
fn test_run_stream_delta_ignores_read_buffer_boundaries() {
    // Inputs spanning several 32 KiB buffers encode as one continuous run.
    let data: Vec<u8> = (0..100_000u32).map(|i| (i * 7 % 253) as u8).collect();
    let one_shot = delta::encode(&data);
    for chunk in [4096, 32 * 1024, 100_000] {
        assert_eq!(stream(BlockFilter::Delta, Direction::Forward, chunk, &data), one_shot);
    }
    // Byte 32768 is coded against byte 32767, not against zero.
    assert_eq!(one_shot[32 * 1024], data[32 * 1024].wrapping_sub(data[32 * 1024 - 1]));
    assert_eq!(stream(BlockFilter::Delta, Direction::Reverse, 32 * 1024, &one_shot), data);
}

proptest! {
    #[test]
    fn delta_round_trip(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        prop_assert_eq!(delta::decode(&delta::encode(&data)), data);
    }

    #[test]
    fn delta_chunking_does_not_change_output(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        split in 0usize..2048,
    ) {
        let split = split.min(data.len());
        let mut chunked = data.clone();
        let (head, tail) = chunked.split_at_mut(split);
        let mut encoder = DeltaEncoder::new();
        encoder.apply(head);
        encoder.apply(tail);
        prop_assert_eq!(&chunked, &delta::encode(&data));

        let (head, tail) = chunked.split_at_mut(split);
        let mut decoder = DeltaDecoder::new();
        decoder.apply(head);
        decoder.apply(tail);
        prop_assert_eq!(chunked, data);
    }

    #[test]
    fn stream_delta_matches_one_shot(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        chunk in 1usize..700,
    ) {
        let encoded = stream(BlockFilter::Delta, Direction::Forward, chunk, &data);
        prop_assert_eq!(&encoded, &delta::encode(&data));
        prop_assert_eq!(stream(BlockFilter::Delta, Direction::Reverse, chunk, &encoded), data);
    }

    #[test]
    fn byteplane_round_trip(
        planes in 1usize..9,
        records in 0usize..256,
        seed in any::<u8>(),
    ) {
        let data: Vec<u8> = (0..planes * records)
            .map(|i| (i as u8).wrapping_mul(seed).wrapping_add(i as u8 >> 3))
            .collect();
        let forward = byteplane::forward(&data, planes).unwrap();
        prop_assert_eq!(forward.len(), data.len());
        prop_assert_eq!(byteplane::reverse(&forward, planes).unwrap(), data);
    }

    #[test]
    fn block_filter_round_trip_any_length(
        data in proptest::collection::vec(any::<u8>(), 0..1024),
        planes in 1usize..9,
    ) {
        for filter in [BlockFilter::None, BlockFilter::Delta, BlockFilter::BytePlane(planes)] {
            let forward = filter.forward_block(&data).unwrap();
            let back = filter.reverse_block(&forward).unwrap();
            prop_assert_eq!(&*back, data.as_slice());
        }
    }
}
