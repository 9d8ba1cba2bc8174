/// Frame header and frame reader tests.
use blkz_core::format::{
    encode_frame, encode_stored, max_payload_len, FRAME_OVERHEAD, HEADER_LEN, MAX_FRAME_LEN,
};
use blkz_core::{BlockOptions, Frame, FrameError, FrameHeader, FrameReader, MAX_BLOCK_SIZE};

#[test]
fn test_header_bit_layout() {
    let header = FrameHeader::new(BlockOptions::STORED, 0x1234).unwrap();
    assert_eq!(header.to_bytes(), [0x80 | 0x12, 0x34]);

    let header = FrameHeader::new(BlockOptions::empty(), MAX_FRAME_LEN).unwrap();
    assert_eq!(header.to_bytes(), [0x1f, 0xff]);

    let decoded = FrameHeader::from_bytes([0xe5, 0x01]);
    assert_eq!(decoded.length, 0x0501);
    assert!(decoded.options.contains(BlockOptions::STORED));
    assert!(decoded.options.contains(BlockOptions::RESERVED_6));
    assert!(decoded.options.contains(BlockOptions::RESERVED_5));
}

#[test]
fn test_fast_option_never_reaches_the_wire() {
    let header = FrameHeader::new(BlockOptions::FAST, 10).unwrap();
    assert_eq!(header.to_bytes(), [0x00, 10]);
    assert!(!header.options.contains(BlockOptions::FAST));
}

#[test]
fn test_header_rejects_oversized_length() {
    assert!(matches!(
        FrameHeader::new(BlockOptions::empty(), MAX_FRAME_LEN + 1),
        Err(FrameError::LengthOverflow { declared: 8192, max: 8191 })
    ));
}

#[test]
fn test_max_payload_len_is_capped() {
    assert_eq!(max_payload_len(4096), 4098);
    assert_eq!(max_payload_len(MAX_BLOCK_SIZE), MAX_FRAME_LEN);
    assert_eq!(max_payload_len(usize::MAX), MAX_FRAME_LEN);
}

#[test]
fn test_stored_frame_layout() {
    let mut out = Vec::new();
    encode_stored(BlockOptions::empty(), b"hello", &mut out).unwrap();
    assert_eq!(out.len(), 5 + FRAME_OVERHEAD);
    assert_eq!(&out[..4], &[0x80u8, 7, 0x00, 5]);

    let (frame, consumed) = Frame::parse(&out, 16).unwrap();
    assert_eq!(consumed, out.len());
    assert!(frame.is_stored());
    assert_eq!(frame.stored_literal(16).unwrap(), b"hello");
}

#[test]
fn test_stored_rejects_block_over_limit() {
    let raw = vec![0u8; MAX_BLOCK_SIZE + 1];
    let mut out = Vec::new();
    assert!(matches!(
        encode_stored(BlockOptions::empty(), &raw, &mut out),
        Err(FrameError::LengthOverflow { .. })
    ));
    assert!(out.is_empty());
}

#[test]
fn test_stored_length_mismatch() {
    let frame = Frame {
        options: BlockOptions::STORED,
        payload: vec![0x00, 4, 1, 2, 3],
    };
    assert!(matches!(
        frame.stored_literal(16),
        Err(FrameError::StoredLengthMismatch { declared: 4, available: 3 })
    ));

    let runt = Frame {
        options: BlockOptions::STORED,
        payload: vec![0x00],
    };
    assert!(matches!(
        runt.stored_literal(16),
        Err(FrameError::ShortRead { expected: 2, actual: 1 })
    ));
}

#[test]
fn test_parse_never_reads_past_buffer() {
    // Declares 16 payload bytes, carries 3.
    let buf = [0x00, 0x10, 1, 2, 3];
    assert!(matches!(
        Frame::parse(&buf, 64),
        Err(FrameError::ShortRead { expected: 16, actual: 3 })
    ));
    assert!(matches!(
        Frame::parse(&buf[..1], 64),
        Err(FrameError::ShortRead { expected: HEADER_LEN, actual: 1 })
    ));
    // Length is checked against the limit before the buffer is sliced.
    assert!(matches!(
        Frame::parse(&[0x1f, 0xff], 64),
        Err(FrameError::LengthOverflow { declared: 8191, max: 66 })
    ));
}

#[test]
fn test_frame_reader_sequence() {
    let mut stream = Vec::new();
    encode_frame(BlockOptions::empty(), b"abc", &mut stream).unwrap();
    encode_stored(BlockOptions::empty(), b"de", &mut stream).unwrap();
    encode_frame(BlockOptions::empty(), b"", &mut stream).unwrap();

    let mut reader = FrameReader::new(&stream[..], 64);
    let first = reader.next_frame().unwrap().unwrap();
    assert_eq!(first.payload, b"abc");
    assert!(!first.is_stored());

    let second = reader.next_frame().unwrap().unwrap();
    assert_eq!(second.stored_literal(64).unwrap(), b"de");

    let third = reader.next_frame().unwrap().unwrap();
    assert!(third.payload.is_empty());

    assert!(reader.next_frame().unwrap().is_none());
    assert_eq!(reader.frames_read(), 3);
}

#[test]
fn test_frame_reader_truncation() {
    let mut stream = Vec::new();
    encode_frame(BlockOptions::empty(), b"abcdef", &mut stream).unwrap();
    stream.truncate(5);

    let mut reader = FrameReader::new(&stream[..], 64);
    assert!(matches!(
        reader.next_frame(),
        Err(FrameError::ShortRead { expected: 6, actual: 3 })
    ));
}
