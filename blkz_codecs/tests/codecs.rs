/// Codec tests: each bundled codec round-trips a block, honours the caller's
/// output bound, and the name registry resolves aliases.
use blkz_codecs::{codec_by_name, DeflateCodec, Lz4Codec, PassThroughCodec, ZstdCodec, CODEC_NAMES};
use blkz_core::{BlockOptions, Codec, CodecError};

fn sample(len: usize) -> Vec<u8> {
    let pattern = b"block compression sample text ";
    (0..len).map(|i| pattern[i % pattern.len()]).collect()
}

#[test]
fn test_each_codec_round_trips_a_block() {
    let raw = sample(4096);
    let codecs: [Box<dyn Codec>; 3] = [
        Box::new(ZstdCodec::default()),
        Box::new(Lz4Codec),
        Box::new(DeflateCodec::default()),
    ];
    for codec in codecs {
        for options in [BlockOptions::empty(), BlockOptions::FAST] {
            let payload = codec.compress_block(&raw, options).unwrap();
            assert!(payload.len() < raw.len(), "{} did not compress", codec.name());
            let restored = codec.decompress_block(&payload, options, raw.len()).unwrap();
            assert_eq!(restored, raw, "{}", codec.name());
        }
    }
}

#[test]
fn test_output_bound_is_enforced() {
    let raw = sample(4096);
    let codecs: [Box<dyn Codec>; 4] = [
        Box::new(ZstdCodec::default()),
        Box::new(Lz4Codec),
        Box::new(DeflateCodec::default()),
        Box::new(PassThroughCodec),
    ];
    for codec in codecs {
        let payload = codec.compress_block(&raw, BlockOptions::empty()).unwrap();
        match codec.decompress_block(&payload, BlockOptions::empty(), 1024) {
            Err(CodecError::OutputTooLarge { codec: name, len, max }) => {
                assert_eq!(name, codec.name());
                assert!(len > 1024, "{}: len {}", name, len);
                assert_eq!(max, 1024);
            }
            other => panic!("{}: unexpected result {:?}", codec.name(), other.map(|v| v.len())),
        }
        // Exactly at the bound still decodes.
        let restored = codec.decompress_block(&payload, BlockOptions::empty(), 4096).unwrap();
        assert_eq!(restored, raw);
    }

    let payload = Lz4Codec.compress_block(&raw, BlockOptions::empty()).unwrap();
    assert!(matches!(
        Lz4Codec.decompress_block(&payload[..3], BlockOptions::empty(), 4096),
        Err(CodecError::Decompress { .. })
    ));
}

#[test]
fn test_passthrough_never_shrinks() {
    let raw = sample(100);
    let payload = PassThroughCodec.compress_block(&raw, BlockOptions::empty()).unwrap();
    assert_eq!(payload, raw);
}

#[test]
fn test_registry_resolves_names_and_aliases() {
    for name in CODEC_NAMES {
        assert_eq!(codec_by_name(name, None).unwrap().name(), *name);
    }
    assert_eq!(codec_by_name("z", Some(19)).unwrap().name(), "zstd");
    assert_eq!(codec_by_name("l", None).unwrap().name(), "lz4");
    assert_eq!(codec_by_name("d", Some(9)).unwrap().name(), "deflate");
    assert_eq!(codec_by_name("none", None).unwrap().name(), "passthrough");

    let err = codec_by_name("brotli", None).err().unwrap();
    assert!(err.to_string().contains("unknown codec"));
    assert!(codec_by_name("deflate", Some(-1)).is_err());
}
