mod deflate_codec;
mod lz4_codec;
mod passthrough;
mod zstd_codec;

pub use deflate_codec::DeflateCodec;
pub use lz4_codec::Lz4Codec;
pub use passthrough::PassThroughCodec;
pub use zstd_codec::ZstdCodec;

use blkz_core::Codec;
use std::sync::Arc;

/// Names accepted by [`codec_by_name`], for help text and error messages.
pub const CODEC_NAMES: &[&str] = &["zstd", "lz4", "deflate", "passthrough"];

/// Resolve a codec from its CLI name.
///
/// The stream does not record which codec produced it, so the decompressing
/// side must name the same codec. `level` applies to zstd and deflate and is
/// ignored by the others.
pub fn codec_by_name(name: &str, level: Option<i32>) -> anyhow::Result<Arc<dyn Codec>> {
    match name {
        "zstd" | "z" => Ok(Arc::new(level.map_or_else(ZstdCodec::default, ZstdCodec::new))),
        "lz4" | "l" => Ok(Arc::new(Lz4Codec)),
        "deflate" | "d" => Ok(Arc::new(match level {
            Some(level) => DeflateCodec::new(u32::try_from(level)?),
            None => DeflateCodec::default(),
        })),
        "passthrough" | "pass" | "none" => Ok(Arc::new(PassThroughCodec)),
        other => anyhow::bail!(
            "unknown codec '{}'. Valid options: {}",
            other,
            CODEC_NAMES.join(", ")
        ),
    }
}
