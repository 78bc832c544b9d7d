//! Perceptual hashing for frame-change detection.
//!
//! Running OCR on every tick is wasteful when the screen is static; the loop
//! hashes each decoded frame and skips extraction while the hash stays close
//! to the last frame that was OCR'd.

use image::RgbaImage;
use image_hasher::{HashAlg, HasherConfig, ImageHash};

pub fn frame_hash(image: &RgbaImage) -> String {
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::DoubleGradient)
        .hash_size(8, 8)
        .to_hasher();
    hasher.hash_image(image).to_base64()
}

/// Hamming distance between two base64 hashes; `u32::MAX` when either fails
/// to parse, which forces the caller to treat the frame as changed.
pub fn hash_distance(lhs: &str, rhs: &str) -> u32 {
    let Ok(h1) = ImageHash::<Vec<u8>>::from_base64(lhs) else {
        return u32::MAX;
    };
    let Ok(h2) = ImageHash::<Vec<u8>>::from_base64(rhs) else {
        return u32::MAX;
    };
    h1.dist(&h2)
}
