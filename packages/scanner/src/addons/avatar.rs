//! Avatar fingerprinting: SHA-256 of the raw bytes plus a 64-bit
//! difference hash over a 9×8 grayscale resize.
//!
//! Fetches go through the transport with the avatar body cap; `.onion`
//! avatar URLs are refused before any request is made. Decoded pixel
//! data is dropped as soon as the hash is computed.

use std::sync::Arc;

use image::imageops::FilterType;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::guard::is_onion_host;
use crate::transport::{ProbeRequest, Transport};
use crate::types::probe::ProbeResult;

/// Accepted avatar content types.
const IMAGE_CONTENT_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Raw bytes of each fetched avatar, aligned with the result slice.
/// Kept for the face-match stage so images are downloaded once.
pub type AvatarBytes = Vec<Option<Vec<u8>>>;

/// Compute the difference hash of an encoded image.
///
/// The image is resized to 9×8, grayscaled, and each pixel compared to
/// its right neighbor row by row, most significant bit first.
pub fn dhash(bytes: &[u8]) -> Result<u64, String> {
    let decoded = image::load_from_memory(bytes).map_err(|e| format!("decode failed: {e}"))?;
    let gray = decoded.to_luma8();
    let small = image::imageops::resize(&gray, 9, 8, FilterType::Triangle);

    let mut hash = 0u64;
    for y in 0..8 {
        for x in 0..8 {
            hash <<= 1;
            if small.get_pixel(x, y).0[0] < small.get_pixel(x + 1, y).0[0] {
                hash |= 1;
            }
        }
    }
    Ok(hash)
}

/// Hamming distance between two difference hashes.
pub fn hamming(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Fingerprint every result that carries an `avatar_url`. Returns the
/// raw image bytes for the face-match stage.
pub async fn apply(transport: &Arc<dyn Transport>, results: &mut [ProbeResult]) -> AvatarBytes {
    let fetches = results.iter().map(|result| {
        let transport = Arc::clone(transport);
        let url = result.profile.avatar_url.clone();
        async move {
            let url = url?;
            let host = url::Url::parse(&url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))?;
            if is_onion_host(&host) {
                return Some(Err("onion_host".to_string()));
            }
            let request = ProbeRequest::get_avatar(&url);
            match transport.fetch(&request).await {
                Ok(response) if !response.is_success() => {
                    Some(Err(format!("download_failed: HTTP {}", response.http_status)))
                }
                Ok(response) => {
                    let content_type = response.content_type().unwrap_or_default();
                    if !IMAGE_CONTENT_TYPES.contains(&content_type.as_str()) {
                        Some(Err("unsupported_format".to_string()))
                    } else {
                        Some(Ok(response.body))
                    }
                }
                Err(err) => Some(Err(format!("download_failed: {err}"))),
            }
        }
    });

    let outcomes = futures::future::join_all(fetches).await;

    let mut bytes_out: AvatarBytes = Vec::with_capacity(results.len());
    for (result, outcome) in results.iter_mut().zip(outcomes) {
        match outcome {
            None => bytes_out.push(None),
            Some(Err(reason)) => {
                debug!(provider = %result.provider, reason = %reason, "avatar fetch failed");
                result.profile.avatar_fetch_error = Some(reason);
                bytes_out.push(None);
            }
            Some(Ok(bytes)) => {
                result.profile.avatar_sha256 = Some(sha256_hex(&bytes));
                match dhash(&bytes) {
                    Ok(hash) => result.profile.avatar_dhash = Some(format!("{hash:016x}")),
                    Err(reason) => result.profile.avatar_fetch_error = Some(reason),
                }
                bytes_out.push(Some(bytes));
            }
        }
    }
    bytes_out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal 1×1 PNG, generated once with the image crate.
    pub(crate) fn png_pixel(luma: u8) -> Vec<u8> {
        let img = image::GrayImage::from_pixel(1, 1, image::Luma([luma]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    /// A small gradient image whose dhash is non-trivial.
    pub(crate) fn gradient_png(step: u8) -> Vec<u8> {
        let img = image::GrayImage::from_fn(16, 16, |x, y| {
            image::Luma([((x as u16 * step as u16 + y as u16) % 256) as u8])
        });
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_dhash_is_stable() {
        let bytes = gradient_png(8);
        let first = dhash(&bytes).unwrap();
        let second = dhash(&bytes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_dhash_flat_image_is_zero() {
        // no pixel is darker than its neighbor in a flat image
        let bytes = png_pixel(128);
        assert_eq!(dhash(&bytes).unwrap(), 0);
    }

    #[test]
    fn test_dhash_rejects_garbage() {
        assert!(dhash(b"not an image").is_err());
    }

    #[test]
    fn test_hamming() {
        assert_eq!(hamming(0, 0), 0);
        assert_eq!(hamming(0b1011, 0b0001), 2);
        assert_eq!(hamming(u64::MAX, 0), 64);
    }

    #[test]
    fn test_sha256_hex() {
        let digest = sha256_hex(b"");
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
