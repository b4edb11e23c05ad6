//! Content address of a render job.
//!
//! Frames are cached under `{tmp_root}/{fingerprint}/`; any change to a parameter that
//! affects pixels, or to the resolved image list, moves the job to a fresh directory.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use sha2::Digest as _;

use crate::foundation::error::ZoomResult;

#[derive(serde::Serialize)]
struct FingerprintInput<'a, P> {
    params: &'a P,
    images: Vec<String>,
}

/// Hex SHA-256 over the canonical JSON of `params` followed by the image paths.
pub fn job_fingerprint<P: serde::Serialize>(
    params: &P,
    image_paths: &[PathBuf],
) -> ZoomResult<String> {
    let input = FingerprintInput {
        params,
        images: image_paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect(),
    };
    let bytes = serde_json::to_vec(&input).context("serialize job parameters for hashing")?;
    Ok(sha256_hex(&bytes))
}

pub fn job_dir(tmp_root: &Path, fingerprint: &str) -> PathBuf {
    tmp_root.join(fingerprint)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
