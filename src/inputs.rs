use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    engine::Raster,
    foundation::error::{ZoomError, ZoomResult},
};

/// Expand the user's inputs into an ordered list of candidate image files.
///
/// Files are taken as is; a directory contributes its direct children sorted by name.
pub fn resolve_image_paths(inputs: &[PathBuf]) -> ZoomResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_file() {
            out.push(input.clone());
        } else if input.is_dir() {
            out.extend(sorted_children(input)?);
        } else {
            return Err(ZoomError::config(format!(
                "input '{}' is neither a file nor a directory",
                input.display()
            )));
        }
    }
    Ok(out)
}

fn sorted_children(dir: &Path) -> ZoomResult<Vec<PathBuf>> {
    let mut children = std::fs::read_dir(dir)
        .with_context(|| format!("read directory '{}'", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("list directory '{}'", dir.display()))?;
    children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(children)
}

/// Decoded images together with the paths they came from.
#[derive(Debug)]
pub struct LoadedImages<R> {
    pub images: Vec<R>,
    pub paths: Vec<PathBuf>,
}

/// Decode every supported path; unsupported formats are skipped with a warning.
pub fn load_images<R: Raster>(paths: &[PathBuf]) -> ZoomResult<LoadedImages<R>> {
    tracing::info!(files = paths.len(), "reading image files");
    let mut images = Vec::with_capacity(paths.len());
    let mut used = Vec::with_capacity(paths.len());
    for path in paths {
        match R::load(path) {
            Ok(img) => {
                images.push(img);
                used.push(path.clone());
            }
            Err(ZoomError::UnsupportedFormat(p)) => {
                tracing::warn!(path = %p.display(), "unsupported file type, skipping");
            }
            Err(e) => return Err(e),
        }
    }

    if images.len() < 2 {
        return Err(ZoomError::config(format!(
            "at least two images are required to create a zoom video, found {} usable",
            images.len()
        )));
    }

    Ok(LoadedImages {
        images,
        paths: used,
    })
}
