//! Persistence helper for rendered images

use std::path::{Path, PathBuf};

use crate::error::RendererResult;
use crate::types::RenderResponse;

/// Write the response's image to `<path_stem>.<format>`, creating parent
/// directories as needed.
///
/// Returns the written path, or `None` when the response carries no image
/// (every failure response does not).
pub async fn save_image(
    path_stem: impl AsRef<Path>,
    response: &RenderResponse,
) -> RendererResult<Option<PathBuf>> {
    let Some(image) = response.image.as_ref() else {
        return Ok(None);
    };

    let mut path = path_stem.as_ref().as_os_str().to_owned();
    path.push(".");
    path.push(response.format.extension());
    let path = PathBuf::from(path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(&path, image).await?;

    Ok(Some(path))
}
