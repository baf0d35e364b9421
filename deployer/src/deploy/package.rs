//! Packaging of the publish folder into a deployable archive

use std::io;
use std::path::Path;

use tokio::task::spawn_blocking;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Zip the contents of `src` into `archive`. Returns the number of files written.
pub async fn zip_directory(src: &Dir, archive: &File) -> Result<usize, DeployError> {
    let src = src.path().to_owned();
    let dest = archive.path().to_owned();
    spawn_blocking(move || zip_directory_sync(&src, &dest)).await?
}

fn zip_directory_sync(src: &Path, dest: &Path) -> Result<usize, DeployError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = ZipWriter::new(std::fs::File::create(dest)?);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut files = 0;
    let mut pending = vec![src.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = std::fs::read_dir(&dir)?.collect::<Result<Vec<_>, io::Error>>()?;
        entries.sort_by_key(|e| e.path());

        for entry in entries {
            let path = entry.path();
            let name = archive_name(src, &path)?;
            if entry.file_type()?.is_dir() {
                writer.add_directory(format!("{}/", name), options)?;
                pending.push(path);
            } else {
                writer.start_file(name, options)?;
                let mut file = std::fs::File::open(&path)?;
                io::copy(&mut file, &mut writer)?;
                files += 1;
            }
        }
    }

    writer.finish()?;
    debug!(files, archive = %dest.display(), "created archive");
    Ok(files)
}

/// Entry name relative to the archive root, always `/`-separated
fn archive_name(root: &Path, path: &Path) -> Result<String, DeployError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| DeployError::Internal(e.to_string()))?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/"))
}
