// src/utils/fs.rs

use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::{fs, io::AsyncWriteExt};

/// Replaces `path` with `bytes` so readers see either the old or the new contents.
///
/// Writes to a uniquely named sibling, fsyncs it, renames it over `path`
/// and fsyncs the directory. On failure the sibling is removed and `path`
/// is left as it was. Once the rename succeeds the write has happened, so a
/// failed directory fsync is only logged.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    let tmp = temp_sibling(path);

    if let Err(e) = write_and_rename(&tmp, path, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }

    sync_directory_logged(parent).await;
    Ok(())
}

async fn write_and_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(tmp, path).await
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    path.with_file_name(name)
}

async fn sync_directory_logged(dir: &Path) {
    if let Err(e) = sync_directory(dir).await {
        tracing::warn!("Failed to sync directory {}: {}", dir.display(), e);
    }
}

#[cfg(unix)]
async fn sync_directory(path: &Path) -> io::Result<()> {
    fs::File::open(path).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_directory(_path: &Path) -> io::Result<()> {
    Ok(())
}
