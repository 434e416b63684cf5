use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use ort_bootstrap::ProvisionError;

/// Unpack a `.zip` into `output`, keeping unix permission bits so the
/// extracted launchers stay executable. Entries that would escape `output`
/// are skipped.
pub fn extract_zip(archive_path: &Path, output: &Path) -> Result<usize, ProvisionError> {
    let file = BufReader::new(File::open(archive_path)?);
    let mut archive = zip::ZipArchive::new(file).map_err(io::Error::other)?;
    let mut extracted = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(io::Error::other)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("skipping zip entry with unsafe path: {}", entry.name());
            continue;
        };
        let outpath = output.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)?;
        io::copy(&mut entry, &mut outfile)?;
        extracted += 1;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
            }
        }
    }

    tracing::debug!(
        "extracted {extracted} files from {} into {}",
        archive_path.display(),
        output.display()
    );
    Ok(extracted)
}
