use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::report::Reporter;
use crate::util::extraction_dir;

/// Unpacks `dir/<resource_id>` into `dir/<resource_id without extension>`.
///
/// A corrupt archive is an [`Error::Archive`]; whatever was already written stays on disk.
pub fn extract_product(
    dir: &Path,
    resource_id: &str,
    reporter: &mut dyn Reporter,
) -> Result<PathBuf> {
    let archive_path = dir.join(resource_id);
    let destination = extraction_dir(dir, resource_id);
    reporter.message("Extracting product archive...");

    extract_zip(&archive_path, &destination)?;

    reporter.message(&format!("Product extracted to: {}", destination.display()));
    Ok(destination)
}

fn extract_zip(archive_path: &Path, destination: &Path) -> Result<()> {
    let archive_error = |detail: String| Error::Archive {
        archive: archive_path.to_path_buf(),
        detail,
    };

    let file = File::open(archive_path).map_err(|e| archive_error(e.to_string()))?;
    let mut archive = ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;
    std::fs::create_dir_all(destination)?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| archive_error(e.to_string()))?;
        let outpath = match entry.enclosed_name() {
            Some(path) => destination.join(path),
            None => {
                warn!(entry = entry.name(), "skipping archive entry with unsafe path");
                continue;
            }
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)?;
        std::io::copy(&mut entry, &mut outfile)
            .map_err(|e| archive_error(format!("{}: {}", outpath.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
            }
        }
    }

    debug!(archive = %archive_path.display(), entries = archive.len(), "archive extracted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zw = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            zw.start_file(*name, SimpleFileOptions::default()).unwrap();
            zw.write_all(data).unwrap();
        }
        zw.finish().unwrap();
    }

    #[test]
    fn extracts_next_to_archive_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_zip(
            &dir.path().join("R1.zip"),
            &[
                ("DIM.XML", &b"<dim/>"[..]),
                ("IMG/tile_R1C1.JP2", &b"jp2"[..]),
            ],
        );

        let mut messages = Vec::new();
        let mut reporter = |m: &str| messages.push(m.to_string());
        let out = extract_product(dir.path(), "R1.zip", &mut reporter).unwrap();

        assert_eq!(out, dir.path().join("R1"));
        assert_eq!(std::fs::read(out.join("DIM.XML")).unwrap(), b"<dim/>");
        assert_eq!(
            std::fs::read(out.join("IMG").join("tile_R1C1.JP2")).unwrap(),
            b"jp2"
        );
        assert_eq!(messages[0], "Extracting product archive...");
        assert!(messages[1].starts_with("Product extracted to:"));
    }

    #[test]
    fn corrupt_archive_is_reported_without_success_message() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("R2.zip"), b"this is not a zip").unwrap();

        let mut messages = Vec::new();
        let mut reporter = |m: &str| messages.push(m.to_string());
        let err = extract_product(dir.path(), "R2.zip", &mut reporter).unwrap_err();

        assert!(matches!(err, Error::Archive { .. }));
        assert!(!messages.iter().any(|m| m.starts_with("Product extracted")));
    }

    #[test]
    fn missing_archive_is_an_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut quiet = |_: &str| {};
        assert!(matches!(
            extract_product(dir.path(), "absent.zip", &mut quiet),
            Err(Error::Archive { .. })
        ));
    }
}
