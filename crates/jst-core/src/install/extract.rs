//! Zip extraction with wrapper folder flattening
//!
//! Tag archives from the forge wrap their contents in a single `<repo>-<tag>/`
//! folder. After unpacking, the children of that folder are moved up into the
//! target directory. An archive whose root is not exactly one folder is rejected,
//! and so is one that contains symbolic links.

use super::error::InstallError;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;
use zip::ZipArchive;

/// Unpack `archive` into the fresh directory `target` and flatten its wrapper folder
///
/// `target` must not exist. If anything fails after it was created, it is removed again.
pub fn extract(archive: &Path, target: &Path) -> Result<PathBuf, InstallError> {
    if fs::symlink_metadata(target).is_ok() {
        return Err(InstallError::ModuleAlreadyExists {
            path: target.to_path_buf(),
        });
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| extraction(target, format!("cannot create {}: {}", parent.display(), e)))?;
    }
    fs::create_dir(target).map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            InstallError::ModuleAlreadyExists {
                path: target.to_path_buf(),
            }
        } else {
            extraction(target, format!("cannot create directory: {}", e))
        }
    })?;

    let result = unpack(archive, target).and_then(|entries| {
        debug!(entries, target = %target.display(), "Unpacked archive");
        flatten_wrapper(target)
    });
    if let Err(e) = result {
        let _ = fs::remove_dir_all(target);
        return Err(e);
    }

    Ok(target.to_path_buf())
}

fn unpack(archive_path: &Path, target: &Path) -> Result<usize, InstallError> {
    let file = File::open(archive_path)
        .map_err(|e| extraction(target, format!("cannot open archive: {}", e)))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| extraction(target, format!("invalid zip archive: {}", e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| extraction(target, format!("cannot read entry {}: {}", i, e)))?;

        let relative = entry
            .enclosed_name()
            .ok_or_else(|| extraction(target, format!("unsafe entry path '{}'", entry.name())))?;
        if entry.is_symlink() {
            return Err(extraction(
                target,
                format!("symbolic link entry '{}' is not supported", entry.name()),
            ));
        }
        let out_path = target.join(&relative);
        let write_error =
            |e: io::Error| extraction(target, format!("cannot write {}: {}", relative.display(), e));

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(write_error)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let mut out_file = File::create(&out_path).map_err(write_error)?;
        io::copy(&mut entry, &mut out_file).map_err(write_error)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode)).map_err(write_error)?;
        }
    }

    Ok(archive.len())
}

/// Move the children of the single top-level folder up into `target`
fn flatten_wrapper(target: &Path) -> Result<(), InstallError> {
    let read_error = |e: io::Error| extraction(target, format!("cannot read extracted files: {}", e));

    let entries = fs::read_dir(target)
        .map_err(read_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error)?;

    let wrapper = match entries.as_slice() {
        [only] => only,
        _ => {
            return Err(extraction(
                target,
                format!(
                    "expected a single top-level folder in the archive, found {} entries",
                    entries.len()
                ),
            ))
        }
    };
    if !wrapper.file_type().map_err(read_error)?.is_dir() {
        return Err(extraction(
            target,
            format!(
                "top-level entry '{}' is not a folder",
                wrapper.file_name().to_string_lossy()
            ),
        ));
    }

    // The wrapper may contain a child with its own name, so move it aside first.
    let staged = target.join(format!(".jst-wrapper-{}", Uuid::new_v4()));
    let move_error = |e: io::Error| extraction(target, format!("cannot flatten wrapper folder: {}", e));
    fs::rename(wrapper.path(), &staged).map_err(move_error)?;

    for child in fs::read_dir(&staged).map_err(move_error)? {
        let child = child.map_err(move_error)?;
        fs::rename(child.path(), target.join(child.file_name())).map_err(move_error)?;
    }
    fs::remove_dir(&staged).map_err(move_error)?;

    Ok(())
}

fn extraction(target: &Path, reason: String) -> InstallError {
    InstallError::Extraction {
        path: target.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{module_archive, zip_bytes};

    fn write_archive(dir: &Path, bytes: &[u8]) -> PathBuf {
        let path = dir.join("archive.zip");
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_extract_flattens_wrapper() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = write_archive(tmp.path(), &module_archive("pkg-v1.0.0"));
        let target = tmp.path().join("apps").join("mymod");

        let out = extract(&archive, &target).unwrap();

        assert_eq!(out, target);
        assert_eq!(fs::read_to_string(target.join("a.txt")).unwrap(), "hello");
        assert!(target.join("apps.py").is_file());
        assert!(target.join("models").join("__init__.py").is_file());
        assert!(!target.join("pkg-v1.0.0").exists());
    }

    #[test]
    fn test_extract_without_directory_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let bytes = zip_bytes(&[("repo-main/a.txt", "a"), ("repo-main/sub/b.txt", "b")]);
        let archive = write_archive(tmp.path(), &bytes);
        let target = tmp.path().join("mod");

        extract(&archive, &target).unwrap();
        assert_eq!(fs::read_to_string(target.join("sub").join("b.txt")).unwrap(), "b");
    }

    #[test]
    fn test_wrapper_child_with_wrapper_name() {
        let tmp = tempfile::tempdir().unwrap();
        let bytes = zip_bytes(&[("pkg/", ""), ("pkg/pkg/", ""), ("pkg/pkg/inner.txt", "x")]);
        let archive = write_archive(tmp.path(), &bytes);
        let target = tmp.path().join("mod");

        extract(&archive, &target).unwrap();
        assert_eq!(fs::read_to_string(target.join("pkg").join("inner.txt")).unwrap(), "x");
    }

    #[test]
    fn test_existing_target_is_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = write_archive(tmp.path(), &module_archive("pkg-v1.0.0"));
        let target = tmp.path().join("foo");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), "original").unwrap();

        let err = extract(&archive, &target).unwrap_err();

        assert!(matches!(err, InstallError::ModuleAlreadyExists { .. }));
        assert_eq!(fs::read_to_string(target.join("keep.txt")).unwrap(), "original");
        assert_eq!(fs::read_dir(&target).unwrap().count(), 1);
    }

    #[test]
    fn test_multiple_top_level_entries_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let bytes = zip_bytes(&[("one/a.txt", "a"), ("two/b.txt", "b")]);
        let archive = write_archive(tmp.path(), &bytes);
        let target = tmp.path().join("mod");

        let err = extract(&archive, &target).unwrap_err();
        assert!(matches!(err, InstallError::Extraction { .. }));
        assert!(err.to_string().contains("found 2 entries"));
        assert!(!target.exists());
    }

    #[test]
    fn test_single_file_root_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = write_archive(tmp.path(), &zip_bytes(&[("README.md", "# hi")]));
        let target = tmp.path().join("mod");

        let err = extract(&archive, &target).unwrap_err();
        assert!(err.to_string().contains("is not a folder"));
        assert!(!target.exists());
    }

    #[test]
    fn test_corrupt_archive_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = write_archive(tmp.path(), b"definitely not a zip file");
        let target = tmp.path().join("mod");

        let err = extract(&archive, &target).unwrap_err();
        assert!(matches!(err, InstallError::Extraction { .. }));
        assert!(!target.exists());
    }

    #[test]
    fn test_symlink_entry_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut buffer = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(io::Cursor::new(&mut buffer));
            let options = zip::write::SimpleFileOptions::default();
            zip.add_directory("pkg/", options).unwrap();
            zip.add_symlink("pkg/passwd", "/etc/passwd", options).unwrap();
            zip.finish().unwrap();
        }
        let archive = write_archive(tmp.path(), &buffer);
        let target = tmp.path().join("mod");

        let err = extract(&archive, &target).unwrap_err();
        assert!(err.to_string().contains("symbolic link entry"));
        assert!(!target.exists());
    }

    #[test]
    fn test_escaping_entry_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let bytes = zip_bytes(&[("pkg/a.txt", "a"), ("../evil.txt", "evil")]);
        let archive = write_archive(tmp.path(), &bytes);
        let target = tmp.path().join("apps").join("mod");

        let err = extract(&archive, &target).unwrap_err();
        assert!(err.to_string().contains("unsafe entry path"));
        assert!(!tmp.path().join("apps").join("evil.txt").exists());
        assert!(!target.exists());
    }
}
