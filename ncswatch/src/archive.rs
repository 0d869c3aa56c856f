//! Zip archive of the working directory.

use std::fs::File;
use std::io;
use std::path::Path;

use log::debug;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::ArchiveError;

/// Zip everything under `source_dir` into `output_path`.
///
/// Entries are stored with paths relative to `source_dir`, `/`-separated,
/// directories included, in sorted order. Symbolic links are not followed
/// and are left out of the archive.
pub fn create(output_path: &Path, source_dir: &Path) -> Result<(), ArchiveError> {
    // Listed before the zip file exists, so an output inside source_dir is
    // never archived into itself.
    let entries = WalkDir::new(source_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    let file = File::create(output_path).map_err(|source| ArchiveError::Io {
        path: output_path.to_path_buf(),
        source,
    })?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        let path = entry.path();
        let name = entry_name(source_dir, path);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            debug!("archive dir {}", name);
            zip.add_directory(name, options)?;
        } else if file_type.is_file() {
            debug!("archive file {}", name);
            zip.start_file(name, options)?;
            let io_err = |source| ArchiveError::Io {
                path: path.to_path_buf(),
                source,
            };
            let mut input = File::open(path).map_err(io_err)?;
            io::copy(&mut input, &mut zip).map_err(io_err)?;
        } else {
            debug!("skipping {} (not a regular file)", name);
        }
    }

    zip.finish()?;
    Ok(())
}

fn entry_name(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;

    #[test]
    fn test_archive_contents() {
        let source = tempfile::tempdir().unwrap();
        fs::create_dir_all(source.path().join("r1")).unwrap();
        fs::create_dir_all(source.path().join("r2")).unwrap();
        fs::write(source.path().join("r1").join("log.txt"), "### r1 - show clock ###").unwrap();
        fs::write(source.path().join("r2").join("log.txt"), "").unwrap();

        let out = tempfile::tempdir().unwrap();
        let archive_path = out.path().join("out.zip");
        create(&archive_path, source.path()).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let names: Vec<_> = archive.file_names().map(str::to_string).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["r1/", "r1/log.txt", "r2/", "r2/log.txt"]);

        let mut text = String::new();
        archive
            .by_name("r1/log.txt")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "### r1 - show clock ###");
    }

    #[test]
    fn test_missing_source() {
        let out = tempfile::tempdir().unwrap();
        let err = create(&out.path().join("out.zip"), Path::new("/nonexistent/ncswatch")).unwrap_err();
        assert!(matches!(err, ArchiveError::Walk(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_skipped() {
        let source = tempfile::tempdir().unwrap();
        fs::create_dir_all(source.path().join("r1")).unwrap();
        fs::write(source.path().join("r1").join("log.txt"), "x").unwrap();
        std::os::unix::fs::symlink(source.path(), source.path().join("r1").join("loop")).unwrap();

        let out = tempfile::tempdir().unwrap();
        let archive_path = out.path().join("out.zip");
        create(&archive_path, source.path()).unwrap();

        let archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["r1/", "r1/log.txt"]);
    }

    #[test]
    fn test_output_inside_source() {
        let source = tempfile::tempdir().unwrap();
        fs::create_dir_all(source.path().join("r1")).unwrap();
        fs::write(source.path().join("r1").join("log.txt"), "x").unwrap();

        let archive_path = source.path().join("out.zip");
        create(&archive_path, source.path()).unwrap();

        let archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
    }
}
