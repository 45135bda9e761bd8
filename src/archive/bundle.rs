//! Zip packaging of a run directory

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use self::walk::collect_entries;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Summary of a written archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipSummary {
    pub path: PathBuf,
    pub files: usize,
    pub directories: usize,
}

/// Zips `source_dir` recursively into `dest`
///
/// Entry names are prefixed with the source directory's own name, so a
/// run folder `2024-05-01_120000` unpacks back into a folder of that name.
/// Entries are written in sorted order with a fixed timestamp, so the same
/// tree always yields the same archive. Empty directories are kept.
///
/// This is blocking; call it from `spawn_blocking` in async code.
pub fn create_zip(source_dir: &Path, dest: &Path) -> zip::result::ZipResult<ZipSummary> {
    let base = source_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no directory name", source_dir.display()),
            )
        })?;

    let entries = collect_entries(source_dir)?;

    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut summary = ZipSummary {
        path: dest.to_path_buf(),
        files: 0,
        directories: 0,
    };

    zip.add_directory(format!("{}/", base), options)?;
    for entry in entries {
        let name = format!("{}/{}", base, entry.relative);
        if entry.is_dir {
            zip.add_directory(format!("{}/", name), options)?;
            summary.directories += 1;
        } else {
            zip.start_file(name, options)?;
            let mut source = File::open(&entry.path)?;
            io::copy(&mut source, &mut zip)?;
            summary.files += 1;
        }
    }

    zip.finish()?.flush()?;
    Ok(summary)
}

mod walk {
    use std::io;
    use std::path::{Path, PathBuf};

    pub struct Entry {
        pub path: PathBuf,
        /// `/`-separated path relative to the walk root
        pub relative: String,
        pub is_dir: bool,
    }

    /// Lists every file and directory below `root`, depth first, sorted by
    /// name at each level
    pub fn collect_entries(root: &Path) -> io::Result<Vec<Entry>> {
        let mut entries = Vec::new();
        walk_dir(root, "", &mut entries)?;
        Ok(entries)
    }

    fn walk_dir(dir: &Path, prefix: &str, out: &mut Vec<Entry>) -> io::Result<()> {
        let mut children = std::fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
        children.sort_by_key(|child| child.file_name());

        for child in children {
            let name = child.file_name().to_string_lossy().into_owned();
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };
            let is_dir = child.file_type()?.is_dir();
            let path = child.path();

            out.push(Entry {
                path: path.clone(),
                relative: relative.clone(),
                is_dir,
            });
            if is_dir {
                walk_dir(&path, &relative, out)?;
            }
        }
        Ok(())
    }
}
