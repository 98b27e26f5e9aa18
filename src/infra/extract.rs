//! Archive extraction
//!
//! Unpacks `.tar.gz`/`.tgz`, `.tar` and `.zip` source archives. When every
//! entry sits under one top-level directory (the usual `name-version/`
//! layout) that directory is stripped so the tree lands directly in the
//! destination. Extraction replaces whatever was at the destination before.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, info};

use crate::error::ExtractError;

/// Archive formats we can unpack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Tar,
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from the file name
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

/// Unpack `archive` into `dest`, replacing any previous tree
pub fn unpack_archive(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    let format = ArchiveFormat::detect(archive).ok_or_else(|| ExtractError::UnsupportedFormat {
        path: archive.to_path_buf(),
    })?;

    if dest.exists() {
        debug!("Replacing existing tree at {}", dest.display());
        fs::remove_dir_all(dest).map_err(|e| io_error(dest, &e))?;
    }
    fs::create_dir_all(dest).map_err(|e| io_error(dest, &e))?;

    let result = match format {
        ArchiveFormat::TarGz => unpack_tar(archive, dest, |f| Box::new(GzDecoder::new(f))),
        ArchiveFormat::Tar => unpack_tar(archive, dest, |f| Box::new(f)),
        ArchiveFormat::Zip => unpack_zip(archive, dest),
    };

    if result.is_err() {
        // Leave no half-extracted tree behind
        let _ = fs::remove_dir_all(dest);
    }
    result?;

    info!("Unpacked {} to {}", archive.display(), dest.display());
    Ok(())
}

type TarReader = Box<dyn Read>;

fn open_tar(
    archive: &Path,
    wrap: &dyn Fn(BufReader<File>) -> TarReader,
) -> Result<Archive<TarReader>, ExtractError> {
    let file = File::open(archive).map_err(|e| io_error(archive, &e))?;
    Ok(Archive::new(wrap(BufReader::new(file))))
}

fn unpack_tar(
    archive: &Path,
    dest: &Path,
    wrap: impl Fn(BufReader<File>) -> TarReader,
) -> Result<(), ExtractError> {
    // First pass: decide whether there is a single top-level directory
    let mut paths = Vec::new();
    let mut listing = open_tar(archive, &wrap)?;
    for entry in listing.entries().map_err(|e| corrupt(archive, &e))? {
        let entry = entry.map_err(|e| corrupt(archive, &e))?;
        if is_pax_metadata(&entry) {
            continue;
        }
        paths.push(entry.path().map_err(|e| corrupt(archive, &e))?.into_owned());
    }
    let strip = single_root(&paths);

    let mut tar = open_tar(archive, &wrap)?;
    for entry in tar.entries().map_err(|e| corrupt(archive, &e))? {
        let mut entry = entry.map_err(|e| corrupt(archive, &e))?;
        if is_pax_metadata(&entry) {
            continue;
        }
        let path = entry.path().map_err(|e| corrupt(archive, &e))?.into_owned();

        let Some(relative) = relative_path(&path, strip) else {
            continue;
        };
        let dest_path = dest.join(&relative);

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, &e))?;
        }

        entry
            .unpack(&dest_path)
            .map_err(|e| io_error(&dest_path, &e))?;
    }

    Ok(())
}

/// `git archive` (and so every GitHub `/archive/` tarball) leads with a
/// `pax_global_header` entry that carries the commit id; it is not a file
fn is_pax_metadata<R: Read>(entry: &tar::Entry<'_, R>) -> bool {
    let kind = entry.header().entry_type();
    kind.is_pax_global_extensions() || kind.is_pax_local_extensions()
}

fn unpack_zip(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive).map_err(|e| io_error(archive, &e))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(archive, &e))?;

    let paths: Vec<PathBuf> = (0..zip.len())
        .filter_map(|i| zip.by_index(i).ok().and_then(|f| f.enclosed_name()))
        .collect();
    let strip = single_root(&paths);

    for i in 0..zip.len() {
        let mut file = zip.by_index(i).map_err(|e| corrupt(archive, &e))?;
        let Some(path) = file.enclosed_name() else {
            continue;
        };
        let Some(relative) = relative_path(&path, strip) else {
            continue;
        };
        let dest_path = dest.join(&relative);

        if file.is_dir() {
            fs::create_dir_all(&dest_path).map_err(|e| io_error(&dest_path, &e))?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, &e))?;
        }
        let mut outfile = File::create(&dest_path).map_err(|e| io_error(&dest_path, &e))?;
        io::copy(&mut file, &mut outfile).map_err(|e| corrupt(archive, &e))?;

        // Keep the executable bit of configure scripts
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode))
                    .map_err(|e| io_error(&dest_path, &e))?;
            }
        }
    }

    Ok(())
}

/// True when every path lives under the same first component and at least
/// one path goes deeper than it
fn single_root(paths: &[PathBuf]) -> bool {
    let mut root = None;
    let mut nested = false;
    for path in paths {
        let mut components = path.components().filter(|c| !matches!(c, Component::CurDir));
        let Some(first) = components.next() else {
            continue;
        };
        match root {
            None => root = Some(first),
            Some(r) if r != first => return false,
            Some(_) => {}
        }
        if components.next().is_some() {
            nested = true;
        }
    }
    root.is_some() && nested
}

/// Path relative to the destination, or `None` for entries to skip
fn relative_path(path: &Path, strip: bool) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if components
        .iter()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return None;
    }
    let relative: PathBuf = components.into_iter().skip(usize::from(strip)).collect();
    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

fn io_error(path: &Path, e: &io::Error) -> ExtractError {
    ExtractError::IoError {
        path: path.to_path_buf(),
        error: e.to_string(),
    }
}

fn corrupt(path: &Path, e: &dyn std::fmt::Display) -> ExtractError {
    ExtractError::Corrupt {
        path: path.to_path_buf(),
        error: e.to_string(),
    }
}
