//! Filesystem operations
//!
//! Handles file and directory operations, including the filtered tree copies
//! recipes use to install headers and libraries.

use std::path::Path;

use walkdir::WalkDir;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::RemoveDir {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Remove one file; a file that is already gone is not an error
pub fn remove_file(path: &Path) -> Result<(), FilesystemError> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(FilesystemError::RemoveFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Copy a single file, creating the destination's parent directories
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    std::fs::copy(from, to).map_err(|e| FilesystemError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(())
}

/// Which files a tree copy keeps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyFilter {
    /// Every regular file
    All,
    /// Files whose extension (without the dot, case-insensitive) is listed
    Extensions(Vec<String>),
}

impl CopyFilter {
    /// Build an extension allowlist
    pub fn extensions(exts: &[&str]) -> Self {
        Self::Extensions(
            exts.iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        )
    }

    /// Common C/C++ header extensions
    pub fn headers() -> Self {
        Self::extensions(&["h", "hpp", "hh", "hxx", "inl", "ipp"])
    }

    fn accepts(&self, path: &Path) -> bool {
        match self {
            Self::All => true,
            Self::Extensions(allowed) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .is_some_and(|ext| allowed.iter().any(|a| *a == ext)),
        }
    }
}

/// Recursively copy files from `src` into `dst`, keeping relative paths.
///
/// With `cleanup` the destination is removed first, so the result mirrors
/// exactly what the filter selects; without it files are merged in.
/// Returns the number of files copied.
pub fn filter_copy(
    src: &Path,
    dst: &Path,
    filter: &CopyFilter,
    cleanup: bool,
) -> Result<usize, FilesystemError> {
    if cleanup {
        remove_dir_all(dst)?;
    }
    create_dir_all(dst)?;

    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| FilesystemError::ReadFile {
            path: src.to_path_buf(),
            error: e.to_string(),
        })?;
        if !entry.file_type().is_file() || !filter.accepts(entry.path()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        copy_file(entry.path(), &dst.join(relative))?;
        copied += 1;
    }

    Ok(copied)
}

/// Mirror a recipe's source tree into its build directory for in-source builds
pub fn copy_sources_to_build(source_dir: &Path, build_dir: &Path) -> Result<usize, FilesystemError> {
    filter_copy(source_dir, build_dir, &CopyFilter::All, true)
}
