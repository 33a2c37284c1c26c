//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Remove a directory only if it is empty. Returns whether it was removed.
pub fn remove_dir_if_empty(path: &Path) -> Result<bool> {
    let is_empty = fs::read_dir(path)
        .with_context(|| format!("failed to read directory: {}", path.display()))?
        .next()
        .is_none();

    if is_empty {
        fs::remove_dir(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(is_empty)
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Copy a file into a directory, keeping its file name.
pub fn copy_into(file: &Path, dir: &Path) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let file_name = file
        .file_name()
        .with_context(|| format!("not a file path: {}", file.display()))?;
    let dest = dir.join(file_name);

    fs::copy(file, &dest)
        .with_context(|| format!("failed to copy {} to {}", file.display(), dest.display()))?;
    Ok(dest)
}

/// Immediate subdirectories of `path`, sorted by name.
pub fn sorted_subdirs(path: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in
        fs::read_dir(path).with_context(|| format!("failed to read directory: {}", path.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// All files below `root`, as paths relative to `root`, sorted.
pub fn list_files_relative(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_file() {
            files.push(relative_path(root, entry.path()));
        }
    }
    Ok(files)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_files_relative() {
        let tmp = TempDir::new().unwrap();
        write_string(&tmp.path().join("b/inner.txt"), "x").unwrap();
        write_string(&tmp.path().join("a.txt"), "y").unwrap();

        let files = list_files_relative(tmp.path()).unwrap();
        assert_eq!(files, vec![PathBuf::from("a.txt"), PathBuf::from("b/inner.txt")]);
    }

    #[test]
    fn test_sorted_subdirs_skips_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("zeta")).unwrap();
        fs::create_dir_all(tmp.path().join("alpha")).unwrap();
        fs::write(tmp.path().join("file.txt"), "x").unwrap();

        let dirs = sorted_subdirs(tmp.path()).unwrap();
        let names: Vec<_> = dirs
            .iter()
            .map(|d| d.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_remove_dir_if_empty() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty");
        let full = tmp.path().join("full");
        fs::create_dir_all(&empty).unwrap();
        write_string(&full.join("f"), "x").unwrap();

        assert!(remove_dir_if_empty(&empty).unwrap());
        assert!(!empty.exists());
        assert!(!remove_dir_if_empty(&full).unwrap());
        assert!(full.exists());
    }

    #[test]
    fn test_copy_into() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("artifact.tar.gz");
        fs::write(&src, b"bytes").unwrap();

        let dest = copy_into(&src, &tmp.path().join("out")).unwrap();
        assert_eq!(dest, tmp.path().join("out/artifact.tar.gz"));
        assert_eq!(fs::read(dest).unwrap(), b"bytes");
    }
}
