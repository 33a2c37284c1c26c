//! Tarball extraction and creation.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::Archive;
use walkdir::WalkDir;

fn open_archive(path: &Path) -> Result<Archive<GzDecoder<BufReader<File>>>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open archive: {}", path.display()))?;
    Ok(Archive::new(GzDecoder::new(BufReader::new(file))))
}

/// Normalize an entry path to forward slashes without a leading `./`.
fn normalized_entry_path(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    text.trim_start_matches("./").to_string()
}

/// Whether a relative path stays below the directory it is joined to.
fn is_contained(relative: &Path) -> bool {
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Names of every entry in a gzipped tarball, normalized.
pub fn list_entries(path: &Path) -> Result<Vec<String>> {
    let mut archive = open_archive(path)?;
    let mut names = Vec::new();

    for entry in archive
        .entries()
        .with_context(|| format!("failed to read entries of {}", path.display()))?
    {
        let entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry.path().context("failed to get entry path")?;
        names.push(normalized_entry_path(&entry_path));
    }

    Ok(names)
}

/// Read a single file out of a gzipped tarball.
pub fn read_entry(path: &Path, wanted: &str) -> Result<Option<Vec<u8>>> {
    let mut archive = open_archive(path)?;

    for entry in archive
        .entries()
        .with_context(|| format!("failed to read entries of {}", path.display()))?
    {
        let mut entry = entry.context("failed to read tarball entry")?;
        let name = normalized_entry_path(&entry.path().context("failed to get entry path")?);
        if name == wanted {
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .with_context(|| format!("failed to read `{}` from {}", wanted, path.display()))?;
            return Ok(Some(data));
        }
    }

    Ok(None)
}

/// Extract a gzipped tarball into `dest`.
///
/// When `strip_prefix` is given, that leading directory is removed from
/// every entry; entries outside it are extracted as-is. Entries that would
/// land outside `dest` and link entries are rejected.
pub fn extract_tarball(path: &Path, dest: &Path, strip_prefix: Option<&str>) -> Result<()> {
    let mut archive = open_archive(path)?;

    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create destination directory: {}", dest.display()))?;

    for entry in archive
        .entries()
        .with_context(|| format!("failed to read entries of {}", path.display()))?
    {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_name = normalized_entry_path(&entry.path().context("failed to get entry path")?);

        let relative = match strip_prefix.map(|p| p.trim_end_matches('/')) {
            Some(prefix) if entry_name.trim_end_matches('/') == prefix => continue,
            Some(prefix) => match entry_name.strip_prefix(&format!("{}/", prefix)) {
                Some(stripped) => stripped.to_string(),
                None => entry_name.clone(),
            },
            None => entry_name.clone(),
        };

        if relative.is_empty() {
            continue;
        }

        let relative = PathBuf::from(relative);
        if relative.is_absolute() || !is_contained(&relative) {
            bail!("tarball entry escapes destination directory: {}", entry_name);
        }
        let output_path = dest.join(&relative);

        match entry.header().entry_type() {
            tar::EntryType::Directory => {
                std::fs::create_dir_all(&output_path).with_context(|| {
                    format!("failed to create directory: {}", output_path.display())
                })?;
            }
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                if let Some(parent) = output_path.parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create directory: {}", parent.display())
                    })?;
                }
                entry.unpack(&output_path).with_context(|| {
                    format!("failed to extract file: {}", output_path.display())
                })?;
            }
            tar::EntryType::Symlink | tar::EntryType::Link => {
                bail!("tarball contains a link entry, refusing to extract: {}", entry_name);
            }
            other => {
                tracing::debug!("skipping tarball entry {} of type {:?}", entry_name, other);
            }
        }
    }

    Ok(())
}

/// Pack `src_dir` into a gzipped tarball at `dest`, placing every file under
/// `prefix/`. Version-control metadata directories are skipped.
pub fn build_tarball_from_dir(src_dir: &Path, dest: &Path, prefix: &str) -> Result<()> {
    if let Some(parent) = dest.parent() {
        crate::util::fs::ensure_dir(parent)?;
    }

    let file = File::create(dest)
        .with_context(|| format!("failed to create archive: {}", dest.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    let walker = WalkDir::new(src_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", src_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = crate::util::fs::relative_path(src_dir, entry.path());
        let name = Path::new(prefix).join(&relative);
        builder
            .append_path_with_name(entry.path(), &name)
            .with_context(|| format!("failed to add {} to archive", relative.display()))?;
    }

    builder
        .into_inner()
        .context("failed to finish archive")?
        .finish()
        .context("failed to finish gzip stream")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{raw_tarball, CollectionFixture};
    use tempfile::TempDir;

    #[test]
    fn test_extract_with_strip_prefix() {
        let tmp = TempDir::new().unwrap();
        let artifact = CollectionFixture::new("acme", "widgets", "1.0.0").write_to(tmp.path());
        let dest = tmp.path().join("out");

        extract_tarball(&artifact, &dest, Some("acme-widgets-1.0.0")).unwrap();

        assert!(dest.join("collection.toml").exists());
        assert!(dest.join("plugins/modules/widgets.py").exists());
        assert!(!dest.join("acme-widgets-1.0.0").exists());
    }

    #[test]
    fn test_extract_rejects_escaping_entries() {
        let tmp = TempDir::new().unwrap();
        let artifact = tmp.path().join("evil.tar.gz");
        std::fs::write(&artifact, raw_tarball(&[("top/../../evil.txt", "boom")])).unwrap();

        let dest = tmp.path().join("a/b");
        let err = extract_tarball(&artifact, &dest, Some("top")).unwrap_err();
        assert!(err.to_string().contains("escapes destination"));
        assert!(!tmp.path().join("evil.txt").exists());
        assert!(!tmp.path().join("a/evil.txt").exists());
    }

    #[test]
    fn test_read_entry() {
        let tmp = TempDir::new().unwrap();
        let artifact = CollectionFixture::new("acme", "widgets", "1.0.0").write_to(tmp.path());

        let manifest = read_entry(&artifact, "acme-widgets-1.0.0/collection.toml").unwrap();
        assert!(String::from_utf8(manifest.unwrap()).unwrap().contains("widgets"));
        assert!(read_entry(&artifact, "nope").unwrap().is_none());
    }

    #[test]
    fn test_build_tarball_skips_git_dir() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        CollectionFixture::new("acme", "widgets", "2.0.0").write_tree(&src);
        std::fs::create_dir_all(src.join(".git")).unwrap();
        std::fs::write(src.join(".git/HEAD"), "ref: refs/heads/main").unwrap();

        let dest = tmp.path().join("out/acme-widgets-2.0.0.tar.gz");
        build_tarball_from_dir(&src, &dest, "acme-widgets-2.0.0").unwrap();

        let entries = list_entries(&dest).unwrap();
        assert!(entries.contains(&"acme-widgets-2.0.0/collection.toml".to_string()));
        assert!(entries.iter().all(|e| !e.contains(".git/")));
    }
}
