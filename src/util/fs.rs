//! Filesystem utilities.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Recursively copy a directory, leaving out sub-directories named in `skip`.
pub fn copy_dir_all(src: &Path, dst: &Path, skip: &[&str]) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            if skip.iter().any(|name| entry.file_name() == *name) {
                continue;
            }
            copy_dir_all(&src_path, &dst_path, skip)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
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
    fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Read a file as raw bytes.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    write_bytes(path, contents.as_bytes())
}

/// Write bytes through a temp file in the same directory, then rename.
///
/// Readers never observe a half-written bundle.
pub fn write_bytes(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    Ok(())
}

/// Sorted file and sub-directory names of a directory.
pub fn list_dir(path: &Path) -> Result<(Vec<String>, Vec<String>)> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();

    for entry in fs::read_dir(path)
        .with_context(|| format!("failed to read directory: {}", path.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() {
            dirs.push(name);
        } else {
            files.push(name);
        }
    }

    files.sort();
    dirs.sort();
    Ok((files, dirs))
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in glob(&pattern_str)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Resolve `path` against `base` and normalise `.` and `..` lexically.
///
/// The path does not need to exist.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Render a relative path with `/` separators on every platform.
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// File name of a path as an owned string (empty if none).
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_files() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("macros");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("mf_abort.sas"), "%macro mf_abort;%mend;").unwrap();
        fs::write(src.join("nested/mp_init.sas"), "%macro mp_init;%mend;").unwrap();
        fs::write(src.join("readme.md"), "readme").unwrap();

        let files = glob_files(tmp.path(), &["macros/**/*.sas".to_string()]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_copy_dir_all() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        fs::create_dir_all(src.join("admin")).unwrap();
        fs::create_dir_all(src.join(".git")).unwrap();
        fs::write(src.join("admin/file.sas"), "content").unwrap();
        fs::write(src.join(".git/HEAD"), "ref").unwrap();

        copy_dir_all(&src, &dst, &[".git"]).unwrap();

        assert_eq!(
            fs::read_to_string(dst.join("admin/file.sas")).unwrap(),
            "content"
        );
        assert!(!dst.join(".git").exists());
    }

    #[test]
    fn test_write_bytes_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a/b/out.json");
        write_string(&path, "{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        write_string(&path, "[]").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn test_list_dir_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.sas"), "").unwrap();
        fs::write(tmp.path().join("a.sas"), "").unwrap();
        fs::create_dir(tmp.path().join("z")).unwrap();
        fs::create_dir(tmp.path().join("m")).unwrap();

        let (files, dirs) = list_dir(tmp.path()).unwrap();
        assert_eq!(files, vec!["a.sas", "b.sas"]);
        assert_eq!(dirs, vec!["m", "z"]);
    }

    #[test]
    fn test_absolutize() {
        let base = Path::new("/project");
        assert_eq!(
            absolutize(base, Path::new("./sasjs/../sasjs/services")),
            PathBuf::from("/project/sasjs/services")
        );
        assert_eq!(
            absolutize(base, Path::new("/abs/macros")),
            PathBuf::from("/abs/macros")
        );
    }

    #[test]
    fn test_to_slash_path() {
        let p = Path::new("services").join("admin").join("x.sas");
        assert_eq!(to_slash_path(&p), "services/admin/x.sas");
    }
}
