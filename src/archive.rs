//! Path-safety-checked tar extraction
//!
//! `tar::Archive::unpack` trusts the archive. Gem payloads are untrusted
//! input, so entries are walked one at a time and rejected before any
//! bytes touch the filesystem.

use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::EntryType;
use thiserror::Error;

/// Reject any single entry larger than this many bytes.
pub const MAX_ENTRY_SIZE: u64 = 100 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("entry {path} has an absolute path")]
    AbsolutePath { path: String },

    #[error("entry {path} contains a '..' component")]
    PathTraversal { path: String },

    #[error("entry {path} is a disallowed type ({kind})")]
    DisallowedEntryType { path: String, kind: &'static str },

    #[error("symlink {path} target escapes the destination directory")]
    SymlinkEscape { path: String },

    #[error("entry {path} exceeds the {MAX_ENTRY_SIZE} byte ceiling")]
    EntryTooLarge { path: String },

    #[error("IO error extracting {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Extract every entry of `archive` into `dest_dir`, enforcing the
/// security contract: no absolute paths, no `..` components, no hard
/// links/device files/FIFOs, no symlink targets that escape `dest_dir`,
/// and a per-entry size ceiling.
///
/// # Errors
///
/// Returns an error if any entry fails the safety checks, or if reading
/// from the archive or writing to `dest_dir` fails.
pub fn extract_safely<R: Read>(
    archive: &mut tar::Archive<R>,
    dest_dir: &Path,
) -> Result<(), ArchiveError> {
    fs::create_dir_all(dest_dir).map_err(|e| ArchiveError::Io {
        path: dest_dir.display().to_string(),
        source: e,
    })?;

    for entry_result in archive.entries().map_err(|e| ArchiveError::Io {
        path: dest_dir.display().to_string(),
        source: e,
    })? {
        let mut entry = entry_result.map_err(|e| ArchiveError::Io {
            path: dest_dir.display().to_string(),
            source: e,
        })?;

        let raw_path = entry.path().map_err(|e| ArchiveError::Io {
            path: dest_dir.display().to_string(),
            source: e,
        })?;
        let display_path = raw_path.display().to_string();

        let safe_rel = sanitize_path(&raw_path, &display_path)?;

        let size = entry.header().size().map_err(|e| ArchiveError::Io {
            path: display_path.clone(),
            source: e,
        })?;
        if size > MAX_ENTRY_SIZE {
            return Err(ArchiveError::EntryTooLarge {
                path: display_path,
            });
        }

        let entry_type = entry.header().entry_type();
        match entry_type {
            EntryType::Regular | EntryType::Continuous => {
                let dest_path = dest_dir.join(&safe_rel);
                if let Some(parent) = dest_path.parent() {
                    fs::create_dir_all(parent).map_err(|e| ArchiveError::Io {
                        path: display_path.clone(),
                        source: e,
                    })?;
                }

                let mode = entry.header().mode().unwrap_or(0o644) | 0o600;
                let mut out = fs::File::create(&dest_path).map_err(|e| ArchiveError::Io {
                    path: display_path.clone(),
                    source: e,
                })?;
                std::io::copy(&mut entry, &mut out).map_err(|e| ArchiveError::Io {
                    path: display_path.clone(),
                    source: e,
                })?;
                drop(out);
                set_mode(&dest_path, mode).map_err(|e| ArchiveError::Io {
                    path: display_path.clone(),
                    source: e,
                })?;
            }
            EntryType::Directory => {
                let dest_path = dest_dir.join(&safe_rel);
                fs::create_dir_all(&dest_path).map_err(|e| ArchiveError::Io {
                    path: display_path.clone(),
                    source: e,
                })?;
                set_mode(&dest_path, 0o755).map_err(|e| ArchiveError::Io {
                    path: display_path.clone(),
                    source: e,
                })?;
            }
            EntryType::Symlink => {
                let target = entry
                    .link_name()
                    .map_err(|e| ArchiveError::Io {
                        path: display_path.clone(),
                        source: e,
                    })?
                    .ok_or_else(|| ArchiveError::SymlinkEscape {
                        path: display_path.clone(),
                    })?;

                if target.is_absolute() {
                    return Err(ArchiveError::SymlinkEscape {
                        path: display_path,
                    });
                }

                let dest_path = dest_dir.join(&safe_rel);
                let parent = dest_path.parent().unwrap_or(dest_dir);
                if !resolves_within(parent, &target, dest_dir) {
                    return Err(ArchiveError::SymlinkEscape {
                        path: display_path,
                    });
                }

                if let Some(grandparent) = dest_path.parent() {
                    fs::create_dir_all(grandparent).map_err(|e| ArchiveError::Io {
                        path: display_path.clone(),
                        source: e,
                    })?;
                }

                #[cfg(unix)]
                std::os::unix::fs::symlink(&target, &dest_path).map_err(|e| ArchiveError::Io {
                    path: display_path.clone(),
                    source: e,
                })?;
                #[cfg(not(unix))]
                let _ = &target;
            }
            EntryType::Link => {
                return Err(ArchiveError::DisallowedEntryType {
                    path: display_path,
                    kind: "hard link",
                });
            }
            EntryType::Block | EntryType::Char => {
                return Err(ArchiveError::DisallowedEntryType {
                    path: display_path,
                    kind: "device file",
                });
            }
            EntryType::Fifo => {
                return Err(ArchiveError::DisallowedEntryType {
                    path: display_path,
                    kind: "FIFO",
                });
            }
            _ => {
                // Ignore pax headers, long-name extensions, and other
                // metadata-only entry types already resolved by the `tar`
                // crate before we see them.
            }
        }
    }

    Ok(())
}

/// Validate a single entry path: reject absolute paths and `..` components.
/// Returns the normalized relative path on success.
fn sanitize_path(path: &Path, display_path: &str) -> Result<PathBuf, ArchiveError> {
    if path.is_absolute() {
        return Err(ArchiveError::AbsolutePath {
            path: display_path.to_string(),
        });
    }

    let mut safe = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => safe.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(ArchiveError::PathTraversal {
                    path: display_path.to_string(),
                });
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::AbsolutePath {
                    path: display_path.to_string(),
                });
            }
        }
    }

    Ok(safe)
}

/// Verify that resolving `target` relative to `from` never ascends above `root`.
fn resolves_within(from: &Path, target: &Path, root: &Path) -> bool {
    let mut depth: i64 = from
        .strip_prefix(root)
        .map(|rel| rel.components().count() as i64)
        .unwrap_or(0);

    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }

    true
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
