//! Local path to object key mapping.
//!
//! Keys are always `/`-delimited, never start with a separator and never
//! contain empty segments, whatever the host's path conventions are.

use crate::error::KeyError;
use std::path::{Component, Path, PathBuf};

/// Derives object keys from absolute file paths under one upload root.
///
/// The mapping is a pure function of the root, the exclude-prefix, the
/// destination prefix and the file path.
#[derive(Clone, Debug)]
pub struct KeyMapper {
    root: PathBuf,
    exclude_prefix: Option<PathBuf>,
    prefix_segments: Vec<String>,
}

impl KeyMapper {
    /// `exclude_prefix` is relative to `root`. `s3_prefix` may use either
    /// separator and may carry stray leading, trailing or doubled slashes.
    pub fn new(
        root: impl Into<PathBuf>,
        exclude_prefix: Option<PathBuf>,
        s3_prefix: Option<&str>,
    ) -> Self {
        let prefix_segments = s3_prefix
            .map(|prefix| {
                prefix
                    .split(['/', '\\'])
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            root: root.into(),
            exclude_prefix: exclude_prefix.filter(|p| !p.as_os_str().is_empty()),
            prefix_segments,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps `path` (which must live under the root) to its object key.
    pub fn to_object_key(&self, path: &Path) -> Result<String, KeyError> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| KeyError::OutsideRoot(path.to_path_buf()))?;

        // Path::strip_prefix matches whole components, so "raw" never eats "rawdata".
        let relative = match &self.exclude_prefix {
            Some(prefix) => relative.strip_prefix(prefix).unwrap_or(relative),
            None => relative,
        };

        let mut segments: Vec<&str> = self.prefix_segments.iter().map(String::as_str).collect();
        let mut file_segments = 0usize;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| KeyError::NonUtf8(path.to_path_buf()))?;
                    segments.push(part);
                    file_segments += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(KeyError::OutsideRoot(path.to_path_buf()));
                }
            }
        }

        if file_segments == 0 {
            return Err(KeyError::Empty(path.to_path_buf()));
        }
        Ok(segments.join("/"))
    }
}
