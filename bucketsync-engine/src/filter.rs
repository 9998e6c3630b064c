//! Upload eligibility rules.
//!
//! Rules are checked in a fixed order and the first match wins:
//! 1. dot entries (when `skip_dot_files` is set)
//! 2. explicit file / folder exclusion by base name
//!
//! Only the entry's own base name is inspected. Ancestors are covered by the
//! walker, which never descends into a directory this filter rejects.

use std::collections::BTreeSet;
use std::path::Path;

/// Outcome of checking a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Eligible,
    DotEntry,
    ExcludedFile,
    ExcludedFolder,
}

impl Verdict {
    pub fn is_eligible(self) -> bool {
        self == Verdict::Eligible
    }
}

/// Pure, side-effect free entry filter.
#[derive(Clone, Debug, Default)]
pub struct PathFilter {
    skip_dot_files: bool,
    file_exclusion: BTreeSet<String>,
    folder_exclusion: BTreeSet<String>,
}

impl PathFilter {
    pub fn new(
        skip_dot_files: bool,
        file_exclusion: BTreeSet<String>,
        folder_exclusion: BTreeSet<String>,
    ) -> Self {
        Self {
            skip_dot_files,
            file_exclusion,
            folder_exclusion,
        }
    }

    /// Classifies `path`. Paths without a base name (`/`, `..`) are eligible.
    pub fn check(&self, path: &Path, is_directory: bool) -> Verdict {
        let Some(name) = path.file_name() else {
            return Verdict::Eligible;
        };
        let name = name.to_string_lossy();

        if self.skip_dot_files && name.starts_with('.') {
            return Verdict::DotEntry;
        }

        if is_directory {
            if self.folder_exclusion.contains(name.as_ref()) {
                return Verdict::ExcludedFolder;
            }
        } else if self.file_exclusion.contains(name.as_ref()) {
            return Verdict::ExcludedFile;
        }

        Verdict::Eligible
    }

    pub fn is_eligible(&self, path: &Path, is_directory: bool) -> bool {
        self.check(path, is_directory).is_eligible()
    }
}
