//! Lazy traversal of the upload root.

use crate::filter::{PathFilter, Verdict};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A regular file that passed the filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub size: u64,
}

/// Single-pass iterator over eligible files under a root directory.
///
/// Directories rejected by the filter are pruned before descending, so
/// nothing beneath them is ever read. Entries within a directory are
/// visited in file-name order; callers must not rely on that for upload
/// ordering. Traversal errors are yielded in place and do not stop the walk.
pub struct Walker<'a> {
    filter: &'a PathFilter,
    inner: walkdir::IntoIter,
    filtered: usize,
}

impl<'a> Walker<'a> {
    pub fn new(root: &Path, filter: &'a PathFilter, follow_symlinks: bool) -> Self {
        let inner = WalkDir::new(root)
            .follow_links(follow_symlinks)
            .min_depth(1)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter();

        Self {
            filter,
            inner,
            filtered: 0,
        }
    }

    /// Number of entries rejected so far. A pruned directory counts once.
    pub fn filtered(&self) -> usize {
        self.filtered
    }
}

impl Iterator for Walker<'_> {
    type Item = Result<Candidate, walkdir::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err)),
            };
            let file_type = entry.file_type();

            if file_type.is_dir() {
                let verdict = self.filter.check(entry.path(), true);
                if !verdict.is_eligible() {
                    log_rejection(entry.path(), verdict);
                    self.filtered += 1;
                    self.inner.skip_current_dir();
                }
                continue;
            }

            if !file_type.is_file() {
                debug!(path = %entry.path().display(), "skipping non-regular entry");
                self.filtered += 1;
                continue;
            }

            let verdict = self.filter.check(entry.path(), false);
            if !verdict.is_eligible() {
                log_rejection(entry.path(), verdict);
                self.filtered += 1;
                continue;
            }

            return Some(entry.metadata().map(|metadata| Candidate {
                size: metadata.len(),
                path: entry.into_path(),
            }));
        }
    }
}

fn log_rejection(path: &Path, verdict: Verdict) {
    let reason = match verdict {
        Verdict::DotEntry => "dot entry",
        Verdict::ExcludedFile => "file exclusion",
        Verdict::ExcludedFolder => "folder exclusion",
        Verdict::Eligible => return,
    };
    debug!(path = %path.display(), reason, "skipping");
}
