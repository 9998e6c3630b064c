//! Folder-style rendering of object keys and local directories.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

const TEE: &str = "├── ";
const ELBOW: &str = "└── ";
const PIPE: &str = "│   ";
const BLANK: &str = "    ";

#[derive(Default)]
struct Node {
    children: BTreeMap<String, Node>,
}

impl Node {
    fn insert<'a>(&mut self, segments: impl Iterator<Item = &'a str>) {
        let mut node = self;
        for segment in segments.filter(|s| !s.is_empty()) {
            node = node.children.entry(segment.to_string()).or_default();
        }
    }

    fn render(&self, indent: &str, out: &mut String) {
        let count = self.children.len();
        for (i, (name, child)) in self.children.iter().enumerate() {
            let last = i + 1 == count;
            out.push_str(indent);
            out.push_str(if last { ELBOW } else { TEE });
            out.push_str(name);
            out.push('\n');
            if !child.children.is_empty() {
                let next = format!("{indent}{}", if last { BLANK } else { PIPE });
                child.render(&next, out);
            }
        }
    }
}

/// Renders `/`-delimited keys as a sorted tree, one line per segment.
pub fn render_tree<I, S>(keys: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut root = Node::default();
    for key in keys {
        root.insert(key.as_ref().split('/'));
    }
    let mut out = String::new();
    root.render("", &mut out);
    out
}

/// Renders a local directory, headed by its own name.
///
/// With `skip_dot_files`, dot entries and everything beneath them are left out.
pub fn render_local_tree(path: &Path, skip_dot_files: bool) -> io::Result<String> {
    let mut root = Node::default();
    let walk = WalkDir::new(path)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(skip_dot_files && entry.file_name().to_string_lossy().starts_with('.'))
        });

    for entry in walk {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(path) else {
            continue;
        };
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        root.insert(segments.iter().map(String::as_str));
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut out = format!("{name}\n");
    root.render("", &mut out);
    Ok(out)
}
