mod support;

use bucketsync_engine::tree::{render_local_tree, render_tree};
use pretty_assertions::assert_eq;

#[test]
fn empty_listing_renders_nothing() {
    assert_eq!(render_tree(Vec::<String>::new()), "");
}

#[test]
fn siblings_are_sorted() {
    let rendered = render_tree(["b.txt", "a.txt", "c/d.txt"]);
    assert_eq!(rendered, "├── a.txt\n├── b.txt\n└── c\n    └── d.txt\n");
}

#[test]
fn duplicate_keys_render_once() {
    assert_eq!(render_tree(["x/y", "x/y"]), "└── x\n    └── y\n");
}

#[test]
fn local_tree_hides_dot_entries() {
    let dir = support::fixture(&[("a.txt", "a"), ("sub/b.txt", "b"), (".git/HEAD", "h")]);
    let rendered = render_local_tree(dir.path(), true).unwrap();
    let name = dir.path().file_name().unwrap().to_string_lossy();
    assert_eq!(
        rendered,
        format!("{name}\n├── a.txt\n└── sub\n    └── b.txt\n")
    );
}

#[test]
fn local_tree_shows_dot_entries_when_asked() {
    let dir = support::fixture(&[("a.txt", "a"), (".git/HEAD", "h")]);
    let rendered = render_local_tree(dir.path(), false).unwrap();
    assert!(rendered.contains("├── .git\n│   └── HEAD\n"));
    assert!(rendered.ends_with("└── a.txt\n"));
}
