//! Menu tree built from the macros directory

use crate::naming::{NamingRules, compare_names};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// One script (or separator) found under the macros root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroEntry {
    /// Path relative to the macros root
    pub relative_path: PathBuf,
    pub display_name: String,
    pub sort_key: String,
    pub explicit_key: bool,
    pub is_separator: bool,
    /// Titles of the submenus between the root and this entry
    pub submenu_path: Vec<String>,
}

impl MacroEntry {
    /// Stable `/`-separated identifier, used to look up per-macro params
    pub fn key(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn is_invocable(&self) -> bool {
        !self.is_separator
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submenu {
    pub title: String,
    pub sort_key: String,
    pub relative_path: PathBuf,
    pub children: Vec<MenuNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuNode {
    Entry(MacroEntry),
    Submenu(Submenu),
}

impl MenuNode {
    pub fn title(&self) -> &str {
        match self {
            MenuNode::Entry(entry) => &entry.display_name,
            MenuNode::Submenu(submenu) => &submenu.title,
        }
    }

    pub fn sort_key(&self) -> &str {
        match self {
            MenuNode::Entry(entry) => &entry.sort_key,
            MenuNode::Submenu(submenu) => &submenu.sort_key,
        }
    }

    pub fn relative_path(&self) -> &Path {
        match self {
            MenuNode::Entry(entry) => &entry.relative_path,
            MenuNode::Submenu(submenu) => &submenu.relative_path,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, MenuNode::Entry(entry) if entry.is_separator)
    }
}

/// A non-fatal problem found while scanning, shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Ordered menu for one macros root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuTree {
    pub root: PathBuf,
    pub items: Vec<MenuNode>,
    pub warnings: Vec<ScanWarning>,
}

/// Total order for one menu level: key, then title (both case-insensitive),
/// then exact title and path so the result never depends on input order
pub fn compare_nodes(a: &MenuNode, b: &MenuNode, natural: bool) -> Ordering {
    compare_names(a.sort_key(), b.sort_key(), natural)
        .then_with(|| compare_names(a.title(), b.title(), natural))
        .then_with(|| a.title().cmp(b.title()))
        .then_with(|| a.relative_path().cmp(b.relative_path()))
}

/// Sort a single menu level in place (children are left untouched)
pub fn sort_nodes(nodes: &mut [MenuNode], rules: &NamingRules) {
    nodes.sort_by(|a, b| compare_nodes(a, b, rules.natural_sort));
}

/// Normalize a title for lookup: remove whitespace and lowercase
pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn titles_match(title: &str, wanted: &str) -> bool {
    normalize(title) == normalize(wanted)
}

impl MenuTree {
    /// Find a node by menu path (e.g., &["Tools", "Encode with x264"])
    ///
    /// Matching is case- and whitespace-insensitive. Separators never match.
    pub fn find_by_path(&self, path: &[&str]) -> Option<&MenuNode> {
        Self::find_in(&self.items, path)
    }

    fn find_in<'a>(nodes: &'a [MenuNode], path: &[&str]) -> Option<&'a MenuNode> {
        let (first, rest) = path.split_first()?;

        let node = nodes
            .iter()
            .filter(|node| !node.is_separator())
            .find(|node| titles_match(node.title(), first));

        let Some(node) = node else {
            log::debug!("'{}' not found in current level", first);
            return None;
        };

        if rest.is_empty() {
            return Some(node);
        }

        match node {
            MenuNode::Submenu(submenu) => Self::find_in(&submenu.children, rest),
            MenuNode::Entry(_) => {
                log::debug!("'{}' is a macro, not a submenu", node.title());
                None
            }
        }
    }

    /// All entries, separators included, in menu order (depth-first)
    pub fn flatten(&self) -> Vec<&MacroEntry> {
        fn collect<'a>(nodes: &'a [MenuNode], out: &mut Vec<&'a MacroEntry>) {
            for node in nodes {
                match node {
                    MenuNode::Entry(entry) => out.push(entry),
                    MenuNode::Submenu(submenu) => collect(&submenu.children, out),
                }
            }
        }

        let mut result = Vec::new();
        collect(&self.items, &mut result);
        result
    }

    /// Absolute path of the script behind `entry`
    pub fn script_path(&self, entry: &MacroEntry) -> PathBuf {
        self.root.join(&entry.relative_path)
    }

    /// Indented text rendering of the menu
    pub fn render(&self) -> String {
        let mut out = String::new();
        Self::render_level(&self.items, 0, &mut out);
        out
    }

    fn render_level(nodes: &[MenuNode], indent: usize, out: &mut String) {
        for node in nodes {
            let prefix = "  ".repeat(indent);
            match node {
                MenuNode::Entry(entry) if entry.is_separator => {
                    out.push_str(&format!("{}----------\n", prefix));
                }
                MenuNode::Entry(entry) => {
                    out.push_str(&format!("{}{}\n", prefix, entry.display_name));
                }
                MenuNode::Submenu(submenu) => {
                    out.push_str(&format!("{}{} >\n", prefix, submenu.title));
                    Self::render_level(&submenu.children, indent + 1, out);
                }
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize menu tree")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, key: &str, name: &str) -> MenuNode {
        MenuNode::Entry(MacroEntry {
            relative_path: PathBuf::from(path),
            display_name: name.to_string(),
            sort_key: key.to_string(),
            explicit_key: key != name,
            is_separator: name.chars().all(|c| c == '-'),
            submenu_path: Vec::new(),
        })
    }

    fn sample_tree() -> MenuTree {
        MenuTree {
            root: PathBuf::from("/macros"),
            items: vec![
                entry("[1] ---.py", "1", "---"),
                entry("[2] Resize.py", "2", "Resize"),
                entry("Crop.py", "Crop", "Crop"),
                MenuNode::Submenu(Submenu {
                    title: "Encode".to_string(),
                    sort_key: "Encode".to_string(),
                    relative_path: PathBuf::from("Encode"),
                    children: vec![entry("Encode/With x264.py", "With x264", "With x264")],
                }),
            ],
            warnings: Vec::new(),
        }
    }

    fn titles(nodes: &[MenuNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.title()).collect()
    }

    #[test]
    fn test_sort_by_key_then_name() {
        let mut nodes = vec![
            entry("Crop.py", "Crop", "Crop"),
            entry("[2] Resize.py", "2", "Resize"),
            entry("[1] ---.py", "1", "---"),
            entry("b.py", "b", "b"),
            entry("A.py", "A", "A"),
        ];
        sort_nodes(&mut nodes, &NamingRules::default());
        assert_eq!(titles(&nodes), vec!["---", "Resize", "A", "b", "Crop"]);
    }

    #[test]
    fn test_sort_is_independent_of_input_order() {
        let base = vec![
            entry("x.py", "x", "x"),
            entry("X.py", "X", "X"),
            entry("[1] b.py", "1", "b"),
            entry("[1] a.py", "1", "a"),
            entry("[10] z.py", "10", "z"),
            entry("[9] y.py", "9", "y"),
        ];
        let rules = NamingRules::default();

        let mut forward = base.clone();
        sort_nodes(&mut forward, &rules);
        let mut reversed: Vec<_> = base.into_iter().rev().collect();
        sort_nodes(&mut reversed, &rules);

        assert_eq!(forward, reversed);
        assert_eq!(titles(&forward), vec!["a", "b", "y", "z", "X", "x"]);
    }

    #[test]
    fn test_find_by_path() {
        let tree = sample_tree();

        let found = tree.find_by_path(&["encode", "with X264"]).unwrap();
        assert_eq!(found.title(), "With x264");

        assert!(matches!(
            tree.find_by_path(&["Encode"]),
            Some(MenuNode::Submenu(_))
        ));
        assert!(tree.find_by_path(&["---"]).is_none());
        assert!(tree.find_by_path(&["Crop", "Anything"]).is_none());
        assert!(tree.find_by_path(&[]).is_none());
    }

    #[test]
    fn test_flatten_in_menu_order() {
        let tree = sample_tree();
        let names: Vec<&str> = tree
            .flatten()
            .iter()
            .map(|e| e.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["---", "Resize", "Crop", "With x264"]);
    }

    #[test]
    fn test_render() {
        let rendered = sample_tree().render();
        assert_eq!(
            rendered,
            "----------\nResize\nCrop\nEncode >\n  With x264\n"
        );
    }

    #[test]
    fn test_json_marks_node_kind() {
        let json = sample_tree().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["items"][0]["kind"], "entry");
        assert_eq!(value["items"][0]["is_separator"], true);
        assert_eq!(value["items"][3]["kind"], "submenu");
    }

    #[test]
    fn test_entry_key_uses_forward_slashes() {
        let MenuNode::Entry(e) = entry("Encode/With x264.py", "k", "With x264") else {
            unreachable!()
        };
        assert_eq!(e.key(), "Encode/With x264.py");
    }
}
