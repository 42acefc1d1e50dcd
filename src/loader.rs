//! Macro discovery: walk the macros root and build the ordered menu

use crate::menu_item::{MacroEntry, MenuNode, MenuTree, ScanWarning, Submenu, sort_nodes};
use crate::naming::{NamingRules, parse_name, strip_extension};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Scan `root` and return its menu tree
///
/// Only a missing or unreadable root is an error. Problems below the root
/// are logged, collected in [`MenuTree::warnings`] and skipped.
pub fn scan(root: &Path, rules: &NamingRules) -> Result<MenuTree> {
    let metadata = fs::metadata(root)
        .with_context(|| format!("Failed to read macros directory {}", root.display()))?;
    if !metadata.is_dir() {
        bail!("Macros path {} is not a directory", root.display());
    }

    let mut scanner = Scanner {
        root,
        rules,
        warnings: Vec::new(),
    };
    let items = scanner.walk()?;

    log::debug!(
        "Scanned {}: {} top-level items, {} warnings",
        root.display(),
        items.len(),
        scanner.warnings.len()
    );

    Ok(MenuTree {
        root: root.to_path_buf(),
        items,
        warnings: scanner.warnings,
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// A menu level still being filled while its directory is walked
struct Level {
    title: String,
    sort_key: String,
    relative_path: PathBuf,
    submenu_path: Vec<String>,
    nodes: Vec<MenuNode>,
}

struct Scanner<'a> {
    root: &'a Path,
    rules: &'a NamingRules,
    warnings: Vec<ScanWarning>,
}

impl Scanner<'_> {
    fn warn(&mut self, path: &Path, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}: {}", path.display(), message);
        self.warnings.push(ScanWarning {
            path: path.to_path_buf(),
            message,
        });
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(self.root).unwrap_or(path).to_path_buf()
    }

    /// One pre-order walk; `levels[d]` collects the entries at depth `d + 1`
    fn walk(&mut self) -> Result<Vec<MenuNode>> {
        let walker = WalkDir::new(self.root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry));

        let mut levels = vec![Level {
            title: String::new(),
            sort_key: String::new(),
            relative_path: PathBuf::new(),
            submenu_path: Vec::new(),
            nodes: Vec::new(),
        }];

        for item in walker {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    if err.path() == Some(self.root) {
                        return Err(err).with_context(|| {
                            format!("Failed to read macros directory {}", self.root.display())
                        });
                    }
                    self.walk_error(&err);
                    continue;
                }
            };

            while levels.len() > entry.depth() {
                self.close_level(&mut levels);
            }

            let Some(name) = entry.file_name().to_str() else {
                self.warn(entry.path(), "Name is not valid UTF-8, skipped");
                continue;
            };

            let parent = levels.last_mut().context("Menu level stack is empty")?;
            if entry.file_type().is_dir() {
                let level = self.open_level(entry.path(), name, &parent.submenu_path);
                levels.push(level);
            } else if entry.file_type().is_file() {
                if let Some(macro_entry) = self.file_entry(entry.path(), name, &parent.submenu_path) {
                    parent.nodes.push(MenuNode::Entry(macro_entry));
                }
            }
        }

        while levels.len() > 1 {
            self.close_level(&mut levels);
        }

        let mut items = levels.pop().map(|level| level.nodes).unwrap_or_default();
        sort_nodes(&mut items, self.rules);
        Ok(items)
    }

    fn walk_error(&mut self, err: &walkdir::Error) {
        let path = err.path().unwrap_or(self.root).to_path_buf();
        let message = if let Some(ancestor) = err.loop_ancestor() {
            format!(
                "Directory links back to {}, skipped",
                ancestor.display()
            )
        } else if let Some(io) = err.io_error() {
            format!("Failed to read: {}", io)
        } else {
            err.to_string()
        };
        self.warn(&path, message);
    }

    fn open_level(&self, path: &Path, name: &str, parent: &[String]) -> Level {
        // A directory can't be a separator, so keep its full name in that case
        let parsed = parse_name(name, self.rules);
        let (title, sort_key) = if parsed.is_separator {
            (name.to_string(), name.to_string())
        } else {
            (parsed.display_name, parsed.sort_key)
        };

        let mut submenu_path = parent.to_vec();
        submenu_path.push(title.clone());

        Level {
            title,
            sort_key,
            relative_path: self.relative(path),
            submenu_path,
            nodes: Vec::new(),
        }
    }

    /// Sort the innermost level and attach it to its parent as a submenu
    fn close_level(&self, levels: &mut Vec<Level>) {
        let Some(mut level) = levels.pop() else {
            return;
        };
        if level.nodes.is_empty() {
            log::debug!("Skipping empty submenu {}", level.relative_path.display());
            return;
        }
        sort_nodes(&mut level.nodes, self.rules);

        if let Some(parent) = levels.last_mut() {
            parent.nodes.push(MenuNode::Submenu(Submenu {
                title: level.title,
                sort_key: level.sort_key,
                relative_path: level.relative_path,
                children: level.nodes,
            }));
        }
    }

    fn file_entry(&self, path: &Path, name: &str, submenu_path: &[String]) -> Option<MacroEntry> {
        let Some(stem) = strip_extension(name, self.rules) else {
            log::trace!("Ignoring non-macro file {}", path.display());
            return None;
        };

        let parsed = parse_name(stem, self.rules);
        Some(MacroEntry {
            relative_path: self.relative(path),
            display_name: parsed.display_name,
            sort_key: parsed.sort_key,
            explicit_key: parsed.explicit_key,
            is_separator: parsed.is_separator,
            submenu_path: submenu_path.to_vec(),
        })
    }
}

/// The macros menu as last built from disk
///
/// Every refresh rescans the root. A failed refresh keeps the previous
/// tree so the menu never disappears.
#[derive(Debug)]
pub struct MacroMenu {
    root: PathBuf,
    rules: NamingRules,
    tree: Option<MenuTree>,
}

impl MacroMenu {
    pub fn new(root: impl Into<PathBuf>, rules: NamingRules) -> Self {
        Self {
            root: root.into(),
            rules,
            tree: None,
        }
    }

    /// Rescan the macros root
    pub fn refresh(&mut self) -> Result<&MenuTree> {
        let tree = scan(&self.root, &self.rules)?;
        log::info!(
            "Loaded {} macros from {}",
            tree.flatten().iter().filter(|e| e.is_invocable()).count(),
            self.root.display()
        );
        let tree: &MenuTree = self.tree.insert(tree);
        Ok(tree)
    }

    /// Tree from the last successful refresh
    pub fn tree(&self) -> Option<&MenuTree> {
        self.tree.as_ref()
    }

    /// Look up a menu path, scanning first if the menu was never loaded
    pub fn find(&mut self, path: &[&str]) -> Result<Option<&MenuNode>> {
        if self.tree.is_none() {
            self.refresh()?;
        }
        Ok(self.tree.as_ref().and_then(|tree| tree.find_by_path(path)))
    }
}
