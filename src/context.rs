//! Editor capabilities handed to a running macro
//!
//! Macros never reach for global editor state: everything they may touch
//! (buffer, selection, open file, external processes, error reporting)
//! goes through a [`MacroContext`].

use anyhow::{Context, Result, bail};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Captured result of an external process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub status: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

pub trait MacroContext {
    /// Full text of the active document
    fn text(&self) -> &str;

    fn set_text(&mut self, text: String);

    /// Selected byte range (empty when there is only a cursor)
    fn selection(&self) -> Range<usize>;

    fn set_selection(&mut self, selection: Range<usize>) -> Result<()>;

    /// File path of the open script, if it has been saved
    fn script_path(&self) -> Option<&Path>;

    fn run_process(&mut self, program: &str, args: &[String]) -> Result<ProcessOutput>;

    /// Show an error to the user without interrupting the editor
    fn report_error(&mut self, title: &str, message: &str);

    /// Frame bookmarks set in the preview
    fn bookmarks(&self) -> Vec<usize> {
        Vec::new()
    }

    fn cursor(&self) -> usize {
        self.selection().end
    }

    /// Insert `text` at `pos`, or replace the selection when `pos` is `None`
    ///
    /// The cursor ends up right after the inserted text.
    fn insert_text(&mut self, text: &str, pos: Option<usize>) -> Result<()> {
        let range = match pos {
            Some(pos) => pos..pos,
            None => self.selection(),
        };
        let current = self.text();
        check_range(current, &range)?;

        let mut updated = String::with_capacity(current.len() + text.len());
        updated.push_str(&current[..range.start]);
        updated.push_str(text);
        updated.push_str(&current[range.end..]);
        self.set_text(updated);

        let cursor = range.start + text.len();
        self.set_selection(cursor..cursor)
    }
}

/// Validate that `range` addresses whole characters of `text`
pub fn check_range(text: &str, range: &Range<usize>) -> Result<()> {
    if range.start > range.end || range.end > text.len() {
        bail!(
            "Range {}..{} is outside the document (length {})",
            range.start,
            range.end,
            text.len()
        );
    }
    if !text.is_char_boundary(range.start) || !text.is_char_boundary(range.end) {
        bail!(
            "Range {}..{} splits a multi-byte character",
            range.start,
            range.end
        );
    }
    Ok(())
}

/// An error shown through [`MacroContext::report_error`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub message: String,
}

/// Script buffer backed by memory and, optionally, a file on disk
#[derive(Debug, Clone, Default)]
pub struct Document {
    text: String,
    selection: Range<usize>,
    path: Option<PathBuf>,
    bookmarks: Vec<usize>,
    reports: Vec<Report>,
    modified: bool,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        log::debug!("Opened {} ({} bytes)", path.display(), text.len());
        Ok(Self {
            text,
            path: Some(path),
            ..Self::default()
        })
    }

    pub fn with_bookmarks(mut self, bookmarks: Vec<usize>) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Errors reported by macros, oldest first
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn save(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            bail!("Document has no file path");
        };
        fs::write(path, &self.text)
            .with_context(|| format!("Failed to write script {}", path.display()))?;
        self.modified = false;
        Ok(())
    }
}

impl MacroContext for Document {
    fn text(&self) -> &str {
        &self.text
    }

    fn set_text(&mut self, text: String) {
        self.text = text;
        self.modified = true;
        // Keep the selection valid for the new contents
        if check_range(&self.text, &self.selection).is_err() {
            let end = self.text.len();
            self.selection = end..end;
        }
    }

    fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    fn set_selection(&mut self, selection: Range<usize>) -> Result<()> {
        check_range(&self.text, &selection)?;
        self.selection = selection;
        Ok(())
    }

    fn script_path(&self) -> Option<&Path> {
        self.path()
    }

    fn run_process(&mut self, program: &str, args: &[String]) -> Result<ProcessOutput> {
        log::debug!("Running {} {:?}", program, args);
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to start {}", program))?;

        Ok(ProcessOutput {
            status: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn report_error(&mut self, title: &str, message: &str) {
        log::error!("{}: {}", title, message);
        self.reports.push(Report {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn bookmarks(&self) -> Vec<usize> {
        self.bookmarks.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_at_cursor_replaces_selection() {
        let mut doc = Document::new("AviSource(\"a.avi\")\nTrim(0,10)");
        doc.set_selection(19..29).unwrap();

        doc.insert_text("Trim(5,20)", None).unwrap();
        assert_eq!(doc.text(), "AviSource(\"a.avi\")\nTrim(5,20)");
        assert_eq!(doc.cursor(), 29);
        assert!(doc.is_modified());
    }

    #[test]
    fn test_insert_at_position() {
        let mut doc = Document::new("ab");
        doc.insert_text("X", Some(1)).unwrap();
        assert_eq!(doc.text(), "aXb");
        assert_eq!(doc.selection(), 2..2);

        assert!(doc.insert_text("X", Some(10)).is_err());
        assert_eq!(doc.text(), "aXb");
    }

    #[test]
    fn test_selection_must_be_on_char_boundaries() {
        let mut doc = Document::new("héllo");
        assert!(doc.set_selection(0..2).is_err());
        assert!(doc.set_selection(0..3).is_ok());
        assert!(doc.set_selection(3..1).is_err());
    }

    #[test]
    fn test_set_text_clamps_selection() {
        let mut doc = Document::new("a long line of text");
        doc.set_selection(5..10).unwrap();
        doc.set_text("short".to_string());
        assert_eq!(doc.selection(), 5..5);
    }

    #[test]
    fn test_open_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.avs");
        fs::write(&path, "Version()").unwrap();

        let mut doc = Document::open(&path).unwrap();
        assert_eq!(doc.script_path(), Some(path.as_path()));
        assert!(!doc.is_modified());

        doc.insert_text("\nReturn(last)", Some(9)).unwrap();
        doc.save().unwrap();
        assert!(!doc.is_modified());
        assert_eq!(fs::read_to_string(&path).unwrap(), "Version()\nReturn(last)");
    }

    #[test]
    fn test_save_without_path_fails() {
        let mut doc = Document::new("x");
        assert!(doc.save().is_err());
    }

    #[test]
    fn test_report_error_is_collected() {
        let mut doc = Document::default();
        doc.report_error("Trim timecode", "No Trims found");
        assert_eq!(
            doc.reports(),
            &[Report {
                title: "Trim timecode".to_string(),
                message: "No Trims found".to_string(),
            }]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_run_process_captures_output() {
        let mut doc = Document::default();
        let output = doc
            .run_process("sh", &["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()])
            .unwrap();
        assert_eq!(output.status, Some(3));
        assert!(!output.success);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }
}
