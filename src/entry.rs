use std::path::{Path, PathBuf};

use crate::message::{HEAD_INVALID_CHARS, HEAD_RENAME_FAILED, MessageSink, Severity};
use crate::rule::{ReplaceRule, apply_chain};
use crate::sanitize::sanitize_name;
use crate::vfs::Vfs;

/// Commit outcome for one entry. `Renamed` and `FailedToRename` are terminal;
/// only reconstruction returns an entry to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenameState {
    #[default]
    None,
    Renamed,
    FailedToRename,
}

/// Field diff reported by `preview`: exactly the fields whose values changed
/// since the previous preview pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldChanges {
    pub candidate_name: bool,
    pub output_path: bool,
    pub is_changed: bool,
}

impl FieldChanges {
    pub fn any(&self) -> bool {
        self.candidate_name || self.output_path || self.is_changed
    }
}

/// One rename target: the name it has on disk, the candidate produced by the
/// last preview, and the commit outcome.
#[derive(Debug, Clone)]
pub struct RenameEntry {
    directory: PathBuf,
    original_name: String,
    is_dir: bool,
    candidate_name: String,
    state: RenameState,
}

impl RenameEntry {
    pub fn new(directory: PathBuf, original_name: String, is_dir: bool) -> Self {
        let candidate_name = original_name.clone();
        Self {
            directory,
            original_name,
            is_dir,
            candidate_name,
            state: RenameState::None,
        }
    }

    pub fn from_path(path: &Path, is_dir: bool) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        let directory = path.parent()?.to_path_buf();
        Some(Self::new(directory, name, is_dir))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn candidate_name(&self) -> &str {
        &self.candidate_name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn state(&self) -> RenameState {
        self.state
    }

    pub fn is_changed(&self) -> bool {
        self.candidate_name != self.original_name
    }

    pub fn input_path(&self) -> PathBuf {
        self.directory.join(&self.original_name)
    }

    pub fn output_path(&self) -> PathBuf {
        self.directory.join(&self.candidate_name)
    }

    /// Recomputes the candidate name from the original through the rule chain
    /// and sanitization. Never touches the filesystem or `state`. Emits one
    /// alert when sanitization substituted anything.
    pub fn preview(
        &mut self,
        rules: &[ReplaceRule],
        rename_extension: bool,
        sink: &MessageSink,
    ) -> FieldChanges {
        let (stem, suffix) = split_scope(&self.original_name, self.is_dir, rename_extension);
        let raw = format!("{}{suffix}", apply_chain(rules, stem));
        let outcome = sanitize_name(&raw);
        if outcome.was_sanitized() {
            sink.push(Severity::Alert, HEAD_INVALID_CHARS, raw);
        }

        let was_changed = self.is_changed();
        let candidate_differs = outcome.name != self.candidate_name;
        self.candidate_name = outcome.name;
        FieldChanges {
            candidate_name: candidate_differs,
            output_path: candidate_differs,
            is_changed: self.is_changed() != was_changed,
        }
    }

    /// Performs the filesystem rename. A no-op while the candidate equals the
    /// original, which also covers re-commit after success. Failure is fully
    /// absorbed into state plus one error diagnostic; a later commit retries.
    pub fn commit(&mut self, fs: &dyn Vfs, sink: &MessageSink) {
        if !self.is_changed() {
            return;
        }
        let old = self.input_path();
        let new = self.output_path();
        match fs.rename_entry(&old, &new) {
            Ok(()) => {
                self.state = RenameState::Renamed;
                self.original_name = self.candidate_name.clone();
            }
            Err(err) => {
                self.state = RenameState::FailedToRename;
                sink.push(
                    Severity::Error,
                    HEAD_RENAME_FAILED,
                    format!("{}: {err}", old.display()),
                );
            }
        }
    }
}

/// Splits a name into the part the rule chain sees and the suffix that is
/// reattached untouched. Directories are always whole-name; files keep the
/// text after the last dot unless the extension is in scope too. A dotfile's
/// leading-dot name is all suffix.
pub fn split_scope(name: &str, is_dir: bool, rename_extension: bool) -> (&str, &str) {
    if is_dir || rename_extension {
        return (name, "");
    }
    match name.rfind('.') {
        Some(idx) => (&name[..idx], &name[idx..]),
        None => (name, ""),
    }
}
