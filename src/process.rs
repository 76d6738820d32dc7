use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};

use crate::entry::{RenameEntry, RenameState};
use crate::message::MessageSink;
use crate::rule::ReplaceRule;
use crate::vfs::Vfs;

/// Cooperative cancellation flag, checked between items. Entries already
/// committed keep their state; unprocessed entries stay in `None`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct Progress {
    pub count: usize,
    pub message: String,
}

pub type ProgressFn<'a> = &'a (dyn Fn(Progress) + Send + Sync);

/// Previews every entry against the shared rule slice. Each entry writes only
/// its own fields, so the pass runs in parallel; all workers push diagnostics
/// through the shared sink.
pub fn preview_all(
    entries: &mut [RenameEntry],
    rules: &[ReplaceRule],
    rename_extension: bool,
    sink: &MessageSink,
    cancel: &CancelToken,
    progress: Option<ProgressFn<'_>>,
) {
    entries
        .par_iter_mut()
        .enumerate()
        .for_each(|(index, entry)| {
            if cancel.is_requested() {
                return;
            }
            entry.preview(rules, rename_extension, sink);
            if let Some(report) = progress {
                report(Progress {
                    count: index,
                    message: entry.candidate_name().to_string(),
                });
            }
        });
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    pub renamed: usize,
    pub failed: usize,
    pub unchanged: usize,
}

/// Commits entries strictly in slice order; the scan's deepest-first order
/// keeps parent renames after their children. Rename collisions between
/// targets surface as per-entry failures, not as an abort.
pub fn commit_all(
    entries: &mut [RenameEntry],
    fs: &dyn Vfs,
    sink: &MessageSink,
    cancel: &CancelToken,
    progress: Option<ProgressFn<'_>>,
) -> CommitStats {
    let mut stats = CommitStats::default();
    for (index, entry) in entries.iter_mut().enumerate() {
        if cancel.is_requested() {
            break;
        }
        if !entry.is_changed() {
            stats.unchanged += 1;
            continue;
        }
        entry.commit(fs, sink);
        match entry.state() {
            RenameState::Renamed => stats.renamed += 1,
            RenameState::FailedToRename => stats.failed += 1,
            RenameState::None => {}
        }
        if let Some(report) = progress {
            report(Progress {
                count: index,
                message: entry.original_name().to_string(),
            });
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageSink, drain};
    use crate::vfs::mem::MemFs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    fn rules(pairs: &[(&str, &str)]) -> Vec<ReplaceRule> {
        pairs
            .iter()
            .map(|(pattern, replacement)| {
                ReplaceRule::new(pattern, replacement).expect("rule compiles")
            })
            .collect()
    }

    fn entries(names: &[&str]) -> Vec<RenameEntry> {
        names
            .iter()
            .map(|name| RenameEntry::new(PathBuf::from("/work"), name.to_string(), false))
            .collect()
    }

    #[test]
    fn preview_all_updates_every_entry() {
        let mut items = entries(&["a -copy.txt", "b -copy.txt", "c.txt"]);
        let (sink, _rx) = MessageSink::channel();
        preview_all(
            &mut items,
            &rules(&[(" -copy", "")]),
            false,
            &sink,
            &CancelToken::new(),
            None,
        );
        assert_eq!(items[0].candidate_name(), "a.txt");
        assert_eq!(items[1].candidate_name(), "b.txt");
        assert!(!items[2].is_changed());
    }

    #[test]
    fn preview_all_reports_progress_per_entry() {
        let mut items = entries(&["a.txt", "b.txt"]);
        let (sink, _rx) = MessageSink::channel();
        let seen = Mutex::new(Vec::new());
        preview_all(
            &mut items,
            &rules(&[("a", "z")]),
            false,
            &sink,
            &CancelToken::new(),
            Some(&|progress: Progress| {
                seen.lock().expect("progress lock").push(progress.count);
            }),
        );
        let mut counts = seen.into_inner().expect("progress lock");
        counts.sort_unstable();
        assert_eq!(counts, [0, 1]);
    }

    #[test]
    fn preview_all_collects_diagnostics_from_all_workers() {
        let mut items = entries(&["A.txt", "B.txt", "c.txt"]);
        let (sink, rx) = MessageSink::channel();
        preview_all(
            &mut items,
            &rules(&[("[AB]", ":")]),
            false,
            &sink,
            &CancelToken::new(),
            None,
        );
        let alerts = drain(&rx);
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|msg| msg.head == crate::message::HEAD_INVALID_CHARS));
    }

    #[test]
    fn cancelled_preview_leaves_entries_untouched() {
        let mut items = entries(&["a.txt", "b.txt"]);
        let (sink, _rx) = MessageSink::channel();
        let cancel = CancelToken::new();
        cancel.request();
        preview_all(&mut items, &rules(&[("a", "z")]), false, &sink, &cancel, None);
        assert!(!items[0].is_changed());
        assert!(!items[1].is_changed());
    }

    #[test]
    fn commit_all_tallies_outcomes() {
        let fs = MemFs::new()
            .with_file("/work/a.txt")
            .with_locked_file("/work/b.txt")
            .with_file("/work/c.txt");
        let mut items = entries(&["a.txt", "b.txt", "c.txt"]);
        let (sink, rx) = MessageSink::channel();
        preview_all(
            &mut items,
            &rules(&[("^[ab]", "x$0")]),
            false,
            &sink,
            &CancelToken::new(),
            None,
        );

        let stats = commit_all(&mut items, &fs, &sink, &CancelToken::new(), None);
        assert_eq!(
            stats,
            CommitStats {
                renamed: 1,
                failed: 1,
                unchanged: 1
            }
        );
        assert_eq!(items[0].state(), RenameState::Renamed);
        assert_eq!(items[1].state(), RenameState::FailedToRename);
        assert_eq!(items[2].state(), RenameState::None);
        assert_eq!(
            fs.names_in(Path::new("/work")),
            ["b.txt", "c.txt", "xa.txt"]
        );

        let failures = drain(&rx);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].body.contains("b.txt"));
    }

    #[test]
    fn cancelled_commit_stops_between_items() {
        let fs = MemFs::new().with_file("/work/a.txt").with_file("/work/b.txt");
        let mut items = entries(&["a.txt", "b.txt"]);
        let (sink, _rx) = MessageSink::channel();
        preview_all(
            &mut items,
            &rules(&[("^", "x")]),
            false,
            &sink,
            &CancelToken::new(),
            None,
        );

        let cancel = CancelToken::new();
        cancel.request();
        let stats = commit_all(&mut items, &fs, &sink, &cancel, None);
        assert_eq!(stats, CommitStats::default());
        assert_eq!(items[0].state(), RenameState::None);
        assert_eq!(items[1].state(), RenameState::None);
    }
}
