use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

use crate::entry::RenameEntry;

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub recursive: bool,
    pub include_hidden: bool,
    pub include_dirs: bool,
    pub filters: Vec<String>,
    pub excludes: Vec<String>,
}

/// Collects rename targets under the given directories. Entries come back
/// deepest-first so committing in order never renames a parent before its
/// children.
pub fn scan_targets(targets: &[PathBuf], options: &ScanOptions) -> Result<Vec<RenameEntry>> {
    let filter = build_globs(&options.filters, "filter")?;
    let exclude = build_globs(&options.excludes, "exclude")?;

    let mut entries = Vec::new();
    for target in targets {
        if !target.is_dir() {
            bail!("target directory {} does not exist", target.display());
        }
        walk_target(target, options, filter.as_ref(), exclude.as_ref(), &mut entries)
            .with_context(|| format!("scanning {}", target.display()))?;
    }

    dedup_by_path(&mut entries);
    sort_deepest_first(&mut entries);
    Ok(entries)
}

fn walk_target(
    dir: &Path,
    options: &ScanOptions,
    filter: Option<&GlobSet>,
    exclude: Option<&GlobSet>,
    acc: &mut Vec<RenameEntry>,
) -> Result<()> {
    let max_depth = if options.recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|entry| options.include_hidden || !is_hidden(entry));

    for entry in walker {
        let entry = entry?;
        let is_dir = entry.file_type().is_dir();
        if is_dir && !options.include_dirs {
            continue;
        }
        let path = entry.into_path();
        if should_skip(&path, filter, exclude) {
            continue;
        }
        // names the filesystem cannot express as UTF-8 are left alone
        if let Some(rename) = RenameEntry::from_path(&path, is_dir) {
            acc.push(rename);
        }
    }

    Ok(())
}

fn should_skip(path: &Path, filter: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    if let Some(set) = filter {
        let matched = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| set.is_match(name));
        if !matched {
            return true;
        }
    }
    if let Some(set) = exclude {
        return set.is_match(normalize_slashes(path).as_str());
    }
    false
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn normalize_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn dedup_by_path(entries: &mut Vec<RenameEntry>) {
    entries.sort_by_key(|entry| entry.input_path());
    entries.dedup_by_key(|entry| entry.input_path());
}

fn sort_deepest_first(entries: &mut [RenameEntry]) {
    entries.sort_by(|a, b| {
        let depth_a = a.input_path().components().count();
        let depth_b = b.input_path().components().count();
        depth_b
            .cmp(&depth_a)
            .then_with(|| a.input_path().cmp(&b.input_path()))
    });
}

fn build_globs(patterns: &[String], label: &str) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|err| anyhow!("invalid {label} glob '{pattern}': {err}"))?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|err| anyhow!("unable to build {label} globs: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::write(path, "x").expect("write file");
    }

    fn names(entries: &[RenameEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| entry.original_name().to_string())
            .collect()
    }

    #[test]
    fn missing_target_is_an_error() {
        let err = scan_targets(
            &[PathBuf::from("/definitely/not/here")],
            &ScanOptions::default(),
        )
        .expect_err("missing dir");
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn non_recursive_scan_stays_at_top_level() {
        let temp = tempdir().expect("temp dir");
        touch(&temp.path().join("a.txt"));
        let sub = temp.path().join("sub");
        fs::create_dir(&sub).expect("sub dir");
        touch(&sub.join("b.txt"));

        let entries = scan_targets(&[temp.path().to_path_buf()], &ScanOptions::default())
            .expect("scan succeeds");
        assert_eq!(names(&entries), ["a.txt"]);
    }

    #[test]
    fn recursive_scan_orders_deepest_first() {
        let temp = tempdir().expect("temp dir");
        touch(&temp.path().join("top.txt"));
        let sub = temp.path().join("sub");
        fs::create_dir(&sub).expect("sub dir");
        touch(&sub.join("deep.txt"));

        let options = ScanOptions {
            recursive: true,
            include_dirs: true,
            ..ScanOptions::default()
        };
        let entries =
            scan_targets(&[temp.path().to_path_buf()], &options).expect("scan succeeds");
        assert_eq!(names(&entries), ["deep.txt", "sub", "top.txt"]);
    }

    #[test]
    fn directories_excluded_unless_requested() {
        let temp = tempdir().expect("temp dir");
        fs::create_dir(temp.path().join("inner")).expect("inner dir");
        touch(&temp.path().join("a.txt"));

        let entries = scan_targets(&[temp.path().to_path_buf()], &ScanOptions::default())
            .expect("scan succeeds");
        assert_eq!(names(&entries), ["a.txt"]);
    }

    #[test]
    fn hidden_entries_skipped_by_default() {
        let temp = tempdir().expect("temp dir");
        touch(&temp.path().join(".hidden.txt"));
        touch(&temp.path().join("seen.txt"));

        let entries = scan_targets(&[temp.path().to_path_buf()], &ScanOptions::default())
            .expect("scan succeeds");
        assert_eq!(names(&entries), ["seen.txt"]);

        let options = ScanOptions {
            include_hidden: true,
            ..ScanOptions::default()
        };
        let entries =
            scan_targets(&[temp.path().to_path_buf()], &options).expect("scan succeeds");
        assert_eq!(names(&entries), [".hidden.txt", "seen.txt"]);
    }

    #[test]
    fn name_filters_and_excludes_apply() {
        let temp = tempdir().expect("temp dir");
        touch(&temp.path().join("keep.txt"));
        touch(&temp.path().join("skip.md"));
        touch(&temp.path().join("drop.txt"));

        let options = ScanOptions {
            filters: vec!["*.txt".to_string()],
            excludes: vec!["**/drop.txt".to_string()],
            ..ScanOptions::default()
        };
        let entries =
            scan_targets(&[temp.path().to_path_buf()], &options).expect("scan succeeds");
        assert_eq!(names(&entries), ["keep.txt"]);
    }

    #[test]
    fn invalid_filter_glob_is_an_error() {
        let temp = tempdir().expect("temp dir");
        let options = ScanOptions {
            filters: vec!["[".to_string()],
            ..ScanOptions::default()
        };
        assert!(scan_targets(&[temp.path().to_path_buf()], &options).is_err());
    }

    #[test]
    fn overlapping_targets_dedup() {
        let temp = tempdir().expect("temp dir");
        touch(&temp.path().join("a.txt"));
        let target = temp.path().to_path_buf();

        let entries = scan_targets(&[target.clone(), target], &ScanOptions::default())
            .expect("scan succeeds");
        assert_eq!(names(&entries), ["a.txt"]);
    }
}
