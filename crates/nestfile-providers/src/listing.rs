//! Listing semantics shared by every reader mode
//!
//! Archives store flat member names. Directories may be explicit members or
//! only implied by deeper names; both count as directories here.

use nestfile_core::{ContainerEntry, EntryKind};

/// Kind of `target` among `entries`; the empty path is the archive root
pub(crate) fn classify(entries: &[ContainerEntry], target: &[String]) -> Option<EntryKind> {
    if target.is_empty() {
        return Some(EntryKind::Directory);
    }

    let mut kind = None;
    for entry in entries {
        if entry.segments == target {
            return Some(entry.kind);
        }
        if is_below(entry, target) {
            kind = Some(EntryKind::Directory);
        }
    }
    kind
}

/// Entries under `target`
///
/// Non-recursive listing collapses deeper names to their first component
/// below `target`. Recursive listing also emits every implied intermediate
/// directory. Both keep first-seen order without duplicates.
pub(crate) fn children(
    entries: &[ContainerEntry],
    target: &[String],
    recursive: bool,
) -> Vec<ContainerEntry> {
    let mut out: Vec<ContainerEntry> = Vec::new();
    let base = target.len();

    for entry in entries.iter().filter(|e| is_below(e, target)) {
        let deepest = if recursive { entry.segments.len() } else { base + 1 };

        for depth in base + 1..=deepest {
            let listed = if depth == entry.segments.len() {
                entry.clone()
            } else {
                ContainerEntry {
                    segments: entry.segments[..depth].to_vec(),
                    kind: EntryKind::Directory,
                    size: None,
                }
            };

            if !out.iter().any(|seen| seen.segments == listed.segments) {
                out.push(listed);
            }
        }
    }

    out
}

fn is_below(entry: &ContainerEntry, target: &[String]) -> bool {
    entry.segments.len() > target.len() && entry.segments.starts_with(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> Vec<String> {
        p.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect()
    }

    fn names(entries: &[ContainerEntry]) -> Vec<String> {
        entries.iter().map(ContainerEntry::internal_path).collect()
    }

    fn sample() -> Vec<ContainerEntry> {
        vec![
            ContainerEntry::directory("a"),
            ContainerEntry::directory("a/b"),
            ContainerEntry::file("a/b/c.txt", 3),
        ]
    }

    #[test]
    fn test_non_recursive_collapses() {
        assert_eq!(names(&children(&sample(), &[], false)), vec!["a"]);
    }

    #[test]
    fn test_recursive_lists_everything() {
        assert_eq!(names(&children(&sample(), &[], true)), vec!["a", "a/b", "a/b/c.txt"]);
    }

    #[test]
    fn test_implied_directories_without_markers() {
        let entries = vec![
            ContainerEntry::file("x/y/z.txt", 1),
            ContainerEntry::file("x/w.txt", 1),
            ContainerEntry::file("top.txt", 1),
        ];

        let root = children(&entries, &[], false);
        assert_eq!(names(&root), vec!["x", "top.txt"]);
        assert!(root[0].is_directory());
        assert!(!root[1].is_directory());

        assert_eq!(names(&children(&entries, &path("x"), false)), vec!["x/y", "x/w.txt"]);
        assert_eq!(
            names(&children(&entries, &path("x"), true)),
            vec!["x/y", "x/y/z.txt", "x/w.txt"]
        );
    }

    #[test]
    fn test_prefix_matches_whole_components() {
        let entries = vec![ContainerEntry::file("abc/d.txt", 1)];
        assert!(children(&entries, &path("ab"), false).is_empty());
        assert_eq!(classify(&entries, &path("ab")), None);
        assert_eq!(classify(&entries, &path("abc")), Some(EntryKind::Directory));
    }

    #[test]
    fn test_classify() {
        let entries = sample();
        assert_eq!(classify(&entries, &[]), Some(EntryKind::Directory));
        assert_eq!(classify(&entries, &path("a/b")), Some(EntryKind::Directory));
        assert_eq!(classify(&entries, &path("a/b/c.txt")), Some(EntryKind::File));
        assert_eq!(classify(&entries, &path("a/x")), None);
    }
}
