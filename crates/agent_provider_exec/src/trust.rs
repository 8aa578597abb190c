use std::path::{Path, PathBuf};

/// Directory names that mark the root of a version-controlled checkout.
pub const REPOSITORY_MARKERS: [&str; 3] = [".git", ".hg", ".jj"];

/// Nearest directory at or above `start` that contains a repository marker.
///
/// Relative paths are resolved against the current directory first.
pub fn find_repository_root(start: &Path) -> Option<PathBuf> {
    let absolute = if start.is_absolute() {
        start.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(start)
    };

    absolute
        .ancestors()
        .find(|dir| {
            REPOSITORY_MARKERS
                .iter()
                .any(|marker| dir.join(marker).exists())
        })
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_marker_in_an_ancestor() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(root.path().join(".jj")).expect("marker");
        let nested = root.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("nested dirs");

        assert_eq!(
            find_repository_root(&nested).as_deref(),
            Some(root.path())
        );
    }

    #[test]
    fn accepts_a_git_file_as_marker() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::write(root.path().join(".git"), "gitdir: ../elsewhere\n").expect("worktree file");

        assert_eq!(
            find_repository_root(root.path()).as_deref(),
            Some(root.path())
        );
    }

    #[test]
    fn plain_directory_has_no_root() {
        let root = tempfile::tempdir().expect("tempdir");
        assert_eq!(find_repository_root(root.path()), None);
    }
}
