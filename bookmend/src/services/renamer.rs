//! Merge-safe folder rename engine
//!
//! Moves a book folder to its corrected author/title location. An
//! existing destination is merged child by child without overwriting
//! anything already there. A partial run is resumable: re-running the
//! move picks up whatever children remain.

use std::fs;
use std::io;
use std::path::Path;
use tracing::warn;

/// Move `old_path` to `new_path`, merging when the destination already
/// exists. Colliding children are left behind (the destination copy
/// wins) and the old folder is only removed once it is empty. The old
/// author directory is pruned when the move empties it.
pub fn move_book_folder(old_path: &Path, new_path: &Path) -> io::Result<()> {
    if old_path == new_path {
        return Ok(());
    }

    if new_path.exists() {
        merge_into_existing(old_path, new_path)?;
    } else {
        if let Some(parent) = new_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(old_path, new_path)?;
    }

    remove_author_dir_if_empty(old_path);

    Ok(())
}

fn merge_into_existing(old_path: &Path, new_path: &Path) -> io::Result<()> {
    let mut left_behind = 0usize;

    for entry in fs::read_dir(old_path)? {
        let entry = entry?;
        let dest = new_path.join(entry.file_name());
        if dest.exists() {
            left_behind += 1;
            continue;
        }
        fs::rename(entry.path(), &dest)?;
    }

    if left_behind == 0 {
        fs::remove_dir(old_path)?;
    } else {
        warn!(
            "Merge into {} left {} conflicting entries behind in {}",
            new_path.display(),
            left_behind,
            old_path.display()
        );
    }

    Ok(())
}

/// Prune the old author directory once its last title moves out.
/// Best-effort: a failure here is cosmetic, the book itself has moved.
fn remove_author_dir_if_empty(old_path: &Path) {
    let Some(parent) = old_path.parent() else {
        return;
    };
    if !parent.exists() {
        return;
    }

    match fs::read_dir(parent) {
        Ok(mut entries) => {
            if entries.next().is_none() {
                if let Err(e) = fs::remove_dir(parent) {
                    warn!("Could not remove empty author directory {}: {}", parent.display(), e);
                }
            }
        }
        Err(e) => {
            warn!("Could not inspect author directory {}: {}", parent.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_file(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn book_dir(root: &Path, author: &str, title: &str) -> PathBuf {
        root.join(author).join(title)
    }

    #[test]
    fn test_plain_move_creates_parents_and_prunes_old_author() {
        let root = TempDir::new().unwrap();
        let old = book_dir(root.path(), "Odd Thomas", "Dean Koontz");
        write_file(&old.join("book.epub"), "content");

        let new = book_dir(root.path(), "Dean Koontz", "Odd Thomas");
        move_book_folder(&old, &new).unwrap();

        assert!(new.join("book.epub").exists());
        assert!(!old.exists());
        // Old author directory was emptied and pruned
        assert!(!root.path().join("Odd Thomas").exists());
    }

    #[test]
    fn test_old_author_dir_kept_when_not_empty() {
        let root = TempDir::new().unwrap();
        let old = book_dir(root.path(), "Author", "Wrong Title");
        write_file(&old.join("a.mp3"), "a");
        let sibling = book_dir(root.path(), "Author", "Other Title");
        write_file(&sibling.join("b.mp3"), "b");

        let new = book_dir(root.path(), "Author", "Right Title");
        move_book_folder(&old, &new).unwrap();

        assert!(!old.exists());
        assert!(sibling.exists());
        assert!(root.path().join("Author").exists());
    }

    #[test]
    fn test_merge_keeps_destination_copy() {
        let root = TempDir::new().unwrap();
        let old = book_dir(root.path(), "Old Author", "Book");
        write_file(&old.join("a.txt"), "from old");
        write_file(&old.join("b.txt"), "old b");

        let new = book_dir(root.path(), "New Author", "Book");
        write_file(&new.join("b.txt"), "new b");
        write_file(&new.join("c.txt"), "from new");

        move_book_folder(&old, &new).unwrap();

        // Union of both, with the colliding file keeping its
        // destination content
        assert_eq!(fs::read_to_string(new.join("a.txt")).unwrap(), "from old");
        assert_eq!(fs::read_to_string(new.join("b.txt")).unwrap(), "new b");
        assert_eq!(fs::read_to_string(new.join("c.txt")).unwrap(), "from new");

        // The conflicting original stays behind rather than being lost
        assert!(old.exists());
        assert_eq!(fs::read_to_string(old.join("b.txt")).unwrap(), "old b");
        assert!(!old.join("a.txt").exists());
    }

    #[test]
    fn test_merge_without_collisions_removes_old_folder() {
        let root = TempDir::new().unwrap();
        let old = book_dir(root.path(), "Old Author", "Book");
        write_file(&old.join("a.txt"), "a");

        let new = book_dir(root.path(), "New Author", "Book");
        write_file(&new.join("c.txt"), "c");

        move_book_folder(&old, &new).unwrap();

        assert!(new.join("a.txt").exists());
        assert!(new.join("c.txt").exists());
        assert!(!old.exists());
        assert!(!root.path().join("Old Author").exists());
    }

    #[test]
    fn test_merge_is_resumable() {
        let root = TempDir::new().unwrap();
        let old = book_dir(root.path(), "Old Author", "Book");
        write_file(&old.join("a.txt"), "a");
        write_file(&old.join("b.txt"), "old b");

        let new = book_dir(root.path(), "New Author", "Book");
        write_file(&new.join("b.txt"), "new b");

        // First run moves a.txt, leaves b.txt behind
        move_book_folder(&old, &new).unwrap();
        assert!(old.exists());

        // Operator resolves the conflict, second run finishes the job
        fs::remove_file(new.join("b.txt")).unwrap();
        move_book_folder(&old, &new).unwrap();

        assert!(!old.exists());
        assert_eq!(fs::read_to_string(new.join("b.txt")).unwrap(), "old b");
        assert!(!root.path().join("Old Author").exists());
    }

    #[test]
    fn test_move_to_same_path_leaves_folder_alone() {
        let root = TempDir::new().unwrap();
        let old = book_dir(root.path(), "Author", "Title");
        write_file(&old.join("a.txt"), "a");

        move_book_folder(&old, &old).unwrap();

        assert!(old.join("a.txt").exists());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let root = TempDir::new().unwrap();
        let old = book_dir(root.path(), "Nobody", "Nothing");
        let new = book_dir(root.path(), "Somebody", "Something");

        assert!(move_book_folder(&old, &new).is_err());
    }

    #[test]
    fn test_moving_directory_contents_recursively() {
        let root = TempDir::new().unwrap();
        let old = book_dir(root.path(), "Old", "Book");
        write_file(&old.join("cd1").join("track01.mp3"), "t1");
        write_file(&old.join("cd2").join("track01.mp3"), "t2");

        let new = book_dir(root.path(), "New", "Book");
        write_file(&new.join("cover.jpg"), "img");

        move_book_folder(&old, &new).unwrap();

        assert!(new.join("cd1").join("track01.mp3").exists());
        assert!(new.join("cd2").join("track01.mp3").exists());
        assert!(new.join("cover.jpg").exists());
        assert!(!old.exists());
    }
}
