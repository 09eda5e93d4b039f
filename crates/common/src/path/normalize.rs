// Logical path canonicalization: NFKC normalization, absolute-path and
// traversal rejection, 512 char max.
//
// This is the first gate of the path registry. Anything rejected here is
// reported upstream as "document does not exist"; unsafe inputs must not
// produce distinguishable errors.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Maximum allowed path length in characters.
const MAX_PATH_CHARS: usize = 512;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path exceeds maximum length of {MAX_PATH_CHARS} characters")]
    TooLong,

    #[error("path is absolute")]
    Absolute,

    #[error("path contains directory traversal component: {0}")]
    Traversal(String),

    #[error("path contains null byte")]
    NullByte,

    #[error("path contains invalid component: {0}")]
    InvalidComponent(String),
}

/// Normalize a logical document path for registry resolution.
///
/// Rules:
/// - Apply Unicode NFKC normalization
/// - Convert all separators to `/`
/// - Collapse consecutive `/` into one
/// - Reject absolute paths (leading separator or drive-letter prefix)
/// - Reject `.` and `..` path components (traversal)
/// - Reject null bytes
/// - Reject empty paths
/// - Enforce max 512 character limit (after normalization)
pub fn normalize_path(input: &str) -> Result<String, PathError> {
    if input.is_empty() {
        return Err(PathError::Empty);
    }

    if input.contains('\0') {
        return Err(PathError::NullByte);
    }

    // Apply Unicode NFKC normalization
    let normalized: String = input.nfkc().collect();

    // Convert backslashes to forward slashes
    let unified = normalized.replace('\\', "/");

    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err(PathError::Absolute);
    }

    // Split into components, dropping empty segments from consecutive slashes
    // mid-path; a trailing slash is tolerated, a leading one was rejected above.
    let components: Vec<&str> = unified.split('/').filter(|s| !s.is_empty()).collect();

    if components.is_empty() {
        return Err(PathError::Empty);
    }

    for component in &components {
        if *component == "." {
            return Err(PathError::Traversal(".".to_string()));
        }
        if *component == ".." {
            return Err(PathError::Traversal("..".to_string()));
        }
        if component.trim().is_empty() {
            return Err(PathError::InvalidComponent(
                "(whitespace-only component)".to_string(),
            ));
        }
    }

    let result = components.join("/");

    if result.chars().count() > MAX_PATH_CHARS {
        return Err(PathError::TooLong);
    }

    Ok(result)
}

/// Windows-style `C:` drive prefix, which `Path::join` would treat as a root.
fn has_drive_prefix(path: &str) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // Valid paths
    #[test]
    fn simple_path_passes_through() {
        assert_eq!(normalize_path("docs/readme.md").unwrap(), "docs/readme.md");
    }

    #[test]
    fn backslashes_become_forward_slashes() {
        assert_eq!(
            normalize_path("docs\\notes\\file.md").unwrap(),
            "docs/notes/file.md"
        );
    }

    #[test]
    fn consecutive_slashes_collapse() {
        assert_eq!(
            normalize_path("docs///nested//file.md").unwrap(),
            "docs/nested/file.md"
        );
    }

    #[test]
    fn trailing_slash_is_tolerated() {
        assert_eq!(normalize_path("docs/file.md/").unwrap(), "docs/file.md");
    }

    #[test]
    fn single_filename_is_valid() {
        assert_eq!(normalize_path("readme.md").unwrap(), "readme.md");
    }

    #[test]
    fn nfkc_normalizes_ligatures() {
        // NFKC normalizes ﬁ (U+FB01, fi ligature) to "fi"
        assert_eq!(normalize_path("docs/\u{FB01}le.md").unwrap(), "docs/file.md");
    }

    #[test]
    fn nfkc_normalizes_combining_accents() {
        let composed = normalize_path("docs/caf\u{0065}\u{0301}.md").unwrap();
        let expected = normalize_path("docs/café.md").unwrap();
        assert_eq!(composed, expected);
    }

    // Absolute paths
    #[test]
    fn rejects_leading_slash() {
        assert_eq!(normalize_path("/etc/passwd"), Err(PathError::Absolute));
    }

    #[test]
    fn rejects_leading_backslash() {
        assert_eq!(normalize_path("\\\\server\\share"), Err(PathError::Absolute));
    }

    #[test]
    fn rejects_drive_letter() {
        assert_eq!(normalize_path("C:/Windows/system.ini"), Err(PathError::Absolute));
        assert_eq!(normalize_path("c:\\boot.ini"), Err(PathError::Absolute));
    }

    // Traversal attacks
    #[test]
    fn rejects_dotdot() {
        assert_eq!(
            normalize_path("docs/../etc/passwd"),
            Err(PathError::Traversal("..".to_string()))
        );
    }

    #[test]
    fn rejects_leading_dotdot() {
        assert_eq!(
            normalize_path("../../../etc/passwd"),
            Err(PathError::Traversal("..".to_string()))
        );
    }

    #[test]
    fn rejects_dot_component() {
        assert_eq!(
            normalize_path("docs/./file.md"),
            Err(PathError::Traversal(".".to_string()))
        );
    }

    #[test]
    fn rejects_backslash_traversal() {
        assert_eq!(
            normalize_path("docs\\..\\etc\\passwd"),
            Err(PathError::Traversal("..".to_string()))
        );
    }

    // Edge cases
    #[test]
    fn rejects_empty() {
        assert_eq!(normalize_path(""), Err(PathError::Empty));
    }

    #[test]
    fn rejects_only_slashes() {
        assert_eq!(normalize_path("///"), Err(PathError::Absolute));
    }

    #[test]
    fn rejects_null_byte() {
        assert_eq!(normalize_path("docs/file\0.md"), Err(PathError::NullByte));
    }

    #[test]
    fn rejects_too_long() {
        let long_path = format!("d/{}", "a".repeat(600));
        assert_eq!(normalize_path(&long_path), Err(PathError::TooLong));
    }

    #[test]
    fn max_length_exactly_is_allowed() {
        let path = "a".repeat(512);
        assert!(normalize_path(&path).is_ok());
    }

    // Filenames that look dangerous but are valid
    #[test]
    fn dotfile_allowed() {
        assert_eq!(normalize_path(".gitignore").unwrap(), ".gitignore");
    }

    #[test]
    fn dots_in_filename_allowed() {
        assert_eq!(
            normalize_path("file.backup.2024.md").unwrap(),
            "file.backup.2024.md"
        );
    }

    #[test]
    fn triple_dot_filename_allowed() {
        // "..." as a filename is valid (not . or ..)
        assert_eq!(normalize_path("docs/...").unwrap(), "docs/...");
    }
}
