//! Path confinement and validation utilities.
//!
//! Every file the publisher touches must resolve, after following symlinks,
//! to a location inside the managed directory.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates the name of the managed directory.
///
/// The name must be exactly one normal path component: no separators, no
/// `.`/`..`, no null bytes and no platform prefixes.
///
/// # Examples
///
/// ```
/// use pagestyle_publish::validate_directory_name;
/// assert!(validate_directory_name("custom-page-styles").is_ok());
/// assert!(validate_directory_name("a/b").is_err());
/// assert!(validate_directory_name("..").is_err());
/// assert!(validate_directory_name("").is_err());
/// ```
pub fn validate_directory_name(name: impl AsRef<Path>) -> Result<PathBuf> {
    let name = name.as_ref();
    let mut components = name.components();
    match (components.next(), components.next()) {
        // Null bytes pass through Path::components() on Unix but cause
        // truncation in C-based syscalls, reject them explicitly.
        (Some(Component::Normal(s)), None) if !s.as_encoded_bytes().contains(&0) => Ok(PathBuf::from(s)),
        _ => exn::bail!(ErrorKind::InvalidPath(name.to_path_buf())),
    }
}

/// Resolves `target` and checks that it lives inside `dir`.
///
/// Both the directory and the target's parent are canonicalized. If the
/// target itself exists it is canonicalized too, so a planted symlink that
/// points elsewhere is caught. Containment is checked component-wise.
///
/// Returns the resolved target path.
///
/// # Errors
/// - [`FilesystemUnavailable`](ErrorKind::FilesystemUnavailable) if `dir`
///   cannot be resolved.
/// - [`PathTraversal`](ErrorKind::PathTraversal) if the target (or its
///   parent) cannot be resolved or resolves outside `dir`.
pub fn confine(dir: &Path, target: &Path) -> Result<PathBuf> {
    let real_dir = match dir.canonicalize() {
        Ok(real) => real,
        Err(_) => exn::bail!(ErrorKind::FilesystemUnavailable(dir.to_path_buf())),
    };
    let resolved = match target.symlink_metadata() {
        Ok(_) => target.canonicalize(),
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            let (Some(parent), Some(name)) = (target.parent(), target.file_name()) else {
                exn::bail!(ErrorKind::PathTraversal(target.to_path_buf()));
            };
            parent.canonicalize().map(|parent| parent.join(name))
        },
        Err(e) => Err(e),
    };
    match resolved {
        Ok(resolved) if resolved != real_dir && resolved.starts_with(&real_dir) => Ok(resolved),
        // Dangling symlinks and unresolvable parents end up here as well.
        _ => exn::bail!(ErrorKind::PathTraversal(target.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("custom-page-styles")]
    #[case("styles")]
    #[case("with space")]
    fn test_valid_directory_names(#[case] name: &str) {
        assert_eq!(validate_directory_name(name).unwrap(), Path::new(name));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("a/b")]
    #[case("/absolute")]
    #[case("../escape")]
    #[case("a\0b")]
    fn test_invalid_directory_names(#[case] name: &str) {
        assert!(validate_directory_name(name).is_err());
    }

    #[test]
    fn test_confine_missing_file_inside() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = temp_dir.path().join("post-styles-1.css");
        let resolved = confine(temp_dir.path(), &target).unwrap();
        assert_eq!(resolved, temp_dir.path().canonicalize().unwrap().join("post-styles-1.css"));
    }

    #[test]
    fn test_confine_existing_file_inside() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = temp_dir.path().join("post-styles-1.css");
        std::fs::write(&target, "a{}").unwrap();
        assert!(confine(temp_dir.path(), &target).is_ok());
    }

    #[test]
    fn test_confine_rejects_traversal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let managed = temp_dir.path().join("managed");
        std::fs::create_dir(&managed).unwrap();
        let target = managed.join("../outside.css");
        let err = confine(&managed, &target).unwrap_err();
        assert!(matches!(&*err, ErrorKind::PathTraversal(_)));
    }

    #[test]
    fn test_confine_rejects_sibling_with_common_prefix() {
        let temp_dir = tempfile::tempdir().unwrap();
        let managed = temp_dir.path().join("styles");
        let sibling = temp_dir.path().join("styles-evil");
        std::fs::create_dir(&managed).unwrap();
        std::fs::create_dir(&sibling).unwrap();
        assert!(confine(&managed, &sibling.join("post-styles-1.css")).is_err());
    }

    #[test]
    fn test_confine_rejects_directory_itself() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(confine(temp_dir.path(), temp_dir.path()).is_err());
    }

    #[test]
    fn test_confine_missing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let managed = temp_dir.path().join("missing");
        let err = confine(&managed, &managed.join("post-styles-1.css")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::FilesystemUnavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_confine_rejects_symlink_escape() {
        let temp_dir = tempfile::tempdir().unwrap();
        let managed = temp_dir.path().join("managed");
        std::fs::create_dir(&managed).unwrap();
        let outside = temp_dir.path().join("secret.css");
        std::fs::write(&outside, "secret").unwrap();
        let target = managed.join("post-styles-1.css");
        std::os::unix::fs::symlink(&outside, &target).unwrap();
        let err = confine(&managed, &target).unwrap_err();
        assert!(matches!(&*err, ErrorKind::PathTraversal(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_confine_rejects_dangling_symlink() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = temp_dir.path().join("post-styles-1.css");
        std::os::unix::fs::symlink("/nonexistent/elsewhere.css", &target).unwrap();
        assert!(confine(temp_dir.path(), &target).is_err());
    }
}
