use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};

use super::ContainerError;

/// Files that travel with a document, keyed by their path relative to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachments {
    files: BTreeMap<String, Vec<u8>>,
}

impl Attachments {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::UnsafePath`] if the path is absolute or
    /// leaves the document's directory.
    pub fn insert(&mut self, path: &str, data: Vec<u8>) -> Result<(), ContainerError> {
        let path = normalise(path)?;
        self.files.insert(path, data);
        Ok(())
    }

    /// The contents of a file.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        let path = normalise(path).ok()?;
        self.files.get(&path).map(Vec::as_slice)
    }

    /// Whether the set holds a file.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Removes a file, returning its contents.
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        let path = normalise(path).ok()?;
        self.files.remove(&path)
    }

    /// Paths of every file, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// The number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether there are no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub(super) fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files
            .iter()
            .map(|(path, data)| (path.as_str(), data.as_slice()))
    }
}

/// Checks that `path` stays inside the document's directory, and spells it
/// with forward slashes and without `.` segments.
///
/// # Errors
///
/// Returns [`ContainerError::UnsafePath`] for absolute paths and paths that
/// climb out of the directory.
pub fn normalise(path: &str) -> Result<String, ContainerError> {
    let unsafe_path = || ContainerError::UnsafePath(path.to_owned());
    let unified = path.replace('\\', "/");
    if unified.starts_with('/') || unified.split('/').next().is_some_and(|first| first.contains(':'))
    {
        return Err(unsafe_path());
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop().ok_or_else(unsafe_path)?;
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return Err(unsafe_path());
    }
    Ok(segments.join("/"))
}

/// The location of an attachment on disk, below `directory`.
pub(super) fn on_disk(directory: &Path, path: &str) -> Result<PathBuf, ContainerError> {
    let relative = normalise(path)?;
    let mut full = directory.to_path_buf();
    for component in Path::new(&relative).components() {
        if let Component::Normal(segment) = component {
            full.push(segment);
        }
    }
    Ok(full)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("files/pic.png", "files/pic.png")]
    #[test_case("./files//pic.png", "files/pic.png")]
    #[test_case("files\\pic.png", "files/pic.png"; "backslashes")]
    #[test_case("files/old/../pic.png", "files/pic.png")]
    fn safe_paths_are_normalised(path: &str, expected: &str) {
        assert_eq!(normalise(path).unwrap(), expected);
    }

    #[test_case("../secret.txt")]
    #[test_case("files/../../secret.txt")]
    #[test_case("/etc/passwd")]
    #[test_case("C:/Windows/win.ini")]
    #[test_case("\\\\server\\share")]
    #[test_case("."; "the directory itself")]
    fn escaping_paths_are_rejected(path: &str) {
        assert!(matches!(normalise(path), Err(ContainerError::UnsafePath(p)) if p == path));
    }

    #[test]
    fn lookups_use_the_normalised_path() {
        let mut attachments = Attachments::new();
        attachments.insert("./files/pic.png", vec![1, 2, 3]).unwrap();

        assert_eq!(attachments.get("files/pic.png"), Some(&[1, 2, 3][..]));
        assert!(attachments.contains("files\\pic.png"));
        assert_eq!(attachments.paths().collect::<Vec<_>>(), ["files/pic.png"]);
        assert!(attachments.insert("../pic.png", Vec::new()).is_err());
        assert_eq!(attachments.len(), 1);
    }

    #[test]
    fn disk_paths_stay_below_the_directory() {
        let directory = Path::new("/data/docs");
        assert_eq!(
            on_disk(directory, "files/pic.png").unwrap(),
            Path::new("/data/docs/files/pic.png")
        );
        assert!(on_disk(directory, "../pic.png").is_err());
    }
}
