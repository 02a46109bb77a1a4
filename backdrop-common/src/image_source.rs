use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;
use crate::error::{BackdropError, ImageSourceError};
use crate::Result;

/// Extensions the host can display as a page background.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Opaque, displayable reference to one image (a URL the host can load).
/// Only valid until the next refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable snapshot of a folder's images. A refresh builds a new list;
/// an existing list is never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageList(Arc<[ImageRef]>);

impl ImageList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageRef> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageRef> {
        self.0.iter()
    }
}

impl Default for ImageList {
    fn default() -> Self {
        Self::from(Vec::new())
    }
}

impl From<Vec<ImageRef>> for ImageList {
    fn from(images: Vec<ImageRef>) -> Self {
        Self(images.into())
    }
}

/// A file inside the vault, as handed out by [`Vault::list_image_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    /// Path relative to the vault root.
    pub path: PathBuf,
}

/// The host's file-system abstraction.
pub trait Vault {
    /// Images directly inside `folder`, filtered to [`SUPPORTED_EXTENSIONS`].
    fn list_image_files(&self, folder: &str) -> Result<Vec<FileHandle>>;

    fn resolve_display_url(&self, file: &FileHandle) -> ImageRef;
}

/// Vault backed by a directory on the local disk. Folder paths are
/// relative to `root`.
#[derive(Debug, Clone)]
pub struct LocalVault {
    root: PathBuf,
}

impl LocalVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn is_supported_image(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                SUPPORTED_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }
}

impl Vault for LocalVault {
    fn list_image_files(&self, folder: &str) -> Result<Vec<FileHandle>> {
        let folder = folder.trim().trim_matches('/');
        if folder.is_empty() {
            return Err(BackdropError::ImageSource(ImageSourceError::NoFolder));
        }

        let path = self.root.join(folder);
        if !path.exists() {
            return Err(BackdropError::ImageSource(ImageSourceError::FolderNotFound { path }));
        }
        if !path.is_dir() {
            return Err(BackdropError::ImageSource(ImageSourceError::NotAFolder { path }));
        }

        let mut files = Vec::new();
        // Only the folder's own children, in file-name order.
        for entry in WalkDir::new(&path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                // Depth 0 is the folder itself; anything deeper is one bad child.
                Err(e) if e.depth() == 0 => {
                    return Err(BackdropError::ImageSource(ImageSourceError::FolderRead {
                        path: path.clone(),
                        source: e.into(),
                    }));
                }
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {:?}: {}", path, e);
                    continue;
                }
            };

            let entry_path = entry.path();
            if !entry_path.is_file() || !Self::is_supported_image(entry_path) {
                continue;
            }

            match entry_path.strip_prefix(&self.root) {
                Ok(relative) => files.push(FileHandle { path: relative.to_path_buf() }),
                Err(_) => log::warn!("Skipping {:?}: outside vault root {:?}", entry_path, self.root),
            }
        }

        if files.is_empty() {
            return Err(BackdropError::ImageSource(ImageSourceError::NoImagesFound { path }));
        }

        Ok(files)
    }

    fn resolve_display_url(&self, file: &FileHandle) -> ImageRef {
        let absolute = self.root.join(&file.path);
        let absolute = absolute.canonicalize().unwrap_or(absolute);
        ImageRef::new(format!("file://{}", absolute.display()))
    }
}

/// Turns a folder path into the current [`ImageList`].
pub struct ImageSource<V> {
    vault: V,
}

impl<V: Vault> ImageSource<V> {
    pub fn new(vault: V) -> Self {
        Self { vault }
    }

    /// Re-enumerates `folder` on every call. Never fails: a missing or
    /// empty folder is logged and yields an empty list.
    pub fn refresh(&self, folder: &str) -> ImageList {
        match self.vault.list_image_files(folder) {
            Ok(files) => {
                let images: Vec<ImageRef> = files
                    .iter()
                    .map(|file| self.vault.resolve_display_url(file))
                    .collect();
                log::debug!("Found {} images in {:?}", images.len(), folder);
                ImageList::from(images)
            }
            Err(e) => {
                log::warn!("No background images available: {}", e);
                ImageList::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use std::fs;

    fn file_names(list: &ImageList) -> Vec<String> {
        list.iter()
            .map(|image| image.as_str().rsplit('/').next().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_refresh_filters_and_sorts_by_name() {
        let temp_dir = tempdir().unwrap();
        let folder = temp_dir.path().join("bg");
        fs::create_dir(&folder).unwrap();

        fs::write(folder.join("c.jpeg"), "fake jpeg").unwrap();
        fs::write(folder.join("a.png"), "fake png").unwrap();
        fs::write(folder.join("b.JPG"), "fake jpg").unwrap();
        fs::write(folder.join("d.gif"), "not supported").unwrap();
        fs::write(folder.join("notes.md"), "not an image").unwrap();

        let source = ImageSource::new(LocalVault::new(temp_dir.path()));
        let images = source.refresh("bg");

        assert_eq!(file_names(&images), vec!["a.png", "b.JPG", "c.jpeg"]);
        assert!(images.iter().all(|image| image.as_str().starts_with("file://")));
    }

    #[test]
    fn test_refresh_ignores_subfolders() {
        let temp_dir = tempdir().unwrap();
        let folder = temp_dir.path().join("bg");
        fs::create_dir_all(folder.join("nested")).unwrap();

        fs::write(folder.join("top.png"), "fake png").unwrap();
        fs::write(folder.join("nested").join("deep.png"), "fake png").unwrap();

        let source = ImageSource::new(LocalVault::new(temp_dir.path()));
        assert_eq!(file_names(&source.refresh("bg")), vec!["top.png"]);
    }

    #[test]
    fn test_refresh_missing_folder_is_empty() {
        let temp_dir = tempdir().unwrap();
        let source = ImageSource::new(LocalVault::new(temp_dir.path()));

        assert!(source.refresh("does/not/exist").is_empty());
        assert!(source.refresh("").is_empty());
    }

    #[test]
    fn test_refresh_sees_changes_between_calls() {
        let temp_dir = tempdir().unwrap();
        let folder = temp_dir.path().join("bg");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("one.png"), "fake png").unwrap();

        let source = ImageSource::new(LocalVault::new(temp_dir.path()));
        let before = source.refresh("bg");
        assert_eq!(before.len(), 1);

        fs::write(folder.join("two.png"), "fake png").unwrap();
        let after = source.refresh("bg");
        assert_eq!(after.len(), 2);
        // The earlier snapshot is untouched.
        assert_eq!(before.len(), 1);
    }

    #[test]
    fn test_refresh_skips_dangling_symlink() {
        let temp_dir = tempdir().unwrap();
        let folder = temp_dir.path().join("bg");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("a.png"), "fake png").unwrap();
        fs::write(folder.join("b.png"), "fake png").unwrap();
        std::os::unix::fs::symlink(folder.join("gone.png"), folder.join("old.png")).unwrap();

        let source = ImageSource::new(LocalVault::new(temp_dir.path()));
        let images = source.refresh("bg");

        assert_eq!(file_names(&images), vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_list_image_files_errors() {
        let temp_dir = tempdir().unwrap();
        fs::create_dir(temp_dir.path().join("empty")).unwrap();
        fs::write(temp_dir.path().join("file.png"), "fake png").unwrap();
        let vault = LocalVault::new(temp_dir.path());

        match vault.list_image_files("  ") {
            Err(BackdropError::ImageSource(ImageSourceError::NoFolder)) => {}
            other => panic!("Expected NoFolder, got {:?}", other),
        }
        match vault.list_image_files("missing") {
            Err(BackdropError::ImageSource(ImageSourceError::FolderNotFound { path })) => {
                assert!(path.ends_with("missing"));
            }
            other => panic!("Expected FolderNotFound, got {:?}", other),
        }
        match vault.list_image_files("file.png") {
            Err(BackdropError::ImageSource(ImageSourceError::NotAFolder { .. })) => {}
            other => panic!("Expected NotAFolder, got {:?}", other),
        }
        match vault.list_image_files("empty") {
            Err(BackdropError::ImageSource(ImageSourceError::NoImagesFound { .. })) => {}
            other => panic!("Expected NoImagesFound, got {:?}", other),
        }
    }

    #[test]
    fn test_file_handles_are_vault_relative() {
        let temp_dir = tempdir().unwrap();
        let folder = temp_dir.path().join("images").join("backgrounds");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("sky.jpg"), "fake jpg").unwrap();

        let vault = LocalVault::new(temp_dir.path());
        let files = vault.list_image_files("/images/backgrounds/").unwrap();

        assert_eq!(files, vec![FileHandle { path: PathBuf::from("images/backgrounds/sky.jpg") }]);
        assert!(vault.resolve_display_url(&files[0]).as_str().ends_with("images/backgrounds/sky.jpg"));
    }

    #[test]
    fn test_is_supported_image() {
        assert!(LocalVault::is_supported_image(Path::new("a.png")));
        assert!(LocalVault::is_supported_image(Path::new("a.JPEG")));
        assert!(!LocalVault::is_supported_image(Path::new("a.webp")));
        assert!(!LocalVault::is_supported_image(Path::new("png")));
    }
}
