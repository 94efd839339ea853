/// Image input selection state
///
/// Two mutually exclusive input modes: local file upload and remote URL
/// list. At most one list is active at a time; switching modes clears both
/// lists and any previously resolved dimensions.

use std::path::{Path, PathBuf};

use iced::widget::image::Handle;

use crate::media::ImageSource;

/// Active input mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Upload,
    Url,
}

/// A selected local file and its loaded thumbnail
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub preview: Option<Handle>,
}

/// Preview state for a single URL entry
#[derive(Debug, Clone)]
pub enum UrlPreview {
    Loading,
    Loaded(Handle),
    Failed,
}

/// The selected image set plus the probed dimensions of the first image
#[derive(Debug, Clone)]
pub struct InputSelection {
    pub mode: InputMode,
    pub files: Vec<SelectedFile>,
    pub urls: Vec<String>,
    pub url_previews: Vec<UrlPreview>,
    /// Pixel dimensions of the first selected image, None until probed
    pub original_dimensions: Option<(u32, u32)>,
    /// The last probe failed (URL images may be unreachable)
    pub probe_failed: bool,
}

impl InputSelection {
    pub fn new() -> Self {
        InputSelection {
            mode: InputMode::Upload,
            files: Vec::new(),
            urls: Vec::new(),
            url_previews: Vec::new(),
            original_dimensions: None,
            probe_failed: false,
        }
    }

    /// Switch the active mode, clearing both image lists and the probed
    /// dimensions. Returns false when the mode is unchanged.
    pub fn switch_mode(&mut self, mode: InputMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.clear();
        true
    }

    /// Drop all selected images and invalidate the dimensions
    pub fn clear(&mut self) {
        self.files.clear();
        self.urls.clear();
        self.url_previews.clear();
        self.original_dimensions = None;
        self.probe_failed = false;
    }

    /// Add image files, skipping non-image paths and names already selected.
    /// Returns the newly added (name, path) pairs.
    pub fn add_files(&mut self, paths: Vec<PathBuf>) -> Vec<(String, PathBuf)> {
        let mut added = Vec::new();

        for path in paths {
            if !is_image_file(&path) {
                log::warn!("⚠️  Skipping non-image file: {}", path.display());
                continue;
            }
            let name = match path.file_name() {
                Some(name) => name.to_string_lossy().to_string(),
                None => continue,
            };
            if self.files.iter().any(|file| file.name == name) {
                continue;
            }
            self.files.push(SelectedFile {
                path: path.clone(),
                name: name.clone(),
                preview: None,
            });
            added.push((name, path));
        }

        if !added.is_empty() {
            self.invalidate_dimensions();
        }
        added
    }

    /// Remove a selected file by name
    pub fn remove_file(&mut self, name: &str) {
        self.files.retain(|file| file.name != name);
        self.invalidate_dimensions();
    }

    /// Attach a loaded thumbnail to a selected file, if it is still selected
    pub fn set_file_preview(&mut self, name: &str, preview: Handle) {
        if let Some(file) = self.files.iter_mut().find(|file| file.name == name) {
            file.preview = Some(preview);
        }
    }

    /// Replace the URL list from the newline-delimited editor text.
    /// Returns false when the parsed list is unchanged.
    pub fn set_urls(&mut self, text: &str) -> bool {
        let urls: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if urls == self.urls {
            return false;
        }
        self.url_previews = vec![UrlPreview::Loading; urls.len()];
        self.urls = urls;
        self.invalidate_dimensions();
        true
    }

    /// Remove a URL by position and return the rebuilt editor text
    pub fn remove_url(&mut self, index: usize) -> String {
        if index < self.urls.len() {
            self.urls.remove(index);
            self.url_previews.remove(index);
            self.invalidate_dimensions();
        }
        self.urls.join("\n")
    }

    pub fn set_url_preview(&mut self, index: usize, preview: Option<Handle>) {
        if let Some(slot) = self.url_previews.get_mut(index) {
            *slot = match preview {
                Some(handle) => UrlPreview::Loaded(handle),
                None => UrlPreview::Failed,
            };
        }
    }

    /// Whether the active mode has at least one image selected
    pub fn has_images(&self) -> bool {
        match self.mode {
            InputMode::Upload => !self.files.is_empty(),
            InputMode::Url => !self.urls.is_empty(),
        }
    }

    /// The first image of the active mode, used for dimension probing
    pub fn first_source(&self) -> Option<ImageSource> {
        match self.mode {
            InputMode::Upload => self
                .files
                .first()
                .map(|file| ImageSource::File(file.path.clone())),
            InputMode::Url => self.urls.first().map(|url| ImageSource::Url(url.clone())),
        }
    }

    fn invalidate_dimensions(&mut self) {
        self.original_dimensions = None;
        self.probe_failed = false;
    }
}

impl Default for InputSelection {
    fn default() -> Self {
        InputSelection::new()
    }
}

/// Image type filter, by file extension
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(image::ImageFormat::from_extension)
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_add_files_filters_and_dedupes() {
        let mut selection = InputSelection::new();
        let added = selection.add_files(paths(&["a.png", "notes.txt", "b.jpg"]));
        assert_eq!(added.len(), 2);

        // Same file name again, from a different directory
        let added = selection.add_files(paths(&["other/a.png"]));
        assert!(added.is_empty());
        assert_eq!(selection.files.len(), 2);
    }

    #[test]
    fn test_switch_mode_clears_everything() {
        let mut selection = InputSelection::new();
        selection.add_files(paths(&["a.png"]));
        selection.original_dimensions = Some((800, 600));

        assert!(selection.switch_mode(InputMode::Url));
        assert!(selection.files.is_empty());
        assert!(selection.urls.is_empty());
        assert_eq!(selection.original_dimensions, None);

        selection.set_urls("https://example.com/a.png");
        selection.original_dimensions = Some((640, 480));

        assert!(selection.switch_mode(InputMode::Upload));
        assert!(selection.urls.is_empty());
        assert_eq!(selection.original_dimensions, None);
    }

    #[test]
    fn test_switch_to_same_mode_is_a_no_op() {
        let mut selection = InputSelection::new();
        selection.add_files(paths(&["a.png"]));
        assert!(!selection.switch_mode(InputMode::Upload));
        assert_eq!(selection.files.len(), 1);
    }

    #[test]
    fn test_set_urls_parses_lines() {
        let mut selection = InputSelection::new();
        selection.mode = InputMode::Url;
        let changed = selection.set_urls("  https://a.example/1.png  \n\nhttps://b.example/2.jpg\n");
        assert!(changed);
        assert_eq!(
            selection.urls,
            vec![
                "https://a.example/1.png".to_string(),
                "https://b.example/2.jpg".to_string(),
            ]
        );
        assert_eq!(selection.url_previews.len(), 2);

        // Re-parsing identical text reports no change
        assert!(!selection.set_urls("https://a.example/1.png\nhttps://b.example/2.jpg"));
    }

    #[test]
    fn test_remove_url_reindexes() {
        let mut selection = InputSelection::new();
        selection.mode = InputMode::Url;
        selection.set_urls("u1\nu2\nu3");

        let text = selection.remove_url(1);
        assert_eq!(text, "u1\nu3");
        assert_eq!(selection.urls, vec!["u1".to_string(), "u3".to_string()]);
        assert_eq!(selection.url_previews.len(), 2);
    }

    #[test]
    fn test_has_images_respects_active_mode() {
        let mut selection = InputSelection::new();
        selection.add_files(paths(&["a.png"]));
        assert!(selection.has_images());

        selection.switch_mode(InputMode::Url);
        assert!(!selection.has_images());
        selection.set_urls("https://example.com/x.png");
        assert!(selection.has_images());
    }

    #[test]
    fn test_first_source_follows_mode() {
        let mut selection = InputSelection::new();
        selection.add_files(paths(&["a.png"]));
        assert!(matches!(
            selection.first_source(),
            Some(ImageSource::File(_))
        ));

        selection.switch_mode(InputMode::Url);
        assert!(selection.first_source().is_none());
        selection.set_urls("https://example.com/x.png");
        assert!(matches!(selection.first_source(), Some(ImageSource::Url(_))));
    }
}
