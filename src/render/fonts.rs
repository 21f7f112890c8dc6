use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rusttype::Font;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, warn};

/// Embedded fallback so font resolution can never fail, even with an empty
/// or missing fonts directory.
static FALLBACK_FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

static FALLBACK_FONT: Lazy<Arc<Font<'static>>> = Lazy::new(|| {
    Arc::new(
        Font::try_from_bytes(FALLBACK_FONT_BYTES).expect("embedded fallback font must parse"),
    )
});

/// Maps logical font names (file stems) to loadable fonts.
///
/// Built once at startup from a fonts directory and passed explicitly, so
/// the renderer stays testable without touching the filesystem. Resolution
/// is infallible: unknown names and unreadable files degrade to the
/// embedded fallback.
pub struct FontLibrary {
    by_name: HashMap<String, PathBuf>,
    cache: Mutex<HashMap<String, Arc<Font<'static>>>>,
}

impl FontLibrary {
    /// A library with no named fonts; every lookup resolves to the fallback.
    pub fn empty() -> Self {
        Self {
            by_name: HashMap::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Scan `dir` for `.ttf`/`.otf` files, keyed by file stem. A missing or
    /// unreadable directory yields an empty library rather than an error.
    pub fn scan(dir: &Path) -> Self {
        let mut by_name = HashMap::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!("fonts dir {} not readable: {e}", dir.display());
                return Self::empty();
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase());
            if !matches!(ext.as_deref(), Some("ttf") | Some("otf")) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                by_name.insert(stem.to_string(), path.clone());
            }
        }
        debug!("font library: {} fonts from {}", by_name.len(), dir.display());
        Self {
            by_name,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a logical font name to a scalable font. Never fails: unknown
    /// names, unreadable files, and unparseable font data all yield the
    /// embedded fallback.
    pub fn resolve(&self, name: &str) -> Arc<Font<'static>> {
        if let Some(f) = self.cache.lock().get(name) {
            return Arc::clone(f);
        }

        let loaded = self.by_name.get(name).and_then(|path| {
            let bytes = match std::fs::read(path) {
                Ok(b) => b,
                Err(e) => {
                    warn!("failed to read font {}: {e}", path.display());
                    return None;
                }
            };
            let f = Font::try_from_vec(bytes);
            if f.is_none() {
                warn!("failed to parse font {}", path.display());
            }
            f
        });

        let font = match loaded {
            Some(f) => Arc::new(f),
            None => Arc::clone(&FALLBACK_FONT),
        };
        self.cache
            .lock()
            .insert(name.to_string(), Arc::clone(&font));
        font
    }

    /// The embedded fallback font.
    pub fn fallback() -> Arc<Font<'static>> {
        Arc::clone(&FALLBACK_FONT)
    }

    /// Logical names of all scanned fonts, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut v: Vec<String> = self.by_name.keys().cloned().collect();
        v.sort();
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_resolves_to_fallback() {
        let lib = FontLibrary::empty();
        let f = lib.resolve("NoSuchFont");
        assert!(Arc::ptr_eq(&f, &FontLibrary::fallback()));
    }

    #[test]
    fn scan_of_missing_dir_yields_empty_library() {
        let lib = FontLibrary::scan(Path::new("/definitely/not/here"));
        assert!(lib.names().is_empty());
        assert!(Arc::ptr_eq(
            &lib.resolve("anything"),
            &FontLibrary::fallback()
        ));
    }

    #[test]
    fn corrupt_font_file_degrades_to_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Broken.ttf"), b"not a font").unwrap();
        let lib = FontLibrary::scan(dir.path());
        assert_eq!(lib.names(), vec!["Broken".to_string()]);
        assert!(Arc::ptr_eq(&lib.resolve("Broken"), &FontLibrary::fallback()));
    }

    #[test]
    fn real_font_file_resolves_to_itself() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Deja.ttf"), FALLBACK_FONT_BYTES).unwrap();
        let lib = FontLibrary::scan(dir.path());
        let f = lib.resolve("Deja");
        // Loaded from disk, so a distinct instance from the fallback.
        assert!(!Arc::ptr_eq(&f, &FontLibrary::fallback()));
        // Cached on the second hit.
        assert!(Arc::ptr_eq(&f, &lib.resolve("Deja")));
    }

    #[test]
    fn non_font_files_are_ignored_by_scan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"hi").unwrap();
        std::fs::write(dir.path().join("A.ttf"), FALLBACK_FONT_BYTES).unwrap();
        std::fs::write(dir.path().join("B.otf"), FALLBACK_FONT_BYTES).unwrap();
        let lib = FontLibrary::scan(dir.path());
        assert_eq!(lib.names(), vec!["A".to_string(), "B".to_string()]);
    }
}
