use std::{path::PathBuf, sync::Arc};

use crate::render::fonts::FontLibrary;

#[derive(Clone)]
pub struct AppState {
    pub fonts: Arc<FontLibrary>,
}

impl AppState {
    /// Build process state from the environment. The fonts directory is
    /// scanned once here; a missing directory just means every render uses
    /// the embedded fallback font.
    pub fn load() -> Self {
        let fonts_dir = std::env::var("FONTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("assets/fonts"));

        let fonts = FontLibrary::scan(&fonts_dir);
        let names = fonts.names();
        if names.is_empty() {
            tracing::warn!(
                "no fonts found in {}; every render will use the embedded fallback",
                fonts_dir.display()
            );
        } else {
            tracing::info!("loaded {} fonts from {}", names.len(), fonts_dir.display());
        }

        Self {
            fonts: Arc::new(fonts),
        }
    }
}
