//! Icons Module
//!
//! Notification icon loading and caching.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Decoded icon, already scaled to the configured size
#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    pub width: u32,
    pub height: u32,
    /// Pixels, RGBA8 row-major
    pub rgba: Vec<u8>,
}

/// Icon cache keyed by path
///
/// Entries live for the whole process, failed decodes included, so a broken
/// icon path is only decoded (and reported) once.
pub struct IconCache {
    size: u32,
    icons: HashMap<PathBuf, Option<Icon>>,
}

impl IconCache {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            icons: HashMap::new(),
        }
    }

    /// Get the icon for a path, decoding it on first use
    pub fn get(&mut self, path: &Path) -> Option<&Icon> {
        let size = self.size;
        self.icons
            .entry(path.to_path_buf())
            .or_insert_with(|| match load_icon(path, size) {
                Ok(icon) => {
                    debug!("Loaded icon {:?}: {}x{}", path, icon.width, icon.height);
                    Some(icon)
                }
                Err(e) => {
                    warn!("Could not load notification icon {:?}: {:#}", path, e);
                    None
                }
            })
            .as_ref()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.icons.len()
    }
}

/// Decode an image and scale it so its longer side equals `size`
pub fn load_icon(path: &Path, size: u32) -> Result<Icon> {
    let img = image::open(path).with_context(|| format!("Failed to decode {:?}", path))?;
    let img = img.resize(size.max(1), size.max(1), FilterType::Triangle);
    let rgba = img.to_rgba8();

    Ok(Icon {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}
