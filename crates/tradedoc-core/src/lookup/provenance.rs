//! Provenance lookup over a folder of product photos.
//!
//! The folder holds one sub-folder per product. The sub-folder whose name is
//! most similar to the product name is chosen; the text recognized on its
//! photos is searched for an origin statement.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace, warn};

use super::{LookupOutcome, Provenance, ProvenanceLookup, Result};
use crate::models::config::ProvenanceConfig;

lazy_static! {
    static ref ORIGIN_STATEMENT: Regex = Regex::new(
        r"(?i)(?:made\s+in|produced\s+in|product\s+of|country\s+of\s+origin|origin|hergestellt\s+in|herkunftsland|herkunft|ursprungsland)\s*:?\s*([\p{L}][\p{L} .-]*)"
    ).unwrap();
}

/// Country names and codes recognized in origin statements.
const COUNTRIES: &[(&str, &str)] = &[
    ("european union", "EU"),
    ("eu", "EU"),
    ("germany", "DE"),
    ("deutschland", "DE"),
    ("austria", "AT"),
    ("österreich", "AT"),
    ("italy", "IT"),
    ("italia", "IT"),
    ("italien", "IT"),
    ("france", "FR"),
    ("frankreich", "FR"),
    ("spain", "ES"),
    ("españa", "ES"),
    ("spanien", "ES"),
    ("portugal", "PT"),
    ("greece", "GR"),
    ("griechenland", "GR"),
    ("netherlands", "NL"),
    ("niederlande", "NL"),
    ("belgium", "BE"),
    ("belgien", "BE"),
    ("poland", "PL"),
    ("polen", "PL"),
    ("czech republic", "CZ"),
    ("tschechien", "CZ"),
    ("hungary", "HU"),
    ("ungarn", "HU"),
    ("switzerland", "CH"),
    ("schweiz", "CH"),
    ("turkey", "TR"),
    ("türkei", "TR"),
    ("china", "CN"),
    ("usa", "US"),
    ("united states", "US"),
];

/// Extract a provenance code from recognized text.
pub fn detect_origin(text: &str) -> Option<String> {
    for caps in ORIGIN_STATEMENT.captures_iter(text) {
        let phrase = caps[1].trim().to_lowercase();
        let hit = COUNTRIES
            .iter()
            .filter(|(name, _)| {
                phrase == *name
                    || phrase
                        .strip_prefix(name)
                        .is_some_and(|rest| rest.starts_with([' ', '.', '-']))
            })
            .max_by_key(|(name, _)| name.len());
        if let Some((_, code)) = hit {
            return Some(code.to_string());
        }
    }
    None
}

/// Source of text recognized on a product photo.
pub trait TextRecognizer {
    /// Text on the image at `path`, if any could be recognized.
    fn recognize(&self, path: &Path) -> Result<Option<String>>;
}

/// Reads previously recognized text from a `.txt` file next to the image.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarText;

impl TextRecognizer for SidecarText {
    fn recognize(&self, path: &Path) -> Result<Option<String>> {
        let sidecar = path.with_extension("txt");
        if !sidecar.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(sidecar)?))
    }
}

/// Provenance lookup over a product photo folder.
///
/// The folder listing is read once on construction and never mutated, so one
/// instance can serve any number of merges.
pub struct FolderProvenanceLookup<R = SidecarText> {
    root: PathBuf,
    folders: Vec<String>,
    cutoff: f64,
    thumbnail_size: u32,
    recognizer: R,
}

impl FolderProvenanceLookup<SidecarText> {
    /// Index `root`; an unreadable folder yields a lookup that never matches.
    pub fn open(root: impl Into<PathBuf>, config: &ProvenanceConfig) -> Self {
        Self::with_recognizer(root, config, SidecarText)
    }
}

impl<R: TextRecognizer> FolderProvenanceLookup<R> {
    pub fn with_recognizer(root: impl Into<PathBuf>, config: &ProvenanceConfig, recognizer: R) -> Self {
        let root = root.into();
        let folders = match list_folders(&root) {
            Ok(folders) => folders,
            Err(e) => {
                warn!("Cannot list provenance folder {}: {}", root.display(), e);
                Vec::new()
            }
        };
        debug!("Indexed {} provenance folders in {}", folders.len(), root.display());

        Self {
            root,
            folders,
            cutoff: config.similarity_cutoff,
            thumbnail_size: config.thumbnail_size,
            recognizer,
        }
    }

    /// Folder most similar to `name`, if any reaches the cutoff.
    pub fn best_match(&self, name: &str) -> Option<&str> {
        let name = collapse_whitespace(name);
        if name.is_empty() {
            return None;
        }

        self.folders
            .iter()
            .map(|folder| (folder, strsim::normalized_levenshtein(&name, folder)))
            .filter(|(_, score)| *score >= self.cutoff)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(folder, score)| {
                trace!("'{}' matched folder '{}' ({:.2})", name, folder, score);
                folder.as_str()
            })
    }

    fn thumbnail(&self, path: &Path) -> Result<Vec<u8>> {
        let img = image::open(path)?.thumbnail(self.thumbnail_size, self.thumbnail_size);
        let mut data = Vec::new();
        img.write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)?;
        Ok(data)
    }
}

impl<R: TextRecognizer> ProvenanceLookup for FolderProvenanceLookup<R> {
    fn lookup(&self, name: &str) -> Result<LookupOutcome<Provenance>> {
        let Some(folder) = self.best_match(name) else {
            return Ok(LookupOutcome::NotFound);
        };

        let images = list_images(&self.root.join(folder))?;

        let mut code = None;
        for path in &images {
            if let Some(text) = self.recognizer.recognize(path)? {
                code = detect_origin(&text);
                if code.is_some() {
                    break;
                }
            }
        }

        let Some(code) = code else {
            debug!("No origin statement found for '{}'", name);
            return Ok(LookupOutcome::NotFound);
        };

        let image = match images.first().map(|p| self.thumbnail(p)).transpose() {
            Ok(image) => image,
            Err(e) => {
                warn!("Cannot build thumbnail for '{}': {}", name, e);
                None
            }
        };

        Ok(LookupOutcome::Found(Provenance { code, image }))
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn list_folders(root: &Path) -> std::io::Result<Vec<String>> {
    let mut folders = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                folders.push(name.to_string());
            }
        }
    }
    folders.sort();
    Ok(folders)
}

fn list_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false)
        })
        .collect();
    images.sort();
    Ok(images)
}
