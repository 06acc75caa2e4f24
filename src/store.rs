//! Template directory loading and atomic hot-reload.
//!
//! A reload builds a complete new `TemplateSet` off to the side and then
//! publishes it by swapping one `Arc`. Readers clone the `Arc` they find and
//! keep using that snapshot for as long as they like; they never observe a
//! partially built set and never block a reload while they match.

use crate::image::io::{is_supported, load_gray_image};
use crate::template::Template;
use crate::trace::{trace_event, trace_warn};
use crate::util::{ClickMatchError, ClickMatchResult};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A file that could not be turned into a template.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedFile {
    pub name: String,
    pub error: ClickMatchError,
}

/// Immutable set of templates produced by one load.
#[derive(Debug, Default)]
pub struct TemplateSet {
    templates: Vec<Arc<Template>>,
    skipped: Vec<SkippedFile>,
    generation: u64,
}

impl TemplateSet {
    /// Builds a set from already constructed templates.
    pub fn new(templates: Vec<Template>) -> Self {
        Self {
            templates: templates.into_iter().map(Arc::new).collect(),
            skipped: Vec::new(),
            generation: 0,
        }
    }

    pub fn templates(&self) -> &[Arc<Template>] {
        &self.templates
    }

    /// Files that were present but failed to load.
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Load counter of the store that published this set (0 if never published).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Template names in load order.
    pub fn names(&self) -> Vec<&str> {
        self.templates.iter().map(|t| t.name()).collect()
    }
}

/// Scans `dir` for supported image files and builds a fresh set.
///
/// The directory is created when missing. Individual files that fail to
/// decode or are degenerate are recorded in `skipped` and never abort the
/// load; only an unusable directory is an error. Files are processed in
/// name order.
pub fn load_template_set(dir: &Path, scale: f32) -> ClickMatchResult<TemplateSet> {
    let dir_err = |err: std::io::Error| ClickMatchError::TemplateDir {
        path: dir.to_path_buf(),
        reason: err.to_string(),
    };
    if !dir.is_dir() {
        fs::create_dir_all(dir).map_err(dir_err)?;
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(dir_err)? {
        let Ok(entry) = entry else {
            continue;
        };
        let path = entry.path();
        if path.is_file() && is_supported(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut set = TemplateSet::default();
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let loaded =
            load_gray_image(&path).and_then(|img| Template::from_gray(name.clone(), img, scale));
        match loaded {
            Ok(template) => set.templates.push(Arc::new(template)),
            Err(error) => {
                trace_warn!("template_skipped", file = name, error = error);
                set.skipped.push(SkippedFile { name, error });
            }
        }
    }
    Ok(set)
}

/// Owner of the currently published template set.
pub struct TemplateStore {
    dir: PathBuf,
    scale: f32,
    current: RwLock<Arc<TemplateSet>>,
    generation: AtomicU64,
}

impl TemplateStore {
    /// Creates a store with an empty set; call [`TemplateStore::reload`] to populate it.
    pub fn new(dir: impl Into<PathBuf>, scale: f32) -> Self {
        Self {
            dir: dir.into(),
            scale,
            current: RwLock::new(Arc::new(TemplateSet::default())),
            generation: AtomicU64::new(0),
        }
    }

    /// Directory scanned on reload.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the most recently published set.
    pub fn current(&self) -> Arc<TemplateSet> {
        self.current.read().clone()
    }

    /// Rebuilds the set from disk and publishes it.
    ///
    /// On error the previously published set stays in place.
    pub fn reload(&self) -> ClickMatchResult<Arc<TemplateSet>> {
        let set = load_template_set(&self.dir, self.scale)?;
        let published = self.install(set);
        trace_event!(
            "templates_loaded",
            count = published.len(),
            skipped = published.skipped().len(),
            generation = published.generation()
        );
        Ok(published)
    }

    /// Publishes a fully built set, replacing the current one wholesale.
    pub fn install(&self, mut set: TemplateSet) -> Arc<TemplateSet> {
        set.generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let set = Arc::new(set);
        *self.current.write() = Arc::clone(&set);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::{TemplateSet, TemplateStore};
    use crate::template::Template;

    fn template(name: &str) -> Template {
        let data: Vec<u8> = (0u8..25).map(|v| v * 10).collect();
        Template::new(name, data, 5, 5, 1.0).unwrap()
    }

    #[test]
    fn install_swaps_whole_set() {
        let store = TemplateStore::new("unused", 1.0);
        assert!(store.current().is_empty());

        let before = store.current();
        let first = store.install(TemplateSet::new(vec![template("a.png")]));
        assert_eq!(first.generation(), 1);
        assert!(before.is_empty());

        let snapshot = store.current();
        store.install(TemplateSet::new(vec![template("b.png"), template("c.png")]));
        assert_eq!(snapshot.names(), vec!["a.png"]);
        assert_eq!(store.current().names(), vec!["b.png", "c.png"]);
        assert_eq!(store.current().generation(), 2);
    }
}
