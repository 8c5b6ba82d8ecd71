use crate::domain::model::RecipeArgs;
use crate::domain::ports::Samples;
use crate::domain::recipe::{optional_usize, required_str, RecipeRegistry};
use crate::utils::error::{DatasetError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Text files unpacked on disk. Samples are read lazily, one file per sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextCorpus {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

impl TextCorpus {
    /// Unpacks `archive` into `target` (replacing previous contents) and collects the
    /// files ending in `extension`.
    pub fn extract_zip(archive: &Path, target: &Path, extension: &str) -> Result<Self> {
        if target.exists() {
            fs::remove_dir_all(target)?;
        }
        fs::create_dir_all(target)?;

        let file = fs::File::open(archive)?;
        let mut zip = zip::ZipArchive::new(file)?;
        tracing::debug!(
            "📦 Extracting {} entries from {} into {}",
            zip.len(),
            archive.display(),
            target.display()
        );
        zip.extract(target)?;

        Self::scan(target, extension)
    }

    pub fn scan(root: &Path, extension: &str) -> Result<Self> {
        let extension = extension.trim_start_matches('.');
        let mut files = Vec::new();
        collect_files(root, extension, &mut files)?;
        files.sort();
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn read_lines(&self, index: usize) -> Result<Vec<String>> {
        let path = self.files.get(index).ok_or(DatasetError::IndexOutOfRange {
            index,
            len: self.files.len(),
        })?;
        let content = fs::read_to_string(path)?;
        Ok(content.lines().map(str::to_string).collect())
    }

    pub fn builtin_recipes() -> RecipeRegistry<TextCorpus> {
        let mut registry = RecipeRegistry::new();
        let registered = registry
            .register("filter_name", filter_name)
            .and_then(|r| r.register("limit", limit))
            .map(|_| ());
        debug_assert!(registered.is_ok(), "built-in recipe names are unique");
        registry
    }
}

impl Samples for TextCorpus {
    type Item = Vec<String>;

    fn sample_count(&self) -> usize {
        self.files.len()
    }

    fn sample(&self, index: usize) -> Result<Vec<String>> {
        self.read_lines(index)
    }
}

fn collect_files(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, extension, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// `filter_name { pattern }`: keeps files whose name matches the regular expression.
fn filter_name(mut corpus: TextCorpus, args: &RecipeArgs) -> Result<TextCorpus> {
    const RECIPE: &str = "filter_name";
    let pattern = required_str(RECIPE, args, "pattern")?;
    let re = Regex::new(pattern)
        .map_err(|e| DatasetError::recipe_failed(RECIPE, format!("invalid pattern: {}", e)))?;

    corpus.files.retain(|path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| re.is_match(n))
    });
    Ok(corpus)
}

/// `limit { count }`: keeps the first `count` files.
fn limit(mut corpus: TextCorpus, args: &RecipeArgs) -> Result<TextCorpus> {
    const RECIPE: &str = "limit";
    let count = optional_usize(RECIPE, args, "count")?
        .ok_or_else(|| DatasetError::recipe_failed(RECIPE, "missing argument 'count'"))?;
    corpus.files.truncate(count);
    Ok(corpus)
}
