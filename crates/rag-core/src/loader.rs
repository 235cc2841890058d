use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::Document;

/// File extensions picked up by [`load_directory`].
pub const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Read every text file under `root` into a [`Document`].
///
/// Metadata carries `source` (full path), `doc_id` (file stem) and
/// `category` (parent directory relative to `root`, `misc` at top level).
/// Files are returned in path order.
pub fn load_directory(root: &Path) -> Result<Vec<Document>> {
    let files = list_text_files(root);
    if files.is_empty() {
        tracing::warn!(dir = %root.display(), "no text files found");
        return Ok(vec![]);
    }
    let mut docs = Vec::with_capacity(files.len());
    for (i, path) in files.iter().enumerate() {
        tracing::debug!(file = %path.display(), "loading {}/{}", i + 1, files.len());
        docs.push(load_file(path, root)?);
    }
    tracing::info!(files = docs.len(), dir = %root.display(), "loaded documents");
    Ok(docs)
}

fn load_file(path: &Path, root: &Path) -> Result<Document> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => String::from_utf8_lossy(&fs::read(path)?).to_string(),
    };
    let doc_id = path.file_stem().map_or_else(String::new, |s| s.to_string_lossy().to_string());
    Ok(Document::new(content)
        .meta("source", path.to_string_lossy().to_string())
        .meta("doc_id", doc_id)
        .meta("category", category_for(path, root)))
}

fn category_for(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    match relative.parent().and_then(Path::to_str) {
        Some(parent) if !parent.is_empty() => parent.to_string(),
        _ => "misc".to_string(),
    }
}

fn list_text_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().and_then(|s| s.to_str()).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext)))
        .collect();
    files.sort();
    files
}
