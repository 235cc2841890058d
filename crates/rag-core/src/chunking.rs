//! Recursive character chunking.
//!
//! The splitter tries paragraph breaks first, then line breaks, then spaces,
//! then single characters. Pieces smaller than `chunk_size` are merged back
//! into chunks; consecutive chunks from one document share up to
//! `chunk_overlap` characters. Lengths are counted in `char`s.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::types::Document;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Validated chunking parameters. `chunk_overlap < chunk_size` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Option<Vec<String>>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP, separators: None }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidChunking { chunk_size, chunk_overlap });
        }
        Ok(Self { chunk_size, chunk_overlap, separators: None })
    }

    /// Replace the default separator list. Order is preference order; an
    /// empty string means "split between any two characters".
    #[must_use]
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = Some(separators.into_iter().map(Into::into).collect());
        self
    }

    pub fn chunk_size(&self) -> usize { self.chunk_size }
    pub fn chunk_overlap(&self) -> usize { self.chunk_overlap }
    pub fn separators(&self) -> Option<&[String]> { self.separators.as_deref() }
}

pub fn build_text_splitter(cfg: &ChunkingConfig) -> Result<RecursiveCharacterSplitter> {
    if cfg.chunk_overlap >= cfg.chunk_size {
        return Err(Error::InvalidChunking { chunk_size: cfg.chunk_size, chunk_overlap: cfg.chunk_overlap });
    }
    let separators = match &cfg.separators {
        Some(custom) => custom.clone(),
        None => DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
    };
    Ok(RecursiveCharacterSplitter { chunk_size: cfg.chunk_size, chunk_overlap: cfg.chunk_overlap, separators })
}

/// Split documents into chunks while preserving metadata.
pub fn split_documents<I>(documents: I, cfg: &ChunkingConfig) -> Result<Vec<Document>>
where
    I: IntoIterator<Item = Document>,
{
    let splitter = build_text_splitter(cfg)?;
    let documents: Vec<Document> = documents.into_iter().collect();
    Ok(splitter.split_documents(&documents))
}

#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        let mut out = Vec::new();
        for doc in documents {
            for chunk in self.split_text(&doc.page_content) {
                out.push(Document::with_metadata(chunk, doc.metadata.clone()));
            }
        }
        tracing::debug!(documents = documents.len(), chunks = out.len(), "split documents");
        out
    }

    pub fn split_text(&self, text: &str) -> Vec<String> { self.split_recursive(text, &self.separators) }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);
        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge_splits(&small));
                small.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !small.is_empty() {
            chunks.extend(self.merge_splits(&small));
        }
        chunks
    }

    /// Greedily pack pieces into chunks of at most `chunk_size` characters,
    /// keeping a tail of at most `chunk_overlap` characters for the next one.
    fn merge_splits(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;
        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(size = total, limit = self.chunk_size, "created a chunk longer than chunk_size");
                }
                if !window.is_empty() {
                    if let Some(chunk) = join_trimmed(&window) {
                        chunks.push(chunk);
                    }
                    while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                        let Some((_, dropped)) = window.pop_front() else { break };
                        total -= dropped;
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        if let Some(chunk) = join_trimmed(&window) {
            chunks.push(chunk);
        }
        chunks
    }
}

/// First separator present in `text`, plus the finer separators after it.
/// An empty separator matches anything and ends the search.
fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (&'a str, &'a [String]) {
    let fallback = separators.last().map_or("", String::as_str);
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return ("", &[]);
        }
        if text.contains(sep.as_str()) {
            return (sep, &separators[i + 1..]);
        }
    }
    (fallback, &[])
}

/// Split on `separator`, attaching each separator to the start of the piece
/// that follows it. Empty pieces are dropped.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    let mut pieces = Vec::new();
    if separator.is_empty() {
        let mut starts = text.char_indices().map(|(i, _)| i).peekable();
        while let Some(start) = starts.next() {
            let end = starts.peek().copied().unwrap_or(text.len());
            pieces.push(&text[start..end]);
        }
        return pieces;
    }
    let mut last = 0;
    for (idx, _) in text.match_indices(separator) {
        pieces.push(&text[last..idx]);
        last = idx;
    }
    pieces.push(&text[last..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

fn join_trimmed(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn char_len(s: &str) -> usize { s.chars().count() }
