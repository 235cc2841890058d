//! Layered settings resolution.
//!
//! Sources, lowest priority first:
//! compiled-in defaults, `configs/settings.toml`, `.env`, process environment,
//! programmatic overrides. Every `load` re-reads all of them; nothing is cached.
//!
//! Environment keys use `SECTION__FIELD` (`RAG__TOP_K=8`), plus two secret
//! aliases (`MISTRAL_API_KEY`, `TAVILY_API_KEY`). Anything else is ignored.
//! Environment and dotenv values stay strings until extraction, which
//! coerces them only where the field is numeric or boolean.

use figment::{
    providers::{Format, Serialized, Toml},
    value::{Dict, Map, Tag, Value},
    Figment, Metadata, Profile, Provider, Source,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::logging::LOG_TARGET;
use crate::paths::resolve_with_base;
use crate::error::Result;

pub const SETTINGS_FILE: &str = "configs/settings.toml";
pub const ENV_FILE: &str = ".env";
/// Separator between section and field in environment keys.
pub const ENV_SPLIT: &str = "__";

const SECTIONS: [&str; 5] = ["app", "models", "paths", "rag", "web"];

/// Environment aliases for the top-level secret fields.
pub const SECRET_ALIASES: [(&str, &str); 2] = [
    ("MISTRAL_API_KEY", "mistral_api_key"),
    ("TAVILY_API_KEY", "tavily_api_key"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub env: String,
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self { Self { env: "dev".into(), log_level: "INFO".into() } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Router, grader and generation model.
    pub chat_model: String,
    pub embed_model: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self { chat_model: "mistral-small-latest".into(), embed_model: "mistral-embed".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub data_dir: String,
    pub vectorstore_dir: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self { data_dir: "./data".into(), vectorstore_dir: "./data/vectorstore".into() }
    }
}

impl PathSettings {
    pub fn data_dir_in(&self, root: &Path) -> PathBuf { resolve_with_base(root, &self.data_dir) }
    pub fn vectorstore_dir_in(&self, root: &Path) -> PathBuf { resolve_with_base(root, &self.vectorstore_dir) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub top_k: usize,
    pub max_loops: usize,
}

impl Default for RagSettings {
    fn default() -> Self { Self { top_k: 4, max_loops: 3 } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    pub provider: String,
    pub max_results: usize,
}

impl Default for WebSettings {
    fn default() -> Self { Self { provider: "tavily".into(), max_results: 5 } }
}

/// Resolved configuration snapshot. Plain value; never mutated after `load`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mistral_api_key: String,
    pub tavily_api_key: String,
    pub app: AppSettings,
    pub models: ModelSettings,
    pub paths: PathSettings,
    pub rag: RagSettings,
    pub web: WebSettings,
    /// Project root the snapshot was resolved against. Relative `paths.*`
    /// entries are anchored here.
    #[serde(skip)]
    pub root: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mistral_api_key: String::new(),
            tavily_api_key: String::new(),
            app: AppSettings::default(),
            models: ModelSettings::default(),
            paths: PathSettings::default(),
            rag: RagSettings::default(),
            web: WebSettings::default(),
            root: PathBuf::from("."),
        }
    }
}

impl Settings {
    /// Resolve from the current directory with every source enabled.
    pub fn resolve() -> Result<Self> { SettingsLoader::new().load() }

    /// `paths.data_dir`, expanded and anchored at [`Settings::root`].
    pub fn data_dir(&self) -> PathBuf { self.paths.data_dir_in(&self.root) }

    /// `paths.vectorstore_dir`, expanded and anchored at [`Settings::root`].
    pub fn vectorstore_dir(&self) -> PathBuf { self.paths.vectorstore_dir_in(&self.root) }

    /// Emit the startup summary at info level.
    pub fn log_summary(&self) {
        tracing::info!(target: LOG_TARGET, "Starting (skeleton only)");
        tracing::info!(target: LOG_TARGET, "ENV={} | LOG_LEVEL={}", self.app.env, self.app.log_level);
        tracing::info!(target: LOG_TARGET, "Mistral model={}", self.models.chat_model);
        tracing::info!(
            target: LOG_TARGET,
            "Data dir={} | Vectorstore dir={}",
            self.paths.data_dir,
            self.paths.vectorstore_dir
        );
        tracing::info!(target: LOG_TARGET, "OK. Next: build minimal graph + baseline RAG.");
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("mistral_api_key", &redact(&self.mistral_api_key))
            .field("tavily_api_key", &redact(&self.tavily_api_key))
            .field("app", &self.app)
            .field("models", &self.models)
            .field("paths", &self.paths)
            .field("rag", &self.rag)
            .field("web", &self.web)
            .field("root", &self.root)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str { if secret.is_empty() { "" } else { "<redacted>" } }

/// Builder for a settings resolution. `SettingsLoader::new().load()` is the
/// common case; the knobs exist for tests and embedding.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    root: PathBuf,
    settings_file: PathBuf,
    env_file: PathBuf,
    use_env: bool,
    overrides: Dict,
}

impl Default for SettingsLoader {
    fn default() -> Self { Self::new() }
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("."),
            settings_file: PathBuf::from(SETTINGS_FILE),
            env_file: PathBuf::from(ENV_FILE),
            use_env: true,
            overrides: Dict::new(),
        }
    }

    /// Base directory for the relative settings and dotenv paths.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self { self.root = root.into(); self }

    #[must_use]
    pub fn settings_file(mut self, path: impl Into<PathBuf>) -> Self { self.settings_file = path.into(); self }

    #[must_use]
    pub fn env_file(mut self, path: impl Into<PathBuf>) -> Self { self.env_file = path.into(); self }

    /// Disable the process-environment source. The dotenv file is unaffected.
    #[must_use]
    pub fn process_env(mut self, enabled: bool) -> Self { self.use_env = enabled; self }

    /// Programmatic override of a dotted key, e.g. `set("rag.top_k", 8)`.
    /// Overrides beat every other source.
    #[must_use]
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        insert_path(&mut self.overrides, key, value.into());
        self
    }

    pub fn settings_path(&self) -> PathBuf { resolve_with_base(&self.root, self.settings_file.to_string_lossy()) }
    pub fn env_path(&self) -> PathBuf { resolve_with_base(&self.root, self.env_file.to_string_lossy()) }

    /// The merged provider chain, before extraction.
    pub fn figment(&self) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(self.settings_path()))
            .merge(DotenvFile::new(self.env_path()));
        if self.use_env {
            figment = figment.merge(ProcessEnv);
        }
        figment.merge(Serialized::defaults(self.overrides.clone()))
    }

    pub fn load(&self) -> Result<Settings> {
        let mut settings: Settings = self.figment().extract_lossy()?;
        settings.root = self.root.clone();
        tracing::debug!(root = %self.root.display(), env = %settings.app.env, "settings resolved");
        Ok(settings)
    }
}

/// Map an environment key onto a dotted settings path, or `None` if the key
/// does not belong to the schema.
pub fn settings_key(raw: &str) -> Option<String> {
    if let Some((_, field)) = SECRET_ALIASES.iter().find(|(alias, _)| alias.eq_ignore_ascii_case(raw)) {
        return Some((*field).to_string());
    }
    let lower = raw.to_ascii_lowercase();
    let (section, field) = lower.split_once(ENV_SPLIT)?;
    if SECTIONS.contains(&section) && !field.is_empty() { Some(format!("{section}.{field}")) } else { None }
}

/// Fold `(key, value)` pairs into a nested dict, keeping only schema keys.
/// Values are kept as strings.
fn collect_keys(pairs: impl IntoIterator<Item = (String, String)>) -> Dict {
    let mut dict = Dict::new();
    for (key, raw) in pairs {
        if let Some(path) = settings_key(&key) {
            insert_path(&mut dict, &path, Value::from(raw));
        }
    }
    dict
}

/// Process-environment source.
#[derive(Debug, Clone, Copy)]
pub struct ProcessEnv;

impl Provider for ProcessEnv {
    fn metadata(&self) -> Metadata { Metadata::named("environment variable(s)") }

    fn data(&self) -> std::result::Result<Map<Profile, Dict>, figment::Error> {
        let pairs = std::env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Ok(Map::from([(Profile::Default, collect_keys(pairs))]))
    }
}

fn insert_path(dict: &mut Dict, path: &str, value: Value) {
    match path.split_once('.') {
        None => { dict.insert(path.to_string(), value); }
        Some((head, rest)) => {
            let entry = dict.entry(head.to_string()).or_insert_with(|| Value::Dict(Tag::Default, Dict::new()));
            if !matches!(entry, Value::Dict(..)) {
                *entry = Value::Dict(Tag::Default, Dict::new());
            }
            if let Value::Dict(_, inner) = entry {
                insert_path(inner, rest, value);
            }
        }
    }
}

/// Dotenv source. Reads the file without touching the process environment
/// and keeps only keys that map onto the schema. Unparseable lines are
/// skipped.
#[derive(Debug, Clone)]
pub struct DotenvFile {
    path: PathBuf,
}

impl DotenvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
}

impl Provider for DotenvFile {
    fn metadata(&self) -> Metadata { Metadata::from("dotenv file", Source::File(self.path.clone())) }

    fn data(&self) -> std::result::Result<Map<Profile, Dict>, figment::Error> {
        if !self.path.is_file() {
            return Ok(Map::from([(Profile::Default, Dict::new())]));
        }
        let iter = dotenvy::from_path_iter(&self.path)
            .map_err(|e| figment::Error::from(format!("failed to open {}: {e}", self.path.display())))?;
        let pairs = iter.filter_map(|item| match item {
            Ok(pair) => Some(pair),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "skipping dotenv line");
                None
            }
        });
        Ok(Map::from([(Profile::Default, collect_keys(pairs))]))
    }
}
