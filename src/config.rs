//! Tattle configuration.
//!
//! The configuration tree is plain JSON, assembled from command-line flags
//! and configuration files. [`Config::from_json`] is the one place it gets
//! validated; everything downstream works with typed values.
//!
//! ```text
//! {
//!   "url":     { "post": "...", "query": "..." },
//!   "path":    { "log": "...", "state": "...", "review": "..." },
//!   "gui":     { "stay_on_top": bool, "progress_bar": bool, "icon": "warning",
//!                "query": "silent" | "default", "post": "silent" | "default",
//!                "prompt": { "title", "message", "technical",
//!                            "btn_send", "btn_cancel", "btn_review", "review" } },
//!   "timeout": { "probe": 5, "query": 6, "post": 20 },
//!   "server_values": bool,
//!   "report":  { ... }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::model::{Identity, ParsedUrl, UrlError};
use crate::reply::Icon;
use crate::report::{CompileError, ContentStore};

/// Errors that stop the workflow from starting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("at least one of url.post or url.query must be set")]
    NoUrl,

    #[error("url.{key}: {source}")]
    Url {
        key: &'static str,
        #[source]
        source: UrlError,
    },

    #[error("gui.{key}: expected \"silent\" or \"default\", got `{value}`")]
    Mode { key: &'static str, value: String },

    #[error("gui.icon: unknown icon `{0}`")]
    Icon(String),

    #[error("report: {0}")]
    Compile(#[from] CompileError),

    #[error("the report has no content; declare at least one string, file or field")]
    EmptyReport,
}

pub type Result<T> = core::result::Result<T, ConfigError>;

/// Whether a stage talks to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Default,
    Silent,
}

impl Mode {
    pub fn is_silent(self) -> bool {
        self == Self::Silent
    }
}

/// Text of the prompt window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptText {
    pub title: String,
    pub message: String,
    pub technical: String,
    pub btn_send: String,
    pub btn_cancel: String,
    pub btn_review: String,

    /// Offer the "view report" surface.
    pub review: bool,
}

impl Default for PromptText {
    fn default() -> Self {
        Self {
            title: "Tattle Report".to_string(),
            message: String::new(),
            technical: String::new(),
            btn_send: "Send Report".to_string(),
            btn_cancel: "Don't Send".to_string(),
            btn_review: "Details...".to_string(),
            review: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gui {
    pub stay_on_top: bool,
    pub progress_bar: bool,
    pub icon: Option<Icon>,
    pub query: Mode,
    pub post: Mode,
    pub prompt: PromptText,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paths {
    /// Append-only event journal.
    pub log: Option<PathBuf>,
    /// Persistent store file.
    pub state: Option<PathBuf>,
    /// Folder listed in the report review.
    pub review: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub probe: Duration,
    pub query: Duration,
    pub post: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(5),
            query: Duration::from_secs(6),
            post: Duration::from_secs(20),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub post_url: Option<ParsedUrl>,
    pub query_url: Option<ParsedUrl>,
    pub paths: Paths,
    pub gui: Gui,
    pub timeouts: Timeouts,

    /// Merge `tattle-json` reply values into the persistent store.
    pub server_values: bool,

    /// `report.type` and `report.id`, when both are given.
    pub identity: Option<Identity>,
}

impl Config {
    /// Validate and normalise a configuration tree.
    pub fn from_json(tree: &Value) -> Result<Self> {
        let raw = RawConfig::deserialize(tree)?;

        let post_url = url("post", raw.url.post.as_deref())?;
        let query_url = url("query", raw.url.query.as_deref())?;
        if !post_url.as_ref().is_some_and(ParsedUrl::is_set)
            && !query_url.as_ref().is_some_and(ParsedUrl::is_set)
        {
            return Err(ConfigError::NoUrl);
        }

        let icon = match non_empty(raw.gui.icon) {
            Some(name) => Some(Icon::parse(&name).ok_or(ConfigError::Icon(name))?),
            None => None,
        };

        let defaults = PromptText::default();
        let prompt = PromptText {
            title: raw.gui.prompt.title.unwrap_or(defaults.title),
            message: raw.gui.prompt.message.unwrap_or(defaults.message),
            technical: raw.gui.prompt.technical.unwrap_or(defaults.technical),
            btn_send: raw.gui.prompt.btn_send.unwrap_or(defaults.btn_send),
            btn_cancel: raw.gui.prompt.btn_cancel.unwrap_or(defaults.btn_cancel),
            btn_review: raw.gui.prompt.btn_review.unwrap_or(defaults.btn_review),
            review: raw.gui.prompt.review,
        };

        Ok(Self {
            post_url,
            query_url,
            paths: Paths {
                log: non_empty(raw.path.log).map(|p| expand_home(&p)),
                state: non_empty(raw.path.state).map(|p| expand_home(&p)),
                review: non_empty(raw.path.review).map(|p| expand_home(&p)),
            },
            gui: Gui {
                stay_on_top: raw.gui.stay_on_top,
                progress_bar: raw.gui.progress_bar,
                icon,
                query: mode("query", raw.gui.query.as_deref())?,
                post: mode("post", raw.gui.post.as_deref())?,
                prompt,
            },
            timeouts: Timeouts {
                probe: Duration::from_secs(raw.timeout.probe),
                query: Duration::from_secs(raw.timeout.query),
                post: Duration::from_secs(raw.timeout.post),
            },
            server_values: raw.server_values,
            identity: identity(&raw.report),
        })
    }
}

/// Compile the `report` node. A report with no content is an error.
pub fn compile_report(tree: &Value) -> Result<ContentStore> {
    let empty = Value::Object(serde_json::Map::new());
    let report = tree.get("report").unwrap_or(&empty);
    let store = ContentStore::compile(report)?;
    if store.is_empty() {
        return Err(ConfigError::EmptyReport);
    }
    Ok(store)
}

/// Replace a leading `~/` with the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

fn url(key: &'static str, raw: Option<&str>) -> Result<Option<ParsedUrl>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => ParsedUrl::parse(raw)
            .map(Some)
            .map_err(|source| ConfigError::Url { key, source }),
        None => Ok(None),
    }
}

fn mode(key: &'static str, raw: Option<&str>) -> Result<Mode> {
    match raw.unwrap_or("default") {
        "default" | "" => Ok(Mode::Default),
        "silent" => Ok(Mode::Silent),
        other => Err(ConfigError::Mode {
            key,
            value: other.to_string(),
        }),
    }
}

fn identity(report: &Value) -> Option<Identity> {
    let kind = identity_part(report.get("type")?)?;
    let id = identity_part(report.get("id")?)?;
    if kind.is_empty() || id.is_empty() {
        return None;
    }
    Some(Identity::new(kind, id))
}

/// Numeric ids are common, so numbers count as their decimal text.
fn identity_part(node: &Value) -> Option<String> {
    match node {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

// ── Raw shape ──

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    url: RawUrls,
    path: RawPaths,
    gui: RawGui,
    timeout: RawTimeouts,
    server_values: bool,
    report: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUrls {
    post: Option<String>,
    query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPaths {
    log: Option<String>,
    state: Option<String>,
    review: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGui {
    stay_on_top: bool,
    progress_bar: bool,
    icon: Option<String>,
    query: Option<String>,
    post: Option<String>,
    prompt: RawPrompt,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPrompt {
    title: Option<String>,
    message: Option<String>,
    technical: Option<String>,
    btn_send: Option<String>,
    btn_cancel: Option<String>,
    btn_review: Option<String>,
    review: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawTimeouts {
    probe: u64,
    query: u64,
    post: u64,
}

impl Default for RawTimeouts {
    fn default() -> Self {
        let defaults = Timeouts::default();
        Self {
            probe: defaults.probe.as_secs(),
            query: defaults.query.as_secs(),
            post: defaults.post.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_json(&json!({
            "url": { "post": "http://example.com/post.php" }
        }))
        .unwrap();

        assert_eq!(config.post_url.unwrap().host, "example.com");
        assert!(config.query_url.is_none());
        assert_eq!(config.gui.query, Mode::Default);
        assert_eq!(config.gui.prompt, PromptText::default());
        assert_eq!(config.gui.prompt.btn_send, "Send Report");
        assert_eq!(config.timeouts, Timeouts::default());
        assert!(!config.server_values);
        assert!(config.identity.is_none());
    }

    #[test]
    fn full_config() {
        let config = Config::from_json(&json!({
            "url": { "post": "https://example.com/post", "query": "https://example.com/query" },
            "path": { "state": "/tmp/tattle/state.json", "log": "/tmp/tattle.log" },
            "gui": {
                "stay_on_top": true, "icon": "warning", "query": "silent", "post": "default",
                "prompt": { "title": "Oops", "btn_cancel": "No", "review": true }
            },
            "timeout": { "post": 60 },
            "server_values": true,
            "report": { "type": "crash", "id": "1234", "os": "linux" }
        }))
        .unwrap();

        assert_eq!(config.query_url.unwrap().path, "/query");
        assert_eq!(config.paths.state, Some(PathBuf::from("/tmp/tattle/state.json")));
        assert!(config.gui.stay_on_top);
        assert_eq!(config.gui.icon, Some(Icon::Warning));
        assert!(config.gui.query.is_silent());
        assert!(!config.gui.post.is_silent());
        assert_eq!(config.gui.prompt.title, "Oops");
        assert_eq!(config.gui.prompt.btn_cancel, "No");
        assert_eq!(config.gui.prompt.btn_send, "Send Report");
        assert!(config.gui.prompt.review);
        assert_eq!(config.timeouts.post, Duration::from_secs(60));
        assert_eq!(config.timeouts.probe, Duration::from_secs(5));
        assert!(config.server_values);
        assert_eq!(config.identity, Some(Identity::new("crash", "1234")));
    }

    #[test]
    fn numeric_identity() {
        let config = Config::from_json(&json!({
            "url": { "post": "http://example.com/post" },
            "report": { "type": "crash", "id": 1234 }
        }))
        .unwrap();
        assert_eq!(config.identity, Some(Identity::new("crash", "1234")));
    }

    #[test]
    fn requires_a_url() {
        let err = Config::from_json(&json!({ "url": { "post": "" } })).unwrap_err();
        assert!(matches!(err, ConfigError::NoUrl));
    }

    #[test]
    fn rejects_bad_url() {
        let err = Config::from_json(&json!({ "url": { "post": "ftp://example.com/x" } }))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Url { key: "post", .. }));
    }

    #[test]
    fn rejects_unknown_mode_and_icon() {
        let err = Config::from_json(&json!({
            "url": { "post": "http://example.com/" },
            "gui": { "post": "quiet" }
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Mode { key: "post", ref value } if value == "quiet"));

        let err = Config::from_json(&json!({
            "url": { "post": "http://example.com/" },
            "gui": { "icon": "skull" }
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Icon(name) if name == "skull"));
    }

    #[test]
    fn rejects_wrong_types() {
        let err = Config::from_json(&json!({ "url": { "post": 7 } })).unwrap_err();
        assert!(matches!(err, ConfigError::Shape(_)));
    }

    #[test]
    fn expands_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_home("~/tattle/state.json"), home.join("tattle/state.json"));
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
    }

    #[test]
    fn compile_report_rejects_empty_content() {
        let err = compile_report(&json!({ "report": { "type": "crash", "id": "1" } })).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyReport));

        let err = compile_report(&json!({})).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyReport));

        let store = compile_report(&json!({ "report": { "os": "linux" } })).unwrap();
        assert_eq!(store.len(), 1);
    }
}
