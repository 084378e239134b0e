//! Command line for Tattle.
//!
//! Flags and JSON configuration files are folded into one configuration
//! tree. Flags build the tree, content declarations before the modifiers
//! that refer to them; each configuration file is then merge-patched on
//! top, in order.

mod pairs;

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use serde_json::{Map, Value};

use crate::config::{self, Config};
use crate::console::ConsoleSurface;
use crate::journal::Journal;
use crate::model::Identity;
use crate::persist::{self, PersistentStore};
use crate::transport::HttpTransport;
use crate::workflow::{self, Controller};

use pairs::{Declare, Modify, PairError};

/// Tattle: collect a report, ask the user, send it to a server.
#[derive(Debug, Parser)]
#[command(name = "tattle", version)]
pub struct Cli {
    /// JSON configuration files, merged in order.
    configs: Vec<PathBuf>,

    /// URL the full report is posted to.
    #[arg(long, value_name = "URL")]
    url_post: Option<String>,

    /// URL queried for known solutions before prompting.
    #[arg(long, value_name = "URL")]
    url_query: Option<String>,

    /// Skip both the query notice and the prompt.
    #[arg(long)]
    silent: bool,

    /// Don't show notices for the pre-query.
    #[arg(long)]
    silent_query: bool,

    /// Post without prompting the user.
    #[arg(long)]
    silent_post: bool,

    /// Keep windows above other applications.
    #[arg(long)]
    stay_on_top: bool,

    /// Report progress while talking to the server.
    #[arg(long)]
    show_progress: bool,

    /// Prompt icon: information, warning, error, question, help or tip.
    #[arg(long, value_name = "NAME")]
    icon: Option<String>,

    /// Persistent state file (consent and remembered fields).
    #[arg(long, value_name = "FILE")]
    state: Option<String>,

    /// Report identity used for "don't show again".
    #[arg(long, value_name = "TYPE:ID")]
    category: Option<String>,

    /// Append a JSON line per workflow event to this file.
    #[arg(long, value_name = "FILE")]
    log: Option<String>,

    /// Write the merged configuration to this file.
    #[arg(long, value_name = "FILE")]
    dump: Option<PathBuf>,

    /// Content string.
    #[arg(long = "arg", value_name = "NAME=VALUE")]
    args: Vec<String>,

    /// Content string also sent with the pre-query.
    #[arg(long = "arg-query", value_name = "NAME=VALUE")]
    query_args: Vec<String>,

    /// Text file attachment.
    #[arg(long = "file", value_name = "NAME=PATH")]
    files: Vec<String>,

    /// Binary file attachment.
    #[arg(long = "file-binary", value_name = "NAME=PATH")]
    binary_files: Vec<String>,

    /// Attach only the first N bytes of a file.
    #[arg(long, value_name = "NAME=N")]
    trunc_begin: Vec<String>,

    /// Attach only the last N bytes of a file.
    #[arg(long, value_name = "NAME=N")]
    trunc_end: Vec<String>,

    /// Line marking where a file was truncated.
    #[arg(long, value_name = "NAME=TEXT")]
    trunc_note: Vec<String>,

    /// Prompt window title.
    #[arg(long)]
    title: Option<String>,

    /// Message summarising the prompt.
    #[arg(long)]
    message: Option<String>,

    /// Technical summary shown under the message.
    #[arg(long)]
    technical: Option<String>,

    /// Text of the send button.
    #[arg(long, value_name = "LABEL")]
    label_send: Option<String>,

    /// Text of the cancel button.
    #[arg(long, value_name = "LABEL")]
    label_cancel: Option<String>,

    /// Text of the view-report button.
    #[arg(long, value_name = "LABEL")]
    label_view: Option<String>,

    /// Single-line field for user input.
    #[arg(long = "field", value_name = "NAME=LABEL")]
    fields: Vec<String>,

    /// Multi-line field for user input.
    #[arg(long = "field-multi", value_name = "NAME=LABEL")]
    multiline_fields: Vec<String>,

    /// Default value of a field.
    #[arg(long, value_name = "NAME=VALUE")]
    field_default: Vec<String>,

    /// Placeholder hint of a single-line field.
    #[arg(long, value_name = "NAME=HINT")]
    field_hint: Vec<String>,

    /// Warn before sending if the field is left empty.
    #[arg(long, value_name = "NAME=TEXT")]
    field_warning: Vec<String>,

    /// Save and restore the user's input to a field.
    #[arg(long, value_name = "NAME")]
    field_store: Vec<String>,

    /// Let the user view the report before sending.
    #[arg(long)]
    view_data: bool,

    /// Folder listed when viewing the report.
    #[arg(long, value_name = "PATH")]
    view_dir: Option<String>,

    /// Store `tattle-json` values sent back by the server.
    #[arg(long)]
    server_values: bool,
}

impl Cli {
    /// The configuration tree: flags, then each file merged on top.
    pub fn tree(&self) -> Result<Value, String> {
        let mut tree = Value::Object(Map::new());
        self.apply_report(&mut tree).map_err(|e| e.to_string())?;
        self.apply_settings(&mut tree)?;

        for path in &self.configs {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            let patch: Value = serde_json::from_str(&text)
                .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
            persist::merge_patch(&mut tree, &patch);
        }
        Ok(tree)
    }

    fn apply_report(&self, tree: &mut Value) -> Result<(), PairError> {
        let mut report = Map::new();

        let declarations = [
            (Declare::Arg, &self.args),
            (Declare::QueryArg, &self.query_args),
            (Declare::TextFile, &self.files),
            (Declare::BinaryFile, &self.binary_files),
            (Declare::Field, &self.fields),
            (Declare::MultilineField, &self.multiline_fields),
        ];
        for (what, args) in declarations {
            for arg in args {
                pairs::declare(&mut report, what, arg)?;
            }
        }

        let modifiers = [
            (Modify::TruncBegin, &self.trunc_begin),
            (Modify::TruncEnd, &self.trunc_end),
            (Modify::TruncNote, &self.trunc_note),
            (Modify::FieldDefault, &self.field_default),
            (Modify::FieldHint, &self.field_hint),
            (Modify::FieldWarning, &self.field_warning),
        ];
        for (what, args) in modifiers {
            for arg in args {
                pairs::modify(&mut report, what, arg)?;
            }
        }
        for name in &self.field_store {
            pairs::store_field(&mut report, name)?;
        }

        set(tree, &["report"], Value::Object(report));
        Ok(())
    }

    fn apply_settings(&self, tree: &mut Value) -> Result<(), String> {
        if let Some(category) = &self.category {
            let identity = Identity::parse(category)
                .ok_or_else(|| format!("malformed category `{category}`: should be TYPE:ID"))?;
            set(tree, &["report", "type"], Value::from(identity.kind));
            set(tree, &["report", "id"], Value::from(identity.id));
        }

        set_some(tree, &["url", "post"], self.url_post.as_deref());
        set_some(tree, &["url", "query"], self.url_query.as_deref());
        set_some(tree, &["path", "state"], self.state.as_deref());
        set_some(tree, &["path", "log"], self.log.as_deref());
        set_some(tree, &["path", "review"], self.view_dir.as_deref());
        set_some(tree, &["gui", "icon"], self.icon.as_deref());

        let text = [
            ("title", &self.title),
            ("message", &self.message),
            ("technical", &self.technical),
            ("btn_send", &self.label_send),
            ("btn_cancel", &self.label_cancel),
            ("btn_review", &self.label_view),
        ];
        for (key, value) in text {
            set_some(tree, &["gui", "prompt", key], value.as_deref());
        }

        if self.silent || self.silent_query {
            set(tree, &["gui", "query"], Value::from("silent"));
        }
        if self.silent || self.silent_post {
            set(tree, &["gui", "post"], Value::from("silent"));
        }
        set_true(tree, &["gui", "stay_on_top"], self.stay_on_top);
        set_true(tree, &["gui", "progress_bar"], self.show_progress);
        set_true(
            tree,
            &["gui", "prompt", "review"],
            self.view_data || self.view_dir.is_some(),
        );
        set_true(tree, &["server_values"], self.server_values);
        Ok(())
    }
}

/// Set the node at `path`, replacing anything in the way with objects.
fn set(tree: &mut Value, path: &[&str], value: Value) {
    let mut node = tree;
    for key in path {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = &mut node[*key];
    }
    *node = value;
}

fn set_some(tree: &mut Value, path: &[&str], value: Option<&str>) {
    if let Some(value) = value {
        set(tree, path, Value::from(value));
    }
}

fn set_true(tree: &mut Value, path: &[&str], on: bool) {
    if on {
        set(tree, path, Value::Bool(true));
    }
}

/// Run the CLI, returning an error message on failure.
pub fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let tree = cli.tree()?;

    if let Some(dump) = &cli.dump {
        let json = serde_json::to_string_pretty(&tree).map_err(|e| e.to_string())?;
        fs::write(dump, json).map_err(|e| format!("failed to write {}: {e}", dump.display()))?;
    }

    let config = Config::from_json(&tree).map_err(|e| e.to_string())?;
    let mut store = config::compile_report(&tree).map_err(|e| e.to_string())?;
    store.read_files();

    let persist = match &config.paths.state {
        Some(path) => PersistentStore::load(path),
        None => PersistentStore::in_memory(),
    };
    let journal = Journal::new(config.paths.log.clone());
    let transport = HttpTransport::new();

    log::info!(
        "report has {} items; posting to {}",
        store.len(),
        config
            .post_url
            .as_ref()
            .map_or_else(|| "nowhere".to_string(), ToString::to_string)
    );

    let mut controller = Controller::new(&config, &transport, store, persist, journal);
    let mut surface = ConsoleSurface::stdio();
    workflow::run(&mut controller, &mut surface);

    if controller.halted() {
        log::info!("stopped before sending");
    }
    Ok(())
}
