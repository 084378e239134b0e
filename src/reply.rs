//! Server replies and the directives embedded in them.
//!
//! A report server steers the client by embedding tag-delimited markers
//! anywhere in its response body:
//!
//! ```text
//! <tattle-title>...</tattle-title>      dialog title
//! <tattle-message>...</tattle-message>  dialog text
//! <tattle-link>...</tattle-link>        path on the report server to suggest
//! <tattle-command>...</tattle-command>  STOP | PROMPT | STOP-ON-LINK
//! <tattle-icon>...</tattle-icon>        information | warning | error | ...
//! <tattle-id>type:id</tattle-id>        report identity for consent tracking
//! <tattle-json>{...}</tattle-json>      values for the persistent store
//! ```
//!
//! Missing or malformed markers yield defaults; parsing never fails.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{Identity, ParsedUrl};
use crate::transport::Exchange;

/// Lifecycle of one HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestState {
    #[default]
    Idle,
    Active,
    Cancelled,
    Failed,
    Unauthorized,
    Completed,
}

/// What the server asks the client to do after showing its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerCommand {
    #[default]
    None,
    /// End the workflow.
    Stop,
    /// Continue to, or return to, the prompt.
    Prompt,
    /// End the workflow only if the user followed the link.
    StopOnLink,
}

impl ServerCommand {
    /// Map a `tattle-command` token. Unknown tokens mean no command.
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            "STOP" => Self::Stop,
            "PROMPT" => Self::Prompt,
            "STOP-ON-LINK" => Self::StopOnLink,
            _ => Self::None,
        }
    }
}

/// Standard dialog icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Information,
    Warning,
    Error,
    Question,
    Help,
    Tip,
}

impl Icon {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "information" | "info" => Some(Self::Information),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "question" => Some(Self::Question),
            "help" => Some(Self::Help),
            "tip" => Some(Self::Tip),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Information => "information",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Question => "question",
            Self::Help => "help",
            Self::Tip => "tip",
        }
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed server response.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub status_code: u16,
    pub state: RequestState,

    /// A connection to the server was established.
    pub connected: bool,

    pub raw: String,
    pub title: String,
    pub message: String,

    /// Same-origin link, already rewritten against the request URL.
    pub link: String,

    pub identity: Option<Identity>,
    pub command: ServerCommand,
    pub icon: Option<Icon>,
    pub json_values: Option<Map<String, Value>>,
}

impl Reply {
    /// Interpret a finished exchange against the URL it was sent to.
    pub fn from_exchange(exchange: Exchange, url: &ParsedUrl) -> Self {
        let mut reply = Self {
            status_code: exchange.status_code,
            state: exchange.state,
            connected: exchange.connected,
            raw: exchange.body,
            ..Self::default()
        };
        reply.parse_directives(url);
        reply
    }

    fn parse_directives(&mut self, url: &ParsedUrl) {
        let raw = &self.raw;

        self.title = tag_contents(raw, "tattle-title").to_string();
        self.message = tag_contents(raw, "tattle-message").to_string();
        self.command = ServerCommand::parse(tag_contents(raw, "tattle-command"));

        let icon = tag_contents(raw, "tattle-icon");
        self.icon = Icon::parse(icon);
        if self.icon.is_none() && !icon.trim().is_empty() {
            log::warn!("server sent unknown icon `{icon}`");
        }

        let link = tag_contents(raw, "tattle-link").trim();
        if !link.is_empty() {
            self.link = url.same_origin(link);
        }

        let id = tag_contents(raw, "tattle-id");
        if !id.trim().is_empty() {
            self.identity = Identity::parse(id);
            if self.identity.is_none() {
                log::warn!("server sent malformed identity `{id}`");
            }
        }

        let json = tag_contents(raw, "tattle-json");
        if !json.trim().is_empty() {
            match serde_json::from_str::<Value>(json) {
                Ok(Value::Object(values)) => self.json_values = Some(values),
                Ok(_) => log::warn!("ignoring tattle-json block that is not an object"),
                Err(e) => log::warn!("ignoring malformed tattle-json block: {e}"),
            }
        }
    }

    /// The transport completed without failure.
    pub fn ok(&self) -> bool {
        self.connected && self.state == RequestState::Completed
    }

    /// A real Tattle reply rather than some unrelated page.
    pub fn valid(&self) -> bool {
        self.ok()
            && (!self.message.is_empty()
                || !self.title.is_empty()
                || !self.link.is_empty()
                || self.command != ServerCommand::None)
    }

    pub fn sent_link(&self) -> bool {
        self.ok() && !self.link.is_empty()
    }

    /// The `tattle-json` values the server may persist.
    ///
    /// Keys starting with `$` or `.` are reserved for local state and
    /// dropped. `None` when nothing is left.
    pub fn server_patch(&self) -> Option<Value> {
        let values = self.json_values.as_ref()?;
        let patch: Map<String, Value> = values
            .iter()
            .filter(|(key, _)| {
                let reserved = key.starts_with(['$', '.']);
                if reserved {
                    log::warn!("server tried to set reserved key `{key}`");
                }
                !reserved
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        (!patch.is_empty()).then_some(Value::Object(patch))
    }
}

/// Text between the first `<tag>` and the first `</tag>`, or "".
pub fn tag_contents<'a>(raw: &'a str, tag: &str) -> &'a str {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let (Some(start), Some(end)) = (raw.find(&open), raw.find(&close)) else {
        return "";
    };
    let start = start + open.len();
    if start <= end { &raw[start..end] } else { "" }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn url() -> ParsedUrl {
        ParsedUrl::parse("https://reports.example.com/tattle/post.php").unwrap()
    }

    fn completed(body: &str) -> Reply {
        Reply::from_exchange(
            Exchange {
                state: RequestState::Completed,
                connected: true,
                status_code: 200,
                body: body.to_string(),
            },
            &url(),
        )
    }

    // ── Tags ──

    #[test]
    fn extracts_tag_contents() {
        let raw = "<html><tattle-title>Known issue</tattle-title></html>";
        assert_eq!(tag_contents(raw, "tattle-title"), "Known issue");
        assert_eq!(tag_contents(raw, "tattle-message"), "");
    }

    #[test]
    fn close_before_open_is_empty() {
        let raw = "</tattle-title>x<tattle-title>";
        assert_eq!(tag_contents(raw, "tattle-title"), "");
    }

    #[test]
    fn parses_every_directive() {
        let reply = completed(
            "<tattle-title>Fixed</tattle-title>\
             <tattle-message>Update to 1.3</tattle-message>\
             <tattle-link>/downloads/1.3</tattle-link>\
             <tattle-command>STOP-ON-LINK</tattle-command>\
             <tattle-icon>tip</tattle-icon>\
             <tattle-id>crash:abc</tattle-id>",
        );

        assert_eq!(reply.title, "Fixed");
        assert_eq!(reply.message, "Update to 1.3");
        assert_eq!(reply.link, "https://reports.example.com/downloads/1.3");
        assert_eq!(reply.command, ServerCommand::StopOnLink);
        assert_eq!(reply.icon, Some(Icon::Tip));
        assert_eq!(reply.identity, Some(Identity::new("crash", "abc")));
    }

    #[test]
    fn unknown_command_is_none() {
        assert_eq!(ServerCommand::parse("RESTART"), ServerCommand::None);
        assert_eq!(ServerCommand::parse("stop"), ServerCommand::None);
        assert_eq!(ServerCommand::parse("PROMPT"), ServerCommand::Prompt);
    }

    #[test]
    fn foreign_links_are_pinned_to_the_request_host() {
        let reply = completed("<tattle-link>https://evil.example.net/phish?x=1</tattle-link>");
        assert_eq!(reply.link, "https://reports.example.com/phish?x=1");
    }

    // ── Classification ──

    #[test]
    fn validity_needs_a_directive() {
        let plain = completed("<html>hello</html>");
        assert!(plain.ok());
        assert!(!plain.valid());

        for body in [
            "<tattle-title>t</tattle-title>",
            "<tattle-message>m</tattle-message>",
            "<tattle-link>l</tattle-link>",
            "<tattle-command>STOP</tattle-command>",
        ] {
            assert!(completed(body).valid(), "{body}");
        }
    }

    #[test]
    fn failed_transport_is_never_valid() {
        let reply = Reply::from_exchange(
            Exchange {
                state: RequestState::Failed,
                connected: true,
                status_code: 500,
                body: "<tattle-message>m</tattle-message>".into(),
            },
            &url(),
        );
        assert!(!reply.ok());
        assert!(!reply.valid());
        assert!(!reply.sent_link());
    }

    #[test]
    fn sent_link_needs_a_link() {
        assert!(completed("<tattle-link>x</tattle-link>").sent_link());
        assert!(!completed("<tattle-message>m</tattle-message>").sent_link());
    }

    // ── Server values ──

    #[test]
    fn server_patch_drops_reserved_keys() {
        let reply = completed(
            r#"<tattle-json>{"token": "abc", "$show": {"x": {"y": 1}}, ".hidden": 1}</tattle-json>"#,
        );
        assert_eq!(reply.server_patch(), Some(json!({ "token": "abc" })));
    }

    #[test]
    fn malformed_json_is_ignored() {
        let reply = completed("<tattle-json>{nope</tattle-json><tattle-title>t</tattle-title>");
        assert!(reply.json_values.is_none());
        assert!(reply.server_patch().is_none());
        assert_eq!(reply.title, "t");
    }

    #[test]
    fn only_reserved_keys_patch_nothing() {
        let reply = completed(r#"<tattle-json>{"$x": 1}</tattle-json>"#);
        assert!(reply.server_patch().is_none());
    }

    #[test]
    fn malformed_identity_is_ignored() {
        let reply = completed("<tattle-id>nocolon</tattle-id>");
        assert!(reply.identity.is_none());
    }
}
