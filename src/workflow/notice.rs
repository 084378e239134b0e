//! Informational dialogs built from server replies.

use crate::reply::{Icon, Reply, ServerCommand, tag_contents};

/// HTML titles longer than this are cut.
const TITLE_LIMIT: usize = 128;

/// Raw bodies longer than this are cut.
const BODY_LIMIT: usize = 512;

/// The contents of an informational dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,

    /// Suggested same-origin link, if any.
    pub link: Option<String>,

    pub icon: Icon,

    /// Applied when the dialog closes.
    pub command: ServerCommand,
}

impl Notice {
    /// The dialog to show for `reply`, if any.
    ///
    /// Failures always produce a notice. When `prompt_open` is set a
    /// failure notice returns the user to the prompt to retry.
    pub fn from_reply(reply: &Reply, prompt_open: bool) -> Option<Self> {
        let default_icon = if reply.ok() {
            Icon::Information
        } else {
            Icon::Error
        };
        let icon = reply.icon.unwrap_or(default_icon);

        if let Some(message) = failure_message(reply) {
            return Some(Self {
                title: "Send Failed".to_string(),
                message,
                link: None,
                icon,
                command: if prompt_open {
                    ServerCommand::Prompt
                } else {
                    ServerCommand::None
                },
            });
        }

        if reply.sent_link() {
            return Some(Self {
                title: or_default(&reply.title, "Suggested Link"),
                message: or_default(&reply.message, "The server replied with a link."),
                link: Some(reply.link.clone()),
                icon,
                command: reply.command,
            });
        }

        if !reply.message.is_empty() {
            return Some(Self {
                title: or_default(&reply.title, "Report Sent"),
                message: reply.message.clone(),
                link: None,
                icon,
                command: reply.command,
            });
        }

        None
    }
}

/// Plain-language description of a failed or misdirected reply.
fn failure_message(reply: &Reply) -> Option<String> {
    if !reply.connected {
        return Some(
            "Failed to reach the website for the report.\n\
             Are you connected to the internet?"
                .to_string(),
        );
    }

    if !reply.ok() {
        let detail = if reply.status_code == 404 {
            "(server script not found)".to_string()
        } else {
            format!("HTTP status {}", reply.status_code)
        };
        return Some(format!("Failed to send the report.\n{detail}"));
    }

    if reply.valid() {
        return None;
    }

    let mut message = "The report went to the wrong place.".to_string();
    let title = tag_contents(&reply.raw, "title").trim();
    if !title.is_empty() {
        message.push_str(&format!(
            "\n\nGot a page titled: `{}'",
            truncate(title, TITLE_LIMIT)
        ));
    } else if !reply.raw.is_empty() {
        message.push_str("\n\nThe server says:\n");
        message.push_str(truncate(&reply.raw, BODY_LIMIT));
        if reply.raw.chars().count() > BODY_LIMIT {
            message.push_str(" ...");
        }
    } else {
        message.push_str("\nAre you connected to the internet?");
    }
    Some(message)
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() { default } else { value }.to_string()
}

/// At most `limit` characters of `s`.
fn truncate(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::ParsedUrl;
    use crate::reply::RequestState;
    use crate::transport::Exchange;

    fn reply(exchange: Exchange) -> Reply {
        let url = ParsedUrl::parse("http://example.com/post.php").unwrap();
        Reply::from_exchange(exchange, &url)
    }

    #[test]
    fn unreachable_server() {
        let notice = Notice::from_reply(&reply(Exchange::unreachable()), false).unwrap();

        assert_eq!(notice.title, "Send Failed");
        assert!(notice.message.starts_with("Failed to reach the website"));
        assert_eq!(notice.icon, Icon::Error);
        assert_eq!(notice.command, ServerCommand::None);
    }

    #[test]
    fn failures_return_to_open_prompt() {
        let notice = Notice::from_reply(&reply(Exchange::response(500, "")), true).unwrap();

        assert_eq!(notice.message, "Failed to send the report.\nHTTP status 500");
        assert_eq!(notice.command, ServerCommand::Prompt);
    }

    #[test]
    fn missing_script() {
        let notice = Notice::from_reply(&reply(Exchange::response(404, "nope")), false).unwrap();
        assert_eq!(
            notice.message,
            "Failed to send the report.\n(server script not found)"
        );
    }

    #[test]
    fn wrong_place_echoes_page_title() {
        let body = "<html><title>Welcome to nginx!</title></html>";
        let notice = Notice::from_reply(&reply(Exchange::response(200, body)), false).unwrap();

        assert!(notice.message.starts_with("The report went to the wrong place."));
        assert!(notice.message.contains("Got a page titled: `Welcome to nginx!'"));
    }

    #[test]
    fn wrong_place_truncates_raw_body() {
        let body = "x".repeat(600);
        let notice = Notice::from_reply(&reply(Exchange::response(200, body)), false).unwrap();

        let expected = format!("The server says:\n{} ...", "x".repeat(BODY_LIMIT));
        assert!(notice.message.ends_with(&expected));
    }

    #[test]
    fn link_defaults() {
        let notice = Notice::from_reply(
            &reply(Exchange::response(
                200,
                "<tattle-link>/fix</tattle-link><tattle-command>STOP-ON-LINK</tattle-command>",
            )),
            false,
        )
        .unwrap();

        assert_eq!(notice.title, "Suggested Link");
        assert_eq!(notice.message, "The server replied with a link.");
        assert_eq!(notice.link.as_deref(), Some("http://example.com/fix"));
        assert_eq!(notice.command, ServerCommand::StopOnLink);
        assert_eq!(notice.icon, Icon::Information);
    }

    #[test]
    fn message_defaults_title() {
        let notice = Notice::from_reply(
            &reply(Exchange::response(
                200,
                "<tattle-message>Thanks!</tattle-message><tattle-icon>tip</tattle-icon>",
            )),
            true,
        )
        .unwrap();

        assert_eq!(notice.title, "Report Sent");
        assert_eq!(notice.message, "Thanks!");
        assert_eq!(notice.icon, Icon::Tip);
        assert_eq!(notice.command, ServerCommand::None);
    }

    #[test]
    fn bare_command_has_no_notice() {
        let r = reply(Exchange::response(200, "<tattle-command>STOP</tattle-command>"));
        assert!(r.valid());
        assert!(Notice::from_reply(&r, false).is_none());
    }

    #[test]
    fn unauthorized_is_a_failure() {
        let r = reply(Exchange::response(403, "<tattle-message>m</tattle-message>"));
        assert_eq!(r.state, RequestState::Unauthorized);

        let notice = Notice::from_reply(&r, false).unwrap();
        assert_eq!(notice.message, "Failed to send the report.\nHTTP status 403");
    }
}
