//! The interactive prompt: what the user sees and what they send back.

use crate::config::Config;
use crate::reply::Icon;
use crate::report::ContentStore;

/// One editable field in the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub placeholder: String,
    pub multiline: bool,

    /// Current value: the user's last input, else the default.
    pub value: String,
}

/// Everything a surface needs to render the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptForm {
    pub title: String,
    pub message: String,
    pub technical: String,
    pub btn_send: String,
    pub btn_cancel: String,
    pub btn_review: String,
    pub icon: Option<Icon>,

    /// The pre-query or probe failed; the post may not get through.
    pub connection_warning: bool,

    pub fields: Vec<FormField>,

    /// Review text, when the review surface is enabled.
    pub review: Option<String>,

    /// Offer "don't show again" for this report's identity.
    pub offer_dont_show: bool,
}

impl PromptForm {
    pub fn build(
        config: &Config,
        store: &ContentStore,
        connection_warning: bool,
        has_identity: bool,
    ) -> Self {
        let text = &config.gui.prompt;
        let fields = store
            .fields()
            .map(|(item, field)| FormField {
                name: item.name.clone(),
                label: if field.label.is_empty() {
                    item.name.clone()
                } else {
                    field.label.clone()
                },
                placeholder: field.placeholder.clone(),
                multiline: field.multiline,
                value: item.value().to_string(),
            })
            .collect();

        Self {
            title: text.title.clone(),
            message: text.message.clone(),
            technical: text.technical.clone(),
            btn_send: text.btn_send.clone(),
            btn_cancel: text.btn_cancel.clone(),
            btn_review: text.btn_review.clone(),
            icon: config.gui.icon,
            connection_warning,
            fields,
            review: text
                .review
                .then(|| store.review(config.paths.review.as_deref())),
            offer_dont_show: has_identity,
        }
    }
}

/// Values the user submitted, by content name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub values: Vec<(String, String)>,
    pub dont_show_again: bool,
}

impl Submission {
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A yes/no question shown before continuing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirm {
    pub title: String,
    pub message: String,
}

/// Warnings for fields left blank that ask not to be.
///
/// A field missing from the submission is judged by its current value.
pub fn input_warnings(store: &ContentStore, submission: &Submission) -> Vec<String> {
    store
        .fields()
        .filter(|(_, field)| !field.input_warning.is_empty())
        .filter(|(item, _)| {
            submission
                .value(&item.name)
                .unwrap_or(item.value())
                .trim()
                .is_empty()
        })
        .map(|(_, field)| field.input_warning.clone())
        .collect()
}

impl Confirm {
    /// Ask whether to send despite `warnings`.
    pub fn send_anyway(warnings: &[String]) -> Self {
        Self {
            title: "Send anyway?".to_string(),
            message: format!("{}\n\nSend the report anyway?", warnings.join("\n")),
        }
    }
}
