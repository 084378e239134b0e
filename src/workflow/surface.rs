//! What the workflow needs from a user interface.

use super::notice::Notice;
use super::prompt::{Confirm, PromptForm, Submission};

/// A window the workflow is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Window {
    Notice(Notice),
    Prompt(PromptForm),
    Confirm(Confirm),
}

/// How a window was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    NoticeClosed { followed_link: bool },
    PromptSubmitted(Submission),
    PromptCancelled,
    ConfirmAnswered(bool),
}

/// A user interface able to present workflow windows.
pub trait Surface {
    /// Present `window` and block until the user closes it.
    fn show(&mut self, window: &Window) -> WindowEvent;

    /// Report network activity. Returning `false` cancels the request.
    fn progress(&mut self, activity: &str) -> bool {
        let _ = activity;
        true
    }
}
