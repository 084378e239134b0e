//! The report workflow: pre-query, prompt, post, done.
//!
//! A [`Controller`] runs stages until one of them needs the user, then
//! parks that window in `pending` and returns. The host shows the window
//! and feeds the result back through [`Controller::dispatch`], which picks
//! up where the workflow left off. [`run`] is that loop for blocking
//! surfaces.
//!
//! ```text
//! Start ─► Query ─► Prompt ─► Post ─► Done
//!            │        ▲  │              ▲
//!            │        └──┘ ShowPrompt   │
//!            └──────── Halt ────────────┘
//! ```
//!
//! Nothing here returns errors. Network failures become replies, and
//! persistence failures are logged.

mod notice;
mod prompt;
mod surface;

use std::time::Duration;

use crate::config::Config;
use crate::journal::{Event, Journal};
use crate::model::{Identity, ParsedUrl};
use crate::persist::PersistentStore;
use crate::reply::{Icon, Reply, ServerCommand};
use crate::report::{ContentStore, Multipart, random_boundary};
use crate::transport::{Request, Transport};

pub use notice::Notice;
#[cfg(test)]
pub use prompt::FormField;
pub use prompt::{Confirm, PromptForm, Submission};
pub use surface::{Surface, Window, WindowEvent};

use prompt::input_warnings;

/// Progress callback handed down to the transport.
pub type Progress<'p> = &'p mut dyn FnMut(&str) -> bool;

/// Workflow stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    Query,
    Prompt,
    Post,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Query => "query",
            Self::Prompt => "prompt",
            Self::Post => "post",
            Self::Done => "done",
        }
    }
}

/// Drives one report from start to finish.
pub struct Controller<'a> {
    config: &'a Config,
    transport: &'a dyn Transport,
    store: ContentStore,
    persist: PersistentStore,
    journal: Journal,

    identity: Option<Identity>,
    stage: Stage,
    halted: bool,
    connection_warning: bool,
    prompt_open: bool,

    /// Window produced by the last step, not yet shown.
    pending: Option<Window>,
    /// Window the user is looking at.
    showing: Option<Window>,
    /// Submission waiting for "send anyway?".
    unconfirmed: Option<Submission>,
}

impl<'a> Controller<'a> {
    /// Set up a workflow. Remembered field values are restored here.
    pub fn new(
        config: &'a Config,
        transport: &'a dyn Transport,
        mut store: ContentStore,
        persist: PersistentStore,
        journal: Journal,
    ) -> Self {
        store.restore_persisted(&persist);
        Self {
            config,
            transport,
            store,
            persist,
            journal,
            identity: config.identity.clone(),
            stage: Stage::Start,
            halted: false,
            connection_warning: false,
            prompt_open: false,
            pending: None,
            showing: None,
            unconfirmed: None,
        }
    }

    #[cfg(test)]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The workflow ended early.
    pub fn halted(&self) -> bool {
        self.halted
    }

    #[cfg(test)]
    pub fn connection_warning(&self) -> bool {
        self.connection_warning
    }

    #[cfg(test)]
    pub fn prompt_open(&self) -> bool {
        self.prompt_open
    }

    #[cfg(test)]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[cfg(test)]
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    #[cfg(test)]
    pub fn persist(&self) -> &PersistentStore {
        &self.persist
    }

    pub fn start(&mut self, progress: Progress<'_>) {
        self.proceed(progress);
    }

    /// Run stages until one produces a window or the workflow ends.
    pub fn proceed(&mut self, progress: Progress<'_>) {
        self.pending = None;
        loop {
            match self.stage {
                Stage::Start => {
                    self.stage = Stage::Query;
                    self.perform_query(progress);
                }
                Stage::Query => {
                    self.stage = Stage::Prompt;
                    self.perform_prompt();
                }
                Stage::Prompt => {
                    self.stage = Stage::Post;
                    self.perform_post(progress);
                }
                Stage::Post => {
                    self.finish();
                    return;
                }
                Stage::Done => return,
            }
            if self.pending.is_some() || self.stage == Stage::Done {
                return;
            }
        }
    }

    /// End the workflow now, skipping any remaining stages.
    pub fn halt(&mut self) {
        if self.stage == Stage::Done {
            return;
        }
        log::info!("halting at {} stage", self.stage.as_str());
        self.journal.record(Event::Halt {
            stage: self.stage.as_str().to_string(),
        });
        self.halted = true;
        self.pending = None;
        self.finish();
    }

    /// Raise the prompt again, or move on to it if it hasn't been shown.
    pub fn show_prompt(&mut self, progress: Progress<'_>) {
        if self.prompt_open {
            self.stage = Stage::Prompt;
            self.pending = Some(Window::Prompt(self.form()));
        } else {
            self.proceed(progress);
        }
    }

    /// The next window to show, if the workflow is waiting on one.
    pub fn take_pending(&mut self) -> Option<Window> {
        let window = self.pending.take()?;
        self.showing = Some(window.clone());
        Some(window)
    }

    /// Resume after the user closed the window from [`take_pending`].
    ///
    /// [`take_pending`]: Self::take_pending
    pub fn dispatch(&mut self, event: WindowEvent, progress: Progress<'_>) {
        match (self.showing.take(), event) {
            (Some(Window::Notice(notice)), WindowEvent::NoticeClosed { followed_link }) => {
                self.notice_closed(notice.command, followed_link, progress);
            }
            (Some(Window::Prompt(_)), WindowEvent::PromptSubmitted(submission)) => {
                self.submit(submission, progress);
            }
            (Some(Window::Prompt(_)), WindowEvent::PromptCancelled) => {
                log::info!("user declined to send the report");
                self.halt();
            }
            (Some(Window::Confirm(_)), WindowEvent::ConfirmAnswered(true)) => {
                match self.unconfirmed.take() {
                    Some(submission) => self.commit(&submission, progress),
                    None => self.proceed(progress),
                }
            }
            (Some(Window::Confirm(_)), WindowEvent::ConfirmAnswered(false)) => {
                self.unconfirmed = None;
                self.show_prompt(progress);
            }
            (window, event) => {
                log::error!("unexpected {event:?} for window {window:?}");
                self.halt();
            }
        }
    }

    // ── Stages ──

    fn perform_query(&mut self, progress: Progress<'_>) {
        let config = self.config;

        if let Some(url) = &config.query_url {
            let multipart = self.store.encode(&random_boundary(), true);
            let reply = self.exchange(
                url,
                multipart,
                config.timeouts.query,
                "Looking for solutions...",
                progress,
            );
            self.journal.record(Event::exchange("query", url, &reply));
            self.absorb_server_values(&reply);

            if reply.ok()
                && let Some(identity) = &reply.identity
            {
                log::info!("server identified the report as {identity}");
                self.identity = Some(identity.clone());
            }

            if !reply.valid() {
                self.connection_warning = true;
                return;
            }

            let notice = if config.gui.query.is_silent() {
                None
            } else {
                Notice::from_reply(&reply, self.prompt_open)
            };
            match notice {
                Some(notice) => self.pending = Some(Window::Notice(notice)),
                None if reply.command == ServerCommand::Stop => self.halt(),
                None => {}
            }
        } else if !config.gui.post.is_silent()
            && let Some(url) = &config.post_url
        {
            let reachable = self.transport.probe(url, config.timeouts.probe);
            self.journal.record(Event::Probe {
                url: url.to_string(),
                reachable,
            });
            if !reachable {
                log::warn!("could not reach {}", url.host);
                self.connection_warning = true;
            }
        }
    }

    fn perform_prompt(&mut self) {
        let config = self.config;
        if config.post_url.is_none() || config.gui.post.is_silent() {
            return;
        }

        if let Some(identity) = &self.identity
            && !self.persist.should_show(identity)
        {
            log::info!("user asked not to be shown {identity} reports again");
            self.halt();
            return;
        }

        self.prompt_open = true;
        self.pending = Some(Window::Prompt(self.form()));
    }

    fn perform_post(&mut self, progress: Progress<'_>) {
        let config = self.config;
        let Some(url) = &config.post_url else {
            return;
        };

        let multipart = self.store.encode(&random_boundary(), false);
        let mut reply = self.exchange(
            url,
            multipart,
            config.timeouts.post,
            "Sending report...",
            progress,
        );
        if reply.icon.is_none() {
            reply.icon = Some(if reply.ok() {
                Icon::Information
            } else {
                Icon::Error
            });
        }
        self.journal.record(Event::exchange("post", url, &reply));
        self.absorb_server_values(&reply);

        if config.gui.post.is_silent() {
            return;
        }
        if let Some(notice) = Notice::from_reply(&reply, self.prompt_open) {
            self.pending = Some(Window::Notice(notice));
        }
    }

    fn finish(&mut self) {
        self.stage = Stage::Done;
        self.prompt_open = false;
        self.journal.record(Event::Done);
    }

    // ── Window results ──

    fn notice_closed(&mut self, command: ServerCommand, followed_link: bool, progress: Progress<'_>) {
        match command {
            ServerCommand::Stop => self.halt(),
            ServerCommand::StopOnLink if followed_link => self.halt(),
            ServerCommand::StopOnLink | ServerCommand::None => self.proceed(progress),
            ServerCommand::Prompt => self.show_prompt(progress),
        }
    }

    fn submit(&mut self, submission: Submission, progress: Progress<'_>) {
        self.apply_input(&submission);

        let warnings = input_warnings(&self.store, &submission);
        if warnings.is_empty() {
            self.commit(&submission, progress);
        } else {
            self.unconfirmed = Some(submission);
            self.pending = Some(Window::Confirm(Confirm::send_anyway(&warnings)));
        }
    }

    fn apply_input(&mut self, submission: &Submission) {
        for (name, value) in &submission.values {
            match self.store.find_mut(name) {
                Some(item) if item.as_field().is_some() => item.user_input = Some(value.clone()),
                _ => log::warn!("ignoring input for unknown field `{name}`"),
            }
        }
    }

    fn commit(&mut self, submission: &Submission, progress: Progress<'_>) {
        if let Some(patch) = self.store.persist_patch()
            && let Err(e) = self.persist.merge_patch(&patch)
        {
            log::warn!("failed to remember field values: {e}");
        }

        if submission.dont_show_again
            && let Some(identity) = &self.identity
            && let Err(e) = self.persist.suppress(identity)
        {
            log::warn!("failed to save \"don't show again\": {e}");
        }

        self.journal.record(Event::Submit {
            dont_show_again: submission.dont_show_again,
        });
        self.proceed(progress);
    }

    // ── Helpers ──

    fn form(&self) -> PromptForm {
        PromptForm::build(
            self.config,
            &self.store,
            self.connection_warning,
            self.identity.is_some(),
        )
    }

    fn exchange(
        &self,
        url: &ParsedUrl,
        multipart: Multipart,
        timeout: Duration,
        activity: &str,
        progress: Progress<'_>,
    ) -> Reply {
        let request = Request {
            url: url.clone(),
            content_type: multipart.content_type(),
            body: multipart.body,
            timeout,
            activity: activity.to_string(),
        };

        let exchange = if self.config.gui.progress_bar {
            self.transport.exchange(&request, progress)
        } else {
            self.transport.exchange(&request, &mut |_: &str| true)
        };
        Reply::from_exchange(exchange, url)
    }

    fn absorb_server_values(&mut self, reply: &Reply) {
        if !self.config.server_values || !reply.ok() {
            return;
        }
        if let Some(patch) = reply.server_patch()
            && let Err(e) = self.persist.merge_patch(&patch)
        {
            log::warn!("failed to store server values: {e}");
        }
    }
}

/// Drive `controller` to completion on a blocking surface.
pub fn run(controller: &mut Controller<'_>, surface: &mut dyn Surface) {
    controller.start(&mut |activity: &str| surface.progress(activity));
    while let Some(window) = controller.take_pending() {
        let event = surface.show(&window);
        controller.dispatch(event, &mut |activity: &str| surface.progress(activity));
    }
}
