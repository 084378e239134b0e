//! Terminal surface: windows are printed to stderr and answered on stdin.

use std::{
    io::{self, BufRead, Write},
    process::Command,
};

use crate::workflow::{Confirm, Notice, PromptForm, Submission, Surface, Window, WindowEvent};

/// A [`Surface`] over line-based input and output.
pub struct ConsoleSurface<R, W> {
    input: R,
    output: W,
    last_activity: String,
    open_links: bool,
}

impl ConsoleSurface<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> ConsoleSurface<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            last_activity: String::new(),
            open_links: true,
        }
    }

    /// Read one line without its terminator. `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Ask a yes/no question. End of input answers `default`.
    fn ask(&mut self, question: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        write!(self.output, "{question} {hint} ")?;
        self.output.flush()?;
        let answer = self.read_line()?.unwrap_or_default();
        Ok(match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default,
        })
    }

    fn notice(&mut self, notice: &Notice) -> io::Result<WindowEvent> {
        writeln!(self.output, "\n[{}] {}", notice.icon, notice.title)?;
        writeln!(self.output, "{}", notice.message)?;

        let mut followed_link = false;
        if let Some(link) = &notice.link {
            writeln!(self.output, "\n{link}")?;
            if self.ask("Open in your browser?", false)? {
                followed_link = self.open_links && open_link(link);
                if !followed_link {
                    writeln!(self.output, "The link couldn't be opened:\n[{link}]")?;
                }
            }
        } else {
            write!(self.output, "(press Enter) ")?;
            self.output.flush()?;
            self.read_line()?;
        }
        Ok(WindowEvent::NoticeClosed { followed_link })
    }

    fn prompt(&mut self, form: &PromptForm) -> io::Result<WindowEvent> {
        writeln!(self.output, "\n== {} ==", form.title)?;
        for text in [&form.message, &form.technical] {
            if !text.is_empty() {
                writeln!(self.output, "{text}")?;
            }
        }
        if form.connection_warning {
            writeln!(
                self.output,
                "Warning: the report server could not be reached. Sending may fail."
            )?;
        }

        let mut values = Vec::with_capacity(form.fields.len());
        for field in &form.fields {
            let value =
                self.field(&field.label, &field.placeholder, &field.value, field.multiline)?;
            let Some(value) = value else {
                return Ok(WindowEvent::PromptCancelled);
            };
            values.push((field.name.clone(), value));
        }

        let dont_show_again =
            form.offer_dont_show && self.ask("Don't show this kind of report again?", false)?;

        loop {
            let mut question = format!("{} [s] / {} [c]", form.btn_send, form.btn_cancel);
            if form.review.is_some() {
                question.push_str(&format!(" / {} [d]", form.btn_review));
            }
            write!(self.output, "{question}: ")?;
            self.output.flush()?;

            let Some(answer) = self.read_line()? else {
                return Ok(WindowEvent::PromptCancelled);
            };
            match answer.trim() {
                "s" | "" => {
                    return Ok(WindowEvent::PromptSubmitted(Submission {
                        values,
                        dont_show_again,
                    }));
                }
                "c" => return Ok(WindowEvent::PromptCancelled),
                "d" => {
                    if let Some(review) = &form.review {
                        writeln!(self.output, "\n{review}")?;
                    }
                }
                _ => {}
            }
        }
    }

    /// Read one field. `None` if input ended.
    fn field(
        &mut self,
        label: &str,
        placeholder: &str,
        current: &str,
        multiline: bool,
    ) -> io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        if !placeholder.is_empty() {
            write!(self.output, " ({placeholder})")?;
        }
        if !current.is_empty() {
            write!(self.output, " [{current}]")?;
        }

        if !multiline {
            write!(self.output, ": ")?;
            self.output.flush()?;
            return Ok(self.read_line()?.map(|line| {
                if line.is_empty() {
                    current.to_string()
                } else {
                    line
                }
            }));
        }

        writeln!(self.output, "\n(end with a line containing only \".\")")?;
        self.output.flush()?;
        let mut lines = Vec::new();
        loop {
            match self.read_line()? {
                None => return Ok(None),
                Some(line) if line == "." => break,
                Some(line) => lines.push(line),
            }
        }
        if lines.is_empty() {
            return Ok(Some(current.to_string()));
        }
        Ok(Some(lines.join("\n")))
    }

    fn confirm(&mut self, confirm: &Confirm) -> io::Result<WindowEvent> {
        writeln!(self.output, "\n{}", confirm.title)?;
        writeln!(self.output, "{}", confirm.message)?;
        Ok(WindowEvent::ConfirmAnswered(self.ask("Send?", false)?))
    }
}

impl<R: BufRead, W: Write> Surface for ConsoleSurface<R, W> {
    fn show(&mut self, window: &Window) -> WindowEvent {
        let result = match window {
            Window::Notice(notice) => self.notice(notice),
            Window::Prompt(form) => self.prompt(form),
            Window::Confirm(confirm) => self.confirm(confirm),
        };
        result.unwrap_or_else(|e| {
            log::warn!("console I/O failed: {e}");
            match window {
                Window::Notice(_) => WindowEvent::NoticeClosed {
                    followed_link: false,
                },
                Window::Prompt(_) => WindowEvent::PromptCancelled,
                Window::Confirm(_) => WindowEvent::ConfirmAnswered(false),
            }
        })
    }

    fn progress(&mut self, activity: &str) -> bool {
        if activity != self.last_activity {
            let _ = writeln!(self.output, "{activity}");
            self.last_activity = activity.to_string();
        }
        true
    }
}

/// Hand `link` to the desktop's default handler.
fn open_link(link: &str) -> bool {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        Command::new("xdg-open")
    };
    match command.arg(link).status() {
        Ok(status) => status.success(),
        Err(e) => {
            log::warn!("failed to open {link}: {e}");
            false
        }
    }
}
