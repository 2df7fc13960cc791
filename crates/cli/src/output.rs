// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use redraft_common::protocol::Notification;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use crate::exit_code::{codes, Rejected};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_GREEN: &str = "\x1b[32m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

/// Write a value to a provided writer (useful for testing).
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line = render_human_stderr_line("error", message, io::stderr().is_terminal());
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    if let Some(rejected) = error.chain().find_map(|cause| cause.downcast_ref::<Rejected>()) {
        return (rejected.code, rejected.message.clone());
    }

    let message = format!("{error:#}");
    let lower = message.to_ascii_lowercase();

    if lower.contains("no document is active") {
        return (
            codes::NO_ACTIVE_DOCUMENT,
            "No document is active. Run: redraft new <title>".to_string(),
        );
    }

    if lower.contains("document") && lower.contains("not found") {
        let doc_name = extract_document_name(&message).unwrap_or_else(|| "<name>".to_string());
        return (
            codes::DOCUMENT_NOT_FOUND,
            format!("Document {doc_name} not found. Run: redraft ls to see available documents"),
        );
    }

    if lower.contains("snapshot") {
        return (codes::STORE_UNREADABLE, message);
    }

    if lower.contains("config") {
        return (codes::CONFIG_ERROR, message);
    }

    (codes::ERROR, message)
}

/// One line per notification: a status mark, the title, then each change
/// summary or error on its own indented line.
pub fn render_notification(notification: &Notification) -> String {
    render_notification_styled(notification, io::stdout().is_terminal())
}

fn render_notification_styled(notification: &Notification, is_tty: bool) -> String {
    let (mark, color) =
        if notification.success { ("ok", ANSI_GREEN) } else { ("failed", ANSI_RED) };
    let mark = if is_tty { format!("{color}{mark}{ANSI_RESET}") } else { mark.to_string() };
    let title =
        if notification.title.is_empty() { "(no document)" } else { notification.title.as_str() };

    let mut lines = vec![format!("{mark} {title}")];
    for entry in notification.change_summaries.iter().chain(notification.error_list()) {
        for (index, line) in entry.lines().enumerate() {
            let indent = if index == 0 { "  " } else { "    " };
            lines.push(format!("{indent}{line}"));
        }
    }
    lines.join("\n")
}

pub fn render_notifications(notifications: &[Notification]) -> String {
    notifications.iter().map(render_notification).collect::<Vec<_>>().join("\n")
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{ANSI_RED}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}

fn extract_document_name(message: &str) -> Option<String> {
    let mut parts = message.split('`');
    let _before = parts.next()?;
    let candidate = parts.next()?.trim();
    if candidate.is_empty() {
        None
    } else {
        Some(candidate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn detect_tty_returns_human() {
        assert_eq!(OutputFormat::detect_from_terminal(true), OutputFormat::Human);
    }

    #[test]
    fn detect_pipe_returns_json() {
        assert_eq!(OutputFormat::detect_from_terminal(false), OutputFormat::Json);
    }

    #[test]
    fn detect_json_flag_overrides_tty() {
        assert_eq!(OutputFormat::detect(true), OutputFormat::Json);
    }

    #[test]
    fn write_output_human_format() {
        #[derive(Serialize)]
        struct Info {
            title: String,
        }
        let info = Info { title: "notes.md".into() };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Human, &info, |i| format!("Title: {}", i.title))
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Title: notes.md\n");
    }

    #[test]
    fn write_output_json_does_not_call_human_fn() {
        #[derive(Serialize)]
        struct Info {
            revisions: u32,
        }
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Json, &Info { revisions: 3 }, |_| {
            panic!("human_fn should not be called in JSON mode")
        })
        .unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["revisions"], 3);
    }

    #[test]
    fn notification_rendering_indents_multiline_errors() {
        let mut notification = Notification::failure(
            Some(Uuid::new_v4()),
            "main.rs",
            "Block 1: search text not found:\nfn mian()",
        );
        notification.change_summaries.push("Block 2: replaced 1 line with 2 lines".into());

        let rendered = render_notification_styled(&notification, false);
        assert_eq!(
            rendered,
            "failed main.rs\n  Block 2: replaced 1 line with 2 lines\n  \
             Block 1: search text not found:\n    fn mian()"
        );
    }

    #[test]
    fn notification_without_title_is_labelled() {
        let notification = Notification::failure(None, "", "no document is active");
        let rendered = render_notification_styled(&notification, true);
        assert!(rendered.contains(ANSI_RED));
        assert!(rendered.contains("(no document)"));
    }

    #[test]
    fn render_human_error_without_tty_is_plain() {
        assert_eq!(render_human_stderr_line("error", "boom", false), "error: boom");
        assert!(render_human_stderr_line("error", "boom", true).contains(ANSI_RED));
    }

    #[test]
    fn rejected_commands_keep_their_code() {
        let err = anyhow::Error::new(Rejected {
            code: codes::DOCUMENT_LOCKED,
            message: "document is locked by ai".into(),
        });
        let (code, message) = actionable_error(&err);
        assert_eq!(code, codes::DOCUMENT_LOCKED);
        assert_eq!(message, "document is locked by ai");
    }

    #[test]
    fn actionable_error_document_not_found_message() {
        let err = anyhow::anyhow!("document `notes.md` not found");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, codes::DOCUMENT_NOT_FOUND);
        assert!(message.contains("notes.md"));
        assert!(message.contains("redraft ls"));
    }

    #[test]
    fn actionable_error_no_active_document() {
        let err = anyhow::anyhow!("no document is active");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, codes::NO_ACTIVE_DOCUMENT);
        assert!(message.contains("redraft new"));
    }

    #[test]
    fn actionable_error_corrupt_snapshot() {
        let err = anyhow::anyhow!("expected value at line 1")
            .context("failed to decode persisted snapshot");
        assert_eq!(actionable_error(&err).0, codes::STORE_UNREADABLE);
    }

    #[test]
    fn actionable_error_falls_back_to_generic() {
        let err = anyhow::anyhow!("something went wrong");
        assert_eq!(actionable_error(&err), (codes::ERROR, "something went wrong".to_string()));
    }
}
