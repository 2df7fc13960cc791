// Newline-delimited JSON command session: one command per input line, one
// reply per output line. Edits reply with their full report, everything else
// with its notifications.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use redraft_common::protocol::{Command, Notification};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::dispatch::{Dispatcher, EditReport};
use crate::runtime::{with_dispatcher, SharedDispatcher};

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Reply {
    Notification(Notification),
    Edit {
        success: bool,
        #[serde(flatten)]
        report: EditReport,
    },
}

impl Reply {
    fn edit(report: EditReport) -> Self {
        Self::Edit { success: report.success(), report }
    }
}

fn run_command(dispatcher: &mut Dispatcher, command: Command, now: DateTime<Utc>) -> Vec<Reply> {
    match command {
        Command::Edit { target, patch, actor } => {
            vec![Reply::edit(dispatcher.edit_as(actor, target, &patch, now))]
        }
        command => {
            dispatcher.execute(command, now).into_iter().map(Reply::Notification).collect()
        }
    }
}

/// Serves commands until `reader` hits EOF. `after_command` runs with the
/// dispatcher still locked, so it can persist a consistent snapshot.
pub async fn serve_session<R, W, F>(
    reader: R,
    mut writer: W,
    shared: SharedDispatcher,
    mut after_command: F,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(&Dispatcher) -> Result<()>,
{
    let mut reader = reader;
    let mut handled = 0usize;

    loop {
        let mut line = Vec::new();
        let bytes_read =
            reader.read_until(b'\n', &mut line).await.context("failed to read session command")?;
        if bytes_read == 0 {
            return Ok(handled);
        }

        trim_line_endings(&mut line);
        if line.iter().all(|byte| byte.is_ascii_whitespace()) {
            continue;
        }

        let replies = match serde_json::from_slice::<Command>(&line) {
            Ok(command) => with_dispatcher(&shared, |dispatcher| {
                let replies = run_command(dispatcher, command, Utc::now());
                if let Err(error) = after_command(dispatcher) {
                    warn!(?error, "failed to persist after command");
                }
                replies
            })?,
            Err(error) => vec![Reply::Notification(Notification::failure(
                None,
                "",
                format!("invalid command: {error}"),
            ))],
        };
        handled += 1;

        for reply in replies {
            let mut encoded = serde_json::to_vec(&reply).context("failed to serialize reply")?;
            encoded.push(b'\n');
            writer.write_all(&encoded).await.context("failed to write reply")?;
        }
        writer.flush().await.context("failed to flush replies")?;
    }
}

fn trim_line_endings(line: &mut Vec<u8>) {
    while matches!(line.last(), Some(b'\n' | b'\r')) {
        line.pop();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tokio::io::BufReader;

    use super::serve_session;
    use crate::config::EngineConfig;
    use crate::dispatch::Dispatcher;
    use crate::runtime::{shared, with_dispatcher};
    use crate::store::{DocumentStore, StoreLimits};

    fn decode(output: &[u8]) -> Vec<Value> {
        output
            .split(|byte| *byte == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).expect("reply line"))
            .collect()
    }

    #[tokio::test]
    async fn each_command_line_yields_notifications() {
        let shared = shared(Dispatcher::from_config(
            &EngineConfig::default(),
            DocumentStore::new(StoreLimits::default()),
        ));
        let input = concat!(
            r#"{"command":"create","kind":"text","title":"notes","content":"hello"}"#,
            "\n\n",
            r#"{"command":"edit","target":"active","patch":"<<<<<<< SEARCH\nhello\n=======\nhello world\n>>>>>>> REPLACE\n"}"#,
            "\r\n",
            "not json\n",
        );
        let mut output = Vec::new();
        let mut saves = 0;

        let handled = serve_session(
            BufReader::new(input.as_bytes()),
            &mut output,
            shared.clone(),
            |_| {
                saves += 1;
                Ok(())
            },
        )
        .await
        .expect("session should finish at eof");

        assert_eq!(handled, 3);
        assert_eq!(saves, 2);
        let replies = decode(&output);
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["success"], true);
        assert_eq!(replies[1]["success"], true);
        assert_eq!(replies[2]["success"], false);
        let error = replies[2]["errors"][0].as_str().expect("error text");
        assert!(error.starts_with("invalid command"));

        let content = with_dispatcher(&shared, |dispatcher| {
            dispatcher.store().active().map(|document| document.content().to_owned())
        })
        .expect("dispatcher available");
        assert_eq!(content.as_deref(), Some("hello world"));
    }

    #[tokio::test]
    async fn edit_replies_carry_block_outcomes() {
        let shared = shared(Dispatcher::from_config(
            &EngineConfig::default(),
            DocumentStore::new(StoreLimits::default()),
        ));
        let input = concat!(
            r#"{"command":"create","kind":"code","title":"app.py","content":"import a\nbody()"}"#,
            "\n",
            r#"{"command":"edit","target":"active","patch":"<<<<<<< SEARCH\nimport a\n=======\nimport a\nimport b\n>>>>>>> REPLACE\n<<<<<<< SEARCH\nmissing()\n=======\nx()\n>>>>>>> REPLACE\n"}"#,
            "\n",
        );
        let mut output = Vec::new();

        serve_session(BufReader::new(input.as_bytes()), &mut output, shared, |_| Ok(()))
            .await
            .expect("session should finish at eof");

        let replies = decode(&output);
        assert_eq!(replies.len(), 2);
        let edit = &replies[1];
        assert_eq!(edit["success"], false);
        assert_eq!(edit["applied_count"], 1);
        assert_eq!(edit["outcomes"][0]["outcome"]["status"], "applied");
        assert_eq!(edit["outcomes"][1]["outcome"]["status"], "not_found");
        assert_eq!(edit["notifications"][0]["title"], "app.py");
    }
}
