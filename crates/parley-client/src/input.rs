//! Operator input.

use std::io::{BufRead, Write};

use tokio::sync::mpsc;
use tracing::debug;

/// Read operator lines from stdin on a dedicated thread.
///
/// `prompt` is printed before each read. Lines arrive without their trailing
/// newline. The channel closes at end of input, on a read error, or once the
/// receiver is dropped and the next line has been read.
pub fn spawn_stdin_reader(prompt: String) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    let spawned = std::thread::Builder::new()
        .name("parley-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            let mut lines = stdin.lock();
            loop {
                {
                    let mut out = std::io::stdout().lock();
                    let _ = out.write_all(prompt.as_bytes());
                    let _ = out.flush();
                }
                let mut line = String::new();
                match lines.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.blocking_send(strip_newline(&line).to_string()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        debug!(error = %e, "could not spawn stdin reader");
    }
    rx
}

/// Drop one trailing `\n` or `\r\n`.
pub fn strip_newline(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
