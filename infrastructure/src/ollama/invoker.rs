//! Ollama process invoker.
//!
//! Each generation spawns one `ollama run <model>` process, writes the
//! prompt to its stdin, and collects stdout. The child is spawned with
//! `kill_on_drop` so an abandoned call (timeout, dropped future) never
//! leaves an orphaned process behind.

use async_trait::async_trait;
use parley_application::ports::backend::{BackendError, ModelBackend, ReplyStream};
use parley_domain::ModelId;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Wall-clock limit for one generation.
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Read granularity for streaming stdout.
const STREAM_READ_BYTES: usize = 64;

/// Backend adapter that shells out to the Ollama CLI.
pub struct OllamaBackend {
    command: String,
    timeout: Duration,
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaBackend {
    pub fn new() -> Self {
        Self::with_command("ollama")
    }

    /// Use a custom executable (useful for testing).
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: GENERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_command(&self, model: &ModelId) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg("run")
            .arg(model.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        // This catches cases where Drop doesn't run (SIGKILL, OOM kill).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        cmd
    }

    fn map_spawn_error(&self, err: std::io::Error, model: &ModelId) -> BackendError {
        if err.kind() == ErrorKind::NotFound {
            BackendError::NotFound(model.clone())
        } else {
            BackendError::Io(err.to_string())
        }
    }

    /// Spawn the process and deliver the prompt on stdin.
    ///
    /// Closing stdin after the write signals end-of-prompt. Write errors are
    /// tolerated: a fast-exiting child closes its end first, and the exit
    /// status carries the real diagnosis.
    async fn spawn_and_send(&self, prompt: &str, model: &ModelId) -> Result<Child, BackendError> {
        debug!("Spawning backend: {} run {}", self.command, model);
        let mut child = self
            .build_command(model)
            .spawn()
            .map_err(|e| self.map_spawn_error(e, model))?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = format!("{prompt}\n");
            if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                debug!("Prompt write failed (child may have exited): {}", e);
            }
            // Dropping stdin closes the pipe
        }

        Ok(child)
    }
}

/// Decode as much of `pending` as possible, leaving only a trailing
/// partial code point in the buffer for the next read.
///
/// Invalid sequences are replaced with U+FFFD and skipped, so one bad byte
/// never stalls the stream; this matches the lossy decode on the blocking
/// path.
fn take_valid_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(pending) {
            Ok(s) => {
                out.push_str(s);
                pending.clear();
                break;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    Some(bad) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + bad);
                    }
                    // Incomplete trailing code point, wait for more bytes
                    None => {
                        pending.drain(..valid);
                        break;
                    }
                }
            }
        }
    }
    out
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    async fn generate(&self, prompt: &str, model: &ModelId) -> Result<String, BackendError> {
        let child = self.spawn_and_send(prompt, model).await?;

        // On timeout the future is dropped and kill_on_drop reaps the child
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(BackendError::Io(e.to_string())),
            Err(_) => {
                warn!("Generation timed out after {:?}", self.timeout);
                return Err(BackendError::Timeout);
            }
        };

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                format!("ollama exited with {}", output.status)
            } else {
                stderr
            };
            Err(BackendError::NonZeroExit(detail))
        }
    }

    async fn generate_streaming(
        &self,
        prompt: &str,
        model: &ModelId,
    ) -> Result<ReplyStream, BackendError> {
        let mut child = self.spawn_and_send(prompt, model).await?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| BackendError::Io("failed to capture stdout".to_string()))?;
        let mut stderr = child.stderr.take();

        let (tx, rx) = mpsc::channel(32);
        let timeout = self.timeout;

        // The task owns the child; kill_on_drop still covers abrupt ends
        tokio::spawn(async move {
            let mut accumulated = String::new();
            let mut pending: Vec<u8> = Vec::new();

            let read_loop = async {
                let mut buf = [0u8; STREAM_READ_BYTES];
                loop {
                    match stdout.read(&mut buf).await {
                        Ok(0) => break Ok(()),
                        Ok(n) => {
                            pending.extend_from_slice(&buf[..n]);
                            let chunk = take_valid_utf8(&mut pending);
                            if !chunk.is_empty() {
                                accumulated.push_str(&chunk);
                                if tx.send(Ok(accumulated.clone())).await.is_err() {
                                    // Receiver gone, stop reading
                                    break Ok(());
                                }
                            }
                        }
                        Err(e) => break Err(e),
                    }
                }
            };

            match tokio::time::timeout(timeout, read_loop).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!("Streaming read failed: {}", e);
                    let _ = child.kill().await;
                    let _ = tx.send(Err(BackendError::Io(e.to_string()))).await;
                    return;
                }
                Err(_) => {
                    warn!("Streaming generation timed out after {:?}", timeout);
                    let _ = child.kill().await;
                    let _ = tx.send(Err(BackendError::Timeout)).await;
                    return;
                }
            }

            // The output ended mid code point; flush it lossily
            if !pending.is_empty() {
                accumulated.push_str(&String::from_utf8_lossy(&pending));
                pending.clear();
                let _ = tx.send(Ok(accumulated.clone())).await;
            }

            match child.wait().await {
                Ok(status) if status.success() => {
                    let trimmed = accumulated.trim();
                    if trimmed.len() != accumulated.len() {
                        let _ = tx.send(Ok(trimmed.to_string())).await;
                    }
                }
                Ok(status) => {
                    let mut detail = String::new();
                    if let Some(mut err_pipe) = stderr.take() {
                        let _ = err_pipe.read_to_string(&mut detail).await;
                    }
                    let detail = detail.trim();
                    let detail = if detail.is_empty() {
                        format!("ollama exited with {status}")
                    } else {
                        detail.to_string()
                    };
                    let _ = tx.send(Err(BackendError::NonZeroExit(detail))).await;
                }
                Err(e) => {
                    let _ = tx.send(Err(BackendError::Io(e.to_string()))).await;
                }
            }
        });

        Ok(ReplyStream::new(rx))
    }

    async fn is_available(&self, model: &ModelId) -> bool {
        let output = Command::new(&self.command)
            .arg("list")
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).contains(model.as_str())
            }
            Ok(output) => {
                debug!("Availability check exited with {}", output.status);
                false
            }
            Err(e) => {
                debug!("Availability check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ModelId {
        ModelId::default()
    }

    #[cfg(unix)]
    fn script(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn take_valid_utf8_holds_back_partial_code_point() {
        // "é" is 0xC3 0xA9; split it across reads
        let mut pending = vec![b'a', 0xC3];
        assert_eq!(take_valid_utf8(&mut pending), "a");
        assert_eq!(pending, vec![0xC3]);

        pending.push(0xA9);
        assert_eq!(take_valid_utf8(&mut pending), "é");
        assert!(pending.is_empty());
    }

    #[test]
    fn take_valid_utf8_replaces_invalid_bytes() {
        // An invalid byte must not block the text after it
        let mut pending = vec![b'a', 0xFF, b'b'];
        assert_eq!(take_valid_utf8(&mut pending), "a\u{FFFD}b");
        assert!(pending.is_empty());
    }

    #[test]
    fn take_valid_utf8_replaces_truncated_sequence_followed_by_ascii() {
        // 0xC3 expects a continuation byte; 'x' is not one
        let mut pending = vec![0xC3, b'x'];
        assert_eq!(take_valid_utf8(&mut pending), "\u{FFFD}x");
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn missing_executable_maps_to_not_found() {
        let backend = OllamaBackend::with_command("parley-test-no-such-binary");
        let err = backend.generate("hi", &model()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Ollama not found. Please install Ollama and pull the llama3.2:3b model."
        );
    }

    #[tokio::test]
    async fn echo_stand_in_returns_its_output() {
        // `echo run <model>` ignores stdin and prints its arguments
        let backend = OllamaBackend::with_command("echo");
        let reply = backend.generate("hi", &model()).await.unwrap();
        assert_eq!(reply, format!("run {}", ModelId::DEFAULT));
    }

    #[tokio::test]
    async fn non_zero_exit_maps_to_backend_error() {
        let backend = OllamaBackend::with_command("false");
        let err = backend.generate("hi", &model()).await.unwrap_err();
        assert!(matches!(err, BackendError::NonZeroExit(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stderr_is_carried_in_the_advisory() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = script(&dir, "fail.sh", "#!/bin/sh\necho 'model not loaded' >&2\nexit 1\n");

        let backend = OllamaBackend::with_command(cmd);
        let err = backend.generate("hi", &model()).await.unwrap_err();
        assert_eq!(err.to_string(), "Error: model not loaded");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_backend_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = script(&dir, "slow.sh", "#!/bin/sh\nsleep 5\n");

        let backend =
            OllamaBackend::with_command(cmd).with_timeout(Duration::from_millis(200));
        let err = backend.generate("hi", &model()).await.unwrap_err();
        assert_eq!(err.to_string(), "Error: Request timed out. Please try again.");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streaming_accumulates_full_text() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = script(&dir, "say.sh", "#!/bin/sh\nprintf 'Hello world'\n");

        let backend = OllamaBackend::with_command(cmd);
        let mut stream = backend.generate_streaming("hi", &model()).await.unwrap();

        let mut snapshots = Vec::new();
        while let Some(event) = stream.next_event().await {
            snapshots.push(event.unwrap());
        }
        // Every snapshot is a prefix-extension of the previous one
        for pair in snapshots.windows(2) {
            assert!(pair[1].starts_with(pair[0].trim_end()));
        }
        assert_eq!(snapshots.last().map(|s| s.trim()), Some("Hello world"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streaming_survives_invalid_utf8_in_the_output() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = script(&dir, "garbled.sh", "#!/bin/sh\nprintf 'abc\\377def'\n");

        let backend = OllamaBackend::with_command(cmd);
        let mut stream = backend.generate_streaming("hi", &model()).await.unwrap();

        let mut last = String::new();
        while let Some(event) = stream.next_event().await {
            last = event.unwrap();
        }
        assert_eq!(last, "abc\u{FFFD}def");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streaming_flushes_a_dangling_byte_at_end_of_output() {
        // 0xC3 alone looks like the start of a two-byte sequence
        let dir = tempfile::tempdir().unwrap();
        let cmd = script(&dir, "dangling.sh", "#!/bin/sh\nprintf 'ok\\303'\n");

        let backend = OllamaBackend::with_command(cmd);
        let mut stream = backend.generate_streaming("hi", &model()).await.unwrap();

        let mut last = String::new();
        while let Some(event) = stream.next_event().await {
            last = event.unwrap();
        }
        assert_eq!(last, "ok\u{FFFD}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streaming_failure_ends_with_error_element() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = script(
            &dir,
            "partial.sh",
            "#!/bin/sh\nprintf 'partial'\necho 'stream broke' >&2\nexit 1\n",
        );

        let backend = OllamaBackend::with_command(cmd);
        let mut stream = backend.generate_streaming("hi", &model()).await.unwrap();

        let mut texts = Vec::new();
        let mut failure = None;
        while let Some(event) = stream.next_event().await {
            match event {
                Ok(snapshot) => texts.push(snapshot),
                Err(err) => failure = Some(err),
            }
        }
        assert!(texts.iter().any(|t| t.contains("partial")));
        assert_eq!(failure.unwrap().to_string(), "Error: stream broke");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn availability_is_substring_containment() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = script(
            &dir,
            "list.sh",
            "#!/bin/sh\necho 'NAME          SIZE'\necho 'llama3.2:3b   2.0 GB'\n",
        );

        let backend = OllamaBackend::with_command(cmd);
        assert!(backend.is_available(&model()).await);
        assert!(!backend.is_available(&ModelId::new("mistral:7b")).await);
    }

    #[tokio::test]
    async fn availability_is_false_when_backend_missing() {
        let backend = OllamaBackend::with_command("parley-test-no-such-binary");
        assert!(!backend.is_available(&model()).await);
    }
}
