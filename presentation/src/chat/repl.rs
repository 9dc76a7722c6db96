//! REPL (Read-Eval-Print Loop) for interactive chat

use crate::ConsoleFormatter;
use crate::ProgressReporter;
use colored::Colorize;
use parley_application::ChatController;
use parley_application::use_cases::chat_controller::SubmitError;
use parley_domain::{SessionExport, SessionId};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Resolve the readline history file: an explicitly configured path wins,
/// otherwise the default under the platform data directory.
fn resolve_history_path(configured: Option<&PathBuf>) -> Option<PathBuf> {
    configured
        .cloned()
        .or_else(|| dirs::data_dir().map(|p| p.join("parley").join("history.txt")))
}

/// Interactive chat REPL
pub struct ChatRepl {
    controller: Arc<ChatController>,
    show_progress: bool,
    stream_replies: bool,
    history_file: Option<PathBuf>,
}

impl ChatRepl {
    /// Create a new ChatRepl
    pub fn new(controller: Arc<ChatController>) -> Self {
        Self {
            controller,
            show_progress: true,
            stream_replies: false,
            history_file: None,
        }
    }

    /// Set whether to show progress
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Set whether to render replies incrementally
    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream_replies = stream;
        self
    }

    /// Override the readline history file location
    pub fn with_history_file(mut self, path: Option<PathBuf>) -> Self {
        self.history_file = path;
        self
    }

    /// Run the interactive REPL
    pub async fn run(&self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        // Try to load history
        let history_path = resolve_history_path(self.history_file.as_ref());

        if let Some(ref path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        self.print_welcome();

        loop {
            let readline = rl.readline(">>> ");

            match readline {
                Ok(line) => {
                    let line = line.trim();

                    // Skip empty lines
                    if line.is_empty() {
                        continue;
                    }

                    // Handle commands
                    if line.starts_with('/') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    // Add to history
                    let _ = rl.add_history_entry(line);

                    self.process_prompt(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        // Save history
        if let Some(ref path) = history_path {
            let _ = rl.save_history(path);
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│            Parley - Chat Mode               │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!("Model: {}", self.controller.active_model());
        println!();
        println!("Commands:");
        println!("  /help     - Show all commands");
        println!("  /new      - Start a new chat");
        println!("  /chats    - List saved chats");
        println!("  /quit     - Exit chat");
        println!();
    }

    /// Handle slash commands. Returns true if should exit.
    fn handle_command(&self, cmd: &str) -> bool {
        let mut parts = cmd.splitn(2, ' ');
        let head = parts.next().unwrap_or(cmd);
        let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

        match head {
            "/quit" | "/exit" | "/q" => {
                println!("Bye!");
                return true;
            }
            "/help" | "/h" | "/?" => {
                println!();
                println!("Commands:");
                println!("  /help, /h, /?    - Show this help");
                println!("  /new             - Save current chat and start a new one");
                println!("  /clear           - Clear the current chat's messages");
                println!("  /chats           - List saved chats");
                println!("  /load <id>       - Switch to a saved chat");
                println!("  /delete <id>     - Delete a saved chat");
                println!("  /stats           - Show chat statistics");
                println!("  /model           - Show the current model");
                println!("  /export          - Export the current chat to a JSON file");
                println!("  /export-all      - Export every chat to a JSON file");
                println!("  /import <path>   - Import a previously exported chat");
                println!("  /quit, /exit, /q - Exit chat");
                println!();
            }
            "/new" => {
                let id = self.controller.new_chat();
                println!("Started {}", id);
            }
            "/clear" => {
                self.controller.clear_chat();
                println!("Cleared current chat");
            }
            "/chats" => {
                println!();
                println!(
                    "{}",
                    ConsoleFormatter::format_listing(
                        &self.controller.list_sessions(),
                        &self.controller.active_session_id(),
                    )
                );
                println!();
            }
            "/load" => match arg {
                Some(id) => match self.controller.load_chat(&SessionId::new(id)) {
                    Ok(()) => {
                        println!();
                        println!(
                            "{}",
                            ConsoleFormatter::format_transcript(&self.controller.messages())
                        );
                        println!();
                    }
                    Err(e) => eprintln!("Error: {}", e),
                },
                None => println!("Usage: /load <id>"),
            },
            "/delete" => match arg {
                Some(id) => {
                    self.controller.delete_chat(&SessionId::new(id));
                    println!("Deleted {}", id);
                }
                None => println!("Usage: /delete <id>"),
            },
            "/stats" => {
                println!();
                println!("{}", ConsoleFormatter::format_stats(&self.controller.stats()));
                println!();
            }
            "/model" => {
                println!("Current model: {}", self.controller.active_model());
            }
            "/export" => match self.controller.export_active() {
                Some(json) => self.write_export("parley-chat", &json),
                None => println!("Nothing to export yet"),
            },
            "/export-all" => match self.controller.export_all() {
                Some(json) => self.write_export("parley-chats", &json),
                None => println!("Nothing to export yet"),
            },
            "/import" => match arg {
                Some(path) => self.import_export(path),
                None => println!("Usage: /import <path>"),
            },
            _ => {
                println!("Unknown command: {}", cmd);
                println!("Type /help for available commands");
            }
        }
        false
    }

    fn write_export(&self, prefix: &str, json: &str) {
        let filename = format!(
            "{}-{}.json",
            prefix,
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        );
        match std::fs::write(&filename, json) {
            Ok(()) => println!("Exported to {}", filename.bold()),
            Err(e) => eprintln!("Error: could not write {}: {}", filename, e),
        }
    }

    fn import_export(&self, path: &str) {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: could not read {}: {}", path, e);
                return;
            }
        };
        let export: SessionExport = match serde_json::from_str(&content) {
            Ok(e) => e,
            Err(e) => {
                eprintln!("Error: {} is not a chat export: {}", path, e);
                return;
            }
        };
        match self.controller.import_session(export) {
            Ok(id) => println!("Imported as {} (use /load {} to open it)", id, id),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    async fn process_prompt(&self, prompt: &str) {
        println!();

        let result = if self.stream_replies {
            self.stream_reply(prompt).await
        } else {
            let progress = self
                .show_progress
                .then(|| ProgressReporter::start("Thinking..."));
            let result = self.controller.submit_prompt(prompt).await;
            if let Some(progress) = progress {
                progress.finish();
            }
            result.map(|reply| {
                println!("{}: {}", "Assistant".bold().green(), reply);
            })
        };

        match result {
            Ok(()) => {}
            Err(SubmitError::Concurrent) => {
                eprintln!("A reply is already being generated, please wait");
            }
            Err(SubmitError::EmptyPrompt) => {
                debug!("Empty prompt ignored");
            }
        }
        println!();
    }

    /// Print the reply as it grows; each snapshot is the full text so far.
    async fn stream_reply(&self, prompt: &str) -> Result<(), SubmitError> {
        print!("{}: ", "Assistant".bold().green());
        let _ = std::io::stdout().flush();

        let mut printed = String::new();
        self.controller
            .submit_prompt_streaming(prompt, |snapshot| {
                if let Some(suffix) = snapshot.strip_prefix(printed.as_str()) {
                    print!("{suffix}");
                } else {
                    // A standalone element (e.g. a failure advisory) replaces
                    // the accumulated text rather than extending it
                    if !printed.is_empty() {
                        println!();
                    }
                    print!("{snapshot}");
                }
                let _ = std::io::stdout().flush();
                printed = snapshot.to_string();
            })
            .await?;

        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_history_path_wins() {
        let configured = PathBuf::from("/tmp/parley-history");
        let resolved = resolve_history_path(Some(&configured));
        assert_eq!(resolved, Some(configured));
    }

    #[test]
    fn default_history_path_lives_under_the_data_dir() {
        let resolved = resolve_history_path(None);
        if let Some(path) = resolved {
            assert!(path.ends_with("parley/history.txt"));
        }
    }
}
