//! Console formatting for messages, listings, and stats

use colored::Colorize;
use parley_domain::{ChatStats, Message, Role, SessionId, SessionSummary};

/// Formats chat data for terminal display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a single message with a colored role label.
    pub fn format_message(message: &Message) -> String {
        let label = match message.role {
            Role::User => "You".bold().cyan(),
            Role::Assistant => "Assistant".bold().green(),
        };
        format!("{}: {}", label, message.content)
    }

    /// Format a whole transcript, one message per block.
    pub fn format_transcript(messages: &[Message]) -> String {
        if messages.is_empty() {
            return "No messages yet. Type a prompt to get started.".dimmed().to_string();
        }
        messages
            .iter()
            .map(Self::format_message)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// One listing entry per session: a header line with a marker on the
    /// active one, and the first-message preview dimmed underneath.
    pub fn format_session_line(summary: &SessionSummary, active: bool) -> String {
        let marker = if active { "*" } else { " " };
        format!(
            "{} {}  {}  {}  ({} messages, {})\n      {}",
            marker,
            summary.id.to_string().bold(),
            summary.title.cyan(),
            summary.last_updated.format("%Y-%m-%d %H:%M"),
            summary.message_count,
            summary.model,
            summary.preview.dimmed(),
        )
    }

    pub fn format_listing(summaries: &[SessionSummary], active_id: &SessionId) -> String {
        if summaries.is_empty() {
            return "No previous chats".dimmed().to_string();
        }
        summaries
            .iter()
            .map(|s| Self::format_session_line(s, &s.id == active_id))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn format_stats(stats: &ChatStats) -> String {
        format!(
            "{}\n  Current chat:  {} messages ({} from you, {} replies)\n  Saved chats:   {}\n  All messages:  {}",
            "Chat statistics".bold(),
            stats.active_messages,
            stats.active_user_messages,
            stats.active_assistant_messages,
            stats.total_chats,
            stats.total_messages,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parley_domain::ModelId;

    fn summary(id: &str, title: &str) -> SessionSummary {
        SessionSummary {
            id: SessionId::new(id),
            title: title.to_string(),
            preview: title.to_string(),
            model: ModelId::default(),
            created_at: Utc::now(),
            last_updated: Utc::now(),
            message_count: 2,
        }
    }

    #[test]
    fn message_format_contains_role_and_content() {
        colored::control::set_override(false);
        let line = ConsoleFormatter::format_message(&Message::user("hello"));
        assert_eq!(line, "You: hello");
    }

    #[test]
    fn empty_listing_has_placeholder() {
        colored::control::set_override(false);
        let out = ConsoleFormatter::format_listing(&[], &SessionId::new("chat-1"));
        assert!(out.contains("No previous chats"));
    }

    #[test]
    fn active_session_is_marked() {
        colored::control::set_override(false);
        let active = SessionId::new("chat-2");
        let out = ConsoleFormatter::format_listing(
            &[summary("chat-1", "First"), summary("chat-2", "Second")],
            &active,
        );
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("  chat-1"));
        assert!(lines[2].starts_with("* chat-2"));
    }

    #[test]
    fn listing_entry_shows_the_preview() {
        colored::control::set_override(false);
        let mut entry = summary("chat-1", "Borrow checker");
        entry.preview = "Why does this borrow fail?...".to_string();
        let out = ConsoleFormatter::format_session_line(&entry, false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].trim(), "Why does this borrow fail?...");
    }

    #[test]
    fn stats_include_counters() {
        colored::control::set_override(false);
        let out = ConsoleFormatter::format_stats(&ChatStats {
            active_messages: 4,
            active_user_messages: 2,
            active_assistant_messages: 2,
            total_chats: 3,
            total_messages: 10,
        });
        assert!(out.contains("4 messages"));
        assert!(out.contains("Saved chats:   3"));
        assert!(out.contains("All messages:  10"));
    }
}
