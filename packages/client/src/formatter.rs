//! Message formatting utilities for client display.

use chrono::{DateTime, Local, Utc};
use parlor_server::infrastructure::dto::websocket::{
    ChatMessagePayload, MessageKindDto, ServerMessage, UserInfo,
};
use parlor_shared::time::rfc3339_to_timestamp;

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format any relay event
    ///
    /// # Arguments
    ///
    /// * `message` - The decoded relay event
    /// * `me` - The current user's display name (to mark as "me")
    pub fn format(message: &ServerMessage, me: &str) -> String {
        match message {
            ServerMessage::Welcome(payload) => {
                Self::format_welcome(&payload.message, &payload.users, me)
            }
            ServerMessage::History(payload) => Self::format_history(&payload.messages, me),
            ServerMessage::UserJoined(payload) => {
                format!(
                    "\n+ {} ({})\n",
                    payload.message,
                    format_clock(&payload.timestamp)
                )
            }
            ServerMessage::UserLeft(payload) => {
                format!(
                    "\n- {} ({})\n",
                    payload.message,
                    format_clock(&payload.timestamp)
                )
            }
            ServerMessage::UserList(payload) => Self::format_user_list(&payload.users, me),
            ServerMessage::NewMessage(payload) => {
                format!("\n{}\n", Self::format_chat_line(payload, me))
            }
            ServerMessage::Error(payload) => format!("\n! {}\n", payload.message),
        }
    }

    /// Format the welcome banner with the presence list
    pub fn format_welcome(message: &str, users: &[UserInfo], me: &str) -> String {
        let mut output = String::new();
        output.push_str("\n\n");
        output.push_str(RULE);
        output.push('\n');
        output.push_str(message);
        output.push('\n');
        output.push_str(&Self::format_users(users, me));
        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format the backfilled history, oldest first
    pub fn format_history(messages: &[ChatMessagePayload], me: &str) -> String {
        if messages.is_empty() {
            return "\n(No earlier messages)\n".to_string();
        }

        let mut output = String::from("\n--- recent messages ---\n");
        for message in messages {
            output.push_str(&Self::format_chat_line(message, me));
            output.push('\n');
        }
        output.push_str("--- end of history ---\n");
        output
    }

    /// Format a presence list refresh
    pub fn format_user_list(users: &[UserInfo], me: &str) -> String {
        format!("\n{}", Self::format_users(users, me))
    }

    /// Format a single chat or system message
    pub fn format_chat_line(message: &ChatMessagePayload, me: &str) -> String {
        let time = format_clock(&message.timestamp);
        match message.r#type {
            MessageKindDto::System => format!("[{}] * {}", time, message.text),
            MessageKindDto::User => {
                let me_suffix = if message.username == me { " (me)" } else { "" };
                format!("[{}] @{}{}: {}", time, message.username, me_suffix, message.text)
            }
        }
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }

    fn format_users(users: &[UserInfo], me: &str) -> String {
        let online: Vec<&UserInfo> = users.iter().filter(|user| user.online).collect();
        if online.is_empty() {
            return "Online: (nobody)\n".to_string();
        }

        let names: Vec<String> = online
            .iter()
            .map(|user| {
                if user.username == me {
                    format!("{} (me)", user.username)
                } else {
                    user.username.clone()
                }
            })
            .collect();
        format!("Online ({}): {}\n", names.len(), names.join(", "))
    }
}

/// Render an RFC 3339 timestamp as local wall-clock time, or echo it back if unparsable
fn format_clock(timestamp: &str) -> String {
    rfc3339_to_timestamp(timestamp)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|utc| utc.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_server::infrastructure::dto::websocket::{
        ErrorPayload, UserJoinedPayload, UserListPayload,
    };

    fn user(username: &str, online: bool) -> UserInfo {
        UserInfo {
            username: username.to_string(),
            online,
        }
    }

    fn chat(username: &str, text: &str, kind: MessageKindDto) -> ChatMessagePayload {
        ChatMessagePayload {
            id: "1".to_string(),
            user_id: "u1".to_string(),
            username: username.to_string(),
            text: text.to_string(),
            r#type: kind,
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_format_welcome_marks_me_and_skips_offline_users() {
        // テスト項目: welcome ではオンラインのユーザーだけが表示され、自分にはマークが付く
        // given (前提条件):
        let users = vec![
            user("Alice", true),
            user("Bob", false),
            user("Carol", true),
        ];

        // when (操作):
        let result =
            MessageFormatter::format_welcome("Welcome to the chat, Alice!", &users, "Alice");

        // then (期待する結果):
        assert!(result.contains("Welcome to the chat, Alice!"));
        assert!(result.contains("Online (2): Alice (me), Carol"));
        assert!(!result.contains("Bob"));
    }

    #[test]
    fn test_format_empty_history() {
        // テスト項目: 履歴が空の場合、その旨が表示される
        // given (前提条件):
        let messages = vec![];

        // when (操作):
        let result = MessageFormatter::format_history(&messages, "Alice");

        // then (期待する結果):
        assert!(result.contains("(No earlier messages)"));
    }

    #[test]
    fn test_format_history_distinguishes_system_messages() {
        // テスト項目: 履歴中のシステムメッセージとユーザーメッセージが区別して表示される
        // given (前提条件):
        let messages = vec![
            chat("Bob", "Bob joined the chat", MessageKindDto::System),
            chat("Bob", "hello", MessageKindDto::User),
        ];

        // when (操作):
        let result = MessageFormatter::format_history(&messages, "Alice");

        // then (期待する結果):
        assert!(result.contains("* Bob joined the chat"));
        assert!(result.contains("@Bob: hello"));
    }

    #[test]
    fn test_format_own_message_is_marked() {
        // テスト項目: 自分のメッセージには (me) が付く
        // given (前提条件):
        let message = ServerMessage::NewMessage(chat("Alice", "hi", MessageKindDto::User));

        // when (操作):
        let result = MessageFormatter::format(&message, "Alice");

        // then (期待する結果):
        assert!(result.contains("@Alice (me): hi"));
    }

    #[test]
    fn test_format_user_joined() {
        // テスト項目: userJoined は + 付きで表示される
        // given (前提条件):
        let message = ServerMessage::UserJoined(UserJoinedPayload {
            username: "Bob".to_string(),
            message: "Bob joined the chat".to_string(),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            users: vec![user("Bob", true)],
        });

        // when (操作):
        let result = MessageFormatter::format(&message, "Alice");

        // then (期待する結果):
        assert!(result.contains("+ Bob joined the chat"));
    }

    #[test]
    fn test_format_user_list_with_nobody_online() {
        // テスト項目: オンラインのユーザーがいない場合、その旨が表示される
        // given (前提条件):
        let message = ServerMessage::UserList(UserListPayload {
            users: vec![user("Bob", false)],
        });

        // when (操作):
        let result = MessageFormatter::format(&message, "Alice");

        // then (期待する結果):
        assert!(result.contains("Online: (nobody)"));
    }

    #[test]
    fn test_format_error() {
        // テスト項目: エラーイベントは ! 付きで表示される
        // given (前提条件):
        let message = ServerMessage::Error(ErrorPayload {
            message: "join the chat before sending messages".to_string(),
        });

        // when (操作):
        let result = MessageFormatter::format(&message, "Alice");

        // then (期待する結果):
        assert_eq!(result, "\n! join the chat before sending messages\n");
    }

    #[test]
    fn test_unparsable_timestamp_is_shown_as_is() {
        // テスト項目: 解析できないタイムスタンプはそのまま表示される
        // given (前提条件):
        let timestamp = "yesterday";

        // when (操作):
        let result = format_clock(timestamp);

        // then (期待する結果):
        assert_eq!(result, "yesterday");
    }
}
