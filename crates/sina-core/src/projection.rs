//! Projection of interaction records into model chat messages.

use autoagents_llm::chat::{ChatMessage, ChatRole, MessageType};
use sina_history::{InteractionRecord, Role};

/// Map each record to one chat message, preserving order and content.
pub fn project(records: &[InteractionRecord]) -> Vec<ChatMessage> {
    records
        .iter()
        .map(|record| ChatMessage {
            role: chat_role(record.role),
            message_type: MessageType::Text,
            content: record.content.clone(),
        })
        .collect()
}

/// Most recent `limit` records; everything when `limit` is `None`.
pub fn window(records: &[InteractionRecord], limit: Option<usize>) -> &[InteractionRecord] {
    match limit {
        Some(limit) => &records[records.len().saturating_sub(limit)..],
        None => records,
    }
}

fn chat_role(role: Role) -> ChatRole {
    match role {
        Role::User => ChatRole::User,
        Role::Assistant => ChatRole::Assistant,
        Role::System => ChatRole::System,
    }
}

#[cfg(test)]
mod tests {
    use super::{project, window};
    use autoagents_llm::chat::{ChatRole, MessageType};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use sina_history::{InteractionRecord, Role};

    fn records() -> Vec<InteractionRecord> {
        vec![
            InteractionRecord::new(Role::User, "list files", Utc::now()),
            InteractionRecord::new(Role::Assistant, "ls -la", Utc::now()),
            InteractionRecord::new(Role::System, "stdout:\na\n", Utc::now()),
            InteractionRecord::new(Role::User, "  spaced  ", Utc::now()),
        ]
    }

    #[test]
    fn projects_roles_in_order_with_verbatim_content() {
        let records = records();
        let messages = project(&records);
        assert_eq!(messages.len(), records.len());
        let roles = messages
            .iter()
            .map(|message| message.role.clone())
            .collect::<Vec<_>>();
        assert_eq!(
            roles,
            vec![
                ChatRole::User,
                ChatRole::Assistant,
                ChatRole::System,
                ChatRole::User
            ]
        );
        for (message, record) in messages.iter().zip(&records) {
            assert_eq!(message.content, record.content);
            assert!(matches!(message.message_type, MessageType::Text));
        }
    }

    #[test]
    fn empty_history_projects_to_nothing() {
        assert!(project(&[]).is_empty());
    }

    #[test]
    fn window_keeps_most_recent_records() {
        let records = records();
        assert_eq!(window(&records, None).len(), 4);
        let tail = window(&records, Some(2));
        assert_eq!(tail[0].content, "stdout:\na\n");
        assert_eq!(tail[1].content, "  spaced  ");
        assert_eq!(window(&records, Some(10)).len(), 4);
        assert!(window(&records, Some(0)).is_empty());
    }
}
