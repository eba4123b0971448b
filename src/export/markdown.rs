use chrono::SecondsFormat;

use crate::conversation::Conversation;

use super::speaker;

/// Heading, creation line, then one bold-labelled paragraph per message
pub fn to_markdown(conversation: &Conversation) -> String {
    let mut out = format!("# {}\n\n", conversation.title);
    out.push_str(&format!(
        "**Created:** {}\n\n",
        conversation
            .created_at
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    ));

    for msg in &conversation.messages {
        out.push_str(&format!("**{}**: {}\n\n", speaker(msg.role), msg.content));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::conversation::{ConversationType, Message};

    #[test]
    fn test_markdown_layout() {
        let conv = Conversation::new(
            3,
            "Borrow checker",
            vec![
                Message::user("Why won't this compile?"),
                Message::assistant("You hold two mutable borrows.\nDrop one first."),
            ],
            ConversationType::Technical,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        );

        let expected = "# Borrow checker\n\n\
                        **Created:** 2024-05-01T12:30:00Z\n\n\
                        **You**: Why won't this compile?\n\n\
                        **AI Assistant**: You hold two mutable borrows.\nDrop one first.\n\n";
        assert_eq!(to_markdown(&conv), expected);
    }

    #[test]
    fn test_empty_conversation() {
        let conv = Conversation::new(
            1,
            "Empty",
            Vec::new(),
            ConversationType::General,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
        assert_eq!(to_markdown(&conv), "# Empty\n\n**Created:** 2024-01-01T00:00:00Z\n\n");
    }
}
