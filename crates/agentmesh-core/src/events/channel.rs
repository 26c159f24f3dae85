//! Text commands accepted on a subscriber's inbound channel.

use super::HubEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCommand {
    Ping,
    /// `execute:<workflow name>`
    Execute(String),
    Other(String),
}

impl ChannelCommand {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed == "ping" {
            return Self::Ping;
        }
        match trimmed.strip_prefix("execute:") {
            Some(name) if !name.trim().is_empty() => Self::Execute(name.trim().to_string()),
            _ => Self::Other(text.to_string()),
        }
    }
}

/// What goes back to the subscriber that sent a command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelReply {
    Text(String),
    Event(HubEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ChannelCommand::parse("ping"), ChannelCommand::Ping);
        assert_eq!(
            ChannelCommand::parse("execute:fraud_detection"),
            ChannelCommand::Execute("fraud_detection".to_string())
        );
        assert_eq!(
            ChannelCommand::parse("execute:"),
            ChannelCommand::Other("execute:".to_string())
        );
        assert_eq!(
            ChannelCommand::parse("hello"),
            ChannelCommand::Other("hello".to_string())
        );
    }
}
