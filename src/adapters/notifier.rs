//! Alert Notifier Adapters
//!
//! Implements the `AlertNotifier` port.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::warn;

use crate::domain::ports::AlertNotifier;
use crate::error::Result;

/// Notifier that writes alerts to the tracing system.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier {
    channel: Option<String>,
}

impl LoggingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every alert with a channel name.
    pub fn with_channel(channel: impl Into<String>) -> Self {
        Self {
            channel: Some(channel.into()),
        }
    }
}

#[async_trait]
impl AlertNotifier for LoggingNotifier {
    async fn notify(&self, message: String) -> Result<()> {
        match &self.channel {
            Some(channel) => warn!(channel = %channel, alert = %message, "Alert raised"),
            None => warn!(alert = %message, "Alert raised"),
        }
        Ok(())
    }
}

/// In-memory alert collector for testing.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    messages: RwLock<Vec<String>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All delivered messages, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages.read().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    pub fn clear(&self) {
        self.messages.write().clear();
    }
}

#[async_trait]
impl AlertNotifier for InMemoryNotifier {
    async fn notify(&self, message: String) -> Result<()> {
        self.messages.write().push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_notifier() {
        tokio_test::block_on(async {
            LoggingNotifier::new().notify("down".into()).await.unwrap();
            LoggingNotifier::with_channel("ops")
                .notify("down".into())
                .await
                .unwrap();
        });
    }

    #[tokio::test]
    async fn test_in_memory_notifier() {
        let notifier = InMemoryNotifier::new();
        assert!(notifier.is_empty());

        notifier.notify("first".into()).await.unwrap();
        notifier.notify("second".into()).await.unwrap();

        assert_eq!(notifier.len(), 2);
        assert_eq!(notifier.messages(), vec!["first", "second"]);

        notifier.clear();
        assert!(notifier.is_empty());
    }
}
