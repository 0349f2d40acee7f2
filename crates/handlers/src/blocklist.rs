//! Senders the replying handlers ignore.

use dashmap::DashSet;

/// Set of blocked sender identifiers, shared between handlers.
///
/// Seeded from configuration and edited at runtime by `/block` and
/// `/unblock`.
#[derive(Debug, Default)]
pub struct Blocklist {
    senders: DashSet<String>,
}

impl Blocklist {
    pub fn new<I, S>(senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            senders: senders
                .into_iter()
                .map(Into::<String>::into)
                .filter(|s| !s.trim().is_empty())
                .collect(),
        }
    }

    /// Returns `false` if the sender was already blocked.
    pub fn block(&self, sender: &str) -> bool {
        self.senders.insert(sender.to_string())
    }

    /// Returns `false` if the sender was not blocked.
    pub fn unblock(&self, sender: &str) -> bool {
        self.senders.remove(sender).is_some()
    }

    pub fn contains(&self, sender: &str) -> bool {
        self.senders.contains(sender)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_from_config_and_edited() {
        let list = Blocklist::new(["spammer", "  "]);
        assert_eq!(list.len(), 1);
        assert!(list.contains("spammer"));

        assert!(list.block("bob"));
        assert!(!list.block("bob"));
        assert!(list.unblock("spammer"));
        assert!(!list.unblock("spammer"));
        assert!(!list.contains("spammer"));
        assert!(list.contains("bob"));
    }
}
