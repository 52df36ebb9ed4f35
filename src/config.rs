//! Session configuration.

/// Default capacity of a session's command queue.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Limits for a server session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of connected participants, or `None` for no limit.
    pub max_participants: Option<usize>,
    /// How many commands may queue up in front of a session task before
    /// senders wait.
    pub mailbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        return Config {
            max_participants: None,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        };
    }
}

impl Config {
    pub fn new() -> Config {
        return Config::default();
    }

    pub fn max_participants(mut self, max: usize) -> Config {
        self.max_participants = Some(max);
        return self;
    }

    /// Set the command queue capacity. Zero is bumped to one, since a
    /// bounded channel needs room for at least one command.
    pub fn mailbox_capacity(mut self, capacity: usize) -> Config {
        self.mailbox_capacity = capacity.max(1);
        return self;
    }
}
