//! Connector configuration.

/// Configuration for opening a connector.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of callers allowed to wait on the connector lock.
    ///
    /// An acquisition beyond this fails with `LockQueueFull`.
    pub lock_queue_capacity: usize,

    /// Rows copied per batch while migrating a table.
    pub migration_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_queue_capacity: 1000,
            migration_batch_size: 1000,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lock queue capacity.
    #[must_use]
    pub const fn lock_queue_capacity(mut self, capacity: usize) -> Self {
        self.lock_queue_capacity = capacity;
        self
    }

    /// Sets the migration batch size. Zero is treated as one.
    #[must_use]
    pub const fn migration_batch_size(mut self, size: usize) -> Self {
        self.migration_batch_size = if size == 0 { 1 } else { size };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.lock_queue_capacity, 1000);
        assert_eq!(config.migration_batch_size, 1000);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .lock_queue_capacity(4)
            .migration_batch_size(0);

        assert_eq!(config.lock_queue_capacity, 4);
        assert_eq!(config.migration_batch_size, 1);
    }
}
