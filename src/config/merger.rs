//! Configuration merging functionality

use crate::config::RelayConfig;

/// Trait for merging configurations
pub trait ConfigMerger {
    /// Merge another configuration into this one
    ///
    /// Values from `other` override values in `self` when they differ from
    /// the defaults. This is how a higher-priority source wins over a lower one.
    /// A value in `other` that equals its default cannot override, even when
    /// it was set on purpose.
    fn merge(&self, other: impl AsRef<Self>) -> Self where Self: Sized;
}

impl ConfigMerger for RelayConfig {
    fn merge(&self, other: impl AsRef<Self>) -> Self {
        let other = other.as_ref();
        let default = Self::default();

        fn merge_field<T: Clone + PartialEq>(self_val: &T, other_val: &T, default_val: &T) -> T {
            if other_val != default_val {
                other_val.clone()
            } else {
                self_val.clone()
            }
        }

        Self {
            listen: merge_field(&self.listen, &other.listen, &default.listen),
            target: merge_field(&self.target, &other.target, &default.target),
            log_level: merge_field(&self.log_level, &other.log_level, &default.log_level),
            buffer_size: merge_field(&self.buffer_size, &other.buffer_size, &default.buffer_size),
            max_idle_buffers: merge_field(&self.max_idle_buffers, &other.max_idle_buffers, &default.max_idle_buffers),
            connect_timeout_ms: merge_field(&self.connect_timeout_ms, &other.connect_timeout_ms, &default.connect_timeout_ms),
            backoff_initial_ms: merge_field(&self.backoff_initial_ms, &other.backoff_initial_ms, &default.backoff_initial_ms),
            backoff_max_ms: merge_field(&self.backoff_max_ms, &other.backoff_max_ms, &default.backoff_max_ms),
            linger_ms: merge_field(&self.linger_ms, &other.linger_ms, &default.linger_ms),
            drain_timeout_ms: merge_field(&self.drain_timeout_ms, &other.drain_timeout_ms, &default.drain_timeout_ms),
            drain_poll_interval_ms: merge_field(&self.drain_poll_interval_ms, &other.drain_poll_interval_ms, &default.drain_poll_interval_ms),
        }
    }
}
