//! Suite configuration contracts shared by the loader, the suite and the CLI.
//!
//! Every section defaults to the values the conformance scenarios are
//! specified with; a config file only needs the keys it overrides.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Suite configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SuiteConfig {
    /// Bounded waits
    #[validate(nested)]
    pub timeouts: TimeoutConfig,

    /// Streaming scenarios
    #[validate(nested)]
    pub streaming: StreamingConfig,

    /// Sampling period hot switch scenarios
    #[validate(nested)]
    pub hot_switch: HotSwitchConfig,

    /// Batching scenarios
    #[validate(nested)]
    pub batching: BatchingConfig,

    /// Direct report scenarios
    #[validate(nested)]
    pub direct_report: DirectReportConfig,

    /// No-stale-events scenario
    #[validate(nested)]
    pub staleness: StalenessConfig,

    /// Data injection scenario
    pub injection: InjectionConfig,

    /// Event queue between HAL and suite
    #[validate(nested)]
    pub session: SessionConfig,

    /// Scenario selection
    pub filter: FilterConfig,
}

/// Bounded wait configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Wait for flush-completion markers
    #[validate(range(min = 1))]
    pub flush_wait_ms: u64,

    /// Base wait for the first event after activation
    #[validate(range(min = 1))]
    pub first_event_ms: u64,

    /// Collection window of the re-initialization scenario
    #[validate(range(min = 1))]
    pub isolation_collection_ms: u64,

    /// Delivery wait after the final flush of a batching scenario
    #[validate(range(min = 1))]
    pub batch_delivery_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            flush_wait_ms: 1000,
            first_event_ms: 500,
            isolation_collection_ms: 1000,
            batch_delivery_ms: 1000,
        }
    }
}

impl TimeoutConfig {
    pub fn flush_wait(&self) -> Duration {
        Duration::from_millis(self.flush_wait_ms)
    }

    pub fn first_event(&self) -> Duration {
        Duration::from_millis(self.first_event_ms)
    }

    pub fn isolation_collection(&self) -> Duration {
        Duration::from_millis(self.isolation_collection_ms)
    }

    pub fn batch_delivery(&self) -> Duration {
        Duration::from_millis(self.batch_delivery_ms)
    }
}

/// Streaming configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StreamingConfig {
    /// Collection duration per streaming scenario
    #[validate(range(min = 10))]
    pub duration_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self { duration_ms: 5000 }
    }
}

impl StreamingConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Sampling period hot switch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HotSwitchConfig {
    /// Pause after each `batch` call before collecting
    pub settle_ms: u64,

    /// Events collected per sampling period (at least 3 for an average interval)
    #[validate(range(min = 3))]
    pub sample_count: u32,
}

impl Default for HotSwitchConfig {
    fn default() -> Self {
        Self {
            settle_ms: 500,
            sample_count: 50,
        }
    }
}

/// Batching configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BatchingConfig {
    /// Pause after activation before the first flush
    pub init_ms: u64,

    /// Upper bound on the batching period derived from the reserved FIFO
    #[validate(range(min = 1000))]
    pub max_period_ms: u64,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            init_ms: 500,
            max_period_ms: 5000,
        }
    }
}

/// Direct report configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DirectReportConfig {
    /// Nominal measurement window
    #[validate(range(min = 100))]
    pub nominal_test_ms: u64,

    /// Extra time allowed for channel start-up
    pub init_slack_ms: u64,

    /// Records in the shared memory ring
    #[validate(range(min = 16))]
    pub ring_capacity: usize,
}

impl Default for DirectReportConfig {
    fn default() -> Self {
        Self {
            nominal_test_ms: 1000,
            init_slack_ms: 500,
            ring_capacity: 4096,
        }
    }
}

/// No-stale-events configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StalenessConfig {
    /// Base quiescent interval between deactivation and reactivation
    #[validate(range(min = 1))]
    pub quiescent_ms: u64,

    /// Minimum timestamp gap accepted across the quiescent interval
    #[validate(range(min = 1))]
    pub min_gap_ms: u64,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            quiescent_ms: 1000,
            min_gap_ms: 500,
        }
    }
}

/// Data injection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionConfig {
    /// Pause before each injected event
    pub delay_ms: u64,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self { delay_ms: 100 }
    }
}

/// Event queue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SessionConfig {
    /// Pending event batches before the HAL writer blocks
    #[validate(range(min = 1))]
    pub queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
        }
    }
}

/// Scenario selection by name glob (`*` matches any run of characters).
///
/// Empty `include` selects everything; `exclude` wins over `include`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl FilterConfig {
    /// Whether scenario `name` is selected.
    pub fn selects(&self, name: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| glob_match(p, name));
        included && !self.exclude.iter().any(|p| glob_match(p, name))
    }
}

/// Minimal `*` glob.
fn glob_match(pattern: &str, name: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = name.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        // no `*` at all
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}
