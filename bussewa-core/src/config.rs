use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SeatingConfig {
    /// Capacity assumed for a bus whose record carries none.
    #[serde(default = "default_capacity")]
    pub default_capacity: u32,
    /// Seats per priority block; seniors draw from the first block,
    /// the 50-64 group from the second.
    #[serde(default = "default_block_size")]
    pub priority_seat_block_size: u32,
    /// Parallel assignment calls during auto-assign.
    #[serde(default = "default_concurrency")]
    pub auto_assign_concurrency: usize,
}

fn default_capacity() -> u32 { 42 }
fn default_block_size() -> u32 { 8 }
fn default_concurrency() -> usize { 1 }

impl Default for SeatingConfig {
    fn default() -> Self {
        Self {
            default_capacity: default_capacity(),
            priority_seat_block_size: default_block_size(),
            auto_assign_concurrency: default_concurrency(),
        }
    }
}

impl SeatingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.default_capacity == 0 {
            return Err("seating.default_capacity must be positive".to_string());
        }
        if self.priority_seat_block_size == 0 {
            return Err("seating.priority_seat_block_size must be positive".to_string());
        }
        if self.auto_assign_concurrency == 0 {
            return Err("seating.auto_assign_concurrency must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Backoff for transient store failures
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_retries() -> usize { 3 }
fn default_initial_delay_ms() -> u64 { 100 }
fn default_max_delay_ms() -> u64 { 2_000 }
fn default_multiplier() -> f64 { 2.0 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}
