use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpmiConfig {
    // status polls before a missing reply word becomes a timeout
    pub rx_poll_attempts: u32,
    // pause between two empty status polls, 0 polls back to back
    pub rx_poll_interval_us: u32,
}

impl Default for SpmiConfig {
    fn default() -> Self {
        Self {
            rx_poll_attempts: 1000,
            rx_poll_interval_us: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct HpmConfig {
    // select/confirm rounds after the wakeup command, the chip needs a
    // variable amount of time to settle after power-up
    pub wakeup_attempts: u32,
    // pause after each failed wakeup round, 0 retries back to back
    #[serde(default)]
    pub wakeup_interval_us: u32,
    // reads of the command register before giving up on completion
    pub command_poll_attempts: u32,
    // warn when a register reports a size other than the reference table
    pub check_size_table: bool,
}

impl Default for HpmConfig {
    fn default() -> Self {
        Self {
            wakeup_attempts: 10,
            wakeup_interval_us: 0,
            command_poll_attempts: 1000,
            check_size_table: true,
        }
    }
}
