use std::time::{SystemTime, UNIX_EPOCH};

/// Get the elapsed system time since the Unix Epoch in milliseconds.
pub fn get_epoch_time_in_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("SystemTime before UNIX EPOCH")
        .as_millis() as u64
}
