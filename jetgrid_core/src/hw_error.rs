//! Maps `Box<dyn Error>` from the `Transport` boundary to typed `GenError`.
//!
//! With the `hardware-errors` feature, `jetgrid_hardware::error::HwError`
//! is downcast for precise mapping; otherwise the message is inspected.

use crate::error::GenError;

/// Map a trait-boundary error to a typed `GenError`.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> GenError {
    #[cfg(feature = "hardware-errors")]
    {
        use jetgrid_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => GenError::Timeout,
                other => GenError::Transport(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        GenError::Timeout
    } else {
        GenError::Transport(s)
    }
}
