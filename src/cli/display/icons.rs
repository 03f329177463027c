//! Status icons for CLI output

/// Status icons for different states
pub struct StatusIcon;

impl StatusIcon {
    /// Success icon (all nodes ready, provisioning succeeded)
    pub const SUCCESS: &'static str = "✓";

    /// Warning icon (partially ready)
    pub const WARNING: &'static str = "⚠";

    /// Error icon (nothing ready, provisioning failed)
    pub const ERROR: &'static str = "✗";

    /// Pending icon (provisioning in progress)
    pub const PENDING: &'static str = "⏳";

    /// Unknown icon
    pub const UNKNOWN: &'static str = "?";

    /// Get status icon based on ready/total nodes
    pub fn get_replica_icon(ready: u32, total: u32) -> &'static str {
        if total == 0 {
            Self::UNKNOWN
        } else if ready == total {
            Self::SUCCESS
        } else if ready > 0 {
            Self::WARNING
        } else {
            Self::ERROR
        }
    }

    /// Get status text based on ready/total nodes
    pub fn get_status_text(ready: u32, total: u32) -> &'static str {
        if total == 0 {
            "Unknown"
        } else if ready == total {
            "Ready"
        } else if ready > 0 {
            "Degraded"
        } else {
            "NotReady"
        }
    }

    /// Get icon for an ARM provisioning state
    pub fn get_provisioning_icon(state: Option<&str>) -> &'static str {
        match state {
            Some("Succeeded") => Self::SUCCESS,
            Some("Failed") | Some("Canceled") => Self::ERROR,
            Some(_) => Self::PENDING,
            None => Self::UNKNOWN,
        }
    }
}
