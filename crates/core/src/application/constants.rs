// Application constants (no magic values)
use std::time::Duration;

/// How long the list controller keeps its store subscription alive after
/// the last observer detaches (5s)
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);
