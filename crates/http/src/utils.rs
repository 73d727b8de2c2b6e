//! Small helpers shared by the delivery modules.

/// Byte size units.
pub mod units {
    pub const KB: usize = 1024;
    pub const MB: usize = 1024 * KB;
    pub const GB: usize = 1024 * MB;
}
