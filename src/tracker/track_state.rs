use serde::Serialize;

/// Lifecycle of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SessionState {
    /// Nothing to track yet; steps only cache the incoming frame.
    #[default]
    Unseeded,
    /// Seeded with a box (TLD) or a live point set (Lucas-Kanade).
    Tracking,
}
