mod ledger;
mod lk_session;
mod points;
mod rect;
mod result;
mod tld_session;
mod track_state;

pub use ledger::{HandleId, HandleKind, LedgerStats, LedgerViolation, Owned, ResourceLedger};
pub use lk_session::LkSession;
pub use points::{TrackSegment, TrackedPoint, make_grid};
pub use rect::{FrameSize, Rect};
pub use result::{DetectionCounts, LkResult, TldResult, TopCandidate, TrackResult};
pub use tld_session::TldSession;
pub use track_state::SessionState;
