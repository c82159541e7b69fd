//! Pure validation of status transitions along the hiring pipeline.

use super::domain::Stage;

/// Directed adjacency table over the pipeline: single-step forward moves
/// plus rejection from any non-terminal stage. Terminal stages have no
/// outgoing edges.
pub const fn allowed_targets(from: Stage) -> &'static [Stage] {
    match from {
        Stage::Applied => &[Stage::PhoneScreen, Stage::Rejected],
        Stage::PhoneScreen => &[Stage::Onsite, Stage::Rejected],
        Stage::Onsite => &[Stage::Offer, Stage::Rejected],
        Stage::Offer => &[Stage::Hired, Stage::Rejected],
        Stage::Hired | Stage::Rejected => &[],
    }
}

/// Decides whether `from -> to` is a legal move. Pure; the engine owns
/// logging, history, and audit around the decision.
pub fn is_transition_allowed(from: Stage, to: Stage) -> bool {
    allowed_targets(from).contains(&to)
}
