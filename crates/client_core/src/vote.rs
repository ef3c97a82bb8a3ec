use std::sync::Arc;

use shared::{
    domain::{PostId, Viewer, VoteDirection, VoteStatus},
    protocol::PostSummary,
};
use tokio::sync::{broadcast, Mutex};
use tracing::warn;

use crate::{ClientEvent, VoteError, VoteGateway, VoteIntent};

/// Next `(status, score)` pair for a vote action. Pure; the controller owns
/// every side effect.
///
/// Re-issuing the current direction cancels the vote. Any other request
/// first removes the existing vote's contribution (a no-op from the neutral
/// state), then applies the requested one.
pub fn apply_vote(
    current_status: VoteStatus,
    current_score: i64,
    direction: VoteDirection,
) -> (VoteStatus, i64) {
    if current_status == VoteStatus::from(direction) {
        return (VoteStatus::None, current_score - direction.value());
    }
    let without_existing = current_score - current_status.value();
    (direction.into(), without_existing + direction.value())
}

/// Wire value transmitted when a vote settles to neutral. Backends disagree
/// here: some expect a literal 0, others want the cancelled direction
/// re-sent and toggle server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnvoteEncoding {
    #[default]
    Zero,
    PriorDirection,
}

impl UnvoteEncoding {
    pub(crate) fn wire_value(self, settled: VoteStatus, direction: VoteDirection) -> i8 {
        match (self, settled) {
            (UnvoteEncoding::Zero, VoteStatus::None) => 0,
            _ => i8::from(direction),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct VoteSnapshot {
    score: i64,
    status: VoteStatus,
}

struct DisplayedVote {
    score: i64,
    status: VoteStatus,
}

/// Per-post shell around [`apply_vote`]: holds the displayed
/// `(score, status)` pair, guards on viewer identity, shows the optimistic
/// result before the gateway round-trip, and restores the pre-transition
/// snapshot when the gateway reports failure.
///
/// Instances are independent; nothing is shared between posts.
pub struct VoteController {
    post_id: PostId,
    viewer: Option<Viewer>,
    gateway: Arc<dyn VoteGateway>,
    unvote_encoding: UnvoteEncoding,
    displayed: Mutex<DisplayedVote>,
    events: broadcast::Sender<ClientEvent>,
}

impl VoteController {
    pub fn new(
        post_id: PostId,
        score: i64,
        status: VoteStatus,
        viewer: Option<Viewer>,
        gateway: Arc<dyn VoteGateway>,
        unvote_encoding: UnvoteEncoding,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            post_id,
            viewer,
            gateway,
            unvote_encoding,
            displayed: Mutex::new(DisplayedVote { score, status }),
            events,
        }
    }

    /// Builds a controller from a loader payload. A summary the backend sent
    /// without score or vote fields decodes to `(0, none)`, so a controller
    /// always starts from a well-defined pair.
    pub fn from_summary(
        post: &PostSummary,
        viewer: Option<Viewer>,
        gateway: Arc<dyn VoteGateway>,
        unvote_encoding: UnvoteEncoding,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self::new(
            post.post_id,
            post.score,
            post.viewer_vote,
            viewer,
            gateway,
            unvote_encoding,
            events,
        )
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub async fn displayed_score(&self) -> i64 {
        self.displayed.lock().await.score
    }

    pub async fn displayed_status(&self) -> VoteStatus {
        self.displayed.lock().await.status
    }

    /// Applies the optimistic result of `direction` to the displayed state,
    /// then confirms it with the gateway. The displayed pair is updated
    /// before the confirmation request is issued; a failed confirmation
    /// restores the snapshot captured at call time and surfaces the reason.
    pub async fn request_vote(&self, direction: VoteDirection) -> Result<(), VoteError> {
        let Some(viewer) = self.viewer.clone() else {
            let err = VoteError::Unauthenticated;
            self.notify_failure(&err);
            return Err(err);
        };

        // Snapshot the state as displayed right now, not any earlier
        // baseline: an overlapping request must roll back only its own step.
        let (snapshot, settled) = {
            let mut displayed = self.displayed.lock().await;
            let snapshot = VoteSnapshot {
                score: displayed.score,
                status: displayed.status,
            };
            let (status, score) = apply_vote(displayed.status, displayed.score, direction);
            displayed.status = status;
            displayed.score = score;
            let _ = self.events.send(ClientEvent::VoteStateChanged {
                post_id: self.post_id,
                score,
                status,
            });
            (snapshot, status)
        };

        let intent = VoteIntent {
            post_id: self.post_id,
            requester_id: viewer.user_id,
            vote_value: self.unvote_encoding.wire_value(settled, direction),
        };

        match self.gateway.submit_vote(intent).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.roll_back(snapshot, &err).await;
                Err(err)
            }
        }
    }

    async fn roll_back(&self, snapshot: VoteSnapshot, err: &VoteError) {
        {
            let mut displayed = self.displayed.lock().await;
            displayed.score = snapshot.score;
            displayed.status = snapshot.status;
        }
        warn!(
            post_id = self.post_id.0,
            restored_score = snapshot.score,
            "vote: confirmation failed, displayed state restored: {err}"
        );
        let _ = self.events.send(ClientEvent::VoteStateChanged {
            post_id: self.post_id,
            score: snapshot.score,
            status: snapshot.status,
        });
        self.notify_failure(err);
    }

    fn notify_failure(&self, err: &VoteError) {
        let _ = self.events.send(ClientEvent::VoteFailed {
            post_id: self.post_id,
            reason: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_vote_adds_the_direction() {
        assert_eq!(
            apply_vote(VoteStatus::None, 10, VoteDirection::Up),
            (VoteStatus::Up, 11)
        );
        assert_eq!(
            apply_vote(VoteStatus::None, 10, VoteDirection::Down),
            (VoteStatus::Down, 9)
        );
    }

    #[test]
    fn repeating_the_current_direction_toggles_off() {
        assert_eq!(
            apply_vote(VoteStatus::Up, 11, VoteDirection::Up),
            (VoteStatus::None, 10)
        );
        assert_eq!(
            apply_vote(VoteStatus::Down, 9, VoteDirection::Down),
            (VoteStatus::None, 10)
        );
    }

    #[test]
    fn switching_direction_undoes_the_old_vote_first() {
        assert_eq!(
            apply_vote(VoteStatus::Up, 11, VoteDirection::Down),
            (VoteStatus::Down, 9)
        );
        assert_eq!(
            apply_vote(VoteStatus::Down, 9, VoteDirection::Up),
            (VoteStatus::Up, 11)
        );
    }

    #[test]
    fn toggle_pair_round_trips_from_neutral_and_same_direction_starts() {
        for direction in [VoteDirection::Up, VoteDirection::Down] {
            for status in [VoteStatus::None, VoteStatus::from(direction)] {
                let score = 42;
                let (mid_status, mid_score) = apply_vote(status, score, direction);
                assert_eq!(apply_vote(mid_status, mid_score, direction), (status, score));
            }
        }
    }

    #[test]
    fn same_direction_twice_from_the_opposite_vote_nets_its_removal() {
        // Switch then toggle-off: the original down-vote is gone, nothing
        // replaced it.
        let (status, score) = apply_vote(VoteStatus::Down, 9, VoteDirection::Up);
        assert_eq!((status, score), (VoteStatus::Up, 11));
        assert_eq!(
            apply_vote(status, score, VoteDirection::Up),
            (VoteStatus::None, 10)
        );
    }

    #[test]
    fn score_minus_status_contribution_is_invariant_across_any_sequence() {
        let baseline = (VoteStatus::None, 10);
        let net_base = baseline.1 - baseline.0.value();
        let sequence = [
            VoteDirection::Up,
            VoteDirection::Up,
            VoteDirection::Down,
            VoteDirection::Down,
            VoteDirection::Up,
            VoteDirection::Down,
            VoteDirection::Up,
            VoteDirection::Up,
        ];

        let (mut status, mut score) = baseline;
        for direction in sequence {
            let next = apply_vote(status, score, direction);
            status = next.0;
            score = next.1;
            assert!((-1..=1).contains(&status.value()));
            assert_eq!(score, net_base + status.value());
        }
    }

    #[test]
    fn unvote_wire_value_follows_the_configured_encoding() {
        let settled_off = VoteStatus::None;
        assert_eq!(
            UnvoteEncoding::Zero.wire_value(settled_off, VoteDirection::Up),
            0
        );
        assert_eq!(
            UnvoteEncoding::PriorDirection.wire_value(settled_off, VoteDirection::Up),
            1
        );
        // A vote that settles on a direction always transmits that direction.
        assert_eq!(
            UnvoteEncoding::Zero.wire_value(VoteStatus::Down, VoteDirection::Down),
            -1
        );
        assert_eq!(
            UnvoteEncoding::PriorDirection.wire_value(VoteStatus::Up, VoteDirection::Up),
            1
        );
    }
}
