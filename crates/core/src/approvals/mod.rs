use serde::{Deserialize, Serialize};

use crate::domain::user::{Role, UserId, UserRecord};

/// How many PENDING approvals assigned within the overload window make an
/// approver count as absent for chain-walking purposes.
pub const OVERLOAD_PENDING_THRESHOLD: u32 = 10;
pub const OVERLOAD_WINDOW_DAYS: i64 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Available,
    OnLeave,
    Overloaded,
}

impl Availability {
    pub fn is_absent(self) -> bool {
        !matches!(self, Availability::Available)
    }

    fn describe(self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::OnLeave => "on approved leave",
            Availability::Overloaded => "overloaded with pending approvals",
        }
    }
}

/// Position in the chain the walk starts from. `Initial` is used when a
/// request first enters the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainPosition {
    Initial,
    At(UserId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateCandidate {
    pub user_id: UserId,
    pub availability: Availability,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainCandidate {
    pub user_id: UserId,
    pub role: Role,
    pub availability: Availability,
    pub delegate: Option<DelegateCandidate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedApprover {
    /// A chain member in person.
    Member { user_id: UserId, role: Role },
    /// An active delegate standing in for an absent chain member. The walk
    /// stops at the substituted position rather than advancing past it.
    Delegate { user_id: UserId, delegator_id: UserId },
}

impl ResolvedApprover {
    pub fn user_id(&self) -> &UserId {
        match self {
            ResolvedApprover::Member { user_id, .. } => user_id,
            ResolvedApprover::Delegate { user_id, .. } => user_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedApprover {
    pub user_id: UserId,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub approver: Option<ResolvedApprover>,
    pub skipped: Vec<SkippedApprover>,
}

/// An ordered, deduplicated snapshot of the approval chain for one
/// requester, with availability and delegation state baked in at build
/// time. Resolution over a snapshot is deterministic: repeated calls with
/// the same position return the same answer.
///
/// Order is fixed: manager, then department director (when distinct), then
/// the HR/EXECUTIVE fallback. First match wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainSnapshot {
    requester_id: UserId,
    candidates: Vec<ChainCandidate>,
    auto_skip_absent: bool,
}

impl ChainSnapshot {
    pub fn new(requester_id: UserId, auto_skip_absent: bool) -> Self {
        Self { requester_id, candidates: Vec::new(), auto_skip_absent }
    }

    /// Appends a candidate unless it duplicates an earlier chain position
    /// or is the requester themselves.
    pub fn push(&mut self, candidate: ChainCandidate) {
        if candidate.user_id == self.requester_id {
            return;
        }
        if self.candidates.iter().any(|existing| existing.user_id == candidate.user_id) {
            return;
        }
        self.candidates.push(candidate);
    }

    pub fn candidates(&self) -> &[ChainCandidate] {
        &self.candidates
    }

    /// Selects the fallback approver from a directory listing: the first
    /// active HR/EXECUTIVE user not already in the chain and not the
    /// requester. Returns the chosen record for the caller to enrich with
    /// availability and delegation state.
    pub fn pick_fallback<'a>(&self, directory: &'a [UserRecord]) -> Option<&'a UserRecord> {
        directory.iter().find(|user| {
            user.is_active
                && user.role.is_fallback_approver()
                && user.id != self.requester_id
                && !self.candidates.iter().any(|existing| existing.user_id == user.id)
        })
    }

    pub fn resolve_next(&self, from: &ChainPosition) -> Resolution {
        let start = match from {
            ChainPosition::Initial => 0,
            ChainPosition::At(user_id) => self
                .candidates
                .iter()
                .position(|candidate| &candidate.user_id == user_id)
                .map(|index| index + 1)
                .unwrap_or(0),
        };

        let mut skipped = Vec::new();
        for candidate in &self.candidates[start.min(self.candidates.len())..] {
            if !self.auto_skip_absent || !candidate.availability.is_absent() {
                return Resolution {
                    approver: Some(ResolvedApprover::Member {
                        user_id: candidate.user_id.clone(),
                        role: candidate.role,
                    }),
                    skipped,
                };
            }

            if let Some(delegate) = &candidate.delegate {
                if !delegate.availability.is_absent() && delegate.user_id != self.requester_id {
                    return Resolution {
                        approver: Some(ResolvedApprover::Delegate {
                            user_id: delegate.user_id.clone(),
                            delegator_id: candidate.user_id.clone(),
                        }),
                        skipped,
                    };
                }
            }

            skipped.push(SkippedApprover {
                user_id: candidate.user_id.clone(),
                reason: candidate.availability.describe().to_string(),
            });
        }

        Resolution { approver: None, skipped }
    }
}
