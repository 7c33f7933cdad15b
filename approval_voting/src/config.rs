// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The approval recorded on a ballot for a single candidate.
///
/// Each ballot carries one mark per candidate of the election, in the order
/// of the candidate list.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ApprovalMark {
    /// The voter approves of this candidate.
    Approved,
    /// The voter does not approve of this candidate.
    NotApproved,
    /// The ballot carries no determinate value for this candidate.
    /// A ballot with a missing mark is dropped from the tally entirely,
    /// it never counts as "not approved".
    Missing,
}

/// One cast vote record: one mark per candidate, with a multiplicity.
///
/// The marks are keyed by position to the candidate list passed to the
/// tally. A vote whose number of marks disagrees with that list is treated
/// like a vote with a missing mark.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Vote {
    pub marks: Vec<ApprovalMark>,
    pub count: u64,
}

// ******** Output data structures *********

/// A set of candidates with its total utility across all ballots.
///
/// The candidate names are listed in ascending name order.
#[derive(PartialEq, Debug, Clone)]
pub struct ScoredSet {
    pub score: f64,
    pub candidates: Vec<String>,
}

/// The outcome of one tally.
#[derive(PartialEq, Debug, Clone)]
pub struct TallyResult {
    /// Number of valid ballots, after dropping the malformed ones.
    pub total_ballots: u64,
    /// Number of distinct approval sets among the valid ballots.
    pub distinct_ballots: u64,
    /// Number of ballots dropped for carrying a missing mark.
    pub dropped_ballots: u64,
    /// Per-candidate approval totals, in decreasing order, if requested.
    /// This is a comparison reference only, it plays no role in the
    /// selection of the winner.
    pub plurality: Option<Vec<(String, u64)>>,
    /// The top-scoring candidate sets, in decreasing score order.
    pub rankings: Vec<ScoredSet>,
    /// The winning candidate set.
    pub winner: ScoredSet,
}

/// Errors that prevent the tally from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyErrors {
    /// The number of winners is zero or exceeds the number of candidates.
    InvalidWinnerCount {
        requested: u32,
        num_candidates: usize,
    },
    /// More candidates than one election can hold (one bit per candidate).
    TooManyCandidates { num_candidates: usize },
    /// The same name appears more than once in the candidate list.
    DuplicateCandidate { name: String },
    /// A name that is not part of the candidate list.
    UnknownCandidate { name: String },
}

impl Error for TallyErrors {}

impl Display for TallyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyErrors::InvalidWinnerCount {
                requested,
                num_candidates,
            } => write!(
                f,
                "invalid number of winners: {} requested for {} candidates (expected between 1 and the number of candidates)",
                requested, num_candidates
            ),
            TallyErrors::TooManyCandidates { num_candidates } => write!(
                f,
                "too many candidates for one election: {} (at most {} are supported)",
                num_candidates,
                crate::MAX_CANDIDATES
            ),
            TallyErrors::DuplicateCandidate { name } => write!(
                f,
                "candidate {:?} appears more than once in the candidate list",
                name
            ),
            TallyErrors::UnknownCandidate { name } => {
                write!(f, "candidate {:?} is not part of the candidate list", name)
            }
        }
    }
}

// ********* Configuration **********

/// The options of one tally.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyRules {
    /// The number of seats to fill. Must be between 1 and the number of
    /// candidates.
    pub num_winners: u32,
    /// How many of the top-scoring candidate sets to keep in the report.
    pub num_ranked: usize,
    /// Whether to also compute the per-candidate approval totals.
    pub plurality_baseline: bool,
}

impl TallyRules {
    pub const DEFAULT_RULES: TallyRules = TallyRules {
        num_winners: 1,
        num_ranked: 10,
        plurality_baseline: true,
    };

    /// The default rules with the given number of seats.
    pub fn with_num_winners(num_winners: u32) -> TallyRules {
        TallyRules {
            num_winners,
            ..TallyRules::DEFAULT_RULES
        }
    }
}
