mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};

use std::{
    collections::HashMap,
    ops::{Add, AddAssign},
};

pub use crate::config::*;

// **** Private structures ****

/// Rank of a candidate name in ascending name order. Doubles as the bit
/// position of the candidate in a [CandidateMask].
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateId(u32);

/// Width of a [CandidateMask], the hard cap on the number of candidates.
pub(crate) const MAX_CANDIDATES: usize = 128;

/// A set of candidates, one bit per candidate at the position given by its
/// [CandidateId].
///
/// This is the canonical form for both the approvals of a ballot and a
/// candidate combination under evaluation: equality, hashing and member
/// iteration are fixed by the bit layout, not by the iteration order of a
/// hashed container. Since the bit positions follow the name order, walking
/// the members of a mask yields the candidate identifiers as a sorted
/// sequence.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateMask(u128);

impl CandidateMask {
    const EMPTY: CandidateMask = CandidateMask(0);

    fn insert(&mut self, CandidateId(idx): CandidateId) {
        self.0 |= 1u128 << idx;
    }

    fn contains(self, CandidateId(idx): CandidateId) -> bool {
        self.0 >> idx & 1 == 1
    }

    /// Number of candidates present in both sets.
    fn count_common(self, other: CandidateMask) -> u32 {
        (self.0 & other.0).count_ones()
    }

    /// The member candidates, in increasing id order.
    fn members(self) -> impl Iterator<Item = CandidateId> {
        let mut rem = self.0;
        std::iter::from_fn(move || {
            if rem == 0 {
                None
            } else {
                let idx = rem.trailing_zeros();
                rem &= rem - 1;
                Some(CandidateId(idx))
            }
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0 + rhs.0)
    }
}

/// Precomputed harmonic sums: H(0) = 0 and H(n) = H(n-1) + 1/n.
///
/// H(n) is the utility credited to a voter who sees n of their approved
/// candidates among the winners. The table is sized from the number of
/// candidates of the election under tally, so every intersection size a
/// ballot can reach is in range.
struct UtilityTable {
    values: Vec<f64>,
}

impl UtilityTable {
    fn for_max_matches(max_matches: usize) -> UtilityTable {
        let mut values = Vec::with_capacity(max_matches + 1);
        values.push(0.0);
        for n in 1..=max_matches {
            values.push(values[n - 1] + 1.0 / n as f64);
        }
        UtilityTable { values }
    }

    /// The utility of a winner set to one voter with `matches` approved
    /// winners. Indexing beyond the table is a programming error, not an
    /// input condition: the table covers every intersection size the
    /// candidate list allows.
    fn utility(&self, matches: usize) -> f64 {
        self.values[matches]
    }
}

/// The validated, deduplicated form of the input.
struct CheckResult {
    /// Distinct approval sets with the number of ballots that cast each,
    /// in increasing mask order.
    ballots: Vec<(CandidateMask, VoteCount)>,
    /// Candidate names with their ids, in ascending name order.
    candidates: Vec<(String, CandidateId)>,
    valid_count: VoteCount,
    dropped_count: VoteCount,
}

// Candidate ids are assigned in ascending name order, whatever the column
// order of the input.
fn checks(coll: &[Vote], candidate_names: &[String]) -> Result<CheckResult, TallyErrors> {
    debug!("checks: coll size: {:?}", coll.len());
    if candidate_names.len() > MAX_CANDIDATES {
        return Err(TallyErrors::TooManyCandidates {
            num_candidates: candidate_names.len(),
        });
    }

    let mut sorted_names: Vec<&str> = candidate_names.iter().map(|s| s.as_str()).collect();
    sorted_names.sort_unstable();
    for w in sorted_names.windows(2) {
        if w[0] == w[1] {
            return Err(TallyErrors::DuplicateCandidate {
                name: w[0].to_string(),
            });
        }
    }
    let ids_by_name: HashMap<&str, CandidateId> = sorted_names
        .iter()
        .enumerate()
        .map(|(idx, name)| (*name, CandidateId(idx as u32)))
        .collect();

    // Column position in the input -> candidate id.
    let column_ids: Vec<CandidateId> = candidate_names
        .iter()
        .map(|name| ids_by_name[name.as_str()])
        .collect();

    let mut dedup: HashMap<CandidateMask, VoteCount> = HashMap::new();
    let mut valid_count = VoteCount::EMPTY;
    let mut dropped_count = VoteCount::EMPTY;
    for v in coll.iter() {
        let count = VoteCount(v.count);
        if v.marks.len() != column_ids.len() {
            debug!(
                "checks: dropping ballot with {:?} marks for {:?} candidates",
                v.marks.len(),
                column_ids.len()
            );
            dropped_count += count;
            continue;
        }
        if v.marks.iter().any(|m| *m == ApprovalMark::Missing) {
            dropped_count += count;
            continue;
        }
        let mut mask = CandidateMask::EMPTY;
        for (mark, cid) in v.marks.iter().zip(column_ids.iter()) {
            if *mark == ApprovalMark::Approved {
                mask.insert(*cid);
            }
        }
        *dedup.entry(mask).or_insert(VoteCount::EMPTY) += count;
        valid_count += count;
    }

    let mut ballots: Vec<(CandidateMask, VoteCount)> = dedup.into_iter().collect();
    ballots.sort_unstable_by_key(|(mask, _)| *mask);

    let candidates: Vec<(String, CandidateId)> = sorted_names
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.to_string(), CandidateId(idx as u32)))
        .collect();

    Ok(CheckResult {
        ballots,
        candidates,
        valid_count,
        dropped_count,
    })
}

/// Enumerates every k-element subset of the ids 0..n, in lexicographic
/// order of the increasing index sequence.
struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Combinations {
        Combinations {
            n,
            indices: (0..k).collect(),
            started: false,
        }
    }

    fn mask(&self) -> CandidateMask {
        let mut m = CandidateMask::EMPTY;
        for &idx in self.indices.iter() {
            m.insert(CandidateId(idx as u32));
        }
        m
    }
}

impl Iterator for Combinations {
    type Item = CandidateMask;

    fn next(&mut self) -> Option<CandidateMask> {
        let k = self.indices.len();
        if k > self.n {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.mask());
        }
        // Advance the rightmost index that can still move up, and reset
        // everything after it.
        let mut i = k;
        while i > 0 {
            i -= 1;
            if self.indices[i] < self.n - k + i {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                return Some(self.mask());
            }
        }
        None
    }
}

// The dominant cost of the tally: C(num_candidates, num_winners) set
// intersections per distinct ballot. The intersection itself is one AND
// and one popcount.
fn score_combinations(
    num_candidates: usize,
    num_winners: usize,
    ballots: &[(CandidateMask, VoteCount)],
    utility: &UtilityTable,
) -> Vec<(CandidateMask, f64)> {
    let mut scores: Vec<(CandidateMask, f64)> = Vec::new();
    for combination in Combinations::new(num_candidates, num_winners) {
        let mut score = 0.0;
        for &(ballot, VoteCount(count)) in ballots.iter() {
            score += count as f64 * utility.utility(combination.count_common(ballot) as usize);
        }
        scores.push((combination, score));
    }
    scores
}

/// Orders by score descending. Equal scores are ordered by the candidate
/// identifiers of the combination compared as a sorted sequence, ascending,
/// which makes the output reproducible across runs and platforms. Ids
/// follow the name order, so iterating the mask members is that sequence.
fn rank_scores(scores: &mut [(CandidateMask, f64)]) {
    scores.sort_unstable_by(|(mask_a, score_a), (mask_b, score_b)| {
        score_b
            .total_cmp(score_a)
            .then_with(|| mask_a.members().cmp(mask_b.members()))
    });
}

fn scored_set(
    mask: CandidateMask,
    score: f64,
    candidates: &[(String, CandidateId)],
) -> ScoredSet {
    ScoredSet {
        score,
        candidates: mask
            .members()
            .map(|CandidateId(idx)| candidates[idx as usize].0.clone())
            .collect(),
    }
}

// Approval totals per candidate, decreasing. Candidates arrive in name
// order and the sort is stable, so ties stay in ascending name order.
fn plurality_counts(
    ballots: &[(CandidateMask, VoteCount)],
    candidates: &[(String, CandidateId)],
) -> Vec<(String, u64)> {
    let mut res: Vec<(String, u64)> = candidates
        .iter()
        .map(|(name, cid)| {
            let total: VoteCount = ballots
                .iter()
                .filter(|(mask, _)| mask.contains(*cid))
                .map(|(_, count)| *count)
                .sum();
            (name.clone(), total.0)
        })
        .collect();
    res.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    res
}

/// Runs the proportional approval voting tally for the given votes.
///
/// Every combination of `rules.num_winners` candidates is scored against
/// every distinct ballot: a ballot contributes its multiplicity times
/// H(number of its approved candidates in the combination), where H is the
/// harmonic sum. The top combinations and the overall winner are reported.
///
/// Arguments:
/// * `coll` the collection of votes to process
/// * `rules` the rules that govern this election
/// * `candidate_names` the registered candidates, in the column order of
///   the votes' marks
///
/// An empty collection of votes is not an error: all combinations then
/// score 0.0 and the winner is the first combination in the deterministic
/// order, which callers should read as "no information".
pub fn run_approval_tally(
    coll: &[Vote],
    rules: &TallyRules,
    candidate_names: &[String],
) -> Result<TallyResult, TallyErrors> {
    info!(
        "run_approval_tally: processing {:?} votes, {:?} candidates, rules: {:?}",
        coll.len(),
        candidate_names.len(),
        rules
    );

    let num_candidates = candidate_names.len();
    let num_winners = rules.num_winners as usize;
    // Rejected before anything else: the enumeration cost grows
    // combinatorially and an invalid count must not reach it.
    if rules.num_winners == 0 || num_winners > num_candidates {
        return Err(TallyErrors::InvalidWinnerCount {
            requested: rules.num_winners,
            num_candidates,
        });
    }

    let cr = checks(coll, candidate_names)?;
    info!(
        "run_approval_tally: {:?} valid ballots ({:?} distinct), {:?} dropped",
        cr.valid_count.0,
        cr.ballots.len(),
        cr.dropped_count.0
    );
    for (name, cid) in cr.candidates.iter() {
        debug!("Candidate: {}: {}", cid.0, name);
    }

    // One entry per approval count a valid ballot can reach.
    let utility = UtilityTable::for_max_matches(num_candidates);

    let mut scores = score_combinations(num_candidates, num_winners, &cr.ballots, &utility);
    debug!("run_approval_tally: {:?} combinations scored", scores.len());

    rank_scores(&mut scores);
    let (winner_mask, winner_score) = scores[0];
    let winner = scored_set(winner_mask, winner_score, &cr.candidates);
    info!(
        "run_approval_tally: winner: {:?} with score {}",
        winner.candidates, winner.score
    );

    let rankings: Vec<ScoredSet> = scores
        .iter()
        .take(rules.num_ranked)
        .map(|&(mask, score)| scored_set(mask, score, &cr.candidates))
        .collect();

    let plurality = if rules.plurality_baseline {
        Some(plurality_counts(&cr.ballots, &cr.candidates))
    } else {
        None
    };

    Ok(TallyResult {
        total_ballots: cr.valid_count.0,
        distinct_ballots: cr.ballots.len() as u64,
        dropped_ballots: cr.dropped_count.0,
        plurality,
        rankings,
        winner,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|s| s.to_string()).collect()
    }

    fn vote(bits: &[u8], count: u64) -> Vote {
        let marks = bits
            .iter()
            .map(|b| {
                if *b == 1 {
                    ApprovalMark::Approved
                } else {
                    ApprovalMark::NotApproved
                }
            })
            .collect();
        Vote { marks, count }
    }

    #[test]
    fn harmonic_values() {
        let table = UtilityTable::for_max_matches(20);
        assert_eq!(table.utility(0), 0.0);
        assert_eq!(table.utility(1), 1.0);
        assert_eq!(table.utility(2), 1.5);
        for n in 1..=20 {
            assert_eq!(table.utility(n), table.utility(n - 1) + 1.0 / n as f64);
            assert!(table.utility(n) > table.utility(n - 1));
        }
    }

    #[test]
    fn utility_depends_on_intersection_size_only() {
        // Two ballots sharing no approval beyond the intersection size
        // contribute the same utility to a combination.
        let mut combination = CandidateMask::EMPTY;
        combination.insert(CandidateId(0));
        combination.insert(CandidateId(2));
        let mut ballot_a = CandidateMask::EMPTY;
        ballot_a.insert(CandidateId(0));
        ballot_a.insert(CandidateId(1));
        let mut ballot_b = CandidateMask::EMPTY;
        ballot_b.insert(CandidateId(2));
        ballot_b.insert(CandidateId(3));
        assert_eq!(
            combination.count_common(ballot_a),
            combination.count_common(ballot_b)
        );
        let table = UtilityTable::for_max_matches(4);
        assert_eq!(
            table.utility(combination.count_common(ballot_a) as usize),
            table.utility(combination.count_common(ballot_b) as usize)
        );
    }

    #[test]
    fn multiplicity_is_linear() {
        let cands = names(&["A", "B", "C"]);
        let rules = TallyRules::with_num_winners(2);
        let doubled = run_approval_tally(
            &[vote(&[1, 1, 0], 2), vote(&[0, 0, 1], 1)],
            &rules,
            &cands,
        )
        .unwrap();
        let repeated = run_approval_tally(
            &[
                vote(&[1, 1, 0], 1),
                vote(&[1, 1, 0], 1),
                vote(&[0, 0, 1], 1),
            ],
            &rules,
            &cands,
        )
        .unwrap();
        assert_eq!(doubled.rankings, repeated.rankings);
        assert_eq!(doubled.total_ballots, repeated.total_ballots);
    }

    #[test]
    fn score_table_has_binomial_size() {
        let table = UtilityTable::for_max_matches(5);
        let scores = score_combinations(5, 2, &[(CandidateMask(0b00011), VoteCount(3))], &table);
        // C(5, 2)
        assert_eq!(scores.len(), 10);
        assert!(scores.iter().all(|(_, s)| *s >= 0.0));
    }

    #[test]
    fn full_universe_is_single_combination() {
        let cands = names(&["A", "B", "C"]);
        let res = run_approval_tally(
            &[vote(&[1, 0, 1], 4)],
            &TallyRules::with_num_winners(3),
            &cands,
        )
        .unwrap();
        assert_eq!(res.rankings.len(), 1);
        assert_eq!(res.winner.candidates, names(&["A", "B", "C"]));
        assert_eq!(res.winner.score, 4.0 * 1.5);
    }

    #[test]
    fn tiebreak_is_deterministic() {
        // No ballots: every score is 0.0 and only the tie-break orders the
        // output.
        let res = run_approval_tally(&[], &TallyRules::with_num_winners(2), &names(&["A", "B", "C", "D"]))
            .unwrap();
        let sets: Vec<Vec<String>> = res.rankings.iter().map(|r| r.candidates.clone()).collect();
        assert_eq!(
            sets,
            vec![
                names(&["A", "B"]),
                names(&["A", "C"]),
                names(&["A", "D"]),
                names(&["B", "C"]),
                names(&["B", "D"]),
                names(&["C", "D"]),
            ]
        );
        assert_eq!(res.winner.candidates, names(&["A", "B"]));
        assert_eq!(res.winner.score, 0.0);
    }

    #[test]
    fn tiebreak_ignores_column_order() {
        // The same election with shuffled columns produces the same report.
        let straight = run_approval_tally(
            &[vote(&[1, 0, 0, 0], 1), vote(&[0, 0, 0, 1], 1)],
            &TallyRules::with_num_winners(2),
            &names(&["A", "B", "C", "D"]),
        )
        .unwrap();
        let shuffled = run_approval_tally(
            &[vote(&[0, 0, 1, 0], 1), vote(&[1, 0, 0, 0], 1)],
            &TallyRules::with_num_winners(2),
            &names(&["D", "B", "A", "C"]),
        )
        .unwrap();
        assert_eq!(straight.rankings, shuffled.rankings);
        assert_eq!(straight.winner, shuffled.winner);
    }

    // The Wikipedia example for proportional approval voting.
    #[test]
    fn wikipedia_example() {
        let cands = names(&["A", "B", "C", "D"]);
        let votes = vec![
            vote(&[1, 1, 0, 0], 5),
            vote(&[1, 0, 1, 0], 17),
            vote(&[0, 0, 0, 1], 8),
        ];
        let res = run_approval_tally(&votes, &TallyRules::with_num_winners(2), &cands).unwrap();

        assert_eq!(res.total_ballots, 30);
        assert_eq!(res.distinct_ballots, 3);
        assert_eq!(res.dropped_ballots, 0);

        let expected = vec![
            (vec!["A", "C"], 30.5),
            (vec!["A", "D"], 30.0),
            (vec!["C", "D"], 25.0),
            (vec!["A", "B"], 24.5),
            (vec!["B", "C"], 22.0),
            (vec!["B", "D"], 13.0),
        ];
        assert_eq!(res.rankings.len(), expected.len());
        for (entry, (set, score)) in res.rankings.iter().zip(expected.iter()) {
            assert_eq!(entry.candidates, names(set));
            assert_eq!(entry.score, *score);
        }
        assert_eq!(res.winner.candidates, names(&["A", "C"]));
        assert_eq!(res.winner.score, 30.5);

        let plurality = res.plurality.unwrap();
        assert_eq!(
            plurality,
            vec![
                ("A".to_string(), 22),
                ("C".to_string(), 17),
                ("D".to_string(), 8),
                ("B".to_string(), 5),
            ]
        );
    }

    #[test]
    fn invalid_winner_counts_are_rejected() {
        let cands = names(&["A", "B", "C"]);
        let votes = vec![vote(&[1, 0, 0], 1)];
        for k in [0u32, 4, 100] {
            let res = run_approval_tally(&votes, &TallyRules::with_num_winners(k), &cands);
            assert_eq!(
                res,
                Err(TallyErrors::InvalidWinnerCount {
                    requested: k,
                    num_candidates: 3
                })
            );
        }
    }

    #[test]
    fn missing_marks_drop_the_whole_row() {
        let cands = names(&["A", "B"]);
        let partial = Vote {
            marks: vec![ApprovalMark::Approved, ApprovalMark::Missing],
            count: 1,
        };
        let res = run_approval_tally(
            &[vote(&[0, 1], 1), partial],
            &TallyRules::with_num_winners(1),
            &cands,
        )
        .unwrap();
        // The partial row contributes to nothing but the dropped count: the
        // approval of A on it does not surface anywhere.
        assert_eq!(res.total_ballots, 1);
        assert_eq!(res.distinct_ballots, 1);
        assert_eq!(res.dropped_ballots, 1);
        assert_eq!(res.winner.candidates, names(&["B"]));
        assert_eq!(res.plurality.unwrap()[0], ("B".to_string(), 1));
    }

    #[test]
    fn short_rows_drop_the_whole_row() {
        let cands = names(&["A", "B", "C"]);
        let short = Vote {
            marks: vec![ApprovalMark::Approved],
            count: 2,
        };
        let res = run_approval_tally(
            &[short, vote(&[0, 1, 0], 3)],
            &TallyRules::with_num_winners(1),
            &cands,
        )
        .unwrap();
        assert_eq!(res.total_ballots, 3);
        assert_eq!(res.dropped_ballots, 2);
        assert_eq!(res.winner.candidates, names(&["B"]));
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let res = run_approval_tally(&[], &TallyRules::with_num_winners(1), &names(&["A", "B"]))
            .unwrap();
        assert_eq!(res.total_ballots, 0);
        assert_eq!(res.distinct_ballots, 0);
        assert_eq!(res.winner.candidates, names(&["A"]));
        assert_eq!(res.winner.score, 0.0);
    }

    #[test]
    fn duplicate_candidates_are_rejected() {
        let res = run_approval_tally(
            &[],
            &TallyRules::with_num_winners(1),
            &names(&["A", "B", "A"]),
        );
        assert_eq!(
            res,
            Err(TallyErrors::DuplicateCandidate {
                name: "A".to_string()
            })
        );
    }

    #[test]
    fn combinations_cover_the_lexicographic_sequence() {
        let all: Vec<CandidateMask> = Combinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![
                CandidateMask(0b0011),
                CandidateMask(0b0101),
                CandidateMask(0b1001),
                CandidateMask(0b0110),
                CandidateMask(0b1010),
                CandidateMask(0b1100),
            ]
        );
        assert_eq!(Combinations::new(3, 3).count(), 1);
        assert_eq!(Combinations::new(3, 4).count(), 0);
    }
}
