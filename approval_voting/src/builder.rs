pub use crate::config::*;
use crate::run_approval_tally;

/// A builder for collecting approval ballots.
///
/// It covers the common case of votes arriving one by one as lists of
/// approved names.
///
/// ```
/// use approval_voting::builder::Builder;
/// use approval_voting::TallyRules;
/// # use approval_voting::TallyErrors;
///
/// let mut builder = Builder::new(&TallyRules::with_num_winners(1))?
///     .candidates(&["Anna".to_string(), "Bob".to_string()])?;
///
/// builder.add_approvals(&["Anna".to_string()])?;
/// builder.add_approvals(&[])?;
///
/// let result = builder.tally()?;
/// assert_eq!(result.winner.candidates, vec!["Anna".to_string()]);
/// # Ok::<(), TallyErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: TallyRules,
    pub(crate) _candidates: Vec<String>,
    pub(crate) _votes: Vec<Vote>,
}

impl Builder {
    pub fn new(rules: &TallyRules) -> Result<Builder, TallyErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _candidates: Vec::new(),
            _votes: Vec::new(),
        })
    }

    /// Registers the candidates, in the column order that the raw votes
    /// added with [Builder::add_vote] will follow. Resets the votes.
    pub fn candidates(self, cands: &[String]) -> Result<Builder, TallyErrors> {
        Ok(Builder {
            _rules: self._rules,
            _candidates: cands.to_vec(),
            _votes: Vec::new(),
        })
    }

    /// Adds one ballot given the names the voter approved of. The other
    /// candidates are marked as not approved.
    pub fn add_approvals(&mut self, approved: &[String]) -> Result<(), TallyErrors> {
        for name in approved.iter() {
            if !self._candidates.contains(name) {
                return Err(TallyErrors::UnknownCandidate { name: name.clone() });
            }
        }
        let marks: Vec<ApprovalMark> = self
            ._candidates
            .iter()
            .map(|c| {
                if approved.contains(c) {
                    ApprovalMark::Approved
                } else {
                    ApprovalMark::NotApproved
                }
            })
            .collect();
        self.add_vote(&Vote { marks, count: 1 })
    }

    /// Adds a vote with raw marks, with a potential weight attached to it.
    pub fn add_vote(&mut self, vote: &Vote) -> Result<(), TallyErrors> {
        self._votes.push(vote.clone());
        Ok(())
    }

    /// Runs the tally over the collected votes.
    pub fn tally(&self) -> Result<TallyResult, TallyErrors> {
        run_approval_tally(&self._votes, &self._rules, &self._candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_approvals_are_rejected() {
        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES)
            .unwrap()
            .candidates(&["Anna".to_string(), "Bob".to_string()])
            .unwrap();
        let res = builder.add_approvals(&["Clara".to_string()]);
        assert_eq!(
            res,
            Err(TallyErrors::UnknownCandidate {
                name: "Clara".to_string()
            })
        );
    }

    #[test]
    fn approvals_follow_the_candidate_order() {
        let mut builder = Builder::new(&TallyRules::with_num_winners(2))
            .unwrap()
            .candidates(&["Bob".to_string(), "Anna".to_string()])
            .unwrap();
        builder.add_approvals(&["Anna".to_string()]).unwrap();
        builder
            .add_approvals(&["Anna".to_string(), "Bob".to_string()])
            .unwrap();
        let result = builder.tally().unwrap();
        assert_eq!(result.total_ballots, 2);
        assert_eq!(
            result.winner.candidates,
            vec!["Anna".to_string(), "Bob".to_string()]
        );
    }
}
