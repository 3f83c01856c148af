use std::fmt;

use serde::{Deserialize, Serialize};

/// Heuristic branch that produced an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rule {
    /// Node was never annotated.
    Unknown,
    /// No usable signal.
    Indeterminate,

    LastHopNoDestinations,
    LastHopIndeterminate,
    LastHopSingleOrg,
    LastHopInterfaceMatch,
    LastHopRelated,
    LastHopHeap,
    LastHopHidden,
    LastHopMissing,

    SingleSuccessorOrigin,
    SingleSuccessorCustomer,
    SingleSuccessorHidden,
    InterfaceAgreement,
    SingleSuccessorUnresolved,
    AllPeerSuccessors,
    InterfaceSuccessorMajority,
    AllPeerOrigins,
    RemainingCustomer,
    VoteSingle,
    VoteTie,
    VoteOverride,

    InterfaceSinglePredecessor,
    InterfaceConsensus,
    InterfaceMajority,
    InterfaceTieBreak,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rule::Unknown => "UNKNOWN",
            Rule::Indeterminate => "INDETERMINATE",
            Rule::LastHopNoDestinations => "LASTHOP_NODEST",
            Rule::LastHopIndeterminate => "LASTHOP_INDETERMINATE",
            Rule::LastHopSingleOrg => "LASTHOP_SINGLE",
            Rule::LastHopInterfaceMatch => "LASTHOP_SAME",
            Rule::LastHopRelated => "LASTHOP_RELS",
            Rule::LastHopHeap => "LASTHOP_HEAPED",
            Rule::LastHopHidden => "LASTHOP_MISSING_INTER",
            Rule::LastHopMissing => "LASTHOP_MISSING_NOINTER",
            Rule::SingleSuccessorOrigin => "SINGLE_SUCC_ORIGIN",
            Rule::SingleSuccessorCustomer => "SINGLE_SUCC_4",
            Rule::SingleSuccessorHidden => "SINGLE_SUCC_HIDDEN",
            Rule::InterfaceAgreement => "IUPDATE",
            Rule::SingleSuccessorUnresolved => "SINGLE_SUCC_RASN",
            Rule::AllPeerSuccessors => "ALLPEER_SUCC",
            Rule::InterfaceSuccessorMajority => "IASN_SUCC_HALF",
            Rule::AllPeerOrigins => "ALLPEER_ORIGIN",
            Rule::RemainingCustomer => "REMAINING_4",
            Rule::VoteSingle => "VOTE_SINGLE",
            Rule::VoteTie => "VOTE_TIE",
            Rule::VoteOverride => "VOTE_OVERRIDE",
            Rule::InterfaceSinglePredecessor => "IFACE_SINGLE",
            Rule::InterfaceConsensus => "IFACE_CONSENSUS",
            Rule::InterfaceMajority => "IFACE_MAJORITY",
            Rule::InterfaceTieBreak => "IFACE_TIE",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of a hidden-intermediary search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HiddenSearch {
    NotAttempted,
    Found,
    NotFound,
}

/// Diagnostic tag attached to every annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecisionCode {
    pub rule: Rule,
    /// Votes were moved to a reallocated customer prefix.
    pub reallocated: bool,
    /// Chosen through the same-subnet predecessor path.
    pub colocated: bool,
    pub hidden: HiddenSearch,
}

impl DecisionCode {
    pub const UNKNOWN: DecisionCode = DecisionCode::new(Rule::Unknown);

    pub const fn new(rule: Rule) -> Self {
        DecisionCode {
            rule,
            reallocated: false,
            colocated: false,
            hidden: HiddenSearch::NotAttempted,
        }
    }

    pub fn with_reallocated(mut self, reallocated: bool) -> Self {
        self.reallocated = reallocated;
        self
    }

    pub fn with_colocated(mut self, colocated: bool) -> Self {
        self.colocated = colocated;
        self
    }

    pub fn with_hidden(mut self, hidden: HiddenSearch) -> Self {
        self.hidden = hidden;
        self
    }

    /// Interface decisions backed by more than one agreeing predecessor.
    pub fn is_high_confidence(&self) -> bool {
        matches!(self.rule, Rule::InterfaceConsensus | Rule::InterfaceMajority)
    }
}

impl Default for DecisionCode {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for DecisionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule)?;
        if self.reallocated {
            write!(f, "+REALLOCATED")?;
        }
        if self.colocated {
            write!(f, "+SUBNET")?;
        }
        match self.hidden {
            HiddenSearch::NotAttempted => Ok(()),
            HiddenSearch::Found => write!(f, "+HIDDEN_INTER"),
            HiddenSearch::NotFound => write!(f, "+HIDDEN_NOINTER"),
        }
    }
}
