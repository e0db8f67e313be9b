use std::fmt;

/// Where a call stands from the local side.
///
/// The caller goes `Idle -> OfferSent -> Connected`, the callee goes
/// `Idle -> AnswerSent -> Connected`. Both end in `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NegotiationState {
    #[default]
    Idle,
    OfferSent,
    AnswerSent,
    /// Offer and answer are both applied. Says nothing about ICE
    /// connectivity, which is reported separately by the transport.
    Connected,
    Closed,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::OfferSent => "offer-sent",
            Self::AnswerSent => "answer-sent",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
