use {
  crate::{AccountId, Amount, AttachmentId, TankId},
  core::cmp::Ordering,
  serde::{Deserialize, Serialize},
};

/// A destination that can receive released asset.
///
/// Accounts and tanks store asset and terminate a flow; attachments
/// process it and forward it onward. Variant order is part of the wire
/// format: new variants append at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sink {
  /// The tank the containing structure is mounted on, resolved from
  /// context during a chain walk.
  SameTank,
  Account(AccountId),
  Tank(TankId),
  Attachment(AttachmentId),
}

impl Sink {
  /// Terminal sinks store asset; all others immediately release it to
  /// another sink.
  pub fn is_terminal(&self) -> bool {
    !matches!(self, Sink::Attachment(_))
  }
}

/// A bound on how much asset may flow during a release.
///
/// Variant order is part of the wire format: new variants append at the
/// end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowLimit {
  Unlimited,
  Amount(Amount),
}

impl FlowLimit {
  pub fn amount(&self) -> Option<Amount> {
    match self {
      FlowLimit::Unlimited => None,
      FlowLimit::Amount(amount) => Some(*amount),
    }
  }

  pub fn is_zero(&self) -> bool {
    matches!(self, FlowLimit::Amount(0))
  }
}

impl PartialOrd for FlowLimit {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for FlowLimit {
  /// An unlimited flow exceeds every bounded amount.
  fn cmp(&self, other: &Self) -> Ordering {
    match (self, other) {
      (FlowLimit::Unlimited, FlowLimit::Unlimited) => Ordering::Equal,
      (FlowLimit::Unlimited, FlowLimit::Amount(_)) => Ordering::Greater,
      (FlowLimit::Amount(_), FlowLimit::Unlimited) => Ordering::Less,
      (FlowLimit::Amount(a), FlowLimit::Amount(b)) => a.cmp(b),
    }
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{FlowLimit, Sink},
    crate::{AccountId, AttachmentId, TankId},
  };

  #[test]
  fn terminal_sinks() {
    assert!(Sink::SameTank.is_terminal());
    assert!(Sink::Account(AccountId(1)).is_terminal());
    assert!(Sink::Tank(TankId(1)).is_terminal());
    assert!(!Sink::Attachment(AttachmentId {
      tank_id: None,
      attachment_index: 0,
    })
    .is_terminal());
  }

  #[test]
  fn flow_limit_ordering() {
    assert!(FlowLimit::Unlimited > FlowLimit::Amount(i64::MAX));
    assert!(FlowLimit::Amount(5) < FlowLimit::Amount(6));
    assert_eq!(FlowLimit::Unlimited, FlowLimit::Unlimited);
    assert!(FlowLimit::Amount(0).is_zero());
    assert!(!FlowLimit::Unlimited.is_zero());
  }
}
