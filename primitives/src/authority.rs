use {
  crate::AccountId,
  ed25519_dalek::PublicKey,
  serde::{Deserialize, Serialize},
};

/// A weighted-threshold authority over accounts and keys.
///
/// Satisfying an authority (collecting enough signatures and account
/// approvals to meet the threshold) is the host chain's business. The
/// core only validates structure, compares authorities, and reports
/// which ones an operation requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authority {
  /// Total member weight that must approve.
  pub weight_threshold: u32,
  pub account_weights: Vec<(AccountId, u16)>,
  pub key_weights: Vec<(PublicKey, u16)>,
}

impl Authority {
  /// An authority satisfied by a single account's approval.
  pub fn single_account(account: AccountId) -> Self {
    Self {
      weight_threshold: 1,
      account_weights: vec![(account, 1)],
      key_weights: vec![],
    }
  }

  fn total_weight(&self) -> u64 {
    let accounts: u64 = self
      .account_weights
      .iter()
      .map(|(_, weight)| u64::from(*weight))
      .sum();
    let keys: u64 = self
      .key_weights
      .iter()
      .map(|(_, weight)| u64::from(*weight))
      .sum();
    accounts + keys
  }

  /// An impossible authority can never be satisfied: its members'
  /// combined weight falls short of the threshold.
  pub fn is_impossible(&self) -> bool {
    self.total_weight() < u64::from(self.weight_threshold)
  }

  /// A trivial authority is satisfied by anyone.
  pub fn is_trivial(&self) -> bool {
    self.weight_threshold == 0
  }

  /// An authority with no members at all.
  pub fn is_empty(&self) -> bool {
    self.account_weights.is_empty() && self.key_weights.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use {super::Authority, crate::AccountId, ed25519_dalek::PublicKey};

  #[test]
  fn structural_checks() {
    let usable = Authority::single_account(AccountId(7));
    assert!(!usable.is_impossible());
    assert!(!usable.is_trivial());
    assert!(!usable.is_empty());

    let impossible = Authority {
      weight_threshold: 3,
      account_weights: vec![(AccountId(7), 1)],
      key_weights: vec![],
    };
    assert!(impossible.is_impossible());

    let trivial = Authority {
      weight_threshold: 0,
      account_weights: vec![(AccountId(7), 1)],
      key_weights: vec![],
    };
    assert!(trivial.is_trivial());

    let empty = Authority {
      weight_threshold: 1,
      account_weights: vec![],
      key_weights: vec![],
    };
    assert!(empty.is_empty());
    assert!(empty.is_impossible());

    // key members count toward the threshold like account members
    let keyed = Authority {
      weight_threshold: 1,
      account_weights: vec![],
      key_weights: vec![(PublicKey::default(), 1)],
    };
    assert!(!keyed.is_impossible());
    assert!(!keyed.is_empty());
  }
}
