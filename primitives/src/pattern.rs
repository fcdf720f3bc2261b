use crate::{DepositPathPattern, PatternElement, Sink, TankId};

/// A concrete path taken by a deposit: where it came from, and the
/// sinks it traversed on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositPath {
  /// The origin of the flow, when known. A tank origin also seeds the
  /// context used to resolve `SameTank` steps on the chain side.
  pub origin: Option<Sink>,
  pub sink_chain: Vec<Sink>,
}

/// Context-sensitive sink equality.
///
/// `SameTank` on either side resolves against that side's current tank
/// before comparison, and attachment references resolve their implied
/// tank ids the same way. Two `SameTank`s from unknown contexts never
/// compare equal.
pub fn sinks_equal(
  left: &Sink,
  left_current: Option<TankId>,
  right: &Sink,
  right_current: Option<TankId>,
) -> bool {
  match (left, right) {
    (Sink::SameTank, Sink::SameTank) => {
      left_current.is_some() && left_current == right_current
    }
    (Sink::SameTank, Sink::Tank(tank)) => left_current == Some(*tank),
    (Sink::Tank(tank), Sink::SameTank) => right_current == Some(*tank),
    (Sink::Attachment(a), Sink::Attachment(b)) => {
      let left_tank = a.tank_id.or(left_current);
      let right_tank = b.tank_id.or(right_current);
      a.attachment_index == b.attachment_index
        && left_tank.is_some()
        && left_tank == right_tank
    }
    (left, right) => left == right,
  }
}

/// Match a concrete deposit path against a restrictor's pattern list,
/// returning the index of the first matching pattern.
///
/// `destination_tank` is the tank whose restrictor owns the patterns;
/// it seeds the pattern side's current tank for `SameTank` resolution.
pub fn matching_deposit_path(
  patterns: &[DepositPathPattern],
  path: &DepositPath,
  destination_tank: Option<TankId>,
) -> Option<usize> {
  patterns
    .iter()
    .position(|pattern| pattern_matches(pattern, path, destination_tank))
}

fn pattern_matches(
  pattern: &[PatternElement],
  path: &DepositPath,
  destination_tank: Option<TankId>,
) -> bool {
  let mut left_current: Option<TankId> = match &path.origin {
    Some(Sink::Tank(id)) => Some(*id),
    _ => None,
  };
  let mut right_current = destination_tank;
  let mut pi = 0;

  // Origin step. A non-repeatable wildcard consumes the origin outright;
  // a repeatable one stays in place and keeps matching into the chain.
  match pattern.first() {
    None => return false,
    Some(PatternElement::Wildcard { repeatable: false }) => pi = 1,
    Some(PatternElement::Wildcard { repeatable: true }) => {}
    Some(PatternElement::Sink(first)) => {
      match &path.origin {
        Some(origin) => {
          if !sinks_equal(origin, left_current, first, right_current) {
            return false;
          }
        }
        // An unknown origin matches anything except a specific account.
        None => {
          if matches!(first, Sink::Account(_)) {
            return false;
          }
        }
      }
      advance_context(first, &mut right_current);
      pi = 1;
    }
  }

  // Body: scan chain and pattern in lockstep.
  let chain = &path.sink_chain;
  let mut ci = 0;
  while pi < pattern.len() {
    match &pattern[pi] {
      PatternElement::Sink(expected) => {
        if ci >= chain.len()
          || !sinks_equal(&chain[ci], left_current, expected, right_current)
        {
          return false;
        }
        advance_context(&chain[ci], &mut left_current);
        advance_context(expected, &mut right_current);
        ci += 1;
        pi += 1;
      }
      PatternElement::Wildcard { repeatable: false } => {
        if ci >= chain.len() {
          return false;
        }
        advance_context(&chain[ci], &mut left_current);
        ci += 1;
        pi += 1;
      }
      PatternElement::Wildcard { repeatable: true } => {
        // A trailing repeatable wildcard matches the remainder.
        let Some(next) = pattern.get(pi + 1) else {
          return true;
        };
        // Validation forbids a wildcard adjacent to a repeatable one.
        let PatternElement::Sink(expected) = next else {
          return false;
        };
        loop {
          if ci >= chain.len() {
            return false;
          }
          if sinks_equal(&chain[ci], left_current, expected, right_current) {
            break;
          }
          advance_context(&chain[ci], &mut left_current);
          ci += 1;
        }
        advance_context(&chain[ci], &mut left_current);
        advance_context(expected, &mut right_current);
        ci += 1;
        pi += 2;
      }
    }
  }

  ci == chain.len()
}

/// The current tank shifts whenever a walked sink names a tank
/// explicitly.
fn advance_context(sink: &Sink, current: &mut Option<TankId>) {
  match sink {
    Sink::Tank(id) => *current = Some(*id),
    Sink::Attachment(id) => {
      if let Some(tank) = id.tank_id {
        *current = Some(tank);
      }
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{matching_deposit_path, sinks_equal, DepositPath},
    crate::{AccountId, AttachmentId, PatternElement, Sink, TankId},
  };

  fn wildcard(repeatable: bool) -> PatternElement {
    PatternElement::Wildcard { repeatable }
  }

  fn sink(s: Sink) -> PatternElement {
    PatternElement::Sink(s)
  }

  fn attachment(tank_id: Option<TankId>, index: u16) -> Sink {
    Sink::Attachment(AttachmentId {
      tank_id,
      attachment_index: index,
    })
  }

  #[test]
  fn same_tank_equality_needs_context() {
    let t2 = TankId(2);
    assert!(sinks_equal(&Sink::SameTank, Some(t2), &Sink::SameTank, Some(t2)));
    assert!(!sinks_equal(&Sink::SameTank, None, &Sink::SameTank, None));
    assert!(sinks_equal(&Sink::Tank(t2), None, &Sink::SameTank, Some(t2)));
    assert!(sinks_equal(&Sink::SameTank, Some(t2), &Sink::Tank(t2), None));
    assert!(!sinks_equal(&Sink::SameTank, Some(TankId(3)), &Sink::Tank(t2), None));
  }

  #[test]
  fn attachment_equality_resolves_implied_tanks() {
    let t2 = TankId(2);
    assert!(sinks_equal(
      &attachment(None, 1),
      Some(t2),
      &attachment(Some(t2), 1),
      None,
    ));
    assert!(!sinks_equal(
      &attachment(None, 1),
      Some(TankId(3)),
      &attachment(Some(t2), 1),
      None,
    ));
    assert!(!sinks_equal(&attachment(None, 1), None, &attachment(None, 1), None));
  }

  #[test]
  fn exact_pattern_matches() {
    let alice = AccountId(10);
    let t2 = TankId(2);
    let patterns = vec![vec![
      sink(Sink::Account(alice)),
      sink(Sink::Tank(t2)),
    ]];

    let path = DepositPath {
      origin: Some(Sink::Account(alice)),
      sink_chain: vec![Sink::Tank(t2)],
    };
    assert_eq!(matching_deposit_path(&patterns, &path, Some(t2)), Some(0));

    // a flow from another tank does not match an account-origin pattern
    let from_tank = DepositPath {
      origin: Some(Sink::Tank(TankId(3))),
      sink_chain: vec![Sink::Tank(t2)],
    };
    assert_eq!(matching_deposit_path(&patterns, &from_tank, Some(t2)), None);
  }

  #[test]
  fn unknown_origin_rejects_account_patterns() {
    let t2 = TankId(2);
    let account_first =
      vec![vec![sink(Sink::Account(AccountId(10))), sink(Sink::Tank(t2))]];
    let tank_first =
      vec![vec![sink(Sink::Tank(TankId(3))), sink(Sink::Tank(t2))]];

    let path = DepositPath {
      origin: None,
      sink_chain: vec![Sink::Tank(t2)],
    };
    assert_eq!(matching_deposit_path(&account_first, &path, Some(t2)), None);
    assert_eq!(matching_deposit_path(&tank_first, &path, Some(t2)), Some(0));
  }

  #[test]
  fn repeatable_wildcard_spans_attachments() {
    let t2 = TankId(2);
    let patterns = vec![vec![
      sink(Sink::Account(AccountId(10))),
      wildcard(true),
      sink(Sink::SameTank),
    ]];

    let path = DepositPath {
      origin: Some(Sink::Account(AccountId(10))),
      sink_chain: vec![
        attachment(Some(t2), 0),
        attachment(Some(t2), 1),
        Sink::Tank(t2),
      ],
    };
    assert_eq!(matching_deposit_path(&patterns, &path, Some(t2)), Some(0));

    // the chain must still reach the expected terminal
    let elsewhere = DepositPath {
      origin: Some(Sink::Account(AccountId(10))),
      sink_chain: vec![attachment(Some(t2), 0), Sink::Tank(TankId(9))],
    };
    assert_eq!(matching_deposit_path(&patterns, &elsewhere, Some(t2)), None);
  }

  #[test]
  fn trailing_repeatable_wildcard_matches_remainder() {
    let t2 = TankId(2);
    let patterns =
      vec![vec![sink(Sink::Account(AccountId(10))), wildcard(true)]];

    let path = DepositPath {
      origin: Some(Sink::Account(AccountId(10))),
      sink_chain: vec![attachment(Some(t2), 0), Sink::Tank(t2)],
    };
    assert_eq!(matching_deposit_path(&patterns, &path, Some(t2)), Some(0));
  }

  #[test]
  fn single_wildcard_consumes_exactly_one() {
    let t2 = TankId(2);
    let patterns = vec![vec![
      wildcard(false),
      wildcard(false),
      sink(Sink::Tank(t2)),
    ]];

    let matches = DepositPath {
      origin: Some(Sink::Account(AccountId(10))),
      sink_chain: vec![attachment(Some(t2), 0), Sink::Tank(t2)],
    };
    assert_eq!(matching_deposit_path(&patterns, &matches, Some(t2)), Some(0));

    let too_long = DepositPath {
      origin: Some(Sink::Account(AccountId(10))),
      sink_chain: vec![
        attachment(Some(t2), 0),
        attachment(Some(t2), 1),
        Sink::Tank(t2),
      ],
    };
    assert_eq!(matching_deposit_path(&patterns, &too_long, Some(t2)), None);
  }

  #[test]
  fn first_matching_pattern_wins() {
    let t2 = TankId(2);
    let patterns = vec![
      vec![sink(Sink::Account(AccountId(99))), sink(Sink::Tank(t2))],
      vec![wildcard(false), sink(Sink::Tank(t2))],
      vec![sink(Sink::Tank(TankId(3))), wildcard(true)],
    ];

    let path = DepositPath {
      origin: Some(Sink::Account(AccountId(10))),
      sink_chain: vec![Sink::Tank(t2)],
    };
    assert_eq!(matching_deposit_path(&patterns, &path, Some(t2)), Some(1));
  }
}
