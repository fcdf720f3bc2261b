use {
  core::fmt::{Debug, Display},
  serde::{Deserialize, Serialize},
};

/// Index of a tap, attachment, or requirement within a single tank.
pub type Index = u16;

/// An amount of asset, counted in the smallest unit of its asset type.
pub type Amount = i64;

/// Identifies a tank object in the host's object store.
#[derive(
  Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TankId(pub u64);

/// Identifies an account on the host chain.
#[derive(
  Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AccountId(pub u64);

/// Identifies an asset type on the host chain.
#[derive(
  Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AssetId(pub u64);

impl AssetId {
  /// The host's native asset, in which fees and deposits are paid.
  pub const NATIVE: AssetId = AssetId(0);
}

impl Display for TankId {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Debug for TankId {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "tank({})", self.0)
  }
}

impl Display for AccountId {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Debug for AccountId {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "account({})", self.0)
  }
}

impl Display for AssetId {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Debug for AssetId {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "asset({})", self.0)
  }
}

/// References an attachment, possibly on another tank.
///
/// A missing tank id means "the current tank", resolved from the context
/// the reference is used in.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct AttachmentId {
  pub tank_id: Option<TankId>,
  pub attachment_index: Index,
}

/// References a tap, possibly on another tank.
///
/// A missing tank id means "the current tank", resolved from the context
/// the reference is used in.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct TapId {
  pub tank_id: Option<TankId>,
  pub tap_index: Index,
}

impl TapId {
  pub fn on_tank(tank_id: TankId, tap_index: Index) -> Self {
    Self {
      tank_id: Some(tank_id),
      tap_index,
    }
  }
}

/// A point in time, in seconds since the unix epoch.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
pub struct TimePoint(pub u64);

impl TimePoint {
  /// Seconds elapsed since an earlier point; zero if `earlier` is later.
  pub fn seconds_since(self, earlier: TimePoint) -> u64 {
    self.0.saturating_sub(earlier.0)
  }

  pub fn plus_seconds(self, seconds: u64) -> TimePoint {
    TimePoint(self.0.saturating_add(seconds))
  }
}

#[cfg(test)]
mod tests {
  use super::TimePoint;

  #[test]
  fn time_point_arithmetic() {
    let t0 = TimePoint(100);
    let t1 = t0.plus_seconds(50);

    assert_eq!(t1, TimePoint(150));
    assert_eq!(t1.seconds_since(t0), 50);
    assert_eq!(t0.seconds_since(t1), 0);
    assert_eq!(TimePoint(u64::MAX).plus_seconds(1), TimePoint(u64::MAX));
  }
}
