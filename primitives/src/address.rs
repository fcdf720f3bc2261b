use {
  crate::{
    CumulativeLimitState,
    DelayState,
    ExchangeState,
    Index,
    MeterState,
    PeriodicLimitState,
    ReviewState,
    TicketState,
  },
  serde::{Deserialize, Serialize},
  std::ops::RangeInclusive,
};

/// Address of one accessory slot on a tank.
///
/// The derived ordering places every attachment address before every
/// requirement address, and orders each class by its natural key, so a
/// tank's accessory-state map can be range-scanned per tap.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
pub enum AccessoryAddress {
  Attachment { attachment_index: Index },
  Requirement { tap_index: Index, requirement_index: Index },
}

impl AccessoryAddress {
  pub fn attachment(attachment_index: Index) -> Self {
    AccessoryAddress::Attachment { attachment_index }
  }

  pub fn requirement(tap_index: Index, requirement_index: Index) -> Self {
    AccessoryAddress::Requirement {
      tap_index,
      requirement_index,
    }
  }

  /// The range covering every requirement address on one tap; used to
  /// drop all of a tap's requirement state when the tap is removed or
  /// replaced.
  pub fn requirement_range(
    tap_index: Index,
  ) -> RangeInclusive<AccessoryAddress> {
    AccessoryAddress::requirement(tap_index, 0)
      ..=AccessoryAddress::requirement(tap_index, Index::MAX)
  }
}

/// Memory for the accessory kinds that keep any; an absent entry means
/// the default state.
///
/// Variant order is part of the stored format: new variants append at
/// the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccessoryState {
  Meter(MeterState),
  CumulativeLimit(CumulativeLimitState),
  PeriodicLimit(PeriodicLimitState),
  Review(ReviewState),
  Delay(DelayState),
  Ticket(TicketState),
  Exchange(ExchangeState),
}
