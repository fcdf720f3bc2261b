use {
  serde::{Deserialize, Serialize},
  std::collections::BTreeMap,
  tnt_primitives::{
    AccessoryAddress,
    AccessoryState,
    Amount,
    CumulativeLimitState,
    DelayState,
    ExchangeState,
    Index,
    MeterState,
    PeriodicLimitState,
    ReviewState,
    TankId,
    TankSchematic,
    TicketState,
    TimePoint,
  },
};

/// A tank: the stored object pairing a schematic with its live balance,
/// bonded deposit, and accessory state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankObject {
  pub id: TankId,
  pub schematic: TankSchematic,
  /// Balance in the tank's asset type.
  pub balance: Amount,
  /// Deposit bonded in the host's native asset, refunded at
  /// destruction.
  pub deposit: Amount,
  /// When the tank was created; periodic limits measure their periods
  /// from here.
  pub created_at: TimePoint,
  /// State of accessories that keep any; an absent entry means the
  /// default state.
  pub accessory_states: BTreeMap<AccessoryAddress, AccessoryState>,
  /// Cached id of the deposit source restrictor, if the tank has one.
  pub restrictor_id: Option<Index>,
}

macro_rules! state_accessor {
  ($get:ident, $get_mut:ident, $variant:ident, $state:ty) => {
    /// Read this accessory's state; `None` is the default state.
    pub fn $get(&self, address: AccessoryAddress) -> Option<&$state> {
      match self.accessory_states.get(&address) {
        Some(AccessoryState::$variant(state)) => Some(state),
        _ => None,
      }
    }

    /// Read or create this accessory's state. Returns `None` when the
    /// address holds state of another kind, which signals a bug in
    /// state bookkeeping.
    pub fn $get_mut(
      &mut self,
      address: AccessoryAddress,
    ) -> Option<&mut $state> {
      let state = self
        .accessory_states
        .entry(address)
        .or_insert_with(|| AccessoryState::$variant(Default::default()));
      match state {
        AccessoryState::$variant(state) => Some(state),
        _ => None,
      }
    }
  };
}

impl TankObject {
  pub fn new(
    id: TankId,
    schematic: TankSchematic,
    deposit: Amount,
    created_at: TimePoint,
  ) -> Self {
    let restrictor_id = schematic.deposit_source_restrictor();
    Self {
      id,
      schematic,
      balance: 0,
      deposit,
      created_at,
      accessory_states: BTreeMap::new(),
      restrictor_id,
    }
  }

  state_accessor!(meter_state, meter_state_mut, Meter, MeterState);
  state_accessor!(
    cumulative_state,
    cumulative_state_mut,
    CumulativeLimit,
    CumulativeLimitState
  );
  state_accessor!(
    periodic_state,
    periodic_state_mut,
    PeriodicLimit,
    PeriodicLimitState
  );
  state_accessor!(review_state, review_state_mut, Review, ReviewState);
  state_accessor!(delay_state, delay_state_mut, Delay, DelayState);
  state_accessor!(ticket_state, ticket_state_mut, Ticket, TicketState);
  state_accessor!(exchange_state, exchange_state_mut, Exchange, ExchangeState);

  /// Drop the state of one attachment.
  pub fn clear_attachment_state(&mut self, attachment_index: Index) {
    self
      .accessory_states
      .remove(&AccessoryAddress::attachment(attachment_index));
  }

  /// Drop the state of every requirement on one tap.
  pub fn clear_tap_state(&mut self, tap_index: Index) {
    let stale: Vec<AccessoryAddress> = self
      .accessory_states
      .range(AccessoryAddress::requirement_range(tap_index))
      .map(|(address, _)| *address)
      .collect();
    for address in stale {
      self.accessory_states.remove(&address);
    }
  }
}
