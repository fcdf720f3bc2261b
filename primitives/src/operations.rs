use {
  crate::{
    queries as query,
    validation,
    AccountId,
    Amount,
    AssetId,
    Authority,
    FeeParameters,
    FlowLimit,
    Index,
    Tap,
    TapId,
    TankAttachment,
    TankId,
    TankSchematic,
    TankValidator,
    TargetedQuery,
  },
  serde::{Deserialize, Serialize},
  std::collections::{BTreeMap, BTreeSet},
  thiserror::Error,
};

/// Stateless validation cannot see the chain's configured limits, so
/// sink chains are checked against a generous stand-in.
const STATELESS_MAX_CHAIN_LENGTH: u16 = 100;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
  #[error("must have positive deposit")]
  NonPositiveDeposit,
  #[error("deposit claim must not be negative")]
  NegativeDepositClaim,
  #[error("emergency tap cannot be removed; it can only be replaced")]
  EmergencyTapRemoval,
  #[error("tank id must be specified")]
  MissingTankId,
  #[error("required authorities must not contain duplicates")]
  DuplicateRequiredAuthority,
  #[error("query list must not be empty")]
  EmptyQueryList,
  #[error("release amount must not be negative")]
  NegativeReleaseAmount,
  #[error("release amount can only be zero if destroying the tank")]
  ZeroReleaseWithoutDestroy,
  #[error(
    "if destroying the tank, release amount must be unlimited or zero (if \
     the tank is empty)"
  )]
  BadDestroyReleaseAmount,
  #[error("number of taps to open must be at least one")]
  ZeroTapOpenCount,
  #[error(transparent)]
  Validation(#[from] validation::Error),
  #[error(transparent)]
  Query(#[from] query::Error),
}

fn check_unique_authorities(authorities: &[Authority]) -> Result<(), Error> {
  for (index, auth) in authorities.iter().enumerate() {
    if authorities[index + 1..].contains(auth) {
      return Err(Error::DuplicateRequiredAuthority);
    }
  }
  Ok(())
}

fn wire_size<T: Serialize>(value: &T) -> usize {
  rmp_serde::to_vec(value)
    .expect("operation encoding cannot fail")
    .len()
}

fn byte_fee<T: Serialize>(value: &T, params: &FeeParameters) -> Amount {
  params
    .base_fee
    .saturating_add(params.price_per_byte.saturating_mul(wire_size(value) as Amount))
}

/// Creates a new tank holding `asset_type`, debiting the payer for the
/// deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankCreate {
  pub payer: AccountId,
  /// Deposit bonded in the host's native asset.
  pub deposit_amount: Amount,
  pub asset_type: AssetId,
  /// Taps the tank starts with; ids are assigned positionally.
  pub taps: Vec<Tap>,
  /// Attachments the tank starts with; ids are assigned positionally.
  pub attachments: Vec<TankAttachment>,
}

impl TankCreate {
  pub fn calculate_fee(&self, params: &FeeParameters) -> Amount {
    byte_fee(self, params)
  }

  pub fn validate(&self) -> Result<(), Error> {
    if self.deposit_amount <= 0 {
      return Err(Error::NonPositiveDeposit);
    }
    let schematic = TankSchematic::from_create_op(self);
    TankValidator::new(&schematic, STATELESS_MAX_CHAIN_LENGTH)
      .validate_tank()?;
    Ok(())
  }
}

/// Changes the accessories of an existing tank. Ids of removed items
/// are tombstoned; additions receive fresh ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankUpdate {
  pub payer: AccountId,
  /// Must match the emergency tap's open authority.
  pub update_authority: Authority,
  pub tank_id: TankId,
  /// Change in the bonded deposit the updated schematic requires.
  pub deposit_delta: Amount,
  pub taps_to_remove: BTreeSet<Index>,
  pub taps_to_replace: BTreeMap<Index, Tap>,
  pub taps_to_add: Vec<Tap>,
  pub attachments_to_remove: BTreeSet<Index>,
  pub attachments_to_replace: BTreeMap<Index, TankAttachment>,
  pub attachments_to_add: Vec<TankAttachment>,
}

impl TankUpdate {
  pub fn calculate_fee(&self, params: &FeeParameters) -> Amount {
    byte_fee(self, params)
  }

  pub fn validate(&self) -> Result<(), Error> {
    if self.taps_to_remove.contains(&0) {
      return Err(Error::EmergencyTapRemoval);
    }
    validation::check_authority(&self.update_authority, "Update authority")?;

    if let Some(emergency) = self.taps_to_replace.get(&0) {
      validation::check_emergency_tap(emergency)?;
    }
    for (id, tap) in &self.taps_to_replace {
      validation::check_tap(*id, tap)?;
    }
    for (position, tap) in self.taps_to_add.iter().enumerate() {
      validation::check_tap(position as Index, tap)?;
    }
    for (id, attachment) in &self.attachments_to_replace {
      validation::check_attachment(*id, attachment)?;
    }
    for (position, attachment) in self.attachments_to_add.iter().enumerate() {
      validation::check_attachment(position as Index, attachment)?;
    }
    Ok(())
  }
}

/// Destroys an empty tank and refunds its deposit to the payer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankDelete {
  pub payer: AccountId,
  /// Must match the emergency tap's open authority.
  pub delete_authority: Authority,
  pub tank_id: TankId,
  /// Must equal the tank's bonded deposit.
  pub deposit_claimed: Amount,
}

impl TankDelete {
  pub fn calculate_fee(&self, params: &FeeParameters) -> Amount {
    byte_fee(self, params)
  }

  pub fn validate(&self) -> Result<(), Error> {
    if self.deposit_claimed < 0 {
      return Err(Error::NegativeDepositClaim);
    }
    validation::check_authority(&self.delete_authority, "Delete authority")?;
    Ok(())
  }
}

/// Applies queries to a tank without opening any tap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TankQuery {
  pub payer: AccountId,
  pub tank_to_query: TankId,
  pub queries: Vec<TargetedQuery>,
  /// Must name exactly the authorities the queries demand.
  pub required_authorities: Vec<Authority>,
}

impl TankQuery {
  pub fn calculate_fee(&self, params: &FeeParameters) -> Amount {
    byte_fee(self, params)
  }

  pub fn validate(&self) -> Result<(), Error> {
    check_unique_authorities(&self.required_authorities)?;
    if self.queries.is_empty() {
      return Err(Error::EmptyQueryList);
    }
    for targeted in &self.queries {
      targeted.validate(self.tank_to_query)?;
    }
    Ok(())
  }
}

/// Opens a tap for a requested amount, running the given queries first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapOpen {
  /// The account responsible for the flow; receives the deposit when
  /// the tank is destroyed.
  pub payer: AccountId,
  /// The tap to open; the tank id must be specified.
  pub tap_to_open: TapId,
  pub release_amount: FlowLimit,
  /// Claim the deposit and destroy the tank once the release empties
  /// it.
  pub deposit_claimed: Option<Amount>,
  /// How many taps this flow may open, including taps triggered by tap
  /// openers; clamped to the chain-wide cap.
  pub tap_open_count: u16,
  pub queries: Vec<TargetedQuery>,
  /// Must name exactly the authorities the queries and opened taps
  /// demand.
  pub required_authorities: Vec<Authority>,
}

impl TapOpen {
  pub fn calculate_fee(&self, params: &FeeParameters) -> Amount {
    byte_fee(self, params)
  }

  pub fn validate(&self) -> Result<(), Error> {
    check_unique_authorities(&self.required_authorities)?;
    let tank_id = self.tap_to_open.tank_id.ok_or(Error::MissingTankId)?;
    for targeted in &self.queries {
      targeted.validate(tank_id)?;
    }

    if let FlowLimit::Amount(amount) = self.release_amount {
      if amount < 0 {
        return Err(Error::NegativeReleaseAmount);
      }
      if amount == 0 && self.deposit_claimed.is_none() {
        return Err(Error::ZeroReleaseWithoutDestroy);
      }
    }
    if self.deposit_claimed.is_some()
      && !matches!(
        self.release_amount,
        FlowLimit::Unlimited | FlowLimit::Amount(0)
      )
    {
      return Err(Error::BadDestroyReleaseAmount);
    }
    if self.tap_open_count < 1 {
      return Err(Error::ZeroTapOpenCount);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{Error, TankCreate, TapOpen},
    crate::{
      AccountId,
      AssetId,
      Authority,
      FeeParameters,
      FlowLimit,
      Sink,
      Tap,
      TapId,
      TankId,
    },
  };

  fn emergency_tap(owner: AccountId) -> Tap {
    Tap {
      connected_sink: Some(Sink::Account(owner)),
      open_authority: Some(Authority::single_account(owner)),
      connect_authority: Some(Authority::single_account(owner)),
      requirements: vec![],
      destructor_tap: true,
    }
  }

  fn create_op() -> TankCreate {
    TankCreate {
      payer: AccountId(1),
      deposit_amount: 100,
      asset_type: AssetId(1),
      taps: vec![emergency_tap(AccountId(1))],
      attachments: vec![],
    }
  }

  #[test]
  fn create_validates_and_prices_by_size() {
    let op = create_op();
    op.validate().unwrap();

    let fee = op.calculate_fee(&FeeParameters {
      base_fee: 500,
      price_per_byte: 10,
    });
    assert!(fee > 500);

    let no_deposit = TankCreate {
      deposit_amount: 0,
      ..create_op()
    };
    assert_eq!(no_deposit.validate(), Err(Error::NonPositiveDeposit));
  }

  #[test]
  fn open_release_amount_rules() {
    let open = |release_amount, deposit_claimed| TapOpen {
      payer: AccountId(1),
      tap_to_open: TapId::on_tank(TankId(1), 0),
      release_amount,
      deposit_claimed,
      tap_open_count: 1,
      queries: vec![],
      required_authorities: vec![],
    };

    open(FlowLimit::Amount(10), None).validate().unwrap();
    open(FlowLimit::Amount(0), Some(5)).validate().unwrap();
    open(FlowLimit::Unlimited, Some(5)).validate().unwrap();

    assert_eq!(
      open(FlowLimit::Amount(0), None).validate(),
      Err(Error::ZeroReleaseWithoutDestroy)
    );
    assert_eq!(
      open(FlowLimit::Amount(7), Some(5)).validate(),
      Err(Error::BadDestroyReleaseAmount)
    );
    assert_eq!(
      open(FlowLimit::Amount(-1), None).validate(),
      Err(Error::NegativeReleaseAmount)
    );
  }
}
