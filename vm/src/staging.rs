use {
  crate::{error::ValidationError, Environment, Error, TankObject, TankStore},
  std::collections::{BTreeMap, BTreeSet},
  tnt_primitives::{AccountId, Amount, AssetId, Sink, TankId},
};

/// An account credit accumulated during a flow, applied only at commit.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountCredit {
  pub account: AccountId,
  pub asset: AssetId,
  pub amount: Amount,
  /// The path the asset flowed through, beginning at the origin; empty
  /// for deposit refunds.
  pub path: Vec<Sink>,
}

/// Everything one operation changes, taken from the staging layer and
/// applied to the store and account balances as a unit.
#[derive(Debug, Default)]
pub struct CommitSet {
  /// Tanks written during the operation.
  pub tanks: Vec<TankObject>,
  /// Tanks destroyed during the operation.
  pub destroyed: Vec<TankId>,
  /// Credits queued for terminal account sinks and deposit refunds.
  pub credits: Vec<AccountCredit>,
}

impl CommitSet {
  /// Write every staged change through to the store and the account
  /// balances. The host serializes operation application, so the whole
  /// set lands atomically from its point of view.
  pub fn apply(
    self,
    store: &mut impl TankStore,
    env: &mut impl Environment,
  ) {
    for tank in self.tanks {
      store.put(tank);
    }
    for id in self.destroyed {
      store.remove(id);
    }
    for credit in self.credits {
      env.adjust_balance(credit.account, credit.asset, credit.amount);
    }
  }
}

/// Copy-on-write view over a tank store.
///
/// The first read of a tank materializes a mutable shadow copy. Writes
/// land on the shadow, and repeated reads return the same shadow, so
/// changes are visible to later reads within the staging lifetime.
/// Nothing reaches the underlying store until the accumulated
/// [`CommitSet`] is taken and applied; dropping the layer instead
/// abandons every change.
pub struct StagedTanks<'a, S: TankStore> {
  base: &'a S,
  shadows: BTreeMap<TankId, TankObject>,
  removed: BTreeSet<TankId>,
  credits: Vec<AccountCredit>,
}

impl<'a, S: TankStore> StagedTanks<'a, S> {
  pub fn new(base: &'a S) -> Self {
    Self {
      base,
      shadows: BTreeMap::new(),
      removed: BTreeSet::new(),
      credits: Vec::new(),
    }
  }

  fn materialize(&mut self, id: TankId) -> Result<(), Error> {
    if self.removed.contains(&id) {
      return Err(ValidationError::NonexistentTank(id).into());
    }
    if !self.shadows.contains_key(&id) {
      let tank = self
        .base
        .get(id)
        .ok_or(ValidationError::NonexistentTank(id))?;
      self.shadows.insert(id, tank);
    }
    Ok(())
  }

  pub fn tank(&mut self, id: TankId) -> Result<&TankObject, Error> {
    self.materialize(id)?;
    Ok(self.shadows.get(&id).expect("materialized above"))
  }

  pub fn tank_mut(&mut self, id: TankId) -> Result<&mut TankObject, Error> {
    self.materialize(id)?;
    Ok(self.shadows.get_mut(&id).expect("materialized above"))
  }

  /// Tombstone a tank; later reads within this staging lifetime fail.
  pub fn remove_tank(&mut self, id: TankId) -> Result<(), Error> {
    self.materialize(id)?;
    self.shadows.remove(&id);
    self.removed.insert(id);
    Ok(())
  }

  pub fn credit_account(&mut self, credit: AccountCredit) {
    self.credits.push(credit);
  }

  /// Everything the staged work would change, ready for atomic
  /// application by the caller.
  pub fn into_commit(self) -> CommitSet {
    CommitSet {
      tanks: self.shadows.into_values().collect(),
      destroyed: self.removed.into_iter().collect(),
      credits: self.credits,
    }
  }
}
