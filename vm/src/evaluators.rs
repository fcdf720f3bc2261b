use {
  crate::{
    error::{
      AuthorizationError,
      ResourceError,
      SemanticError,
      ValidationError,
    },
    evaluate_tap_flow,
    AccountCredit,
    Environment,
    Error,
    QueryEvaluator,
    StagedTanks,
    TankObject,
    TankStore,
    TapFlowReport,
  },
  tnt_primitives::{
    AssetId,
    Authority,
    Parameters,
    TankCreate,
    TankDelete,
    TankId,
    TankQuery,
    TankSchematic,
    TankUpdate,
    TankValidator,
    TapOpen,
  },
  tracing::debug,
};

/// Declared authorities must equal the set the operation actually
/// demands: missing ones block the operation, extra ones are rejected
/// as unused.
fn check_required_authorities(
  declared: &[Authority],
  demanded: &[Authority],
) -> Result<(), Error> {
  for authority in demanded {
    if !declared.contains(authority) {
      return Err(AuthorizationError::MissingRequiredAuthority.into());
    }
  }
  for authority in declared {
    if !demanded.contains(authority) {
      return Err(AuthorizationError::UnusedAuthority.into());
    }
  }
  Ok(())
}

fn emergency_open_authority(tank: &TankObject) -> Option<Authority> {
  tank
    .schematic
    .taps
    .get(&0)
    .and_then(|tap| tap.open_authority.clone())
}

/// Create a tank, debiting the payer for the deposit and fee.
pub fn apply_tank_create<S: TankStore, E: Environment>(
  store: &mut S,
  env: &mut E,
  parameters: &Parameters,
  op: &TankCreate,
) -> Result<TankId, Error> {
  op.validate()?;

  let schematic = TankSchematic::from_create_op(op);
  let lookup = |id: TankId| store.get(id).map(|tank| tank.schematic);
  let validator = TankValidator::with_lookup(
    &schematic,
    parameters.max_sink_chain_length,
    &lookup,
    None,
  );
  validator.validate_tank()?;

  let deposit = validator.calculate_deposit(parameters);
  if op.deposit_amount != deposit {
    return Err(
      ValidationError::IncorrectDeposit {
        expected: deposit,
        declared: op.deposit_amount,
      }
      .into(),
    );
  }

  let fee = op.calculate_fee(&parameters.tank_create_fee);
  let due = deposit.saturating_add(fee);
  if env.balance(op.payer, AssetId::NATIVE) < due {
    return Err(ResourceError::InsufficientPayerBalance(op.payer).into());
  }
  env.adjust_balance(op.payer, AssetId::NATIVE, -due);

  let id = store.next_id();
  store.put(TankObject::new(id, schematic, deposit, env.now()));

  debug!(tank = %id, deposit, "created tank");
  Ok(id)
}

/// Update a tank's accessories and rebalance its bonded deposit.
pub fn apply_tank_update<S: TankStore, E: Environment>(
  store: &mut S,
  env: &mut E,
  parameters: &Parameters,
  op: &TankUpdate,
) -> Result<(), Error> {
  op.validate()?;

  let old = store
    .get(op.tank_id)
    .ok_or(ValidationError::NonexistentTank(op.tank_id))?;
  if emergency_open_authority(&old).as_ref() != Some(&op.update_authority) {
    return Err(AuthorizationError::BadUpdateAuthority.into());
  }

  let mut updated = old.clone();
  updated.schematic.apply_update(op);

  let lookup = |id: TankId| store.get(id).map(|tank| tank.schematic);
  let validator = TankValidator::with_lookup(
    &updated.schematic,
    parameters.max_sink_chain_length,
    &lookup,
    Some(op.tank_id),
  );
  validator.validate_tank()?;

  let new_deposit = validator.calculate_deposit(parameters);
  let expected_delta = new_deposit - old.deposit;
  if op.deposit_delta != expected_delta {
    return Err(
      ValidationError::IncorrectDepositDelta {
        expected: expected_delta,
        declared: op.deposit_delta,
      }
      .into(),
    );
  }

  let fee = op.calculate_fee(&parameters.tank_update_fee);
  let due = fee.saturating_add(expected_delta.max(0));
  if env.balance(op.payer, AssetId::NATIVE) < due {
    return Err(ResourceError::InsufficientPayerBalance(op.payer).into());
  }

  // removed and replaced accessories lose their state
  for id in op
    .attachments_to_remove
    .iter()
    .chain(op.attachments_to_replace.keys())
  {
    updated.clear_attachment_state(*id);
  }
  for id in op.taps_to_remove.iter().chain(op.taps_to_replace.keys()) {
    updated.clear_tap_state(*id);
  }
  updated.deposit = new_deposit;
  updated.restrictor_id = updated.schematic.deposit_source_restrictor();

  // a negative delta refunds part of the bonded deposit
  env.adjust_balance(op.payer, AssetId::NATIVE, -fee - expected_delta);
  store.put(updated);

  debug!(tank = %op.tank_id, deposit_delta = expected_delta, "updated tank");
  Ok(())
}

/// Destroy an empty tank, refunding its deposit to the payer.
pub fn apply_tank_delete<S: TankStore, E: Environment>(
  store: &mut S,
  env: &mut E,
  parameters: &Parameters,
  op: &TankDelete,
) -> Result<(), Error> {
  op.validate()?;

  let old = store
    .get(op.tank_id)
    .ok_or(ValidationError::NonexistentTank(op.tank_id))?;
  if emergency_open_authority(&old).as_ref() != Some(&op.delete_authority) {
    return Err(AuthorizationError::BadDeleteAuthority.into());
  }
  if old.balance != 0 {
    return Err(SemanticError::TankNotEmpty.into());
  }
  if op.deposit_claimed != old.deposit {
    return Err(SemanticError::IncorrectDepositClaim.into());
  }

  let fee = op.calculate_fee(&parameters.tank_delete_fee);
  if env.balance(op.payer, AssetId::NATIVE).saturating_add(old.deposit) < fee
  {
    return Err(ResourceError::InsufficientPayerBalance(op.payer).into());
  }
  env.adjust_balance(op.payer, AssetId::NATIVE, old.deposit - fee);
  store.remove(op.tank_id);

  debug!(tank = %op.tank_id, "deleted tank");
  Ok(())
}

/// Apply queries to a tank without opening any tap.
pub fn apply_tank_query<S: TankStore, E: Environment>(
  store: &mut S,
  env: &mut E,
  parameters: &Parameters,
  op: &TankQuery,
) -> Result<(), Error> {
  op.validate()?;

  let fee = op.calculate_fee(&parameters.tank_query_fee);
  if env.balance(op.payer, AssetId::NATIVE) < fee {
    return Err(ResourceError::InsufficientPayerBalance(op.payer).into());
  }

  let mut staging = StagedTanks::new(&*store);
  let evaluator = QueryEvaluator::apply(
    &mut staging,
    &*env,
    op.tank_to_query,
    &op.queries,
  )?;
  check_required_authorities(
    &op.required_authorities,
    evaluator.required_authorities(),
  )?;

  let commit = staging.into_commit();
  commit.apply(store, env);
  env.adjust_balance(op.payer, AssetId::NATIVE, -fee);
  Ok(())
}

/// Open a tap: apply queries, evaluate the flow cascade, optionally
/// destroy the emptied tank, and commit everything atomically.
pub fn apply_tap_open<S: TankStore, E: Environment>(
  store: &mut S,
  env: &mut E,
  parameters: &Parameters,
  op: &TapOpen,
) -> Result<TapFlowReport, Error> {
  op.validate()?;
  let tank_id = op
    .tap_to_open
    .tank_id
    .ok_or(ValidationError::NonexistentTap(op.tap_to_open))?;

  let fee = op.calculate_fee(&parameters.tap_open_fee);
  if env.balance(op.payer, AssetId::NATIVE) < fee {
    return Err(ResourceError::InsufficientPayerBalance(op.payer).into());
  }

  let mut staging = StagedTanks::new(&*store);
  let evaluator =
    QueryEvaluator::apply(&mut staging, &*env, tank_id, &op.queries)?;

  let max_taps = usize::from(op.tap_open_count.min(parameters.max_taps_to_open));
  let mut report = if op.release_amount.is_zero() {
    // destroy-only open: no flow is evaluated, but the tap must exist
    // and its open authority is still demanded
    let mut report = TapFlowReport::default();
    let tank = staging.tank(tank_id)?;
    let tap = tank
      .schematic
      .taps
      .get(&op.tap_to_open.tap_index)
      .ok_or(ValidationError::NonexistentTap(op.tap_to_open))?;
    if let Some(authority) = tap.open_authority.clone() {
      report.require_authority(tank_id, authority);
    }
    report
  } else {
    evaluate_tap_flow(
      &mut staging,
      &*env,
      &evaluator,
      op.payer,
      op.tap_to_open,
      op.release_amount.clone(),
      max_taps,
      parameters,
    )?
  };

  if let Some(claimed) = op.deposit_claimed {
    let tank = staging.tank(tank_id)?;
    let tap = tank
      .schematic
      .taps
      .get(&op.tap_to_open.tap_index)
      .ok_or(ValidationError::NonexistentTap(op.tap_to_open))?;
    if !tap.destructor_tap {
      return Err(SemanticError::NotDestructorTap.into());
    }
    if tank.balance != 0 {
      return Err(SemanticError::TankNotEmpty.into());
    }
    if tank.deposit != claimed {
      return Err(SemanticError::IncorrectDepositClaim.into());
    }
    staging.remove_tank(tank_id)?;
    staging.credit_account(AccountCredit {
      account: op.payer,
      asset: AssetId::NATIVE,
      amount: claimed,
      path: vec![],
    });
    debug!(tank = %tank_id, claimed, "destroyed tank through destructor tap");
  }

  // declared authorities must exactly cover the queries' demands plus
  // the open authorities of every opened tap
  let mut demanded: Vec<Authority> =
    evaluator.required_authorities().to_vec();
  for authorities in report.authorities_required.values() {
    for authority in authorities {
      if !demanded.contains(authority) {
        demanded.push(authority.clone());
      }
    }
  }
  check_required_authorities(&op.required_authorities, &demanded)?;

  let commit = staging.into_commit();
  report.account_credits = commit.credits.clone();
  commit.apply(store, env);
  env.adjust_balance(op.payer, AssetId::NATIVE, -fee);

  debug!(flows = report.tap_flows.len(), "tap open committed");
  Ok(report)
}
