use {
  common::{chain, create_tank, emergency_tap, expected_deposit, fund_tank, general_tap},
  tnt_primitives::{
    AccountId,
    AssetId,
    Authority,
    FlowLimit,
    ImmediateFlowLimit,
    Sink,
    TankCreate,
    TankDelete,
    TankUpdate,
    TapId,
    TapOpen,
    TapRequirement,
  },
  tnt_vm::{
    apply_tank_create,
    apply_tank_delete,
    apply_tank_update,
    apply_tap_open,
    AuthorizationError,
    Environment,
    Error,
    SemanticError,
    TankStore,
    ValidationError,
  },
};

mod common;

#[test]
fn create_debits_deposit_and_fee() -> anyhow::Result<()> {
  let (mut store, mut env, parameters) = chain();
  let alice = AccountId(1);
  let asset = AssetId(2);

  let taps = vec![emergency_tap(alice)];
  let deposit = expected_deposit(&parameters, &taps, &[]);
  env.credit(alice, AssetId::NATIVE, 10_000);

  let op = TankCreate {
    payer: alice,
    deposit_amount: deposit,
    asset_type: asset,
    taps: taps.clone(),
    attachments: vec![],
  };
  let fee = op.calculate_fee(&parameters.tank_create_fee);
  let tank_id = apply_tank_create(&mut store, &mut env, &parameters, &op)?;

  assert_eq!(store.get(tank_id).unwrap().deposit, deposit);
  assert_eq!(
    env.balance(alice, AssetId::NATIVE),
    10_000 - deposit - fee
  );

  // a mispriced deposit is refused outright
  let wrong = TankCreate {
    deposit_amount: deposit + 1,
    ..op
  };
  let result = apply_tank_create(&mut store, &mut env, &parameters, &wrong);
  assert!(matches!(
    result,
    Err(Error::Validation(ValidationError::IncorrectDeposit { .. }))
  ));
  Ok(())
}

#[test]
fn update_requires_emergency_authority() -> anyhow::Result<()> {
  let (mut store, mut env, parameters) = chain();
  let alice = AccountId(1);
  let mallory = AccountId(66);
  let asset = AssetId(2);

  let tank_id = create_tank(
    &mut store,
    &mut env,
    &parameters,
    alice,
    asset,
    vec![emergency_tap(alice)],
    vec![],
  )?;

  let update = |authority: Authority| TankUpdate {
    payer: alice,
    update_authority: authority,
    tank_id,
    deposit_delta: 0,
    taps_to_remove: Default::default(),
    taps_to_replace: Default::default(),
    taps_to_add: vec![general_tap(Sink::Account(alice), vec![])],
    attachments_to_remove: Default::default(),
    attachments_to_replace: Default::default(),
    attachments_to_add: vec![],
  };

  let result = apply_tank_update(
    &mut store,
    &mut env,
    &parameters,
    &update(Authority::single_account(mallory)),
  );
  assert!(matches!(
    result,
    Err(Error::Authorization(AuthorizationError::BadUpdateAuthority))
  ));

  apply_tank_update(
    &mut store,
    &mut env,
    &parameters,
    &update(Authority::single_account(alice)),
  )?;
  let tank = store.get(tank_id).unwrap();
  // the added tap took the next fresh id
  assert!(tank.schematic.taps.contains_key(&1));
  assert_eq!(tank.schematic.tap_counter, 2);
  Ok(())
}

#[test]
fn delete_refunds_deposit() -> anyhow::Result<()> {
  let (mut store, mut env, parameters) = chain();
  let alice = AccountId(1);
  let asset = AssetId(2);

  let tank_id = create_tank(
    &mut store,
    &mut env,
    &parameters,
    alice,
    asset,
    vec![emergency_tap(alice)],
    vec![],
  )?;
  let deposit = store.get(tank_id).unwrap().deposit;

  // a tank with an outstanding balance cannot be deleted
  fund_tank(&mut store, tank_id, 10);
  let op = TankDelete {
    payer: alice,
    delete_authority: Authority::single_account(alice),
    tank_id,
    deposit_claimed: deposit,
  };
  let result = apply_tank_delete(&mut store, &mut env, &parameters, &op);
  assert!(matches!(
    result,
    Err(Error::Semantic(SemanticError::TankNotEmpty))
  ));

  fund_tank(&mut store, tank_id, -10);
  let before = env.balance(alice, AssetId::NATIVE);
  let fee = op.calculate_fee(&parameters.tank_delete_fee);
  apply_tank_delete(&mut store, &mut env, &parameters, &op)?;

  assert!(store.get(tank_id).is_none());
  assert_eq!(env.balance(alice, AssetId::NATIVE), before + deposit - fee);
  Ok(())
}

/// The emergency tap destroys an empty tank and pays the deposit back,
/// with no flows in the report.
#[test]
fn emergency_tap_destroys_empty_tank() -> anyhow::Result<()> {
  let (mut store, mut env, parameters) = chain();
  let alice = AccountId(1);
  let asset = AssetId(2);

  let tank_id = create_tank(
    &mut store,
    &mut env,
    &parameters,
    alice,
    asset,
    vec![emergency_tap(alice)],
    vec![],
  )?;
  let deposit = store.get(tank_id).unwrap().deposit;
  let alice_authority = Authority::single_account(alice);

  let open = TapOpen {
    payer: alice,
    tap_to_open: TapId::on_tank(tank_id, 0),
    release_amount: FlowLimit::Amount(0),
    deposit_claimed: Some(deposit),
    tap_open_count: 1,
    queries: vec![],
    required_authorities: vec![alice_authority.clone()],
  };

  // the emergency tap's open authority must be declared
  let undeclared = TapOpen {
    required_authorities: vec![],
    ..open.clone()
  };
  let result = apply_tap_open(&mut store, &mut env, &parameters, &undeclared);
  assert!(matches!(
    result,
    Err(Error::Authorization(
      AuthorizationError::MissingRequiredAuthority
    ))
  ));

  let before = env.balance(alice, AssetId::NATIVE);
  let fee = open.calculate_fee(&parameters.tap_open_fee);
  let report = apply_tap_open(&mut store, &mut env, &parameters, &open)?;

  assert!(report.tap_flows.is_empty());
  assert_eq!(
    report.authorities_required[&tank_id],
    vec![alice_authority]
  );

  // the refund is reported as a pathless credit to the claimant
  assert_eq!(report.account_credits.len(), 1);
  assert_eq!(report.account_credits[0].account, alice);
  assert_eq!(report.account_credits[0].amount, deposit);
  assert!(report.account_credits[0].path.is_empty());

  assert!(store.get(tank_id).is_none());
  assert_eq!(env.balance(alice, AssetId::NATIVE), before + deposit - fee);
  Ok(())
}

/// Declaring an authority the operation never uses is as fatal as
/// omitting a needed one.
#[test]
fn extra_declared_authority_is_rejected() -> anyhow::Result<()> {
  let (mut store, mut env, parameters) = chain();
  let alice = AccountId(1);
  let bob = AccountId(2);
  let asset = AssetId(2);

  let tank_id = create_tank(
    &mut store,
    &mut env,
    &parameters,
    alice,
    asset,
    vec![
      emergency_tap(alice),
      general_tap(Sink::Account(bob), vec![]),
    ],
    vec![],
  )?;
  fund_tank(&mut store, tank_id, 100);

  let open = TapOpen {
    payer: bob,
    tap_to_open: TapId::on_tank(tank_id, 1),
    release_amount: FlowLimit::Amount(10),
    deposit_claimed: None,
    tap_open_count: 1,
    queries: vec![],
    required_authorities: vec![Authority::single_account(bob)],
  };
  env.credit(bob, AssetId::NATIVE, 1_000);
  let result = apply_tap_open(&mut store, &mut env, &parameters, &open);
  assert!(matches!(
    result,
    Err(Error::Authorization(AuthorizationError::UnusedAuthority))
  ));
  Ok(())
}

/// A failed evaluation must leave the store byte-for-byte unchanged.
#[test]
fn failed_flow_is_a_no_op() -> anyhow::Result<()> {
  let (mut store, mut env, parameters) = chain();
  let alice = AccountId(1);
  let bob = AccountId(2);
  let asset = AssetId(2);

  let tank_id = create_tank(
    &mut store,
    &mut env,
    &parameters,
    alice,
    asset,
    vec![
      emergency_tap(alice),
      general_tap(
        Sink::Account(bob),
        vec![TapRequirement::ImmediateLimit(ImmediateFlowLimit {
          limit: 10,
        })],
      ),
    ],
    vec![],
  )?;
  fund_tank(&mut store, tank_id, 100);
  let before = store.get(tank_id).unwrap();

  let open = TapOpen {
    payer: bob,
    tap_to_open: TapId::on_tank(tank_id, 1),
    release_amount: FlowLimit::Amount(50),
    deposit_claimed: None,
    tap_open_count: 1,
    queries: vec![],
    required_authorities: vec![],
  };
  env.credit(bob, AssetId::NATIVE, 1_000);
  let result = apply_tap_open(&mut store, &mut env, &parameters, &open);
  assert!(matches!(
    result,
    Err(Error::Semantic(SemanticError::RequirementLimitedFlow {
      requirement: 0,
      requested: 50,
      limit: 10,
      ..
    }))
  ));

  assert_eq!(store.get(tank_id).unwrap(), before);
  assert_eq!(env.balance(bob, asset), 0);
  Ok(())
}
