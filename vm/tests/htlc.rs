use {
  common::{chain, create_tank, emergency_tap, fund_tank, general_tap},
  sha2::{Digest, Sha256},
  tnt_primitives::{
    AccessoryAddress,
    AccountId,
    AssetId,
    FlowLimit,
    HashPreimageRequirement,
    HashValue,
    Query,
    Sink,
    TapId,
    TapOpen,
    TapRequirement,
    TargetedQuery,
  },
  tnt_vm::{apply_tap_open, Environment, Error, SemanticError, TankStore},
};

mod common;

/// A hash/time-lock contract: Alice locks 100 of an asset such that Bob
/// can claim it by revealing the preimage of a hash.
#[test]
fn htlc_happy_path() -> anyhow::Result<()> {
  let (mut store, mut env, parameters) = chain();
  let alice = AccountId(1);
  let bob = AccountId(2);
  let asset = AssetId(7);

  let preimage = b"pay to bob before friday".to_vec();
  let digest: [u8; 32] = Sha256::digest(&preimage).into();

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
        vec![TapRequirement::HashPreimage(HashPreimageRequirement {
          hash: HashValue::Sha256(digest),
          preimage_size: Some(preimage.len() as u16),
        })],
      ),
    ],
    vec![],
  )?;
  fund_tank(&mut store, tank_id, 100);

  let open = TapOpen {
    payer: bob,
    tap_to_open: TapId::on_tank(tank_id, 1),
    release_amount: FlowLimit::Amount(100),
    deposit_claimed: None,
    tap_open_count: 1,
    queries: vec![TargetedQuery {
      query: Query::RevealHashPreimage {
        preimage: preimage.clone(),
      },
      target: Some(AccessoryAddress::requirement(1, 0)),
    }],
    required_authorities: vec![],
  };
  env.credit(bob, AssetId::NATIVE, 1_000_000);
  let report = apply_tap_open(&mut store, &mut env, &parameters, &open)?;

  assert_eq!(report.tap_flows.len(), 1);
  let flow = &report.tap_flows[0];
  assert_eq!(flow.amount_released, 100);
  assert_eq!(flow.source_tap, TapId::on_tank(tank_id, 1));
  assert_eq!(flow.flow_path, vec![Sink::Account(bob)]);

  // nobody's open authority was needed
  assert!(report.authorities_required.is_empty());

  // the committed credit records the full origin-prefixed deposit path
  assert_eq!(report.account_credits.len(), 1);
  let credit = &report.account_credits[0];
  assert_eq!((credit.account, credit.asset, credit.amount), (bob, asset, 100));
  assert_eq!(credit.path, vec![Sink::Tank(tank_id), Sink::Account(bob)]);

  assert_eq!(store.get(tank_id).unwrap().balance, 0);
  assert_eq!(env.balance(bob, asset), 100);
  Ok(())
}

#[test]
fn htlc_rejects_wrong_preimage() -> anyhow::Result<()> {
  let (mut store, mut env, parameters) = chain();
  let alice = AccountId(1);
  let bob = AccountId(2);
  let asset = AssetId(7);

  let digest: [u8; 32] = Sha256::digest(b"the real preimage").into();
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
        vec![TapRequirement::HashPreimage(HashPreimageRequirement {
          hash: HashValue::Sha256(digest),
          preimage_size: None,
        })],
      ),
    ],
    vec![],
  )?;
  fund_tank(&mut store, tank_id, 100);

  let open = TapOpen {
    payer: bob,
    tap_to_open: TapId::on_tank(tank_id, 1),
    release_amount: FlowLimit::Amount(100),
    deposit_claimed: None,
    tap_open_count: 1,
    queries: vec![TargetedQuery {
      query: Query::RevealHashPreimage {
        preimage: b"a guess".to_vec(),
      },
      target: Some(AccessoryAddress::requirement(1, 0)),
    }],
    required_authorities: vec![],
  };
  env.credit(bob, AssetId::NATIVE, 1_000_000);
  let result = apply_tap_open(&mut store, &mut env, &parameters, &open);
  assert!(matches!(
    result,
    Err(Error::Semantic(SemanticError::PreimageMismatch))
  ));

  // the failed attempt left no trace
  assert_eq!(store.get(tank_id).unwrap().balance, 100);
  assert_eq!(env.balance(bob, asset), 0);
  Ok(())
}

/// Without the reveal query the requirement locks the tap outright.
#[test]
fn htlc_locked_without_reveal() -> anyhow::Result<()> {
  let (mut store, mut env, parameters) = chain();
  let alice = AccountId(1);
  let bob = AccountId(2);
  let asset = AssetId(7);

  let digest: [u8; 32] = Sha256::digest(b"the real preimage").into();
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
        vec![TapRequirement::HashPreimage(HashPreimageRequirement {
          hash: HashValue::Sha256(digest),
          preimage_size: None,
        })],
      ),
    ],
    vec![],
  )?;
  fund_tank(&mut store, tank_id, 100);

  let open = TapOpen {
    payer: bob,
    tap_to_open: TapId::on_tank(tank_id, 1),
    release_amount: FlowLimit::Amount(100),
    deposit_claimed: None,
    tap_open_count: 1,
    queries: vec![],
    required_authorities: vec![],
  };
  env.credit(bob, AssetId::NATIVE, 1_000_000);
  let result = apply_tap_open(&mut store, &mut env, &parameters, &open);
  assert!(matches!(
    result,
    Err(Error::Semantic(SemanticError::TapLocked {
      requirement: 0,
      ..
    }))
  ));
  Ok(())
}
