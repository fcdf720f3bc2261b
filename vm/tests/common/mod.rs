use {
  tnt_primitives::{
    AccountId,
    Amount,
    AssetId,
    Authority,
    Parameters,
    Sink,
    Tap,
    TankCreate,
    TankId,
    TapRequirement,
    TankAttachment,
  },
  tnt_vm::{
    apply_tank_create,
    InMemoryEnvironment,
    InMemoryTankStore,
    TankStore,
  },
};

/// A throwaway chain: empty store, default parameters, everyone
/// authorized for everything.
pub fn chain() -> (InMemoryTankStore, InMemoryEnvironment, Parameters) {
  (
    InMemoryTankStore::default(),
    InMemoryEnvironment::default(),
    Parameters::default(),
  )
}

/// The emergency tap every tank must carry at id 0.
pub fn emergency_tap(owner: AccountId) -> Tap {
  Tap {
    connected_sink: Some(Sink::Account(owner)),
    open_authority: Some(Authority::single_account(owner)),
    connect_authority: Some(Authority::single_account(owner)),
    requirements: vec![],
    destructor_tap: true,
  }
}

/// A tap anyone may open, releasing into `destination` when its
/// requirements allow.
pub fn general_tap(
  destination: Sink,
  requirements: Vec<TapRequirement>,
) -> Tap {
  Tap {
    connected_sink: Some(destination),
    open_authority: None,
    connect_authority: None,
    requirements,
    destructor_tap: false,
  }
}

/// The deposit the chain will demand for this accessory load.
pub fn expected_deposit(
  parameters: &Parameters,
  taps: &[Tap],
  attachments: &[TankAttachment],
) -> Amount {
  let accessories = attachments.len()
    + taps.iter().map(|tap| tap.requirements.len()).sum::<usize>();
  parameters.deposit_base
    + parameters.deposit_per_accessory * accessories as Amount
}

/// Create a tank through the real creation path, funding the payer
/// generously enough for the deposit and all later fees.
pub fn create_tank(
  store: &mut InMemoryTankStore,
  env: &mut InMemoryEnvironment,
  parameters: &Parameters,
  payer: AccountId,
  asset: AssetId,
  taps: Vec<Tap>,
  attachments: Vec<TankAttachment>,
) -> anyhow::Result<TankId> {
  let deposit = expected_deposit(parameters, &taps, &attachments);
  env.credit(payer, AssetId::NATIVE, deposit + 1_000_000);
  let op = TankCreate {
    payer,
    deposit_amount: deposit,
    asset_type: asset,
    taps,
    attachments,
  };
  Ok(apply_tank_create(store, env, parameters, &op)?)
}

/// Put asset into a tank directly, standing in for a deposit flow.
pub fn fund_tank(store: &mut InMemoryTankStore, id: TankId, amount: Amount) {
  let mut tank = store.get(id).expect("tank must exist");
  tank.balance += amount;
  store.put(tank);
}
