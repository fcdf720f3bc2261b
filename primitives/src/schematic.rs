use {
  crate::{
    operations::{TankCreate, TankUpdate},
    AssetId,
    Index,
    Tap,
    TankAttachment,
  },
  serde::{Deserialize, Serialize},
  std::collections::BTreeMap,
};

/// The declarative structure of a tank: its taps, attachments, and
/// asset type.
///
/// Taps and attachments are keyed by ids assigned from monotone
/// counters; ids of removed items are never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankSchematic {
  /// Tap 0 must exist and is the emergency tap.
  pub taps: BTreeMap<Index, Tap>,
  pub tap_counter: Index,
  pub attachments: BTreeMap<Index, TankAttachment>,
  pub attachment_counter: Index,
  /// The only asset this tank stores.
  pub asset_type: AssetId,
}

impl TankSchematic {
  /// Build the schematic a creation operation describes. Taps and
  /// attachments receive ids in their positional order.
  pub fn from_create_op(op: &TankCreate) -> Self {
    let mut schematic = TankSchematic {
      taps: BTreeMap::new(),
      tap_counter: 0,
      attachments: BTreeMap::new(),
      attachment_counter: 0,
      asset_type: op.asset_type,
    };
    for attachment in &op.attachments {
      schematic
        .attachments
        .insert(schematic.attachment_counter, attachment.clone());
      schematic.attachment_counter += 1;
    }
    for tap in &op.taps {
      schematic.taps.insert(schematic.tap_counter, tap.clone());
      schematic.tap_counter += 1;
    }
    schematic
  }

  /// Apply an update operation: removals first, then replacements, then
  /// additions under freshly assigned ids.
  pub fn apply_update(&mut self, op: &TankUpdate) {
    for id in &op.taps_to_remove {
      self.taps.remove(id);
    }
    for (id, tap) in &op.taps_to_replace {
      self.taps.insert(*id, tap.clone());
    }
    for tap in &op.taps_to_add {
      self.taps.insert(self.tap_counter, tap.clone());
      self.tap_counter += 1;
    }

    for id in &op.attachments_to_remove {
      self.attachments.remove(id);
    }
    for (id, attachment) in &op.attachments_to_replace {
      self.attachments.insert(*id, attachment.clone());
    }
    for attachment in &op.attachments_to_add {
      self
        .attachments
        .insert(self.attachment_counter, attachment.clone());
      self.attachment_counter += 1;
    }
  }

  /// The id of this tank's deposit source restrictor, if it carries
  /// one. Validation guarantees at most one exists.
  pub fn deposit_source_restrictor(&self) -> Option<Index> {
    self.attachments.iter().find_map(|(id, attachment)| {
      matches!(attachment, TankAttachment::Restrictor(_)).then_some(*id)
    })
  }

  /// Total number of accessories (attachments plus tap requirements),
  /// which scales the deposit a tank must bond.
  pub fn accessory_count(&self) -> usize {
    self.attachments.len()
      + self
        .taps
        .values()
        .map(|tap| tap.requirements.len())
        .sum::<usize>()
  }
}

#[cfg(test)]
mod tests {
  use {
    super::TankSchematic,
    crate::{
      operations::{TankCreate, TankUpdate},
      AccountId,
      AssetId,
      Authority,
      Sink,
      Tap,
    },
    std::collections::{BTreeMap, BTreeSet},
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

  fn plain_tap(destination: AccountId) -> Tap {
    Tap {
      connected_sink: Some(Sink::Account(destination)),
      open_authority: None,
      connect_authority: None,
      requirements: vec![],
      destructor_tap: false,
    }
  }

  #[test]
  fn create_assigns_positional_ids() {
    let op = TankCreate {
      payer: AccountId(1),
      deposit_amount: 10,
      asset_type: AssetId(5),
      taps: vec![emergency_tap(AccountId(1)), plain_tap(AccountId(2))],
      attachments: vec![],
    };

    let schematic = TankSchematic::from_create_op(&op);
    assert_eq!(schematic.taps.len(), 2);
    assert_eq!(schematic.tap_counter, 2);
    assert!(schematic.taps.contains_key(&0));
    assert!(schematic.taps.contains_key(&1));
    assert_eq!(schematic.asset_type, AssetId(5));
  }

  #[test]
  fn schematic_round_trips_through_wire_encoding() {
    let op = TankCreate {
      payer: AccountId(1),
      deposit_amount: 10,
      asset_type: AssetId(5),
      taps: vec![emergency_tap(AccountId(1)), plain_tap(AccountId(2))],
      attachments: vec![],
    };
    let schematic = TankSchematic::from_create_op(&op);

    let bytes = rmp_serde::to_vec(&schematic).unwrap();
    let decoded: TankSchematic = rmp_serde::from_slice(&bytes).unwrap();
    assert_eq!(decoded, schematic);
  }

  #[test]
  fn update_tombstones_ids() {
    let op = TankCreate {
      payer: AccountId(1),
      deposit_amount: 10,
      asset_type: AssetId(5),
      taps: vec![
        emergency_tap(AccountId(1)),
        plain_tap(AccountId(2)),
        plain_tap(AccountId(3)),
      ],
      attachments: vec![],
    };
    let mut schematic = TankSchematic::from_create_op(&op);

    let update = TankUpdate {
      payer: AccountId(1),
      update_authority: Authority::single_account(AccountId(1)),
      tank_id: crate::TankId(0),
      deposit_delta: 0,
      taps_to_remove: BTreeSet::from([1]),
      taps_to_replace: BTreeMap::new(),
      taps_to_add: vec![plain_tap(AccountId(4))],
      attachments_to_remove: BTreeSet::new(),
      attachments_to_replace: BTreeMap::new(),
      attachments_to_add: vec![],
    };
    schematic.apply_update(&update);

    // id 1 stays tombstoned, the added tap takes a fresh id
    assert!(!schematic.taps.contains_key(&1));
    assert!(schematic.taps.contains_key(&3));
    assert_eq!(schematic.tap_counter, 4);
  }
}
