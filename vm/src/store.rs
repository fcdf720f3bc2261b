use {
  crate::TankObject,
  std::collections::HashMap,
  tnt_primitives::TankId,
};

/// Host-side persistence for tank objects.
///
/// The enclosing chain owns the real object store; the core only needs
/// to read whole tanks, write updated tanks back, and drop destroyed
/// ones. Tank ids are handed out by the store and never reused, even
/// after the tank under an id is destroyed.
pub trait TankStore {
  /// Retrieve a tank by its id.
  fn get(&self, id: TankId) -> Option<TankObject>;

  /// The id the next created tank will take.
  fn next_id(&self) -> TankId;

  /// Insert a new tank, or overwrite the stored tank under its id.
  fn put(&mut self, tank: TankObject);

  /// Drop a tank. Its id stays retired.
  fn remove(&mut self, id: TankId);
}

/// This store is used in testing and other short-lived scenarios such
/// as simulators or SDK examples.
#[derive(Debug, Default)]
pub struct InMemoryTankStore {
  tanks: HashMap<TankId, TankObject>,
  /// High-water mark of handed-out ids; removal must not lower it.
  next_id: u64,
}

impl TankStore for InMemoryTankStore {
  fn get(&self, id: TankId) -> Option<TankObject> {
    self.tanks.get(&id).cloned()
  }

  fn next_id(&self) -> TankId {
    TankId(self.next_id)
  }

  fn put(&mut self, tank: TankObject) {
    self.next_id = self.next_id.max(tank.id.0 + 1);
    self.tanks.insert(tank.id, tank);
  }

  fn remove(&mut self, id: TankId) {
    self.next_id = self.next_id.max(id.0 + 1);
    self.tanks.remove(&id);
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{InMemoryTankStore, TankStore},
    crate::TankObject,
    std::collections::BTreeMap,
    tnt_primitives::{AssetId, TankId, TankSchematic, TimePoint},
  };

  fn tank(id: TankId, balance: i64) -> TankObject {
    let mut tank = TankObject::new(
      id,
      TankSchematic {
        taps: BTreeMap::new(),
        tap_counter: 0,
        attachments: BTreeMap::new(),
        attachment_counter: 0,
        asset_type: AssetId(1),
      },
      0,
      TimePoint(0),
    );
    tank.balance = balance;
    tank
  }

  #[test]
  fn put_get_remove_round_trip() {
    let mut store = InMemoryTankStore::default();
    assert_eq!(store.next_id(), TankId(0));

    store.put(tank(TankId(0), 100));
    store.put(tank(TankId(1), 200));
    assert_eq!(store.get(TankId(0)).unwrap().balance, 100);
    assert_eq!(store.get(TankId(1)).unwrap().balance, 200);
    assert!(store.get(TankId(2)).is_none());

    // writing under an existing id overwrites the stored tank
    store.put(tank(TankId(0), 150));
    assert_eq!(store.get(TankId(0)).unwrap().balance, 150);

    store.remove(TankId(1));
    assert!(store.get(TankId(1)).is_none());
  }

  #[test]
  fn ids_are_never_reused() {
    let mut store = InMemoryTankStore::default();
    let first = store.next_id();
    store.put(tank(first, 1));
    let second = store.next_id();
    assert_ne!(first, second);
    store.put(tank(second, 2));

    // destroying the newest tank does not resurrect its id
    store.remove(second);
    assert_eq!(store.next_id(), TankId(second.0 + 1));
  }
}
