use {
  crate::{
    Amount,
    AttachmentId,
    Authority,
    FlowLimit,
    Index,
    TankId,
    TimePoint,
  },
  ed25519_dalek::PublicKey,
  multihash::Multihash,
  multihash_codetable::{Code, MultihashDigest, Sha3_256},
  multihash_derive::Hasher,
  serde::{Deserialize, Serialize},
  std::collections::BTreeMap,
};

/// A flat cap on the amount released by any single opening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmediateFlowLimit {
  pub limit: Amount,
}

/// A cap on the total released through the tap over its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeFlowLimit {
  pub limit: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeLimitState {
  pub amount_released: Amount,
}

/// A cap on the total released within each fixed-length period, with
/// periods measured from the tank's creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicFlowLimit {
  pub period_secs: u32,
  pub limit: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodicLimitState {
  /// The period the release tally below belongs to.
  pub period_num: u64,
  pub amount_released: Amount,
}

/// Locks and unlocks the tap on a fixed schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLock {
  pub start_locked: bool,
  /// The lock state toggles at each of these times.
  pub lock_unlock_times: Vec<TimePoint>,
}

impl TimeLock {
  /// Whether the tap is unlocked at the given time.
  pub fn unlocked_at(&self, now: TimePoint) -> bool {
    let toggles = self
      .lock_unlock_times
      .iter()
      .filter(|time| **time <= now)
      .count();
    self.start_locked == (toggles % 2 == 1)
  }
}

/// Keeps the tap from draining the tank below a floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumTankLevel {
  pub minimum_level: Amount,
}

/// Requires a request that has been reviewed and approved before the
/// tap opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequirement {
  /// Authority which approves or denies requests.
  pub reviewer: Authority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
  pub request_amount: FlowLimit,
  pub request_comment: Option<String>,
  pub approved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
  /// Requests made so far; assigns request ids.
  pub request_counter: Index,
  pub pending_requests: BTreeMap<Index, ReviewRequest>,
}

/// Requires a non-empty documentation string when the tap is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationRequirement {}

/// Requires a request that has sat out a fixed delay before the tap
/// opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayRequirement {
  /// Authority which can veto a request during the delay.
  pub veto_authority: Option<Authority>,
  pub delay_period_secs: u32,
  /// Cap on outstanding requests; zero means no cap.
  pub request_limit: Index,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayRequest {
  pub delay_period_start: TimePoint,
  pub request_amount: FlowLimit,
  pub request_comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayState {
  /// Requests made so far; assigns request ids.
  pub request_counter: Index,
  pub pending_requests: BTreeMap<Index, DelayRequest>,
}

/// The digest kinds a hash lock can commit to.
///
/// Variant order is part of the wire format: new variants append at the
/// end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashValue {
  Sha256([u8; 32]),
  Sha1([u8; 20]),
  Ripemd160([u8; 20]),
  /// Bitcoin-style hash160: ripemd160 of sha256.
  Hash160([u8; 20]),
}

impl HashValue {
  /// Check a candidate preimage against the committed digest.
  pub fn matches(&self, preimage: &[u8]) -> bool {
    use {
      ripemd::Ripemd160,
      sha1::Sha1,
      sha2::{Digest, Sha256},
    };
    match self {
      HashValue::Sha256(digest) => {
        Sha256::digest(preimage).as_slice() == digest
      }
      HashValue::Sha1(digest) => Sha1::digest(preimage).as_slice() == digest,
      HashValue::Ripemd160(digest) => {
        Ripemd160::digest(preimage).as_slice() == digest
      }
      HashValue::Hash160(digest) => {
        Ripemd160::digest(Sha256::digest(preimage)).as_slice() == digest
      }
    }
  }

  pub fn is_null(&self) -> bool {
    match self {
      HashValue::Sha256(digest) => digest.iter().all(|byte| *byte == 0),
      HashValue::Sha1(digest)
      | HashValue::Ripemd160(digest)
      | HashValue::Hash160(digest) => digest.iter().all(|byte| *byte == 0),
    }
  }
}

/// Requires an argument containing the preimage of a committed hash in
/// order to open the tap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashPreimageRequirement {
  pub hash: HashValue,
  /// Expected preimage size in bytes; a preimage of a different size is
  /// rejected. Absent means any size is accepted.
  pub preimage_size: Option<u16>,
}

/// Requires a ticket counter-signed by a declared key to open the tap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRequirement {
  /// Key that must sign tickets to validate them.
  pub ticket_signer: PublicKey,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketState {
  /// Tickets used so far to authorize a release.
  pub tickets_consumed: Index,
}

/// A signed authorization to open one specific tap once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
  /// Tank containing the tap this ticket is for.
  pub tank_id: TankId,
  pub tap_index: Index,
  pub requirement_index: Index,
  /// Maximum release this ticket authorizes.
  pub max_withdrawal: FlowLimit,
  /// Must equal the requirement's consumed-ticket count to be valid.
  pub ticket_number: Index,
}

impl Ticket {
  /// The digest a ticket signer signs.
  ///
  /// The encoded field order is fixed; changing it would invalidate
  /// every outstanding ticket.
  pub fn digest(&self) -> Multihash<64> {
    let mut hasher = Sha3_256::default();
    hasher.update(
      &bincode::serialize(&(
        self.tank_id,
        self.tap_index,
        self.requirement_index,
        &self.max_withdrawal,
        self.ticket_number,
      ))
      .unwrap(),
    );
    Code::Sha3_256.wrap(hasher.finalize()).unwrap()
  }

  /// Whether `signature` is the signer's signature over this ticket's
  /// digest.
  pub fn verify_signature(
    &self,
    signer: &PublicKey,
    signature: &ed25519_dalek::Signature,
  ) -> bool {
    use ed25519_dalek::Verifier;
    signer.verify(&self.digest().to_bytes(), signature).is_ok()
  }
}

/// Releases in proportion to what a monitored meter has taken in.
///
/// The maximum release is
/// `meter_reading / tick_amount * release_per_tick - amount_released`,
/// so releases come in ticks: once the meter has received a full tick
/// amount, the tap will release one tick's worth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRequirement {
  /// The meter to read.
  pub meter_id: AttachmentId,
  /// Amount released per tick of the meter.
  pub release_per_tick: Amount,
  /// Amount of metered asset per tick.
  pub tick_amount: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeState {
  pub amount_released: Amount,
}

impl ExchangeRequirement {
  pub fn max_release(&self, released: Amount, meter_reading: Amount) -> Amount {
    (meter_reading / self.tick_amount)
      .saturating_mul(self.release_per_tick)
      .saturating_sub(released)
      .max(0)
  }
}

/// A condition or limit on opening one tap.
///
/// Variant order is part of the wire format: new variants append at the
/// end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TapRequirement {
  ImmediateLimit(ImmediateFlowLimit),
  CumulativeLimit(CumulativeFlowLimit),
  PeriodicLimit(PeriodicFlowLimit),
  TimeLock(TimeLock),
  MinimumLevel(MinimumTankLevel),
  Review(ReviewRequirement),
  Documentation(DocumentationRequirement),
  Delay(DelayRequirement),
  HashPreimage(HashPreimageRequirement),
  Ticket(TicketRequirement),
  Exchange(ExchangeRequirement),
}
