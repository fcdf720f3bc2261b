use {
  crate::{
    error::ValidationError,
    Error,
    QueryEvaluator,
    StagedTanks,
    TankObject,
    TankStore,
  },
  tnt_primitives::{
    AccessoryAddress,
    Amount,
    FlowLimit,
    Index,
    TankId,
    TapId,
    TapRequirement,
    TimePoint,
  },
};

/// The outcome of scanning a tap's requirements: the tightest release
/// limit and the requirement that imposed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLimit {
  /// Index of the binding requirement; `None` when the tank balance
  /// itself is the limit.
  pub binding_requirement: Option<usize>,
  pub limit: FlowLimit,
}

/// Compute the tightest upper bound the tap's requirements place on a
/// release right now.
///
/// The limit starts at the tank balance, so the result is always
/// bounded; scanning short-circuits once a requirement locks the tap
/// completely.
pub fn max_tap_release<S: TankStore>(
  staging: &mut StagedTanks<S>,
  queries: &QueryEvaluator,
  tank_id: TankId,
  tap_index: Index,
  now: TimePoint,
) -> Result<ReleaseLimit, Error> {
  let tank = staging.tank(tank_id)?.clone();
  let tap = tank.schematic.taps.get(&tap_index).ok_or_else(|| {
    Error::from(ValidationError::NonexistentTap(TapId::on_tank(
      tank_id, tap_index,
    )))
  })?;

  let mut limit = FlowLimit::Amount(tank.balance.max(0));
  let mut binding = None;

  for (index, requirement) in tap.requirements.iter().enumerate() {
    let address = AccessoryAddress::requirement(tap_index, index as Index);
    let requirement_limit = requirement_release_limit(
      staging,
      queries,
      &tank,
      requirement,
      address,
      now,
    )?;
    if requirement_limit < limit {
      limit = requirement_limit;
      binding = Some(index);
    }
    if limit.is_zero() {
      break;
    }
  }

  Ok(ReleaseLimit {
    binding_requirement: binding,
    limit,
  })
}

fn requirement_release_limit<S: TankStore>(
  staging: &mut StagedTanks<S>,
  queries: &QueryEvaluator,
  tank: &TankObject,
  requirement: &TapRequirement,
  address: AccessoryAddress,
  now: TimePoint,
) -> Result<FlowLimit, Error> {
  Ok(match requirement {
    TapRequirement::ImmediateLimit(limit) => FlowLimit::Amount(limit.limit),

    TapRequirement::CumulativeLimit(limit) => {
      let released = tank
        .cumulative_state(address)
        .map(|state| state.amount_released)
        .unwrap_or(0);
      FlowLimit::Amount(limit.limit.saturating_sub(released).max(0))
    }

    TapRequirement::PeriodicLimit(limit) => {
      let period = now.seconds_since(tank.created_at)
        / u64::from(limit.period_secs).max(1);
      match tank.periodic_state(address) {
        // still inside the recorded period: what remains of it
        Some(state) if state.period_num == period => FlowLimit::Amount(
          limit.limit.saturating_sub(state.amount_released).max(0),
        ),
        // the period rolled over, the full limit is available again
        _ => FlowLimit::Amount(limit.limit),
      }
    }

    TapRequirement::TimeLock(lock) => {
      if lock.unlocked_at(now) {
        FlowLimit::Unlimited
      } else {
        FlowLimit::Amount(0)
      }
    }

    TapRequirement::MinimumLevel(level) => {
      FlowLimit::Amount((tank.balance - level.minimum_level).max(0))
    }

    // request requirements and tickets release exactly what the
    // operation's queries consumed for this address
    TapRequirement::Review(_)
    | TapRequirement::Delay(_)
    | TapRequirement::Ticket(_) => {
      sum_allowances(queries.consumed_allowances(address))
    }

    TapRequirement::Documentation(_) => {
      if queries.has_documentation() {
        FlowLimit::Unlimited
      } else {
        FlowLimit::Amount(0)
      }
    }

    TapRequirement::HashPreimage(_) => {
      if queries.preimage_revealed(address) {
        FlowLimit::Unlimited
      } else {
        FlowLimit::Amount(0)
      }
    }

    TapRequirement::Exchange(exchange) => {
      let released = tank
        .exchange_state(address)
        .map(|state| state.amount_released)
        .unwrap_or(0);
      let meter_address =
        AccessoryAddress::attachment(exchange.meter_id.attachment_index);
      let reading = match exchange.meter_id.tank_id {
        Some(meter_tank_id) if meter_tank_id != tank.id => staging
          .tank(meter_tank_id)?
          .meter_state(meter_address)
          .map(|state| state.metered_amount)
          .unwrap_or(0),
        _ => tank
          .meter_state(meter_address)
          .map(|state| state.metered_amount)
          .unwrap_or(0),
      };
      FlowLimit::Amount(exchange.max_release(released, reading))
    }
  })
}

/// Total release the consumed allowances authorize; any unlimited
/// allowance makes the whole sum unlimited.
fn sum_allowances(allowances: &[FlowLimit]) -> FlowLimit {
  let mut total: Amount = 0;
  for allowance in allowances {
    match allowance {
      FlowLimit::Unlimited => return FlowLimit::Unlimited,
      FlowLimit::Amount(amount) => total = total.saturating_add(*amount),
    }
  }
  FlowLimit::Amount(total)
}
