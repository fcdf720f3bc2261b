use {
  crate::{
    error::{
      AuthorizationError,
      InternalError,
      ResourceError,
      SemanticError,
      ValidationError,
    },
    max_tap_release,
    AccountCredit,
    Environment,
    Error,
    QueryEvaluator,
    SinkFlowProcessor,
    StagedTanks,
    TankStore,
  },
  std::collections::{BTreeMap, VecDeque},
  tnt_primitives::{
    AccessoryAddress,
    AccountId,
    Amount,
    Authority,
    FlowLimit,
    Parameters,
    Sink,
    TankId,
    TapId,
    TapRequirement,
    TimePoint,
  },
  tracing::debug,
};

/// One released flow in a report.
#[derive(Debug, Clone, PartialEq)]
pub struct TapFlow {
  pub amount_released: Amount,
  /// The tap the release came out of.
  pub source_tap: TapId,
  /// The path of the flow, from the tap's connected sink to the
  /// terminal depository.
  pub flow_path: Vec<Sink>,
}

/// The outcome of a full tap-flow evaluation.
#[derive(Debug, Clone, Default)]
pub struct TapFlowReport {
  /// Flows in the order they were processed.
  pub tap_flows: Vec<TapFlow>,
  /// Authorities each tank demanded, in first-encounter order per tank.
  pub authorities_required: BTreeMap<TankId, Vec<Authority>>,
  /// Credits the flow queued for terminal account sinks and deposit
  /// refunds, each carrying the full origin-prefixed path the asset
  /// travelled. Filled in when the operation commits.
  pub account_credits: Vec<AccountCredit>,
}

impl TapFlowReport {
  pub(crate) fn require_authority(
    &mut self,
    tank_id: TankId,
    authority: Authority,
  ) {
    let authorities = self.authorities_required.entry(tank_id).or_default();
    if !authorities.contains(&authority) {
      authorities.push(authority);
    }
  }

  /// Total amount released across all flows.
  pub fn total_released(&self) -> Amount {
    self.tap_flows.iter().map(|flow| flow.amount_released).sum()
  }
}

/// Evaluate a tap opening and every tap flow it triggers.
///
/// Openings triggered by tap openers are flattened into a FIFO queue
/// rather than processed recursively, so invariants hold at dequeue
/// boundaries and `max_taps` caps the whole cascade uniformly: every
/// tap ever enqueued, the root included, counts against the cap. All
/// state lands on the staging layer; the caller commits it on success
/// and discards it on failure.
pub fn evaluate_tap_flow<S: TankStore, E: Environment>(
  staging: &mut StagedTanks<S>,
  env: &E,
  queries: &QueryEvaluator,
  responsible: AccountId,
  root_tap: TapId,
  flow_amount: FlowLimit,
  max_taps: usize,
  parameters: &Parameters,
) -> Result<TapFlowReport, Error> {
  let mut report = TapFlowReport::default();
  let mut queue: VecDeque<(TapId, FlowLimit)> = VecDeque::new();
  queue.push_back((root_tap, flow_amount));
  let mut scheduled = 1usize;

  while let Some((tap_id, amount)) = queue.pop_front() {
    let tank_id = tap_id
      .tank_id
      .ok_or(ValidationError::NonexistentTap(tap_id))?;

    let tank = staging.tank(tank_id)?;
    let tap = tank
      .schematic
      .taps
      .get(&tap_id.tap_index)
      .ok_or(ValidationError::NonexistentTap(tap_id))?;
    let connected = tap
      .connected_sink
      .clone()
      .ok_or(ValidationError::TapNotConnected(tap_id))?;
    let open_authority = tap.open_authority.clone();
    let asset = tank.schematic.asset_type;

    if !env.is_authorized(responsible, asset) {
      return Err(
        AuthorizationError::UnauthorizedForAsset {
          account: responsible,
          asset,
        }
        .into(),
      );
    }
    if let Some(authority) = open_authority {
      report.require_authority(tank_id, authority);
    }

    let release_limit = max_tap_release(
      staging,
      queries,
      tank_id,
      tap_id.tap_index,
      env.now(),
    )?;
    if release_limit.limit.is_zero() {
      return Err(match release_limit.binding_requirement {
        Some(requirement) => {
          SemanticError::TapLocked {
            tap: tap_id,
            requirement,
          }
          .into()
        }
        None => Error::from(ResourceError::TankEmpty(tank_id)),
      });
    }

    let release = match (&amount, &release_limit.limit) {
      (FlowLimit::Amount(requested), FlowLimit::Amount(limit)) => {
        if requested > limit {
          return Err(match release_limit.binding_requirement {
            Some(requirement) => SemanticError::RequirementLimitedFlow {
              tap: tap_id,
              requirement,
              requested: *requested,
              limit: *limit,
            }
            .into(),
            None => ResourceError::InsufficientBalance {
              requested: *requested,
              available: *limit,
            }
            .into(),
          });
        }
        *requested
      }
      (FlowLimit::Unlimited, FlowLimit::Amount(limit)) => *limit,
      // the limit starts at the tank balance, so it is always bounded
      (_, FlowLimit::Unlimited) => {
        return Err(InternalError::UnboundedRelease.into());
      }
    };

    let tank = staging.tank_mut(tank_id)?;
    tank.balance = tank
      .balance
      .checked_sub(release)
      .ok_or(InternalError::BalanceOverflow)?;
    record_release(staging, tap_id, tank_id, release, env.now())?;

    let path = SinkFlowProcessor::new(
      staging,
      env,
      parameters.max_sink_chain_length as usize,
    )
    .release_to_sink(
      Sink::Tank(tank_id),
      connected,
      asset,
      release,
      |tap, amount| {
        if scheduled >= max_taps {
          return Err(ResourceError::MaxTapsExceeded.into());
        }
        scheduled += 1;
        queue.push_back((tap, amount));
        Ok(())
      },
    )?;

    debug!(tap = ?tap_id, release, "processed tap flow");
    report.tap_flows.push(TapFlow {
      amount_released: release,
      source_tap: tap_id,
      flow_path: path,
    });
  }

  Ok(report)
}

/// Advance the release tallies of the opened tap's requirements by the
/// released amount.
fn record_release<S: TankStore>(
  staging: &mut StagedTanks<S>,
  tap_id: TapId,
  tank_id: TankId,
  release: Amount,
  now: TimePoint,
) -> Result<(), Error> {
  let tank = staging.tank_mut(tank_id)?;
  let created_at = tank.created_at;
  let requirements = tank
    .schematic
    .taps
    .get(&tap_id.tap_index)
    .map(|tap| tap.requirements.clone())
    .unwrap_or_default();

  for (index, requirement) in requirements.iter().enumerate() {
    let address =
      AccessoryAddress::requirement(tap_id.tap_index, index as u16);
    match requirement {
      TapRequirement::CumulativeLimit(_) => {
        let state = tank
          .cumulative_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)?;
        state.amount_released = state.amount_released.saturating_add(release);
      }
      TapRequirement::PeriodicLimit(limit) => {
        let period = now.seconds_since(created_at)
          / u64::from(limit.period_secs).max(1);
        let state = tank
          .periodic_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)?;
        if state.period_num == period {
          state.amount_released =
            state.amount_released.saturating_add(release);
        } else {
          state.period_num = period;
          state.amount_released = release;
        }
      }
      TapRequirement::Exchange(_) => {
        let state = tank
          .exchange_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)?;
        state.amount_released = state.amount_released.saturating_add(release);
      }
      _ => {}
    }
  }
  Ok(())
}
