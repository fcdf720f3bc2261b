use {
  crate::{
    error::{
      AuthorizationError,
      InternalError,
      SemanticError,
      ValidationError,
    },
    Environment,
    Error,
    StagedTanks,
    TankObject,
    TankStore,
  },
  std::collections::{BTreeMap, BTreeSet},
  tnt_primitives::{
    lookups::{LookupError, SchematicLookups, SinkAsset},
    validation,
    AccessoryAddress,
    Authority,
    DelayRequest,
    FlowLimit,
    MeterState,
    Query,
    ReviewRequest,
    TankAttachment,
    TankId,
    TapId,
    TapRequirement,
    TargetedQuery,
  },
  tracing::trace,
};

/// Applies pre-flow queries to the staged tank and records their
/// outcomes for the tap-requirement calculator.
///
/// Request consumption, ticket redemption, preimage reveals, and
/// documentation only count for the operation they were applied in, so
/// the evaluator captures them here rather than in tank state.
#[derive(Debug, Default)]
pub struct QueryEvaluator {
  /// Authorities the applied queries demand, in first-encounter order.
  required_authorities: Vec<Authority>,
  /// Release allowances consumed per requirement address: approved
  /// review requests, matured delay requests, and redeemed tickets.
  consumed: BTreeMap<AccessoryAddress, Vec<FlowLimit>>,
  /// Requirement addresses whose hash preimage was revealed.
  revealed: BTreeSet<AccessoryAddress>,
  /// Whether a documentation string was supplied.
  documented: bool,
}

impl QueryEvaluator {
  /// Apply every query in order against the staging layer.
  pub fn apply<S: TankStore>(
    staging: &mut StagedTanks<S>,
    env: &impl Environment,
    tank_id: TankId,
    queries: &[TargetedQuery],
  ) -> Result<QueryEvaluator, Error> {
    let mut evaluator = QueryEvaluator::default();
    for targeted in queries {
      trace!(?targeted, "applying tank query");
      evaluator.apply_one(staging, env, tank_id, targeted)?;
    }
    Ok(evaluator)
  }

  pub fn required_authorities(&self) -> &[Authority] {
    &self.required_authorities
  }

  /// Allowances consumed for one requirement address during this
  /// operation.
  pub fn consumed_allowances(&self, address: AccessoryAddress) -> &[FlowLimit] {
    self
      .consumed
      .get(&address)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  pub fn preimage_revealed(&self, address: AccessoryAddress) -> bool {
    self.revealed.contains(&address)
  }

  pub fn has_documentation(&self) -> bool {
    self.documented
  }

  fn require(&mut self, authority: Authority) {
    if !self.required_authorities.contains(&authority) {
      self.required_authorities.push(authority);
    }
  }

  fn apply_one<S: TankStore>(
    &mut self,
    staging: &mut StagedTanks<S>,
    env: &impl Environment,
    tank_id: TankId,
    targeted: &TargetedQuery,
  ) -> Result<(), Error> {
    match &targeted.query {
      Query::ResetMeter => {
        let address = target(targeted)?;
        let tank = staging.tank_mut(tank_id)?;
        let TankAttachment::Meter(meter) = attachment_at(tank, address)?
        else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        let authority = meter
          .reset_authority
          .clone()
          .or_else(|| emergency_open_authority(tank))
          .ok_or(AuthorizationError::NoAuthorityDeclared)?;
        self.require(authority);
        *meter_state_mut(tank, address)? = MeterState::default();
      }

      Query::ReconnectAttachment { new_sink } => {
        let address = target(targeted)?;
        let tank = staging.tank_mut(tank_id)?;
        let TankAttachment::ConnectAuthority(connect) =
          attachment_at(tank, address)?
        else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        let authority = connect.connect_authority.clone();
        let target_index = connect.attachment_index;

        let rewired = tank
          .schematic
          .attachments
          .get(&target_index)
          .ok_or(ValidationError::NonexistentAttachment(target_index))?;
        let asset = rewired
          .receives_asset()
          .ok_or(InternalError::AssetToNonReceivingAttachment)?;
        check_new_sink(&tank.schematic, new_sink, asset, target_index)?;

        self.require(authority);
        let rewired = tank
          .schematic
          .attachments
          .get_mut(&target_index)
          .expect("presence checked above");
        *rewired
          .output_sink_mut()
          .ok_or(InternalError::AssetToNonReceivingAttachment)? =
          new_sink.clone();
      }

      Query::CreateRequestForReview {
        request_amount,
        comment,
      } => {
        let address = target(targeted)?;
        let tank = staging.tank_mut(tank_id)?;
        let TapRequirement::Review(_) = requirement_at(tank, address)? else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        let state = tank
          .review_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)?;
        let id = state.request_counter;
        state.request_counter += 1;
        state.pending_requests.insert(id, ReviewRequest {
          request_amount: request_amount.clone(),
          request_comment: comment.clone(),
          approved: false,
        });
      }

      Query::ReviewRequestToOpen {
        request_id,
        approved,
        comment: _,
      } => {
        let address = target(targeted)?;
        let tank = staging.tank_mut(tank_id)?;
        let TapRequirement::Review(review) = requirement_at(tank, address)?
        else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        let reviewer = review.reviewer.clone();
        self.require(reviewer);
        let state = tank
          .review_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)?;
        if *approved {
          state
            .pending_requests
            .get_mut(request_id)
            .ok_or(SemanticError::NonexistentRequest(*request_id))?
            .approved = true;
        } else {
          // a denied request cannot be re-approved later
          state
            .pending_requests
            .remove(request_id)
            .ok_or(SemanticError::NonexistentRequest(*request_id))?;
        }
      }

      Query::CancelRequestForReview {
        request_id,
        comment: _,
      } => {
        let address = target(targeted)?;
        let tank = staging.tank_mut(tank_id)?;
        let TapRequirement::Review(_) = requirement_at(tank, address)? else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        tank
          .review_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)?
          .pending_requests
          .remove(request_id)
          .ok_or(SemanticError::NonexistentRequest(*request_id))?;
      }

      Query::ConsumeApprovedRequestToOpen { request_id } => {
        let address = target(targeted)?;
        let tank = staging.tank_mut(tank_id)?;
        let TapRequirement::Review(_) = requirement_at(tank, address)? else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        let state = tank
          .review_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)?;
        let request = state
          .pending_requests
          .remove(request_id)
          .ok_or(SemanticError::NonexistentRequest(*request_id))?;
        if !request.approved {
          return Err(SemanticError::RequestNotApproved(*request_id).into());
        }
        self
          .consumed
          .entry(address)
          .or_default()
          .push(request.request_amount);
      }

      Query::DocumentationString { reason: _ } => {
        self.documented = true;
      }

      Query::CreateRequestForDelay {
        request_amount,
        comment,
      } => {
        let address = target(targeted)?;
        let now = env.now();
        let tank = staging.tank_mut(tank_id)?;
        let TapRequirement::Delay(delay) = requirement_at(tank, address)?
        else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        let request_limit = delay.request_limit;
        let state = tank
          .delay_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)?;
        if request_limit > 0
          && state.pending_requests.len() >= request_limit as usize
        {
          return Err(SemanticError::RequestLimitReached.into());
        }
        let id = state.request_counter;
        state.request_counter += 1;
        state.pending_requests.insert(id, DelayRequest {
          delay_period_start: now,
          request_amount: request_amount.clone(),
          request_comment: comment.clone(),
        });
      }

      Query::VetoRequestInDelay {
        request_id,
        comment: _,
      } => {
        let address = target(targeted)?;
        let tank = staging.tank_mut(tank_id)?;
        let TapRequirement::Delay(delay) = requirement_at(tank, address)?
        else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        let veto = delay
          .veto_authority
          .clone()
          .ok_or(AuthorizationError::NoAuthorityDeclared)?;
        self.require(veto);
        tank
          .delay_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)?
          .pending_requests
          .remove(request_id)
          .ok_or(SemanticError::NonexistentRequest(*request_id))?;
      }

      Query::CancelRequestInDelay {
        request_id,
        comment: _,
      } => {
        let address = target(targeted)?;
        let tank = staging.tank_mut(tank_id)?;
        let TapRequirement::Delay(_) = requirement_at(tank, address)? else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        tank
          .delay_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)?
          .pending_requests
          .remove(request_id)
          .ok_or(SemanticError::NonexistentRequest(*request_id))?;
      }

      Query::ConsumeMaturedRequestToOpen { request_id } => {
        let address = target(targeted)?;
        let now = env.now();
        let tank = staging.tank_mut(tank_id)?;
        let TapRequirement::Delay(delay) = requirement_at(tank, address)?
        else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        let delay_period_secs = delay.delay_period_secs;
        let state = tank
          .delay_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)?;
        let request = state
          .pending_requests
          .remove(request_id)
          .ok_or(SemanticError::NonexistentRequest(*request_id))?;
        let matured_at = request
          .delay_period_start
          .plus_seconds(delay_period_secs.into());
        if now < matured_at {
          return Err(SemanticError::RequestNotMatured(*request_id).into());
        }
        self
          .consumed
          .entry(address)
          .or_default()
          .push(request.request_amount);
      }

      Query::RevealHashPreimage { preimage } => {
        let address = target(targeted)?;
        let tank = staging.tank_mut(tank_id)?;
        let TapRequirement::HashPreimage(lock) = requirement_at(tank, address)?
        else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        if let Some(size) = lock.preimage_size {
          if preimage.len() != size as usize {
            return Err(SemanticError::PreimageWrongSize.into());
          }
        }
        if !lock.hash.matches(preimage) {
          return Err(SemanticError::PreimageMismatch.into());
        }
        self.revealed.insert(address);
      }

      Query::RedeemTicketToOpen {
        ticket,
        ticket_signature,
      } => {
        let address = target(targeted)?;
        let tank = staging.tank_mut(tank_id)?;
        let TapRequirement::Ticket(requirement) =
          requirement_at(tank, address)?
        else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        let signer = requirement.ticket_signer;
        let state = tank
          .ticket_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)?;
        if ticket.ticket_number != state.tickets_consumed {
          return Err(SemanticError::TicketNumberMismatch.into());
        }
        if !ticket.verify_signature(&signer, ticket_signature) {
          return Err(SemanticError::TicketSignatureInvalid.into());
        }
        state.tickets_consumed += 1;
        self
          .consumed
          .entry(address)
          .or_default()
          .push(ticket.max_withdrawal.clone());
      }

      Query::ResetExchangeAndMeter => {
        let address = target(targeted)?;
        let tank = staging.tank_mut(tank_id)?;
        let TapRequirement::Exchange(exchange) = requirement_at(tank, address)?
        else {
          return Err(ValidationError::QueryTargetMismatch(address).into());
        };
        let meter_id = exchange.meter_id;
        let authority = emergency_open_authority(tank)
          .ok_or(AuthorizationError::NoAuthorityDeclared)?;
        self.require(authority);
        *tank
          .exchange_state_mut(address)
          .ok_or(InternalError::StateKindMismatch)? = Default::default();

        let meter_tank_id = meter_id.tank_id.unwrap_or(tank_id);
        let meter_address =
          AccessoryAddress::attachment(meter_id.attachment_index);
        let meter_tank = staging.tank_mut(meter_tank_id)?;
        *meter_state_mut(meter_tank, meter_address)? = MeterState::default();
      }
    }
    Ok(())
  }
}

fn target(targeted: &TargetedQuery) -> Result<AccessoryAddress, Error> {
  targeted
    .target
    .ok_or_else(|| tnt_primitives::queries::Error::ExpectedRequirementTarget.into())
}

fn emergency_open_authority(tank: &TankObject) -> Option<Authority> {
  tank
    .schematic
    .taps
    .get(&0)
    .and_then(|tap| tap.open_authority.clone())
}

fn attachment_at(
  tank: &TankObject,
  address: AccessoryAddress,
) -> Result<&TankAttachment, Error> {
  let AccessoryAddress::Attachment { attachment_index } = address else {
    return Err(ValidationError::QueryTargetMismatch(address).into());
  };
  tank
    .schematic
    .attachments
    .get(&attachment_index)
    .ok_or_else(|| ValidationError::NonexistentAttachment(attachment_index).into())
}

fn requirement_at(
  tank: &TankObject,
  address: AccessoryAddress,
) -> Result<&TapRequirement, Error> {
  let AccessoryAddress::Requirement {
    tap_index,
    requirement_index,
  } = address
  else {
    return Err(ValidationError::QueryTargetMismatch(address).into());
  };
  let tap = tank.schematic.taps.get(&tap_index).ok_or_else(|| {
    Error::from(ValidationError::NonexistentTap(TapId::on_tank(
      tank.id, tap_index,
    )))
  })?;
  tap
    .requirements
    .get(requirement_index as usize)
    .ok_or_else(|| ValidationError::QueryTargetMismatch(address).into())
}

fn meter_state_mut(
  tank: &mut TankObject,
  address: AccessoryAddress,
) -> Result<&mut MeterState, Error> {
  tank
    .meter_state_mut(address)
    .ok_or_else(|| InternalError::StateKindMismatch.into())
}

/// A rewired sink must still accept the attachment's asset, as far as
/// that can be resolved without external tanks.
fn check_new_sink(
  schematic: &tnt_primitives::TankSchematic,
  new_sink: &tnt_primitives::Sink,
  asset: tnt_primitives::AssetId,
  attachment: tnt_primitives::Index,
) -> Result<(), Error> {
  let lookups = SchematicLookups::new(schematic);
  match lookups.sink_asset(new_sink) {
    Ok(SinkAsset::Any) => Ok(()),
    Ok(SinkAsset::Asset(accepted)) if accepted == asset => Ok(()),
    Ok(SinkAsset::Asset(_)) => {
      Err(validation::Error::DestinationWrongAsset { attachment }.into())
    }
    Ok(SinkAsset::NoAsset(_)) => {
      Err(validation::Error::DestinationReceivesNoAsset { attachment }.into())
    }
    Err(LookupError::NeedsExternal) => Ok(()),
    Err(err) => Err(err.into()),
  }
}
