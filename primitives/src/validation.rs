use {
  crate::{
    lookups::{
      BadSinkReason,
      ChainError,
      LookupError,
      SchematicLookups,
      SinkAsset,
      TankLookup,
    },
    matching_deposit_path,
    Amount,
    AttachmentId,
    Authority,
    DepositPath,
    DepositSourceRestrictor,
    FlowLimit,
    Index,
    Parameters,
    PatternElement,
    Sink,
    Tap,
    TapRequirement,
    TankAttachment,
    TankId,
    TankSchematic,
  },
  ed25519_dalek::PublicKey,
  thiserror::Error,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
  #[error("emergency tap does not exist")]
  MissingEmergencyTap,
  #[error("emergency tap must have no requirements")]
  EmergencyTapHasRequirements,
  #[error("emergency tap must specify an open authority")]
  EmergencyTapMissingOpenAuthority,
  #[error("emergency tap must specify a connect authority")]
  EmergencyTapMissingConnectAuthority,
  #[error("emergency tap must be a destructor tap")]
  EmergencyTapNotDestructor,

  #[error("{name} must not be an impossible authority")]
  ImpossibleAuthority { name: &'static str },
  #[error("{name} must not be a trivial authority")]
  TrivialAuthority { name: &'static str },
  #[error("{name} must not be an empty authority")]
  EmptyAuthority { name: &'static str },

  #[error("attachment {attachment}: destination sink cannot receive asset")]
  DestinationReceivesNoAsset { attachment: Index },
  #[error("attachment {attachment}: destination sink accepts the wrong asset")]
  DestinationWrongAsset { attachment: Index },
  #[error("attachment {attachment}: tap opener references nonexistent tap {tap}")]
  OpenerTapMissing { attachment: Index, tap: Index },
  #[error("attachment {attachment}: tap opener release amount must be positive")]
  OpenerReleaseNotPositive { attachment: Index },
  #[error(
    "attachment {attachment}: connect authority references nonexistent \
     attachment {target}"
  )]
  ConnectTargetMissing { attachment: Index, target: Index },
  #[error(
    "attachment {attachment}: connect authority references an attachment \
     which does not receive asset"
  )]
  ConnectTargetReceivesNoAsset { attachment: Index },
  #[error("a tank may carry at most one deposit source restrictor")]
  DuplicateRestrictor,

  #[error("attachment {attachment}: restrictor must accept at least one deposit path")]
  NoDepositPaths { attachment: Index },
  #[error(
    "attachment {attachment}: deposit path patterns must contain at least a \
     source and a destination"
  )]
  PatternTooShort { attachment: Index },
  #[error(
    "attachment {attachment}: deposit path patterns must begin with a \
     terminal sink or a wildcard"
  )]
  PatternBadFirst { attachment: Index },
  #[error(
    "attachment {attachment}: deposit path patterns must end with the \
     current tank or a wildcard"
  )]
  PatternBadLast { attachment: Index },
  #[error(
    "attachment {attachment}: a repeatable wildcard cannot be adjacent to \
     another wildcard"
  )]
  PatternAdjacentWildcards { attachment: Index },
  #[error("attachment {attachment}: a lone wildcard is not a valid deposit path pattern")]
  PatternLoneWildcard { attachment: Index },

  #[error("tap {tap} requirement {index}: {what} must be positive")]
  NonPositiveValue {
    tap: Index,
    index: usize,
    what: &'static str,
  },
  #[error(
    "tap {tap} requirement {index}: time lock must specify at least one \
     lock or unlock time"
  )]
  TimeLockWithoutToggles { tap: Index, index: usize },
  #[error("tap {tap} requirement {index}: hash lock must not commit to a null hash")]
  NullHashLock { tap: Index, index: usize },
  #[error("tap {tap} requirement {index}: ticket signer must not be a null key")]
  NullTicketSigner { tap: Index, index: usize },
  #[error("tap {tap} requirement {index}: references a nonexistent meter")]
  MeterMissing { tap: Index, index: usize },
  #[error("tap {tap} requirement {index}: references an attachment which is not a meter")]
  NotAMeter { tap: Index, index: usize },

  #[error("tap {tap} must be connected or specify a connect authority")]
  UnconnectedTap { tap: Index },
  #[error("tap {tap} connects to a sink chain which exceeds the maximum length")]
  TapChainTooLong { tap: Index },
  #[error("tap {tap} connects to a sink that cannot receive asset: {sink:?}")]
  TapChainReceivesNoAsset { tap: Index, sink: Sink },
  #[error("tap {tap} connects to a sink that receives the wrong asset: {sink:?}")]
  TapChainWrongAsset { tap: Index, sink: Sink },
  #[error(
    "tap {tap} connects to destination tank, but is not accepted by the \
     destination's deposit source restrictor"
  )]
  RestrictorRejectsTap { tap: Index },

  #[error(transparent)]
  Lookup(#[from] LookupError),
}

/// Structural checks for an authority declared in a schematic.
pub fn check_authority(
  auth: &Authority,
  name: &'static str,
) -> Result<(), Error> {
  if auth.is_impossible() {
    return Err(Error::ImpossibleAuthority { name });
  }
  if auth.is_trivial() {
    return Err(Error::TrivialAuthority { name });
  }
  if auth.is_empty() {
    return Err(Error::EmptyAuthority { name });
  }
  Ok(())
}

/// Shape checks for the emergency tap: no requirements, both
/// authorities declared, destructor.
pub fn check_emergency_tap(tap: &Tap) -> Result<(), Error> {
  if !tap.requirements.is_empty() {
    return Err(Error::EmergencyTapHasRequirements);
  }
  if tap.open_authority.is_none() {
    return Err(Error::EmergencyTapMissingOpenAuthority);
  }
  if tap.connect_authority.is_none() {
    return Err(Error::EmergencyTapMissingConnectAuthority);
  }
  if !tap.destructor_tap {
    return Err(Error::EmergencyTapNotDestructor);
  }
  Ok(())
}

/// Internal checks for a tap outside the context of a full schematic;
/// cross-references are left to [`TankValidator`].
pub fn check_tap(tap_index: Index, tap: &Tap) -> Result<(), Error> {
  if tap.connected_sink.is_none() && tap.connect_authority.is_none() {
    return Err(Error::UnconnectedTap { tap: tap_index });
  }
  for (index, requirement) in tap.requirements.iter().enumerate() {
    check_requirement(tap_index, index, requirement)?;
  }
  Ok(())
}

/// Internal checks for a single tap requirement.
pub fn check_requirement(
  tap: Index,
  index: usize,
  requirement: &TapRequirement,
) -> Result<(), Error> {
  let positive = |value: Amount, what: &'static str| {
    if value > 0 {
      Ok(())
    } else {
      Err(Error::NonPositiveValue { tap, index, what })
    }
  };

  match requirement {
    TapRequirement::ImmediateLimit(limit) => {
      positive(limit.limit, "immediate flow limit")
    }
    TapRequirement::CumulativeLimit(limit) => {
      positive(limit.limit, "cumulative flow limit")
    }
    TapRequirement::PeriodicLimit(limit) => {
      positive(limit.limit, "periodic flow limit")?;
      positive(limit.period_secs.into(), "periodic limit period")
    }
    TapRequirement::TimeLock(lock) => {
      if lock.lock_unlock_times.is_empty() {
        return Err(Error::TimeLockWithoutToggles { tap, index });
      }
      Ok(())
    }
    TapRequirement::MinimumLevel(level) => {
      positive(level.minimum_level, "minimum tank level")
    }
    TapRequirement::Review(review) => {
      check_authority(&review.reviewer, "Reviewer")
    }
    TapRequirement::Documentation(_) => Ok(()),
    TapRequirement::Delay(delay) => {
      if let Some(veto) = &delay.veto_authority {
        check_authority(veto, "Veto authority")?;
      }
      positive(delay.delay_period_secs.into(), "delay period")
    }
    TapRequirement::HashPreimage(lock) => {
      if lock.hash.is_null() {
        return Err(Error::NullHashLock { tap, index });
      }
      if let Some(size) = lock.preimage_size {
        positive(size.into(), "hash lock preimage size")?;
      }
      Ok(())
    }
    TapRequirement::Ticket(ticket) => {
      if ticket.ticket_signer == PublicKey::default() {
        return Err(Error::NullTicketSigner { tap, index });
      }
      Ok(())
    }
    TapRequirement::Exchange(exchange) => {
      positive(exchange.tick_amount, "exchange tick amount")?;
      positive(exchange.release_per_tick, "exchange release amount")
    }
  }
}

/// Internal checks for an attachment outside the context of a full
/// schematic; cross-references are left to [`TankValidator`].
pub fn check_attachment(
  attachment: Index,
  att: &TankAttachment,
) -> Result<(), Error> {
  match att {
    TankAttachment::Meter(meter) => {
      if let Some(auth) = &meter.reset_authority {
        check_authority(auth, "Meter reset authority")?;
      }
      Ok(())
    }
    TankAttachment::Restrictor(restrictor) => {
      check_restrictor_patterns(attachment, restrictor)
    }
    TankAttachment::Opener(opener) => {
      if let FlowLimit::Amount(amount) = opener.release_amount {
        if amount <= 0 {
          return Err(Error::OpenerReleaseNotPositive { attachment });
        }
      }
      Ok(())
    }
    TankAttachment::ConnectAuthority(connect) => check_authority(
      &connect.connect_authority,
      "Attachment connect authority",
    ),
  }
}

fn check_restrictor_patterns(
  attachment: Index,
  restrictor: &DepositSourceRestrictor,
) -> Result<(), Error> {
  if restrictor.legal_deposit_paths.is_empty() {
    return Err(Error::NoDepositPaths { attachment });
  }
  for pattern in &restrictor.legal_deposit_paths {
    if pattern.len() < 2 {
      return Err(Error::PatternTooShort { attachment });
    }
    match &pattern[0] {
      PatternElement::Sink(first) => {
        if !first.is_terminal() {
          return Err(Error::PatternBadFirst { attachment });
        }
      }
      PatternElement::Wildcard { .. } => {
        // a two-element pattern led by a wildcard carries no source
        // information at all
        if pattern.len() < 3 {
          return Err(Error::PatternLoneWildcard { attachment });
        }
      }
    }
    match pattern.last() {
      Some(PatternElement::Wildcard { .. }) | None => {}
      Some(PatternElement::Sink(last)) => match last {
        Sink::SameTank | Sink::Tank(_) => {}
        _ => return Err(Error::PatternBadLast { attachment }),
      },
    }
    for window in pattern.windows(2) {
      if window[0].is_wildcard()
        && window[1].is_wildcard()
        && (window[0].is_repeatable_wildcard()
          || window[1].is_repeatable_wildcard())
      {
        return Err(Error::PatternAdjacentWildcards { attachment });
      }
    }
  }
  Ok(())
}

/// Validates the static consistency of a full tank schematic: every
/// attachment, the emergency tap, and every tap with its requirements
/// and its connected sink chain.
pub struct TankValidator<'a> {
  lookups: SchematicLookups<'a>,
  schema: &'a TankSchematic,
  /// Id of the tank this schematic belongs to, when it already exists.
  tank_id: Option<TankId>,
  max_sink_chain_length: usize,
}

impl<'a> TankValidator<'a> {
  pub fn new(schema: &'a TankSchematic, max_sink_chain_length: u16) -> Self {
    Self {
      lookups: SchematicLookups::new(schema),
      schema,
      tank_id: None,
      max_sink_chain_length: max_sink_chain_length.into(),
    }
  }

  pub fn with_lookup(
    schema: &'a TankSchematic,
    max_sink_chain_length: u16,
    lookup: TankLookup<'a>,
    tank_id: Option<TankId>,
  ) -> Self {
    Self {
      lookups: SchematicLookups::with_lookup(schema, lookup),
      schema,
      tank_id,
      max_sink_chain_length: max_sink_chain_length.into(),
    }
  }

  /// Validate the whole schematic. Attachments go first because taps
  /// may connect to them and they should be internally valid by the
  /// time that happens.
  pub fn validate_tank(&self) -> Result<(), Error> {
    let restrictors = self
      .schema
      .attachments
      .values()
      .filter(|att| matches!(att, TankAttachment::Restrictor(_)))
      .count();
    if restrictors > 1 {
      return Err(Error::DuplicateRestrictor);
    }

    for (id, attachment) in &self.schema.attachments {
      self.validate_attachment(*id, attachment)?;
    }
    self.validate_emergency_tap()?;
    for (id, tap) in &self.schema.taps {
      self.validate_tap(*id, tap)?;
    }
    Ok(())
  }

  pub fn validate_emergency_tap(&self) -> Result<(), Error> {
    let tap = self
      .schema
      .taps
      .get(&0)
      .ok_or(Error::MissingEmergencyTap)?;
    check_emergency_tap(tap)
  }

  pub fn validate_attachment(
    &self,
    id: Index,
    attachment: &TankAttachment,
  ) -> Result<(), Error> {
    check_attachment(id, attachment)?;
    match attachment {
      TankAttachment::Meter(meter) => {
        self.check_sink_asset(id, &meter.destination_sink, meter.asset_type)
      }
      TankAttachment::Restrictor(restrictor) => {
        // a pattern naming its destination tank by id must name this one
        if let Some(own_id) = self.tank_id {
          for pattern in &restrictor.legal_deposit_paths {
            if let Some(PatternElement::Sink(Sink::Tank(dest))) =
              pattern.last()
            {
              if *dest != own_id {
                return Err(Error::PatternBadLast { attachment: id });
              }
            }
          }
        }
        Ok(())
      }
      TankAttachment::Opener(opener) => {
        if !self.schema.taps.contains_key(&opener.tap_index) {
          return Err(Error::OpenerTapMissing {
            attachment: id,
            tap: opener.tap_index,
          });
        }
        self.check_sink_asset(id, &opener.destination_sink, opener.asset_type)
      }
      TankAttachment::ConnectAuthority(connect) => {
        let target = self
          .schema
          .attachments
          .get(&connect.attachment_index)
          .ok_or(Error::ConnectTargetMissing {
            attachment: id,
            target: connect.attachment_index,
          })?;
        if target.receives_asset().is_none() {
          return Err(Error::ConnectTargetReceivesNoAsset { attachment: id });
        }
        Ok(())
      }
    }
  }

  pub fn validate_tap(&self, id: Index, tap: &Tap) -> Result<(), Error> {
    if tap.connected_sink.is_none() && tap.connect_authority.is_none() {
      return Err(Error::UnconnectedTap { tap: id });
    }
    for (index, requirement) in tap.requirements.iter().enumerate() {
      self.validate_tap_requirement(id, index, requirement)?;
    }
    self.check_tap_connection(id, tap)
  }

  fn validate_tap_requirement(
    &self,
    tap: Index,
    index: usize,
    requirement: &TapRequirement,
  ) -> Result<(), Error> {
    check_requirement(tap, index, requirement)?;
    if let TapRequirement::Exchange(exchange) = requirement {
      self.check_meter(tap, index, &exchange.meter_id)?;
    }
    Ok(())
  }

  fn check_meter(
    &self,
    tap: Index,
    index: usize,
    id: &AttachmentId,
  ) -> Result<(), Error> {
    match self.lookups.attachment(id) {
      Ok(TankAttachment::Meter(_)) => Ok(()),
      Ok(_) => Err(Error::NotAMeter { tap, index }),
      Err(LookupError::NeedsExternal) => Ok(()),
      Err(LookupError::Nonexistent(_)) => Err(Error::MeterMissing { tap, index }),
    }
  }

  fn check_sink_asset(
    &self,
    attachment: Index,
    sink: &Sink,
    asset: crate::AssetId,
  ) -> Result<(), Error> {
    match self.lookups.sink_asset(sink) {
      Ok(SinkAsset::Any) => Ok(()),
      Ok(SinkAsset::Asset(accepted)) if accepted == asset => Ok(()),
      Ok(SinkAsset::Asset(_)) => Err(Error::DestinationWrongAsset { attachment }),
      Ok(SinkAsset::NoAsset(_)) => {
        Err(Error::DestinationReceivesNoAsset { attachment })
      }
      Err(LookupError::NeedsExternal) => Ok(()),
      Err(err @ LookupError::Nonexistent(_)) => Err(err.into()),
    }
  }

  /// Check a connected tap's sink chain, and when it terminates at a
  /// tank with a deposit source restrictor, that the path from this tap
  /// matches one of the restrictor's patterns.
  fn check_tap_connection(&self, id: Index, tap: &Tap) -> Result<(), Error> {
    let Some(connected) = &tap.connected_sink else {
      return Ok(());
    };

    let chain = match self.lookups.sink_chain(
      connected,
      self.max_sink_chain_length,
      Some(self.schema.asset_type),
    ) {
      Ok(chain) => chain,
      Err(ChainError::ExceededMaxLength) => {
        return Err(Error::TapChainTooLong { tap: id });
      }
      Err(ChainError::BadSink {
        reason: BadSinkReason::ReceivesNoAsset,
        sink,
      }) => return Err(Error::TapChainReceivesNoAsset { tap: id, sink }),
      Err(ChainError::BadSink {
        reason: BadSinkReason::ReceivesWrongAsset,
        sink,
      }) => return Err(Error::TapChainWrongAsset { tap: id, sink }),
      Err(ChainError::Lookup(LookupError::NeedsExternal)) => return Ok(()),
      Err(ChainError::Lookup(err)) => return Err(err.into()),
    };

    // find out whether the chain ends at a tank
    let dest_ref = match chain.sinks.last() {
      Some(Sink::SameTank) => chain.final_sink_tank,
      Some(Sink::Tank(dest)) => Some(*dest),
      _ => return Ok(()),
    };
    // None means the chain ends back at the tank being validated
    let dest = match self.lookups.tank(dest_ref) {
      Ok(dest) => dest,
      Err(LookupError::NeedsExternal) => return Ok(()),
      Err(err) => return Err(err.into()),
    };

    if let Some(restrictor_id) = dest.deposit_source_restrictor() {
      if let Some(TankAttachment::Restrictor(restrictor)) =
        dest.attachments.get(&restrictor_id)
      {
        let path = DepositPath {
          origin: self.tank_id.map(Sink::Tank),
          sink_chain: chain.sinks,
        };
        let dest_id = dest_ref.or(self.tank_id);
        if matching_deposit_path(
          &restrictor.legal_deposit_paths,
          &path,
          dest_id,
        )
        .is_none()
        {
          return Err(Error::RestrictorRejectsTap { tap: id });
        }
      }
    }
    Ok(())
  }

  /// The deposit a tank with this schematic must bond: a base amount
  /// plus a price per accessory.
  pub fn calculate_deposit(&self, parameters: &Parameters) -> Amount {
    parameters.deposit_base.saturating_add(
      parameters
        .deposit_per_accessory
        .saturating_mul(self.schema.accessory_count() as Amount),
    )
  }
}
