use {
  crate::{
    AssetId,
    AttachmentId,
    Sink,
    TankAttachment,
    TankId,
    TankSchematic,
    TapId,
  },
  std::borrow::Cow,
  thiserror::Error,
};

/// Reference to an object a lookup failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingObject {
  Tank(TankId),
  Attachment(AttachmentId),
  Tap(TapId),
}

/// Why a lookup could not produce an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LookupError {
  /// The lookup crossed to another tank, but no way to read external
  /// tanks was provided.
  #[error("lookup requires access to external tanks")]
  NeedsExternal,
  #[error("referenced object does not exist: {0:?}")]
  Nonexistent(MissingObject),
}

/// What asset a sink accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkAsset {
  /// The sink stores exactly this asset.
  Asset(AssetId),
  /// Accounts can hold any asset.
  Any,
  /// The referenced attachment does not receive asset.
  NoAsset(AttachmentId),
}

/// Why a sink cannot be used where it appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadSinkReason {
  ReceivesWrongAsset,
  ReceivesNoAsset,
}

/// A resolved chain of sinks ending at a terminal depository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkChain {
  pub sinks: Vec<Sink>,
  /// The tank a trailing `SameTank` terminal refers to; `None` when the
  /// walk never left the tank it started from.
  pub final_sink_tank: Option<TankId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
  #[error("sink chain exceeds the maximum length")]
  ExceededMaxLength,
  #[error("sink cannot be used here ({reason:?}): {sink:?}")]
  BadSink { reason: BadSinkReason, sink: Sink },
  #[error(transparent)]
  Lookup(#[from] LookupError),
}

/// A way to read other tanks' schematics during lookups.
pub type TankLookup<'a> = &'a dyn Fn(TankId) -> Option<TankSchematic>;

/// Resolves references out of one tank's schematic, optionally through
/// a host-provided view of other tanks.
///
/// Without a lookup function, any question that crosses to another tank
/// answers [`LookupError::NeedsExternal`]; callers validating a
/// schematic in isolation treat that as "skip the check".
pub struct SchematicLookups<'a> {
  schema: &'a TankSchematic,
  lookup: Option<TankLookup<'a>>,
}

impl<'a> SchematicLookups<'a> {
  pub fn new(schema: &'a TankSchematic) -> Self {
    Self {
      schema,
      lookup: None,
    }
  }

  pub fn with_lookup(
    schema: &'a TankSchematic,
    lookup: TankLookup<'a>,
  ) -> Self {
    Self {
      schema,
      lookup: Some(lookup),
    }
  }

  /// Resolve a tank reference; `None` is the current tank.
  pub fn tank(
    &self,
    id: Option<TankId>,
  ) -> Result<Cow<'a, TankSchematic>, LookupError> {
    match id {
      None => Ok(Cow::Borrowed(self.schema)),
      Some(id) => match self.lookup {
        None => Err(LookupError::NeedsExternal),
        Some(lookup) => lookup(id)
          .map(Cow::Owned)
          .ok_or(LookupError::Nonexistent(MissingObject::Tank(id))),
      },
    }
  }

  /// Resolve an attachment reference within an explicit current-tank
  /// context.
  pub fn attachment_in(
    &self,
    id: &AttachmentId,
    current_tank: Option<TankId>,
  ) -> Result<TankAttachment, LookupError> {
    let schema = self.tank(id.tank_id.or(current_tank))?;
    schema
      .attachments
      .get(&id.attachment_index)
      .cloned()
      .ok_or(LookupError::Nonexistent(MissingObject::Attachment(*id)))
  }

  pub fn attachment(
    &self,
    id: &AttachmentId,
  ) -> Result<TankAttachment, LookupError> {
    self.attachment_in(id, None)
  }

  /// What asset an attachment accepts.
  pub fn attachment_asset(
    &self,
    id: &AttachmentId,
  ) -> Result<SinkAsset, LookupError> {
    let attachment = self.attachment(id)?;
    Ok(match attachment.receives_asset() {
      Some(asset) => SinkAsset::Asset(asset),
      None => SinkAsset::NoAsset(*id),
    })
  }

  fn sink_asset_in(
    &self,
    sink: &Sink,
    current_tank: Option<TankId>,
  ) -> Result<SinkAsset, LookupError> {
    Ok(match sink {
      Sink::SameTank => SinkAsset::Asset(self.tank(current_tank)?.asset_type),
      Sink::Account(_) => SinkAsset::Any,
      Sink::Tank(id) => SinkAsset::Asset(self.tank(Some(*id))?.asset_type),
      Sink::Attachment(id) => {
        let attachment = self.attachment_in(id, current_tank)?;
        match attachment.receives_asset() {
          Some(asset) => SinkAsset::Asset(asset),
          None => SinkAsset::NoAsset(*id),
        }
      }
    })
  }

  /// What asset a sink accepts, in the current tank's context.
  pub fn sink_asset(&self, sink: &Sink) -> Result<SinkAsset, LookupError> {
    self.sink_asset_in(sink, None)
  }

  /// Follow a chain of attachment sinks to the terminal depository.
  ///
  /// Sinks specify where released asset goes next, but an attachment
  /// sink is only an intermediate step: the attachment processes the
  /// asset and releases it onward. This walks those forwards until a
  /// sink that stores asset is found, tracking the "current tank" as
  /// attachments on other tanks shift it.
  ///
  /// `max_hops` bounds the number of non-terminal sinks traversed. When
  /// `expected_asset` is given, every sink in the chain must accept
  /// that asset.
  pub fn sink_chain(
    &self,
    first: &Sink,
    max_hops: usize,
    expected_asset: Option<AssetId>,
  ) -> Result<SinkChain, ChainError> {
    let mut sinks = Vec::new();
    let mut current_tank: Option<TankId> = None;
    let mut sink = first.clone();

    loop {
      if let Some(asset) = expected_asset {
        match self.sink_asset_in(&sink, current_tank)? {
          SinkAsset::Any => {}
          SinkAsset::Asset(accepted) if accepted == asset => {}
          SinkAsset::Asset(_) => {
            return Err(ChainError::BadSink {
              reason: BadSinkReason::ReceivesWrongAsset,
              sink,
            });
          }
          SinkAsset::NoAsset(_) => {
            return Err(ChainError::BadSink {
              reason: BadSinkReason::ReceivesNoAsset,
              sink,
            });
          }
        }
      }

      match sink {
        Sink::Attachment(id) => {
          if sinks.len() >= max_hops {
            return Err(ChainError::ExceededMaxLength);
          }
          let attachment = self.attachment_in(&id, current_tank)?;
          let next =
            attachment
              .output_sink()
              .cloned()
              .ok_or(ChainError::BadSink {
                reason: BadSinkReason::ReceivesNoAsset,
                sink: Sink::Attachment(id),
              })?;
          current_tank = id.tank_id.or(current_tank);
          sinks.push(Sink::Attachment(id));
          sink = next;
        }
        terminal => {
          let final_sink_tank = match &terminal {
            Sink::SameTank => current_tank,
            Sink::Tank(id) => Some(*id),
            _ => None,
          };
          sinks.push(terminal);
          return Ok(SinkChain {
            sinks,
            final_sink_tank,
          });
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{BadSinkReason, ChainError, SchematicLookups, SinkAsset},
    crate::{
      AccountId,
      AssetFlowMeter,
      AssetId,
      AttachmentId,
      Sink,
      TankAttachment,
      TankSchematic,
    },
    std::collections::BTreeMap,
  };

  fn meter(asset: AssetId, destination: Sink) -> TankAttachment {
    TankAttachment::Meter(AssetFlowMeter {
      asset_type: asset,
      destination_sink: destination,
      reset_authority: None,
    })
  }

  fn schematic_with_attachments(
    attachments: Vec<TankAttachment>,
  ) -> TankSchematic {
    let attachments: BTreeMap<_, _> = attachments
      .into_iter()
      .enumerate()
      .map(|(id, attachment)| (id as u16, attachment))
      .collect();
    TankSchematic {
      taps: BTreeMap::new(),
      tap_counter: 0,
      attachments: attachments.clone(),
      attachment_counter: attachments.len() as u16,
      asset_type: AssetId(1),
    }
  }

  fn local_attachment(index: u16) -> Sink {
    Sink::Attachment(AttachmentId {
      tank_id: None,
      attachment_index: index,
    })
  }

  #[test]
  fn chain_walks_to_terminal() {
    let schema = schematic_with_attachments(vec![
      meter(AssetId(1), local_attachment(1)),
      meter(AssetId(1), Sink::Account(AccountId(9))),
    ]);
    let lookups = SchematicLookups::new(&schema);

    let chain = lookups
      .sink_chain(&local_attachment(0), 10, Some(AssetId(1)))
      .unwrap();
    assert_eq!(chain.sinks.len(), 3);
    assert_eq!(chain.sinks.last(), Some(&Sink::Account(AccountId(9))));
    assert_eq!(chain.final_sink_tank, None);
  }

  #[test]
  fn chain_length_is_bounded() {
    // two meters forwarding to each other never terminate
    let schema = schematic_with_attachments(vec![
      meter(AssetId(1), local_attachment(1)),
      meter(AssetId(1), local_attachment(0)),
    ]);
    let lookups = SchematicLookups::new(&schema);

    let result = lookups.sink_chain(&local_attachment(0), 10, None);
    assert_eq!(result.unwrap_err(), ChainError::ExceededMaxLength);
  }

  #[test]
  fn chain_rejects_wrong_asset() {
    let schema = schematic_with_attachments(vec![meter(
      AssetId(2),
      Sink::Account(AccountId(9)),
    )]);
    let lookups = SchematicLookups::new(&schema);

    let result = lookups.sink_chain(&local_attachment(0), 10, Some(AssetId(1)));
    assert!(matches!(
      result,
      Err(ChainError::BadSink {
        reason: BadSinkReason::ReceivesWrongAsset,
        ..
      })
    ));
  }

  #[test]
  fn sink_asset_answers() {
    let schema = schematic_with_attachments(vec![meter(
      AssetId(1),
      Sink::Account(AccountId(9)),
    )]);
    let lookups = SchematicLookups::new(&schema);

    assert_eq!(
      lookups.sink_asset(&Sink::Account(AccountId(2))).unwrap(),
      SinkAsset::Any
    );
    assert_eq!(
      lookups.sink_asset(&Sink::SameTank).unwrap(),
      SinkAsset::Asset(AssetId(1))
    );
    assert_eq!(
      lookups.sink_asset(&local_attachment(0)).unwrap(),
      SinkAsset::Asset(AssetId(1))
    );
  }
}
