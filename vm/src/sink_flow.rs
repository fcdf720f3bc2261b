use {
  crate::{
    error::{
      AuthorizationError,
      InternalError,
      ResourceError,
      SemanticError,
      ValidationError,
    },
    AccountCredit,
    Environment,
    Error,
    StagedTanks,
    TankStore,
  },
  tnt_primitives::{
    matching_deposit_path,
    AccessoryAddress,
    Amount,
    AssetId,
    DepositPath,
    FlowLimit,
    Sink,
    TankAttachment,
    TapId,
  },
  tracing::debug,
};

/// Processes the release of asset into a sink: the movement of asset
/// along the chain of attachments and its deposit into the terminal
/// sink, with all the accounting and state updates intermediate sinks
/// call for.
///
/// Attachment side effects (meter increments, tap-opener scheduling)
/// land on the staging layer; account deposits are queued as credits on
/// the same layer so the whole flow commits or vanishes together.
pub struct SinkFlowProcessor<'a, 'b, S: TankStore, E: Environment> {
  staging: &'a mut StagedTanks<'b, S>,
  env: &'a E,
  max_chain_length: usize,
}

impl<'a, 'b, S: TankStore, E: Environment> SinkFlowProcessor<'a, 'b, S, E> {
  pub fn new(
    staging: &'a mut StagedTanks<'b, S>,
    env: &'a E,
    max_chain_length: usize,
  ) -> Self {
    Self {
      staging,
      env,
      max_chain_length,
    }
  }

  /// Release asset into `first` and process its flow through any
  /// intermediate sinks to the terminal depository.
  ///
  /// `open_tap` is invoked for every tap-opener attachment the asset
  /// passes through; the caller decides whether another opening may be
  /// scheduled.
  ///
  /// Returns the full path of sinks the asset flowed through, beginning
  /// with `first` and ending at the terminal sink.
  pub fn release_to_sink(
    &mut self,
    origin: Sink,
    first: Sink,
    asset: AssetId,
    amount: Amount,
    mut open_tap: impl FnMut(TapId, FlowLimit) -> Result<(), Error>,
  ) -> Result<Vec<Sink>, Error> {
    if matches!(origin, Sink::SameTank) {
      return Err(InternalError::SameTankOrigin.into());
    }

    let mut path: Vec<Sink> = Vec::new();
    let mut current_tank = match &origin {
      Sink::Tank(id) => Some(*id),
      _ => None,
    };
    let mut sink = first;

    while let Sink::Attachment(attachment_id) = sink {
      if path.len() >= self.max_chain_length {
        return Err(ResourceError::ExceededMaxChainLength.into());
      }
      let tank_id = attachment_id
        .tank_id
        .or(current_tank)
        .ok_or(InternalError::NoCurrentTank)?;
      current_tank = Some(tank_id);

      let tank = self.staging.tank_mut(tank_id)?;
      let address =
        AccessoryAddress::attachment(attachment_id.attachment_index);
      let attachment = tank
        .schematic
        .attachments
        .get(&attachment_id.attachment_index)
        .cloned()
        .ok_or(ValidationError::NonexistentAttachment(
          attachment_id.attachment_index,
        ))?;

      let next = match attachment {
        TankAttachment::Meter(meter) => {
          if meter.asset_type != asset {
            return Err(InternalError::AttachmentAssetMismatch.into());
          }
          let state = tank
            .meter_state_mut(address)
            .ok_or(InternalError::StateKindMismatch)?;
          state.metered_amount = state
            .metered_amount
            .checked_add(amount)
            .ok_or(InternalError::BalanceOverflow)?;
          meter.destination_sink
        }
        TankAttachment::Opener(opener) => {
          if opener.asset_type != asset {
            return Err(InternalError::AttachmentAssetMismatch.into());
          }
          open_tap(
            TapId::on_tank(tank_id, opener.tap_index),
            opener.release_amount,
          )?;
          opener.destination_sink
        }
        // validation never wires asset into these
        TankAttachment::Restrictor(_)
        | TankAttachment::ConnectAuthority(_) => {
          return Err(InternalError::AssetToNonReceivingAttachment.into());
        }
      };
      path.push(Sink::Attachment(attachment_id));
      sink = next;
    }

    let sink = match sink {
      Sink::SameTank => {
        Sink::Tank(current_tank.ok_or(InternalError::NoCurrentTank)?)
      }
      other => other,
    };
    path.push(sink.clone());

    match sink {
      Sink::Tank(dest_id) => {
        let dest = self.staging.tank_mut(dest_id)?;
        if dest.schematic.asset_type != asset {
          return Err(
            SemanticError::WrongAssetForTank {
              stored: dest.schematic.asset_type,
              flowed: asset,
            }
            .into(),
          );
        }
        if let Some(restrictor_id) = dest.restrictor_id {
          if let Some(TankAttachment::Restrictor(restrictor)) =
            dest.schematic.attachments.get(&restrictor_id)
          {
            let deposit_path = DepositPath {
              origin: Some(origin),
              sink_chain: path.clone(),
            };
            if matching_deposit_path(
              &restrictor.legal_deposit_paths,
              &deposit_path,
              Some(dest_id),
            )
            .is_none()
            {
              return Err(SemanticError::RestrictorRejected.into());
            }
          }
        }
        dest.balance = dest
          .balance
          .checked_add(amount)
          .ok_or(InternalError::BalanceOverflow)?;
        debug!(tank = %dest_id, amount, "tap flow credited tank");
      }
      Sink::Account(account) => {
        if !self.env.is_authorized(account, asset) {
          return Err(
            AuthorizationError::UnauthorizedAssetHolder { account, asset }
              .into(),
          );
        }
        let mut full_path = Vec::with_capacity(path.len() + 1);
        full_path.push(origin);
        full_path.extend(path.iter().cloned());
        self.staging.credit_account(AccountCredit {
          account,
          asset,
          amount,
          path: full_path,
        });
        debug!(account = %account, amount, "tap flow queued account credit");
      }
      // the loop consumed every attachment and SameTank was resolved
      Sink::SameTank | Sink::Attachment(_) => {
        return Err(InternalError::UnresolvedTerminalSink.into());
      }
    }

    Ok(path)
  }
}
