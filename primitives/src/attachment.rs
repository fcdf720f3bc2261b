use {
  crate::{Amount, AssetId, Authority, FlowLimit, Index, Sink},
  serde::{Deserialize, Serialize},
};

/// Counts asset flowing through it and forwards it to a fixed
/// destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetFlowMeter {
  /// The only asset that may flow through this meter.
  pub asset_type: AssetId,
  /// Where metered asset is released to.
  pub destination_sink: Sink,
  /// Authority allowed to reset the reading to zero; without one, only
  /// the emergency tap's open authority can.
  pub reset_authority: Option<Authority>,
}

/// Running total of an [`AssetFlowMeter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterState {
  pub metered_amount: Amount,
}

/// One element of a deposit path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternElement {
  Sink(Sink),
  /// Matches one arbitrary sink, or any number of them when repeatable.
  Wildcard { repeatable: bool },
}

impl PatternElement {
  pub fn is_wildcard(&self) -> bool {
    matches!(self, PatternElement::Wildcard { .. })
  }

  pub fn is_repeatable_wildcard(&self) -> bool {
    matches!(self, PatternElement::Wildcard { repeatable: true })
  }
}

/// A sequence of sinks (and wildcards) that incoming deposits must have
/// flowed through.
pub type DepositPathPattern = Vec<PatternElement>;

/// Rejects any deposit into the tank whose path does not match one of
/// the declared patterns. The restrictor itself never receives asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositSourceRestrictor {
  pub legal_deposit_paths: Vec<DepositPathPattern>,
}

/// Schedules another tap on its own tank for opening whenever asset
/// flows through, then forwards the asset onward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapOpener {
  /// The tap to open, always on the tank the opener is mounted on.
  pub tap_index: Index,
  /// How much the triggered opening requests.
  pub release_amount: FlowLimit,
  pub destination_sink: Sink,
  /// The only asset that may flow through this opener.
  pub asset_type: AssetId,
}

/// Lets a named authority rewire the output sink of another attachment
/// on the same tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentConnectAuthority {
  pub connect_authority: Authority,
  /// The attachment that may be rewired.
  pub attachment_index: Index,
}

/// A module mounted on a tank.
///
/// Variant order is part of the wire format: new variants append at the
/// end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TankAttachment {
  Meter(AssetFlowMeter),
  Restrictor(DepositSourceRestrictor),
  Opener(TapOpener),
  ConnectAuthority(AttachmentConnectAuthority),
}

impl TankAttachment {
  /// The asset this attachment accepts, if it receives asset at all.
  pub fn receives_asset(&self) -> Option<AssetId> {
    match self {
      TankAttachment::Meter(meter) => Some(meter.asset_type),
      TankAttachment::Opener(opener) => Some(opener.asset_type),
      TankAttachment::Restrictor(_) | TankAttachment::ConnectAuthority(_) => {
        None
      }
    }
  }

  /// Where received asset is released to, for attachments that receive
  /// any.
  pub fn output_sink(&self) -> Option<&Sink> {
    match self {
      TankAttachment::Meter(meter) => Some(&meter.destination_sink),
      TankAttachment::Opener(opener) => Some(&opener.destination_sink),
      TankAttachment::Restrictor(_) | TankAttachment::ConnectAuthority(_) => {
        None
      }
    }
  }

  pub fn output_sink_mut(&mut self) -> Option<&mut Sink> {
    match self {
      TankAttachment::Meter(meter) => Some(&mut meter.destination_sink),
      TankAttachment::Opener(opener) => Some(&mut opener.destination_sink),
      TankAttachment::Restrictor(_) | TankAttachment::ConnectAuthority(_) => {
        None
      }
    }
  }
}
