mod address;
mod attachment;
mod authority;
mod ids;
mod parameters;
mod pattern;
mod requirement;
mod schematic;
mod sink;
mod tap;

pub mod lookups;
pub mod operations;
pub mod queries;
pub mod validation;

pub use {
  address::{AccessoryAddress, AccessoryState},
  attachment::{
    AssetFlowMeter,
    AttachmentConnectAuthority,
    DepositPathPattern,
    DepositSourceRestrictor,
    MeterState,
    PatternElement,
    TankAttachment,
    TapOpener,
  },
  authority::Authority,
  ids::{
    AccountId,
    Amount,
    AssetId,
    AttachmentId,
    Index,
    TankId,
    TapId,
    TimePoint,
  },
  operations::{TankCreate, TankDelete, TankQuery, TankUpdate, TapOpen},
  parameters::{FeeParameters, Parameters},
  pattern::{matching_deposit_path, sinks_equal, DepositPath},
  queries::{Query, TargetedQuery},
  requirement::{
    CumulativeFlowLimit,
    CumulativeLimitState,
    DelayRequest,
    DelayRequirement,
    DelayState,
    DocumentationRequirement,
    ExchangeRequirement,
    ExchangeState,
    HashPreimageRequirement,
    HashValue,
    ImmediateFlowLimit,
    MinimumTankLevel,
    PeriodicFlowLimit,
    PeriodicLimitState,
    ReviewRequest,
    ReviewRequirement,
    ReviewState,
    TapRequirement,
    Ticket,
    TicketRequirement,
    TicketState,
    TimeLock,
  },
  schematic::TankSchematic,
  sink::{FlowLimit, Sink},
  tap::Tap,
  validation::TankValidator,
};
