use {
  thiserror::Error,
  tnt_primitives::{
    lookups::LookupError,
    operations,
    queries,
    validation,
    AccessoryAddress,
    AccountId,
    Amount,
    AssetId,
    Index,
    TankId,
    TapId,
  },
};

/// Any failure of an operation against the tank store. Every variant
/// aborts the surrounding operation: the staging layer is discarded and
/// nothing is committed.
#[derive(Debug, Error)]
pub enum Error {
  /// Structural problems, caught before any state changes.
  #[error("validation failure: {0}")]
  Validation(#[from] ValidationError),
  /// A required authority is missing, unused, or an account lacks
  /// permission over an asset.
  #[error("authorization failure: {0}")]
  Authorization(#[from] AuthorizationError),
  /// A chain-configured limit was exhausted.
  #[error("resource limit: {0}")]
  Resource(#[from] ResourceError),
  /// The operation was well-formed but the tank's live state refuses
  /// it.
  #[error("{0}")]
  Semantic(#[from] SemanticError),
  /// A state reachable only through a bug in validation.
  #[error("internal error, please report: {0}")]
  Internal(#[from] InternalError),
}

impl From<validation::Error> for Error {
  fn from(err: validation::Error) -> Self {
    Error::Validation(ValidationError::Schematic(err))
  }
}

impl From<operations::Error> for Error {
  fn from(err: operations::Error) -> Self {
    Error::Validation(ValidationError::Operation(err))
  }
}

impl From<queries::Error> for Error {
  fn from(err: queries::Error) -> Self {
    Error::Validation(ValidationError::Query(err))
  }
}

impl From<LookupError> for Error {
  fn from(err: LookupError) -> Self {
    Error::Validation(ValidationError::Lookup(err))
  }
}

#[derive(Debug, Error)]
pub enum ValidationError {
  #[error(transparent)]
  Schematic(#[from] validation::Error),
  #[error(transparent)]
  Operation(#[from] operations::Error),
  #[error(transparent)]
  Query(#[from] queries::Error),
  #[error(transparent)]
  Lookup(#[from] LookupError),
  #[error("tank {0} does not exist")]
  NonexistentTank(TankId),
  #[error("tap {0:?} does not exist")]
  NonexistentTap(TapId),
  #[error("tap {0:?} is not connected")]
  TapNotConnected(TapId),
  #[error("attachment {0} does not exist")]
  NonexistentAttachment(Index),
  #[error("query targets an accessory of the wrong type at {0:?}")]
  QueryTargetMismatch(AccessoryAddress),
  #[error("tank create deposit must be {expected}, got {declared}")]
  IncorrectDeposit { expected: Amount, declared: Amount },
  #[error("tank update deposit delta must be {expected}, got {declared}")]
  IncorrectDepositDelta { expected: Amount, declared: Amount },
}

#[derive(Debug, Error)]
pub enum AuthorizationError {
  #[error("account {account} is not authorized to transact asset {asset}")]
  UnauthorizedForAsset { account: AccountId, asset: AssetId },
  #[error(
    "terminal sink is an account ({account}) which is unauthorized to hold \
     the asset"
  )]
  UnauthorizedAssetHolder { account: AccountId, asset: AssetId },
  #[error("operation does not declare an authority it requires")]
  MissingRequiredAuthority,
  #[error("operation declares a required authority it never uses")]
  UnusedAuthority,
  #[error("update authority does not match the tank's emergency tap")]
  BadUpdateAuthority,
  #[error("delete authority does not match the tank's emergency tap")]
  BadDeleteAuthority,
  #[error("query requires an authority the accessory does not declare")]
  NoAuthorityDeclared,
}

#[derive(Debug, Error)]
pub enum ResourceError {
  #[error("tap flow has exceeded the maximum sink chain length")]
  ExceededMaxChainLength,
  #[error("tap flow has exceeded the maximum number of taps to open")]
  MaxTapsExceeded,
  #[error("cannot open tap: tank {0} is empty")]
  TankEmpty(TankId),
  #[error(
    "cannot release requested amount of {requested} from tap: tank balance \
     is only {available}"
  )]
  InsufficientBalance { requested: Amount, available: Amount },
  #[error("account {0} has insufficient balance to pay the deposit")]
  InsufficientPayerBalance(AccountId),
}

#[derive(Debug, Error)]
pub enum SemanticError {
  #[error("cannot open tap: requirement {requirement} has locked the tap")]
  TapLocked { tap: TapId, requirement: usize },
  #[error(
    "cannot release requested amount of {requested} from tap: requirement \
     {requirement} has limited flow to {limit}"
  )]
  RequirementLimitedFlow {
    tap: TapId,
    requirement: usize,
    requested: Amount,
    limit: Amount,
  },
  #[error("deposit path is not accepted by the destination's deposit source restrictor")]
  RestrictorRejected,
  #[error("destination tank stores asset {stored}, but the flow carries {flowed}")]
  WrongAssetForTank { stored: AssetId, flowed: AssetId },
  #[error("ticket number does not match the requirement's counter")]
  TicketNumberMismatch,
  #[error("ticket signature is invalid")]
  TicketSignatureInvalid,
  #[error("preimage size does not match the hash lock")]
  PreimageWrongSize,
  #[error("preimage does not match the hash lock")]
  PreimageMismatch,
  #[error("request {0} does not exist")]
  NonexistentRequest(Index),
  #[error("request {0} has not been approved")]
  RequestNotApproved(Index),
  #[error("request {0} has not matured yet")]
  RequestNotMatured(Index),
  #[error("the limit on outstanding requests has been reached")]
  RequestLimitReached,
  #[error("only a destructor tap can claim the deposit")]
  NotDestructorTap,
  #[error("cannot destroy a tank holding an outstanding balance")]
  TankNotEmpty,
  #[error("claimed deposit does not match the tank's deposit")]
  IncorrectDepositClaim,
}

#[derive(Debug, Error)]
pub enum InternalError {
  #[error("asset flowed to an attachment which cannot receive asset")]
  AssetToNonReceivingAttachment,
  #[error("sink resolves outside the context of any current tank")]
  NoCurrentTank,
  #[error("flow origin cannot be the contextual same-tank reference")]
  SameTankOrigin,
  #[error("attachment received an asset it was not validated to accept")]
  AttachmentAssetMismatch,
  #[error("accessory state has the wrong payload kind")]
  StateKindMismatch,
  #[error("balance arithmetic overflowed")]
  BalanceOverflow,
  #[error("release limit resolved to unlimited")]
  UnboundedRelease,
  #[error("sink chain walk ended on a non-terminal sink")]
  UnresolvedTerminalSink,
}
