mod env;
mod error;
mod evaluators;
mod object;
mod queries;
mod requirements;
mod sink_flow;
mod staging;
mod store;
mod tap_flow;

pub use {
  env::{Environment, InMemoryEnvironment},
  error::{
    AuthorizationError,
    Error,
    InternalError,
    ResourceError,
    SemanticError,
    ValidationError,
  },
  evaluators::{
    apply_tank_create,
    apply_tank_delete,
    apply_tank_query,
    apply_tank_update,
    apply_tap_open,
  },
  object::TankObject,
  queries::QueryEvaluator,
  requirements::{max_tap_release, ReleaseLimit},
  sink_flow::SinkFlowProcessor,
  staging::{AccountCredit, CommitSet, StagedTanks},
  store::{InMemoryTankStore, TankStore},
  tap_flow::{evaluate_tap_flow, TapFlow, TapFlowReport},
};
