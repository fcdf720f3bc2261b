use {
  crate::{Authority, Sink, TapRequirement},
  serde::{Deserialize, Serialize},
};

/// An exit point of a tank, gated by a vector of requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tap {
  /// Where released asset goes. May be absent only when a connect
  /// authority can wire it later.
  pub connected_sink: Option<Sink>,
  /// Who may open the tap. Absent means anyone who can satisfy the
  /// requirements may open it.
  pub open_authority: Option<Authority>,
  /// Who may connect or rewire the tap. Absent means the connection is
  /// fixed at creation.
  pub connect_authority: Option<Authority>,
  pub requirements: Vec<TapRequirement>,
  /// Destructor taps may destroy the tank once it empties.
  pub destructor_tap: bool,
}
