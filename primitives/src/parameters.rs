use {
  crate::Amount,
  serde::{Deserialize, Serialize},
};

/// Prices for one operation kind: a flat fee plus a price per encoded
/// byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParameters {
  pub base_fee: Amount,
  pub price_per_byte: Amount,
}

/// Chain-configured limits and prices for tank structures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
  /// The maximum length of a sink chain (a sequence of tank
  /// attachments).
  pub max_sink_chain_length: u16,
  /// The maximum number of taps a single operation may open.
  pub max_taps_to_open: u16,
  /// Flat part of the deposit a tank bonds at creation.
  pub deposit_base: Amount,
  /// Deposit per accessory (attachment or tap requirement).
  pub deposit_per_accessory: Amount,
  pub tank_create_fee: FeeParameters,
  pub tank_update_fee: FeeParameters,
  pub tank_delete_fee: FeeParameters,
  pub tank_query_fee: FeeParameters,
  pub tap_open_fee: FeeParameters,
}

impl Default for Parameters {
  fn default() -> Self {
    Self {
      max_sink_chain_length: 10,
      max_taps_to_open: 10,
      deposit_base: 100,
      deposit_per_accessory: 20,
      tank_create_fee: FeeParameters {
        base_fee: 500,
        price_per_byte: 10,
      },
      tank_update_fee: FeeParameters {
        base_fee: 500,
        price_per_byte: 10,
      },
      tank_delete_fee: FeeParameters {
        base_fee: 100,
        price_per_byte: 0,
      },
      tank_query_fee: FeeParameters {
        base_fee: 50,
        price_per_byte: 5,
      },
      tap_open_fee: FeeParameters {
        base_fee: 100,
        price_per_byte: 5,
      },
    }
  }
}
