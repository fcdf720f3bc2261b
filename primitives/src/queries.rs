use {
  crate::{AccessoryAddress, FlowLimit, Index, Sink, TankId, Ticket},
  ed25519_dalek::Signature,
  serde::{Deserialize, Serialize},
  thiserror::Error,
};

const MAX_COMMENT_LENGTH: usize = 150;

/// An action run against a tank or one of its accessories before any
/// flow begins.
///
/// Queries perform actions or record information relevant to particular
/// accessories, or to the tank as a whole; several tap requirements can
/// only be satisfied by a query applied within the same operation that
/// opens the tap.
///
/// Variant order is part of the wire format: new variants append at the
/// end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Query {
  /// Reset a flow meter's reading to zero.
  ResetMeter,
  /// Rewire the output sink of the attachment governed by the targeted
  /// connect authority.
  ReconnectAttachment { new_sink: Sink },
  CreateRequestForReview {
    request_amount: FlowLimit,
    comment: Option<String>,
  },
  ReviewRequestToOpen {
    request_id: Index,
    approved: bool,
    comment: Option<String>,
  },
  CancelRequestForReview {
    request_id: Index,
    comment: Option<String>,
  },
  ConsumeApprovedRequestToOpen { request_id: Index },
  /// Document the reason for the action being taken; also satisfies a
  /// documentation requirement for this open.
  DocumentationString { reason: String },
  CreateRequestForDelay {
    request_amount: FlowLimit,
    comment: Option<String>,
  },
  VetoRequestInDelay {
    request_id: Index,
    comment: Option<String>,
  },
  CancelRequestInDelay {
    request_id: Index,
    comment: Option<String>,
  },
  ConsumeMaturedRequestToOpen { request_id: Index },
  RevealHashPreimage { preimage: Vec<u8> },
  RedeemTicketToOpen {
    ticket: Ticket,
    ticket_signature: Signature,
  },
  /// Zero both an exchange requirement's released tally and the meter
  /// it monitors.
  ResetExchangeAndMeter,
}

/// A query together with the address of the accessory it targets;
/// tank-level queries carry no address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetedQuery {
  pub query: Query,
  pub target: Option<AccessoryAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("request amount must not be zero")]
  ZeroRequestAmount,
  #[error("if provided, comment must not be empty")]
  EmptyComment,
  #[error("comment is max {MAX_COMMENT_LENGTH} characters")]
  CommentTooLong,
  #[error("documentation reason must not be empty")]
  EmptyReason,
  #[error("documentation reason is max {MAX_COMMENT_LENGTH} characters")]
  ReasonTooLong,
  #[error("preimage must not be empty")]
  EmptyPreimage,
  #[error("ticket maximum withdrawal must not be zero")]
  ZeroTicketWithdrawal,
  #[error("ticket tank does not match the queried tank")]
  TicketTankMismatch,
  #[error("ticket tap does not match the query target")]
  TicketTapMismatch,
  #[error("ticket requirement index does not match the query target")]
  TicketRequirementMismatch,
  #[error("query must target an attachment")]
  ExpectedAttachmentTarget,
  #[error("query must target a tap requirement")]
  ExpectedRequirementTarget,
  #[error("query targets the tank and takes no accessory address")]
  UnexpectedTarget,
}

impl TargetedQuery {
  /// Stateless consistency checks; whether the target accessory exists
  /// and has the right type is checked when the query is applied.
  pub fn validate(&self, queried_tank: TankId) -> Result<(), Error> {
    match &self.query {
      Query::ResetMeter | Query::ReconnectAttachment { .. } => {
        if !matches!(self.target, Some(AccessoryAddress::Attachment { .. })) {
          return Err(Error::ExpectedAttachmentTarget);
        }
      }
      Query::DocumentationString { .. } => {
        if self.target.is_some() {
          return Err(Error::UnexpectedTarget);
        }
      }
      _ => {
        if !matches!(self.target, Some(AccessoryAddress::Requirement { .. }))
        {
          return Err(Error::ExpectedRequirementTarget);
        }
      }
    }

    match &self.query {
      Query::CreateRequestForReview {
        request_amount,
        comment,
      }
      | Query::CreateRequestForDelay {
        request_amount,
        comment,
      } => {
        if request_amount.is_zero() {
          return Err(Error::ZeroRequestAmount);
        }
        check_comment(comment)
      }
      Query::ReviewRequestToOpen { comment, .. }
      | Query::CancelRequestForReview { comment, .. }
      | Query::VetoRequestInDelay { comment, .. }
      | Query::CancelRequestInDelay { comment, .. } => check_comment(comment),
      Query::DocumentationString { reason } => {
        if reason.is_empty() {
          return Err(Error::EmptyReason);
        }
        if reason.len() > MAX_COMMENT_LENGTH {
          return Err(Error::ReasonTooLong);
        }
        Ok(())
      }
      Query::RevealHashPreimage { preimage } => {
        if preimage.is_empty() {
          return Err(Error::EmptyPreimage);
        }
        Ok(())
      }
      Query::RedeemTicketToOpen { ticket, .. } => {
        if ticket.max_withdrawal.is_zero() {
          return Err(Error::ZeroTicketWithdrawal);
        }
        if ticket.tank_id != queried_tank {
          return Err(Error::TicketTankMismatch);
        }
        if let Some(AccessoryAddress::Requirement {
          tap_index,
          requirement_index,
        }) = self.target
        {
          if ticket.tap_index != tap_index {
            return Err(Error::TicketTapMismatch);
          }
          if ticket.requirement_index != requirement_index {
            return Err(Error::TicketRequirementMismatch);
          }
        }
        Ok(())
      }
      _ => Ok(()),
    }
  }
}

fn check_comment(comment: &Option<String>) -> Result<(), Error> {
  if let Some(comment) = comment {
    if comment.is_empty() {
      return Err(Error::EmptyComment);
    }
    if comment.len() > MAX_COMMENT_LENGTH {
      return Err(Error::CommentTooLong);
    }
  }
  Ok(())
}
