//! SetZone：切换当前区域，负载为 16 字节区域 UUID

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::{Action, ActionId, Followup};
use crate::core::{DecodeError, EncodeError, RuntimeError};
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetZone(pub Uuid);

impl Action for SetZone {
    const ID: ActionId = ActionId::SetZone;

    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(self.0.as_bytes().to_vec())
    }

    fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        Uuid::from_slice(payload)
            .map(SetZone)
            .map_err(|_| DecodeError::InvalidZoneId(payload.len()))
    }

    fn execute(&self, session: &mut SessionState) -> Result<Followup, RuntimeError> {
        if session.state.enter_zone(self.0) {
            tracing::debug!(zone = %self.0, "zone entered for the first time");
            Ok(Followup::InitializeZone(self.0))
        } else {
            Ok(Followup::None)
        }
    }
}
