//! ResetApp：零长度负载的重置信号

use serde::{Deserialize, Serialize};

use crate::actions::{Action, ActionId, Followup};
use crate::core::{DecodeError, EncodeError, RuntimeError};
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetApp;

impl Action for ResetApp {
    const ID: ActionId = ActionId::ResetApp;

    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(Vec::new())
    }

    fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.is_empty() {
            Ok(ResetApp)
        } else {
            Err(DecodeError::TrailingBytes {
                what: "reset app",
                count: payload.len(),
            })
        }
    }

    /// 清空区域成员与初始化标记；成员重建与起始区域由 Runtime 完成
    fn execute(&self, session: &mut SessionState) -> Result<Followup, RuntimeError> {
        session.state.clear_zone_tracking();
        Ok(Followup::ResetApp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_reset_clears_tracking() {
        let mut session = SessionState::new(Uuid::new_v4());
        let zone = Uuid::new_v4();
        session.state.enter_zone(zone);
        session.state.zone_actors.insert(zone, vec![Uuid::new_v4()]);

        assert_eq!(ResetApp.execute(&mut session).unwrap(), Followup::ResetApp);
        assert!(session.state.zone_actors.is_empty());
        assert!(!session.state.is_zone_initialized(zone));
    }

    #[test]
    fn test_reset_payload() {
        assert!(ResetApp.encode().unwrap().is_empty());
        assert_eq!(ResetApp::decode(&[]).unwrap(), ResetApp);
        assert!(ResetApp::decode(&[0]).is_err());
    }
}
