//! REST-Handler Module

pub mod rooms;
pub mod sessions;
pub mod status;

#[cfg(test)]
pub(crate) mod testhilfe {
    use easyconnect_signaling::{Coordinator, CoordinatorConfig, TestUhr};
    use std::sync::Arc;

    use crate::rest::ApiState;

    pub fn api_state() -> (ApiState, Arc<TestUhr>) {
        let uhr = Arc::new(TestUhr::neu());
        let coordinator = Coordinator::neu(CoordinatorConfig::default(), uhr.clone(), None);
        (ApiState::neu(coordinator), uhr)
    }
}
