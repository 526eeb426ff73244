use std::{sync::Arc, time::Duration};

use {
    moqlink_broker::Broker,
    moqlink_liaison::{CommandDispatcher, RegistrationManager},
};

/// Shared state for the plugin and admin routers.
#[derive(Clone)]
pub struct GatewayState {
    pub broker: Arc<dyn Broker>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub registration: Arc<RegistrationManager>,
    /// Deadline applied to each inbound command execution.
    pub command_timeout: Duration,
}

impl GatewayState {
    pub fn new(
        broker: Arc<dyn Broker>,
        dispatcher: Arc<CommandDispatcher>,
        registration: Arc<RegistrationManager>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            broker,
            dispatcher,
            registration,
            command_timeout,
        }
    }
}
