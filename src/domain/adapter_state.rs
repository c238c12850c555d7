use crate::domain::models::AdapterState;
use tracing::info;

/// What a power-state notification means for the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTransition {
    EnteredPoweredOn,
    LeftPoweredOn,
    Unchanged,
}

/// Tracks the radio power state reported by the adapter. Never polls; the
/// state only moves when [`observe`](Self::observe) is fed a notification.
#[derive(Debug, Default)]
pub struct AdapterStateMachine {
    state: AdapterState,
}

impl AdapterStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn is_powered_on(&self) -> bool {
        self.state == AdapterState::PoweredOn
    }

    /// Record a new state and classify the transition.
    pub fn observe(&mut self, new_state: AdapterState) -> PowerTransition {
        let previous = std::mem::replace(&mut self.state, new_state);
        info!("Adapter state: {} -> {}", previous, new_state);

        let was_on = previous == AdapterState::PoweredOn;
        let is_on = new_state == AdapterState::PoweredOn;
        match (was_on, is_on) {
            (false, true) => PowerTransition::EnteredPoweredOn,
            (true, false) => PowerTransition::LeftPoweredOn,
            _ => PowerTransition::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let machine = AdapterStateMachine::new();
        assert_eq!(machine.state(), AdapterState::Unknown);
        assert!(!machine.is_powered_on());
    }

    #[test]
    fn test_power_cycle_transitions() {
        let mut machine = AdapterStateMachine::new();
        assert_eq!(
            machine.observe(AdapterState::PoweredOn),
            PowerTransition::EnteredPoweredOn
        );
        assert_eq!(
            machine.observe(AdapterState::PoweredOn),
            PowerTransition::Unchanged
        );
        assert_eq!(
            machine.observe(AdapterState::PoweredOff),
            PowerTransition::LeftPoweredOn
        );
        assert_eq!(
            machine.observe(AdapterState::Resetting),
            PowerTransition::Unchanged
        );
        assert_eq!(
            machine.observe(AdapterState::PoweredOn),
            PowerTransition::EnteredPoweredOn
        );
        assert!(machine.is_powered_on());
    }

    #[test]
    fn test_non_power_states_are_recorded() {
        let mut machine = AdapterStateMachine::new();
        assert_eq!(
            machine.observe(AdapterState::Unauthorized),
            PowerTransition::Unchanged
        );
        assert_eq!(machine.state(), AdapterState::Unauthorized);
    }
}
