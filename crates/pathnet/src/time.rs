use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeState {
    #[default]
    Past,
    Future,
}

impl TimeState {
    pub const ALL: [TimeState; 2] = [TimeState::Past, TimeState::Future];

    pub fn from_is_future(is_future: bool) -> Self {
        if is_future {
            TimeState::Future
        } else {
            TimeState::Past
        }
    }

    pub fn is_future(self) -> bool {
        matches!(self, TimeState::Future)
    }

    pub fn toggled(self) -> Self {
        match self {
            TimeState::Past => TimeState::Future,
            TimeState::Future => TimeState::Past,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TimeState::Past => "past",
            TimeState::Future => "future",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeTransition {
    pub from: TimeState,
    pub to: TimeState,
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    current: TimeState,
    transitions: u64,
}

impl Timeline {
    pub fn new(initial: TimeState) -> Self {
        Self {
            current: initial,
            transitions: 0,
        }
    }

    pub fn current(&self) -> TimeState {
        self.current
    }

    pub fn is_future(&self) -> bool {
        self.current.is_future()
    }

    pub fn transition_count(&self) -> u64 {
        self.transitions
    }

    pub fn set(&mut self, state: TimeState) -> Option<TimeTransition> {
        if state == self.current {
            return None;
        }
        let transition = TimeTransition {
            from: self.current,
            to: state,
        };
        self.current = state;
        self.transitions = self.transitions.saturating_add(1);
        info!(
            from = transition.from.name(),
            to = transition.to.name(),
            "time_changed"
        );
        Some(transition)
    }

    pub fn toggle(&mut self) -> TimeTransition {
        let next = self.current.toggled();
        let transition = TimeTransition {
            from: self.current,
            to: next,
        };
        self.current = next;
        self.transitions = self.transitions.saturating_add(1);
        info!(
            from = transition.from.name(),
            to = transition.to.name(),
            "time_changed"
        );
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_to_current_state_emits_no_transition() {
        let mut timeline = Timeline::new(TimeState::Past);
        assert_eq!(timeline.set(TimeState::Past), None);
        assert_eq!(timeline.transition_count(), 0);
    }

    #[test]
    fn toggle_flips_and_reports_transition() {
        let mut timeline = Timeline::default();
        let transition = timeline.toggle();

        assert_eq!(transition.from, TimeState::Past);
        assert_eq!(transition.to, TimeState::Future);
        assert!(timeline.is_future());

        let back = timeline.set(TimeState::Past).expect("transition");
        assert_eq!(back.to, TimeState::Past);
        assert_eq!(timeline.transition_count(), 2);
    }

    #[test]
    fn from_is_future_round_trips() {
        for state in TimeState::ALL {
            assert_eq!(TimeState::from_is_future(state.is_future()), state);
        }
    }
}
