//! Screen enumeration and the bounded navigation history.
//!
//! Every screen is reachable from the preset-selection home screen through a chain of
//! at most three forward steps, so the history is a fixed four-slot stack. Walking off
//! either end of the stack is a navigation-logic bug, not a user error; it forces the
//! terminal [`Screen::Error`] state, recoverable only by an external reset.

/// Navigation history depth, including the home screen.
pub const NAV_DEPTH: usize = 4;

/// The screens presented on the 16 illuminated keys.
///
/// The user manual groups these into five sections: preset selection, channel editing,
/// recording, global editing, and bank selection. Some sections have more than one
/// screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Screen {
    /// Preset selection, the home screen.
    PresetSelect,
    /// Select the channel on which preset-selection operations, such as recording,
    /// take place.
    PresetChannelSelect,
    /// Intermediary screen allowing navigation to all major sections.
    SectionSelect,
    /// Configure channels as gate, CV or random.
    EditChannelSelect,
    /// Edit any of the 16 voltages of a single channel, or mark them locked, inactive
    /// or random.
    EditChannelVoltages,
    /// Record voltages, manually or automatically.
    RecordChannelSelect,
    /// Global editing of presets, including removal from the sequence.
    GlobalEdit,
    /// Select a new bank from memory.
    BankSelect,
    /// Load an entirely new module from storage.
    ModuleSelect,
    /// The module has entered an error state.
    Error,
}

/// Failed screen transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NavigationError {
    /// Attempted to go forward past the deepest history slot.
    Overflow,
    /// Attempted to go back past the home screen.
    Underflow,
}

/// Bounded history of visited screens.
#[derive(Clone, Debug)]
pub struct NavigationStack {
    history: [Screen; NAV_DEPTH],
    index: usize,
    current: Screen,
}

impl Default for NavigationStack {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationStack {
    /// Constructs a stack sitting at the home screen.
    pub fn new() -> Self {
        Self {
            history: [Screen::PresetSelect; NAV_DEPTH],
            index: 0,
            current: Screen::PresetSelect,
        }
    }

    /// The screen currently presented.
    pub fn current(&self) -> Screen {
        self.current
    }

    /// Navigates forward to `screen`, recording it in the history.
    pub fn go_forward(&mut self, screen: Screen) -> Result<Screen, NavigationError> {
        if self.index == NAV_DEPTH - 1 {
            error!("Attempting to go forward past the deepest step in the nav history");
            self.current = Screen::Error;
            return Err(NavigationError::Overflow);
        }
        self.index += 1;
        self.history[self.index] = screen;
        self.current = screen;
        Ok(screen)
    }

    /// Navigates back to the previously recorded screen.
    pub fn go_back(&mut self) -> Result<Screen, NavigationError> {
        if self.index == 0 {
            error!("Attempting to go back past the earliest step in the nav history");
            self.current = Screen::Error;
            return Err(NavigationError::Underflow);
        }
        self.index -= 1;
        self.current = self.history[self.index];
        Ok(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_and_back_restore_the_previous_screen() {
        let mut nav = NavigationStack::new();
        assert_eq!(Ok(Screen::SectionSelect), nav.go_forward(Screen::SectionSelect));
        assert_eq!(Ok(Screen::BankSelect), nav.go_forward(Screen::BankSelect));
        assert_eq!(Ok(Screen::SectionSelect), nav.go_back());
        assert_eq!(Screen::SectionSelect, nav.current(), "Expected left but got right");
    }

    #[test]
    fn going_back_past_home_is_an_error() {
        let mut nav = NavigationStack::new();
        assert_eq!(Err(NavigationError::Underflow), nav.go_back());
        assert_eq!(
            Screen::Error,
            nav.current(),
            "Underflow should force the error screen"
        );
    }

    #[test]
    fn going_forward_past_the_deepest_slot_is_an_error() {
        let mut nav = NavigationStack::new();
        assert!(nav.go_forward(Screen::SectionSelect).is_ok());
        assert!(nav.go_forward(Screen::EditChannelSelect).is_ok());
        assert!(nav.go_forward(Screen::EditChannelVoltages).is_ok());
        assert_eq!(
            Err(NavigationError::Overflow),
            nav.go_forward(Screen::BankSelect)
        );
        assert_eq!(
            Screen::Error,
            nav.current(),
            "Overflow should force the error screen"
        );
    }
}
