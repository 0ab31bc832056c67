//! Cache states and the cells that carry them.

/// Freshness of one cached value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CacheState {
    /// Not computed for the current contents of the source.
    #[default]
    Invalid,
    /// Computed and current.
    Valid,
    /// Was valid, then dropped to save memory. Recomputed on demand.
    Flushed,
    /// Computing it failed for the current contents of the source.
    Error,
}

impl CacheState {
    /// Returns `true` if a lookup has to compute the value first.
    pub fn needs_computing(self) -> bool {
        matches!(self, CacheState::Invalid | CacheState::Flushed)
    }
}

/// One cached value and its state.
///
/// A value is only present while the state is [`CacheState::Valid`].
#[derive(Clone, Debug)]
pub struct CacheCell<T> {
    state: CacheState,
    value: Option<T>,
}

impl<T> Default for CacheCell<T> {
    fn default() -> Self {
        Self {
            state: CacheState::Invalid,
            value: None,
        }
    }
}

impl<T> CacheCell<T> {
    /// The state of the value.
    pub fn state(&self) -> CacheState {
        self.state
    }

    /// The value, if valid.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Stores a freshly computed value.
    pub fn set_value(&mut self, value: T) {
        self.state = CacheState::Valid;
        self.value = Some(value);
    }

    /// Moves the cell to `state`.
    ///
    /// Any state but `Valid` drops the value. `Valid` is only accepted while
    /// a value is present.
    pub fn set_state(&mut self, state: CacheState) {
        match state {
            CacheState::Valid => {
                if self.value.is_some() {
                    self.state = CacheState::Valid;
                }
            }
            other => {
                self.state = other;
                self.value = None;
            }
        }
    }

    /// Drops a valid value to save memory. Other states are left alone.
    pub fn flush(&mut self) {
        if self.state == CacheState::Valid {
            self.set_state(CacheState::Flushed);
        }
    }

    /// Marks the value as stale.
    pub fn invalidate(&mut self) {
        self.set_state(CacheState::Invalid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_invalid() {
        let cell: CacheCell<u32> = CacheCell::default();
        assert_eq!(cell.state(), CacheState::Invalid);
        assert!(cell.value().is_none());
        assert!(cell.state().needs_computing());
    }

    #[test]
    fn flush_only_touches_valid() {
        let mut cell = CacheCell::default();
        cell.flush();
        assert_eq!(cell.state(), CacheState::Invalid);

        cell.set_value(7);
        cell.flush();
        assert_eq!(cell.state(), CacheState::Flushed);
        assert!(cell.value().is_none());

        cell.set_state(CacheState::Error);
        cell.flush();
        assert_eq!(cell.state(), CacheState::Error);
        assert!(!cell.state().needs_computing());
    }

    #[test]
    fn valid_requires_a_value() {
        let mut cell = CacheCell::default();
        cell.set_state(CacheState::Valid);
        assert_eq!(cell.state(), CacheState::Invalid);

        cell.set_value("x");
        cell.invalidate();
        assert_eq!(cell.state(), CacheState::Invalid);
        assert!(cell.value().is_none());

        cell.set_value("y");
        assert_eq!(cell.value(), Some(&"y"));
    }
}
