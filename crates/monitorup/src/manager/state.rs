use std::fmt;

/// Lifecycle of the manager's monitor cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ManagerState {
    /// Nothing cached
    #[default]
    Empty,
    /// A populate call is fetching candidates
    Populating,
    /// Monitors are cached
    Populated,
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ManagerState::Empty => "empty",
            ManagerState::Populating => "populating",
            ManagerState::Populated => "populated",
        };
        f.write_str(name)
    }
}
