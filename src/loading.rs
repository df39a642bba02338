use serde::{Deserialize, Serialize};

/// The various possible states of loading data.
///
/// A container whose state is `None` means data loading has not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadState {
    /// The data is in the process of being loaded.
    Loading,
    /// Data is loaded/present, but there is also work in progress that will
    /// change it (some or all of its values).
    Updating,
    /// The data is loaded.
    Loaded,
    /// Data is loaded/present, but it is (or probably is) out-of-date
    /// (possibly known because the update of other data is known to affect
    /// this data).
    Stale,
    /// Data was not able to be loaded due to an error.
    Error,
}

impl LoadState {
    /// Whether a producer currently has work in flight for this container.
    pub fn in_flight(&self) -> bool {
        matches!(self, LoadState::Loading | LoadState::Updating)
    }
}

impl core::fmt::Display for LoadState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            LoadState::Loading => "loading",
            LoadState::Updating => "updating",
            LoadState::Loaded => "loaded",
            LoadState::Stale => "stale",
            LoadState::Error => "error",
        };
        f.write_str(s)
    }
}
