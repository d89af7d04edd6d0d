use serde::{Deserialize, Serialize};

/// Cluster status as reported by the tool. Wire form is `CREATE_COMPLETE`
/// and friends; anything else fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteLifecycleStatus {
    CreateInProgress,
    CreateComplete,
    CreateFailed,
    UpdateInProgress,
    UpdateComplete,
    UpdateFailed,
    DeleteInProgress,
    DeleteComplete,
    DeleteFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Availability {
    Available,
    Unavailable,
}

/// What a lifecycle status means for the resource. `availability` of `None`
/// leaves the previously recorded availability untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleOutcome {
    pub exists: bool,
    pub availability: Option<Availability>,
}

impl RemoteLifecycleStatus {
    pub const ALL: [Self; 9] = [
        Self::CreateInProgress,
        Self::CreateComplete,
        Self::CreateFailed,
        Self::UpdateInProgress,
        Self::UpdateComplete,
        Self::UpdateFailed,
        Self::DeleteInProgress,
        Self::DeleteComplete,
        Self::DeleteFailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::CreateFailed => "CREATE_FAILED",
            Self::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Self::UpdateComplete => "UPDATE_COMPLETE",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::DeleteFailed => "DELETE_FAILED",
        }
    }

    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            Self::CreateInProgress | Self::UpdateInProgress | Self::DeleteInProgress
        )
    }

    pub fn lifecycle_outcome(self) -> LifecycleOutcome {
        let (exists, availability) = match self {
            Self::CreateInProgress | Self::UpdateInProgress | Self::DeleteInProgress => {
                (true, None)
            }
            Self::CreateComplete | Self::UpdateComplete => (true, Some(Availability::Available)),
            Self::CreateFailed | Self::DeleteComplete => (false, None),
            Self::UpdateFailed | Self::DeleteFailed => (true, Some(Availability::Unavailable)),
        };
        LifecycleOutcome {
            exists,
            availability,
        }
    }
}

impl std::fmt::Display for RemoteLifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
