/// Everything the controller reacts to. Platform listeners, the refresh
/// workers and the signal handler all feed the same channel, so handling is
/// serialized on the controller task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarEvent {
    /// Outputs were added, removed or changed mode.
    DisplaysChanged,
    WillSleep,
    DidWake,
    /// A workspace query finished (possibly after it became stale).
    WorkspaceFinished(QueryResult),
    /// Battery label computed by a worker for windows of `epoch`.
    BatteryRead { epoch: u64, text: String },
    Shutdown,
}

/// Outcome of one workspace query, tagged with the generation it was
/// launched under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub generation: u64,
    pub text: String,
    pub ok: bool,
}

/// Refresh kinds driven by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    Clock,
    Workspace,
    Battery,
}
