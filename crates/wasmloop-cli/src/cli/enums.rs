use clap::ValueEnum;

/// Debounce keying for artifact events
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum DebounceScope {
    /// Track the last event kind separately for every artifact file
    ///
    /// Two modules rebuilding at the same time cannot swallow each other's
    /// trigger.
    #[value(name = "per-file")]
    PerFile,

    /// Share one last-event-kind across every matching file
    #[value(name = "global")]
    Global,
}
