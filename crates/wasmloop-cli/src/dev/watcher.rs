//! Build-directory watcher with two-phase debounce.
//!
//! Linkers write the raw object in place and then rename it, which shows up
//! as a content change followed by a rename. Only that exact sequence means
//! the artifact is complete, so a `Rename` directly after a `Change` for a
//! matching file is the one trigger for a rebuild.

use crate::config::DebounceScope;
use crate::error::{CliError, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Capacity of the watcher -> dev loop channel.
const WATCH_QUEUE: usize = 100;

/// Coarse filesystem event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactEventKind {
    /// Create, remove or rename
    Rename,
    /// Content or metadata modification
    Change,
    /// Access, close-write and anything unrecognised
    Other,
}

impl From<&EventKind> for ArtifactEventKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) | EventKind::Remove(_) => Self::Rename,
            EventKind::Modify(ModifyKind::Name(_)) => Self::Rename,
            EventKind::Modify(_) => Self::Change,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => Self::Other,
        }
    }
}

/// One filesystem event for one file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEvent {
    pub kind: ArtifactEventKind,
    pub name: String,
}

impl ArtifactEvent {
    pub fn new(kind: ArtifactEventKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Debounce state for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebouncePhase {
    /// Last event was not a change
    #[default]
    Idle,
    /// Last event was a change; a rename now completes the artifact
    SeenChange,
}

impl DebouncePhase {
    /// Advance on a `Rename` or `Change`. Returns the next phase and whether
    /// the artifact is ready.
    pub fn next(self, kind: ArtifactEventKind) -> (Self, bool) {
        match (self, kind) {
            (Self::SeenChange, ArtifactEventKind::Rename) => (Self::Idle, true),
            (_, ArtifactEventKind::Change) => (Self::SeenChange, false),
            (_, ArtifactEventKind::Rename) => (Self::Idle, false),
            (phase, ArtifactEventKind::Other) => (phase, false),
        }
    }
}

/// Tracks the last event kind per debounce key.
#[derive(Debug, Default)]
pub struct Debouncer {
    scope: DebounceScope,
    phases: HashMap<String, DebouncePhase>,
}

impl Debouncer {
    pub fn new(scope: DebounceScope) -> Self {
        Self {
            scope,
            phases: HashMap::new(),
        }
    }

    /// Feed one event; returns `true` when it completes an artifact.
    ///
    /// `Other` events leave the state untouched.
    pub fn observe(&mut self, event: &ArtifactEvent) -> bool {
        if event.kind == ArtifactEventKind::Other {
            return false;
        }

        let key = match self.scope {
            DebounceScope::PerFile => event.name.as_str(),
            DebounceScope::Global => "",
        };

        let phase = self.phases.get(key).copied().unwrap_or_default();
        let (next, ready) = phase.next(event.kind);
        // Only keys with a pending change are kept
        if next == DebouncePhase::Idle {
            self.phases.remove(key);
        } else {
            self.phases.insert(key.to_string(), next);
        }
        ready
    }
}

/// Recognises raw artifacts and derives their final names.
#[derive(Debug, Clone)]
pub struct ArtifactMatcher {
    marker: String,
    suffix: String,
}

impl ArtifactMatcher {
    pub fn new(marker: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            suffix: suffix.into(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        name.contains(&self.marker)
    }

    /// `app.wasm.o` -> `app.wasm`.
    pub fn artifact_name(&self, name: &str) -> String {
        match name.strip_suffix(&self.suffix) {
            Some(stem) => stem.to_string(),
            None => name.replacen(&self.suffix, "", 1),
        }
    }
}

/// Signal from the watcher to the dev loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A rebuilt artifact is complete at this path
    ArtifactReady(PathBuf),
    /// The watch on the root failed; the loop cannot continue
    Failed(String),
}

/// Turns raw notify events into [`WatchEvent`]s.
///
/// Kept separate from the OS watcher so the debounce logic can be driven
/// with synthetic events.
#[derive(Debug)]
pub struct EventRouter {
    root: PathBuf,
    matcher: ArtifactMatcher,
    debouncer: Debouncer,
}

impl EventRouter {
    pub fn new(root: PathBuf, matcher: ArtifactMatcher, scope: DebounceScope) -> Self {
        Self {
            root,
            matcher,
            debouncer: Debouncer::new(scope),
        }
    }

    pub fn route(&mut self, event: &Event) -> Vec<WatchEvent> {
        let kind = ArtifactEventKind::from(&event.kind);
        let mut out = Vec::new();

        for path in &event.paths {
            if path == &self.root {
                if matches!(event.kind, EventKind::Remove(_)) {
                    out.push(WatchEvent::Failed(format!(
                        "Watched directory was removed: {}",
                        self.root.display()
                    )));
                }
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !self.matcher.matches(name) {
                continue;
            }

            let artifact = ArtifactEvent::new(kind, name);
            if self.debouncer.observe(&artifact) {
                let ready = self.root.join(self.matcher.artifact_name(name));
                tracing::debug!(artifact = %ready.display(), "artifact ready");
                out.push(WatchEvent::ArtifactReady(ready));
            }
        }

        out
    }
}

/// Drops readiness for artifacts that aren't on disk, e.g. a linker temp
/// file such as `app.wasm.o.tmp1a2b` renamed into place.
fn artifact_exists(event: &WatchEvent) -> bool {
    match event {
        WatchEvent::ArtifactReady(path) if !path.is_file() => {
            tracing::debug!(artifact = %path.display(), "skipping missing artifact");
            false
        }
        _ => true,
    }
}

/// OS-level watcher on the build output directory.
pub struct ArtifactWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl ArtifactWatcher {
    /// Start watching `root` (non-recursive).
    ///
    /// # Errors
    ///
    /// Returns error if the directory doesn't exist or the watch can't be
    /// installed.
    pub fn new(
        root: PathBuf,
        matcher: ArtifactMatcher,
        scope: DebounceScope,
    ) -> Result<(Self, mpsc::Receiver<WatchEvent>)> {
        if !root.is_dir() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(WATCH_QUEUE);
        let mut router = EventRouter::new(root.clone(), matcher, scope);

        // Runs on notify's thread
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let events = match res {
                Ok(event) => router.route(&event),
                Err(err) => vec![WatchEvent::Failed(err.to_string())],
            };
            for event in events.into_iter().filter(artifact_exists) {
                let _ = tx.blocking_send(event);
            }
        })?;

        watcher.watch(&root, RecursiveMode::NonRecursive)?;
        tracing::debug!(root = %root.display(), "watching build directory");

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};
    use std::time::Duration;

    use ArtifactEventKind::{Change, Other, Rename};

    fn feed(debouncer: &mut Debouncer, events: &[(ArtifactEventKind, &str)]) -> usize {
        events
            .iter()
            .filter(|(kind, name)| debouncer.observe(&ArtifactEvent::new(*kind, *name)))
            .count()
    }

    fn router(scope: DebounceScope) -> EventRouter {
        EventRouter::new(
            PathBuf::from("/project/bin"),
            ArtifactMatcher::new(".wasm.o", ".o"),
            scope,
        )
    }

    fn change(path: &str) -> Event {
        Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content))).add_path(path.into())
    }

    fn rename(path: &str) -> Event {
        Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any))).add_path(path.into())
    }

    #[test]
    fn test_change_then_rename_triggers_once() {
        let mut debouncer = Debouncer::new(DebounceScope::PerFile);
        assert_eq!(feed(&mut debouncer, &[(Change, "app.wasm.o"), (Rename, "app.wasm.o")]), 1);
    }

    #[test]
    fn test_other_sequences_do_not_trigger() {
        let cases: &[&[(ArtifactEventKind, &str)]] = &[
            &[(Rename, "app.wasm.o"), (Rename, "app.wasm.o")],
            &[(Change, "app.wasm.o"), (Change, "app.wasm.o")],
            &[(Change, "app.wasm.o")],
            &[(Rename, "app.wasm.o"), (Change, "app.wasm.o")],
        ];

        for events in cases {
            let mut debouncer = Debouncer::new(DebounceScope::PerFile);
            assert_eq!(feed(&mut debouncer, events), 0, "sequence {:?}", events);
        }
    }

    #[test]
    fn test_other_events_do_not_reset_state() {
        let mut debouncer = Debouncer::new(DebounceScope::PerFile);
        let events = [
            (Change, "app.wasm.o"),
            (Other, "app.wasm.o"),
            (Rename, "app.wasm.o"),
        ];
        assert_eq!(feed(&mut debouncer, &events), 1);
    }

    #[test]
    fn test_repeated_builds_trigger_each_time() {
        let mut debouncer = Debouncer::new(DebounceScope::PerFile);
        let events = [
            (Change, "app.wasm.o"),
            (Rename, "app.wasm.o"),
            (Change, "app.wasm.o"),
            (Rename, "app.wasm.o"),
        ];
        assert_eq!(feed(&mut debouncer, &events), 2);
    }

    #[test]
    fn test_idle_keys_are_dropped() {
        let mut debouncer = Debouncer::new(DebounceScope::PerFile);
        feed(&mut debouncer, &[(Change, "a.wasm.o"), (Change, "b.wasm.o")]);
        assert_eq!(debouncer.phases.len(), 2);

        feed(&mut debouncer, &[(Rename, "a.wasm.o"), (Rename, "b.wasm.o")]);
        assert!(debouncer.phases.is_empty());
    }

    #[test]
    fn test_per_file_scope_keeps_interleaved_files_apart() {
        let events = [
            (Change, "a.wasm.o"),
            (Change, "b.wasm.o"),
            (Rename, "a.wasm.o"),
            (Rename, "b.wasm.o"),
        ];

        let mut per_file = Debouncer::new(DebounceScope::PerFile);
        assert_eq!(feed(&mut per_file, &events), 2);

        // A shared state only sees the last kind, whichever file it came from
        let mut global = Debouncer::new(DebounceScope::Global);
        assert_eq!(feed(&mut global, &events), 1);
    }

    #[test]
    fn test_artifact_name() {
        let matcher = ArtifactMatcher::new(".wasm.o", ".o");
        assert!(matcher.matches("app.wasm.o"));
        assert!(!matcher.matches("app.wasm"));
        assert!(!matcher.matches("index.html"));
        assert_eq!(matcher.artifact_name("app.wasm.o"), "app.wasm");
        assert_eq!(matcher.artifact_name("app.wasm.o.tmp"), "app.wasm.tmp");
    }

    #[test]
    fn test_event_kind_mapping() {
        assert_eq!(
            ArtifactEventKind::from(&EventKind::Create(CreateKind::File)),
            Rename
        );
        assert_eq!(
            ArtifactEventKind::from(&EventKind::Remove(RemoveKind::File)),
            Rename
        );
        assert_eq!(
            ArtifactEventKind::from(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            Rename
        );
        assert_eq!(
            ArtifactEventKind::from(&EventKind::Modify(ModifyKind::Data(DataChange::Any))),
            Change
        );
        assert_eq!(ArtifactEventKind::from(&EventKind::Any), Other);
    }

    #[test]
    fn test_router_emits_final_artifact_path() {
        let mut router = router(DebounceScope::PerFile);

        assert!(router.route(&change("/project/bin/app.wasm.o")).is_empty());
        let events = router.route(&rename("/project/bin/app.wasm.o"));
        assert_eq!(
            events,
            vec![WatchEvent::ArtifactReady(PathBuf::from("/project/bin/app.wasm"))]
        );
    }

    #[test]
    fn test_router_ignores_non_matching_files() {
        let mut router = router(DebounceScope::Global);

        assert!(router.route(&change("/project/bin/app.wasm.o")).is_empty());
        // Unrelated file must not disturb the pending change
        assert!(router.route(&rename("/project/bin/notes.txt")).is_empty());
        assert_eq!(router.route(&rename("/project/bin/app.wasm.o")).len(), 1);
    }

    #[test]
    fn test_router_reports_root_removal() {
        let mut router = router(DebounceScope::PerFile);
        let event =
            Event::new(EventKind::Remove(RemoveKind::Folder)).add_path("/project/bin".into());

        let events = router.route(&event);
        assert!(matches!(events.as_slice(), [WatchEvent::Failed(_)]));
    }

    #[test]
    fn test_missing_artifacts_are_filtered() {
        let temp = tempfile::TempDir::new().unwrap();
        let present = temp.path().join("app.wasm");
        std::fs::write(&present, b"\0asm").unwrap();

        assert!(artifact_exists(&WatchEvent::ArtifactReady(present)));
        assert!(!artifact_exists(&WatchEvent::ArtifactReady(
            temp.path().join("app.wasm.tmp1a2b")
        )));
        assert!(artifact_exists(&WatchEvent::Failed("gone".to_string())));
    }

    fn watch(dir: &Path) -> (ArtifactWatcher, mpsc::Receiver<WatchEvent>) {
        ArtifactWatcher::new(
            dir.to_path_buf(),
            ArtifactMatcher::new(".wasm.o", ".o"),
            DebounceScope::PerFile,
        )
        .unwrap()
    }

    async fn next_event(rx: &mut mpsc::Receiver<WatchEvent>) -> WatchEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("watcher produced no event")
            .expect("watcher channel closed")
    }

    async fn assert_quiet(rx: &mut mpsc::Receiver<WatchEvent>) {
        let extra = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
        assert!(extra.is_err(), "unexpected event: {:?}", extra);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watcher_reports_linked_artifact() {
        let temp = tempfile::TempDir::new().unwrap();
        let bin = temp.path().canonicalize().unwrap().join("bin");
        std::fs::create_dir(&bin).unwrap();
        let (_watcher, mut rx) = watch(&bin);

        // Compile, link, then clean up the object
        std::fs::write(bin.join("app.wasm.o"), b"object").unwrap();
        std::fs::write(bin.join("app.wasm"), b"\0asm").unwrap();
        std::fs::remove_file(bin.join("app.wasm.o")).unwrap();

        assert_eq!(
            next_event(&mut rx).await,
            WatchEvent::ArtifactReady(bin.join("app.wasm"))
        );
        assert_quiet(&mut rx).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watcher_skips_renamed_temp_object() {
        let temp = tempfile::TempDir::new().unwrap();
        let bin = temp.path().canonicalize().unwrap().join("bin");
        std::fs::create_dir(&bin).unwrap();
        let (_watcher, mut rx) = watch(&bin);

        std::fs::write(bin.join("app.wasm.o.tmp1a2b"), b"object").unwrap();
        std::fs::rename(bin.join("app.wasm.o.tmp1a2b"), bin.join("app.wasm.o")).unwrap();
        std::fs::write(bin.join("app.wasm"), b"\0asm").unwrap();
        std::fs::remove_file(bin.join("app.wasm.o")).unwrap();

        assert_eq!(
            next_event(&mut rx).await,
            WatchEvent::ArtifactReady(bin.join("app.wasm"))
        );
        assert_quiet(&mut rx).await;
    }

    #[test]
    fn test_watcher_requires_existing_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("bin");

        let result = ArtifactWatcher::new(
            missing,
            ArtifactMatcher::new(".wasm.o", ".o"),
            DebounceScope::PerFile,
        );
        assert!(matches!(result, Err(CliError::FileNotFound(_))));
    }
}
