//! The background fill state machine.
//!
//! One interface-owning thread drives the scheduler through
//! `open_directory` and `poll`. A listing larger than the visible
//! prefix spawns a short-lived set of worker threads that fill a
//! staging model the view never sees; once every worker has reported
//! done, the staging model replaces the live one in a single swap. A
//! navigation request arriving mid-fill raises the cancellation flag,
//! and the superseded staging model is discarded only after all
//! workers have confirmed exit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::{partition, visible_items, FillConfig, FillEvent, Viewport};
use crate::lister;
use crate::models::{GridModel, IconSize, ModelSlots, NavigationTarget};
use crate::thumbnails::ThumbnailResolver;

/// Cancellation plus per-worker completion, behind one lock so the
/// supervising poll never sees a torn "all done".
#[derive(Debug)]
struct FillFlags {
    cancel: bool,
    done: Vec<bool>,
}

impl FillFlags {
    fn new(workers: usize) -> Self {
        Self {
            cancel: false,
            done: vec![false; workers],
        }
    }

    fn all_done(&self) -> bool {
        self.done.iter().all(|d| *d)
    }
}

/// One in-flight background cycle.
struct ActiveFill {
    dir: PathBuf,
    staging: Arc<GridModel>,
    flags: Arc<Mutex<FillFlags>>,
    workers: Vec<JoinHandle<()>>,
}

/// A navigation request parked while the previous cycle winds down.
#[derive(Debug, Clone)]
struct PendingOpen {
    path: PathBuf,
    viewport: Viewport,
}

/// Where the scheduler currently is between interface calls.
///
/// Listing, staging creation and publication all run synchronously
/// inside `open_directory` / `poll`, so only these three phases
/// persist across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPhase {
    Idle,
    Filling,
    Cancelling,
}

enum FillState {
    Idle,
    Filling(ActiveFill),
    Cancelling {
        fill: ActiveFill,
        pending: Option<PendingOpen>,
    },
}

/// Drives listing, fast-path resolution and background fill for one
/// grid view. All methods are interface-thread calls.
pub struct FillScheduler {
    config: FillConfig,
    resolver: ThumbnailResolver,
    slots: Arc<ModelSlots>,
    events: Sender<FillEvent>,
    state: FillState,
    icon_size: IconSize,
    target: Option<NavigationTarget>,
}

impl FillScheduler {
    /// Create a scheduler and the event stream its owner drains.
    pub fn new(config: FillConfig) -> (Self, Receiver<FillEvent>) {
        Self::with_resolver(config, ThumbnailResolver::new())
    }

    pub fn with_resolver(
        config: FillConfig,
        resolver: ThumbnailResolver,
    ) -> (Self, Receiver<FillEvent>) {
        let (events, rx) = flume::unbounded();
        let scheduler = Self {
            config,
            resolver,
            slots: Arc::new(ModelSlots::new()),
            events,
            state: FillState::Idle,
            icon_size: IconSize::default(),
            target: None,
        };
        (scheduler, rx)
    }

    pub fn phase(&self) -> FillPhase {
        match &self.state {
            FillState::Idle => FillPhase::Idle,
            FillState::Filling(_) => FillPhase::Filling,
            FillState::Cancelling { .. } => FillPhase::Cancelling,
        }
    }

    pub fn icon_size(&self) -> IconSize {
        self.icon_size
    }

    /// The model currently bound to the grid view.
    pub fn live_model(&self) -> Option<Arc<GridModel>> {
        self.slots.live()
    }

    pub fn current_target(&self) -> Option<&NavigationTarget> {
        self.target.as_ref()
    }

    /// Open a directory, cancelling any in-flight cycle first.
    ///
    /// If a cycle is running, the request is parked and the actual
    /// listing starts from a later `poll` once all workers have
    /// exited; at most one cycle is ever in flight.
    pub fn open_directory(&mut self, path: &Path, viewport: Viewport) {
        let pending = PendingOpen {
            path: path.to_path_buf(),
            viewport,
        };
        match std::mem::replace(&mut self.state, FillState::Idle) {
            FillState::Idle => self.start_listing(pending),
            FillState::Filling(fill) => {
                debug!(dir = ?fill.dir, "cancelling in-flight fill for new navigation");
                fill.flags.lock().cancel = true;
                self.state = FillState::Cancelling {
                    fill,
                    pending: Some(pending),
                };
            }
            FillState::Cancelling { fill, .. } => {
                self.state = FillState::Cancelling {
                    fill,
                    pending: Some(pending),
                };
            }
        }
    }

    /// Switch the current target to a single file, discarding any
    /// staged background work for the old directory.
    pub fn open_file(&mut self, path: &Path) {
        self.cancel_current_navigation();
        self.target = Some(NavigationTarget::File(path.to_path_buf()));
    }

    /// Change the icon size. Existing thumbnails are sized for the old
    /// setting, so the current directory is relisted and refilled.
    pub fn set_icon_size(&mut self, size: IconSize, viewport: Viewport) {
        if self.icon_size == size {
            return;
        }
        self.icon_size = size;

        let dir = match &self.target {
            Some(NavigationTarget::Directory(dir)) => Some(dir.clone()),
            _ => None,
        };
        if let Some(dir) = dir {
            self.open_directory(&dir, viewport);
        }
    }

    /// Abandon the in-flight cycle, if any, along with any parked
    /// navigation request.
    pub fn cancel_current_navigation(&mut self) {
        match std::mem::replace(&mut self.state, FillState::Idle) {
            FillState::Idle => {}
            FillState::Filling(fill) | FillState::Cancelling { fill, .. } => {
                fill.flags.lock().cancel = true;
                self.state = FillState::Cancelling {
                    fill,
                    pending: None,
                };
            }
        }
    }

    /// Advance the state machine. Non-blocking; the owner calls this
    /// on its event tick at roughly `config.poll_interval`.
    pub fn poll(&mut self) {
        match std::mem::replace(&mut self.state, FillState::Idle) {
            FillState::Idle => {}
            FillState::Filling(mut fill) => {
                if !fill.flags.lock().all_done() {
                    self.state = FillState::Filling(fill);
                    return;
                }
                join_workers(&mut fill);
                let staging = fill.staging;
                debug!(dir = ?fill.dir, entries = staging.len(), "publishing filled model");
                let displaced = self.slots.publish(staging.clone());
                drop(displaced);
                let _ = self.events.send(FillEvent::Published { model: staging });
            }
            FillState::Cancelling { mut fill, pending } => {
                if !fill.flags.lock().all_done() {
                    self.state = FillState::Cancelling { fill, pending };
                    return;
                }
                join_workers(&mut fill);
                debug_assert_eq!(
                    Arc::strong_count(&fill.staging),
                    1,
                    "workers must have released the staging model"
                );
                debug!(dir = ?fill.dir, "discarded cancelled staging model");
                drop(fill.staging);
                if let Some(pending) = pending {
                    self.start_listing(pending);
                }
            }
        }
    }

    /// Poll at the configured interval until the scheduler is idle.
    ///
    /// Headless-driver and test helper; a GUI owner calls `poll` from
    /// its own timer instead of blocking on this.
    pub fn drive_until_idle(&mut self) {
        while self.phase() != FillPhase::Idle {
            thread::sleep(self.config.poll_interval);
            self.poll();
        }
    }

    fn start_listing(&mut self, open: PendingOpen) {
        let PendingOpen { path, viewport } = open;

        let entries = match lister::list_directory(&path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(?path, %err, "directory listing failed");
                let _ = self.events.send(FillEvent::DirectoryUnreadable {
                    path,
                    message: err.system_message(),
                });
                return;
            }
        };

        self.target = Some(NavigationTarget::Directory(path.clone()));

        let model = GridModel::new(path, self.icon_size, entries);
        let total = model.len();
        let visible = visible_items(viewport, self.icon_size, &self.config).min(total);

        // Fast path: the first screenful resolves synchronously so the
        // view has content the moment it rebinds.
        for entry in model.iter().take(visible) {
            let thumb =
                self.resolver
                    .resolve(entry.path(), entry.is_dir(), entry.is_symlink(), self.icon_size);
            entry.set_thumbnail(thumb);
        }

        let model = Arc::new(model);
        let displaced = self.slots.publish(model.clone());
        drop(displaced);
        info!(dir = ?model.dir(), total, resolved = visible, "listing live");
        let _ = self.events.send(FillEvent::InitialReady {
            model: model.clone(),
            resolved: visible,
        });

        if total > visible {
            self.state = FillState::Filling(self.spawn_fill(&model));
        }
    }

    fn spawn_fill(&self, live: &Arc<GridModel>) -> ActiveFill {
        let staging = Arc::new((**live).clone());
        let workers = self.config.worker_count();
        let flags = Arc::new(Mutex::new(FillFlags::new(workers)));

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let staging = Arc::clone(&staging);
            let flags = Arc::clone(&flags);
            let resolver = self.resolver.clone();
            let icon_size = self.icon_size;
            let stagger = self.config.worker_stagger * id as u32;
            let handle = thread::Builder::new()
                .name(format!("fill-worker-{id}"))
                .spawn(move || fill_worker(id, workers, staging, resolver, icon_size, flags, stagger))
                .expect("failed to spawn fill worker");
            handles.push(handle);
        }

        debug!(dir = ?live.dir(), workers, remaining = live.len() - live.ready_count(), "background fill started");
        ActiveFill {
            dir: live.dir().to_path_buf(),
            staging,
            flags,
            workers: handles,
        }
    }
}

impl Drop for FillScheduler {
    fn drop(&mut self) {
        match std::mem::replace(&mut self.state, FillState::Idle) {
            FillState::Idle => {}
            FillState::Filling(mut fill) | FillState::Cancelling { mut fill, .. } => {
                fill.flags.lock().cancel = true;
                join_workers(&mut fill);
            }
        }
    }
}

/// Join workers whose done flags already confirmed exit; this never
/// holds the interface thread beyond thread teardown.
fn join_workers(fill: &mut ActiveFill) {
    for handle in fill.workers.drain(..) {
        if handle.join().is_err() {
            warn!("fill worker panicked");
        }
    }
}

fn fill_worker(
    id: usize,
    workers: usize,
    staging: Arc<GridModel>,
    resolver: ThumbnailResolver,
    icon_size: IconSize,
    flags: Arc<Mutex<FillFlags>>,
    stagger: Duration,
) {
    if !stagger.is_zero() {
        thread::sleep(stagger);
    }
    trace!(id, "fill worker started");

    let total = staging.len();
    let mut filled = 0usize;
    for index in partition::worker_indices(id, workers, total) {
        if flags.lock().cancel {
            trace!(id, filled, "fill worker observed cancellation");
            break;
        }
        let Some(entry) = staging.get(index) else {
            break;
        };
        if entry.is_ready() {
            continue;
        }
        let thumb = resolver.resolve(entry.path(), entry.is_dir(), entry.is_symlink(), icon_size);
        entry.set_thumbnail(thumb);
        filled += 1;
    }

    trace!(id, filled, "fill worker exiting");
    flags.lock().done[id] = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    // Minimal valid 1x1 PNG.
    const PNG_1X1: [u8; 67] = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
        0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x08, 0xD7, 0x63, 0xF8,
        0x0F, 0x00, 0x00, 0x01, 0x01, 0x00, 0x18, 0xDD, 0x8D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    fn populate(dir: &Path, count: usize) {
        for i in 0..count {
            let mut f = File::create(dir.join(format!("img{i:04}.png"))).unwrap();
            f.write_all(&PNG_1X1).unwrap();
        }
    }

    fn tiny_viewport_config() -> FillConfig {
        FillConfig {
            prefetch_multiplier: 1.0,
            poll_interval: Duration::from_millis(5),
            worker_stagger: Duration::from_millis(1),
            ..FillConfig::default()
        }
    }

    const VP: Viewport = Viewport {
        width: 0,
        height: 0,
    };

    #[test]
    fn test_small_directory_needs_no_background_cycle() {
        let dir = tempdir().unwrap();
        populate(dir.path(), 2);

        let (mut scheduler, events) = FillScheduler::new(FillConfig::default());
        scheduler.open_directory(dir.path(), Viewport { width: 900, height: 500 });

        assert_eq!(scheduler.phase(), FillPhase::Idle);
        let model = scheduler.live_model().unwrap();
        assert!(model.is_fully_ready());

        match events.try_recv().unwrap() {
            FillEvent::InitialReady { resolved, .. } => assert_eq!(resolved, 2),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_background_cycle_publishes_complete_model() {
        let dir = tempdir().unwrap();
        populate(dir.path(), 30);

        let (mut scheduler, events) = FillScheduler::new(tiny_viewport_config());
        scheduler.open_directory(dir.path(), VP);
        assert_eq!(scheduler.phase(), FillPhase::Filling);

        let initial = match events.recv().unwrap() {
            FillEvent::InitialReady { model, resolved } => {
                assert!(resolved < 30);
                model
            }
            other => panic!("unexpected event {other:?}"),
        };
        assert!(!initial.is_fully_ready());

        scheduler.drive_until_idle();

        let published = match events.recv().unwrap() {
            FillEvent::Published { model } => model,
            other => panic!("unexpected event {other:?}"),
        };
        assert_eq!(published.len(), 30);
        assert!(published.is_fully_ready());
        assert!(Arc::ptr_eq(&scheduler.live_model().unwrap(), &published));
    }

    #[test]
    fn test_unreadable_directory_keeps_previous_view() {
        let good = tempdir().unwrap();
        populate(good.path(), 2);

        let (mut scheduler, events) = FillScheduler::new(FillConfig::default());
        scheduler.open_directory(good.path(), VP);
        scheduler.drive_until_idle();
        while events.try_recv().is_ok() {}
        let before = scheduler.live_model().unwrap();

        let missing = good.path().join("not-here");
        scheduler.open_directory(&missing, VP);

        match events.try_recv().unwrap() {
            FillEvent::DirectoryUnreadable { path, message } => {
                assert_eq!(path, missing);
                assert!(!message.is_empty());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(scheduler.phase(), FillPhase::Idle);
        assert!(Arc::ptr_eq(&scheduler.live_model().unwrap(), &before));
    }

    #[test]
    fn test_navigation_mid_fill_cancels_and_requeues() {
        let first = tempdir().unwrap();
        populate(first.path(), 120);
        let second = tempdir().unwrap();
        populate(second.path(), 3);

        let (mut scheduler, events) = FillScheduler::new(tiny_viewport_config());
        scheduler.open_directory(first.path(), VP);
        assert_eq!(scheduler.phase(), FillPhase::Filling);

        scheduler.open_directory(second.path(), VP);
        assert_eq!(scheduler.phase(), FillPhase::Cancelling);

        scheduler.drive_until_idle();

        let live = scheduler.live_model().unwrap();
        assert_eq!(live.dir(), second.path());
        assert!(live.iter().all(|e| e.path().starts_with(second.path())));

        // events: initial(first), initial(second), published(second at most)
        let mut published_dirs = Vec::new();
        for event in events.try_iter() {
            if let FillEvent::Published { model } = event {
                published_dirs.push(model.dir().to_path_buf());
            }
        }
        assert!(!published_dirs.iter().any(|d| d == first.path()));
    }

    #[test]
    fn test_explicit_cancel_discards_parked_request() {
        let first = tempdir().unwrap();
        populate(first.path(), 120);
        let second = tempdir().unwrap();
        populate(second.path(), 3);

        let (mut scheduler, _events) = FillScheduler::new(tiny_viewport_config());
        scheduler.open_directory(first.path(), VP);
        scheduler.open_directory(second.path(), VP);
        scheduler.cancel_current_navigation();
        scheduler.drive_until_idle();

        // the parked request for `second` was dropped with the cancel
        assert_eq!(scheduler.live_model().unwrap().dir(), first.path());
    }

    #[test]
    fn test_set_icon_size_repopulates() {
        let dir = tempdir().unwrap();
        populate(dir.path(), 12);

        let (mut scheduler, _events) = FillScheduler::new(tiny_viewport_config());
        scheduler.open_directory(dir.path(), VP);
        scheduler.drive_until_idle();
        assert_eq!(scheduler.live_model().unwrap().icon_size(), IconSize::default());

        scheduler.set_icon_size(IconSize::Px48, VP);
        scheduler.drive_until_idle();

        let model = scheduler.live_model().unwrap();
        assert_eq!(model.icon_size(), IconSize::Px48);
        assert!(model.is_fully_ready());
    }

    #[test]
    fn test_open_file_switches_target() {
        let dir = tempdir().unwrap();
        populate(dir.path(), 120);

        let (mut scheduler, _events) = FillScheduler::new(tiny_viewport_config());
        scheduler.open_directory(dir.path(), VP);
        assert!(matches!(
            scheduler.current_target(),
            Some(NavigationTarget::Directory(_))
        ));

        let file = dir.path().join("img0000.png");
        scheduler.open_file(&file);
        assert_eq!(
            scheduler.current_target(),
            Some(&NavigationTarget::File(file))
        );
        scheduler.drive_until_idle();
        assert_eq!(scheduler.phase(), FillPhase::Idle);
    }
}
