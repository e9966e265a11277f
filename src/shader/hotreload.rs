//! Source-file change detection for shader reloads.
//!
//! This only detects *that* a watched file changed and hands the
//! caller a fresh [`super::HotSwapClass`] once it has recompiled and
//! reflected the new source; actually swapping a running pipeline
//! mid-frame is out of scope. The watcher only flips a flag for the
//! cache to notice on its own schedule.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, OnceLock};

use hashbrown::HashMap;
use notify::{RecursiveMode, Watcher};

/// A flag flipped by the background watcher thread when the file it
/// was registered for changes. Cheap to poll from a frame loop.
#[derive(Debug)]
pub struct ReloadWatch {
    path: PathBuf,
    changed: Arc<AtomicBool>,
}

impl ReloadWatch {
    pub fn register(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let changed = Arc::new(AtomicBool::new(false));
        FileWatcher::register(path.clone(), changed.clone());
        Self { path, changed }
    }

    /// Returns whether the file changed since the last call, resetting
    /// the flag either way.
    pub fn has_changed(&self) -> bool {
        self.changed.swap(false, Ordering::SeqCst)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ReloadWatch {
    fn drop(&mut self) {
        FileWatcher::unregister(self.path.clone(), self.changed.clone());
    }
}

enum WatchEvent {
    Register(PathBuf, Arc<AtomicBool>),
    Unregister(PathBuf, Arc<AtomicBool>),
    Changed(PathBuf),
}

struct FileWatcher;

impl FileWatcher {
    fn register(path: PathBuf, cell: Arc<AtomicBool>) {
        Self::sender().send(WatchEvent::Register(path, cell)).ok();
    }

    fn unregister(path: PathBuf, cell: Arc<AtomicBool>) {
        Self::sender().send(WatchEvent::Unregister(path, cell)).ok();
    }

    fn sender() -> &'static mpsc::Sender<WatchEvent> {
        static WATCHER: OnceLock<mpsc::Sender<WatchEvent>> = OnceLock::new();
        WATCHER.get_or_init(|| {
            let (tx, rx) = mpsc::channel();

            let forward = {
                let tx = tx.clone();
                move |res: notify::Result<notify::Event>| {
                    if let Ok(event) = res {
                        if event.need_rescan()
                            || event.kind.is_create()
                            || event.kind.is_modify()
                            || event.kind.is_remove()
                        {
                            for path in event.paths {
                                tx.send(WatchEvent::Changed(path)).ok();
                            }
                        }
                    }
                }
            };

            let mut watcher = notify::recommended_watcher(forward)
                .expect("failed to start shader file watcher");

            std::thread::spawn(move || {
                let mut watched: HashMap<PathBuf, Vec<Arc<AtomicBool>>> = HashMap::new();
                while let Ok(event) = rx.recv() {
                    match event {
                        WatchEvent::Register(path, cell) => {
                            let is_new = !watched.contains_key(&path);
                            watched.entry(path.clone()).or_default().push(cell);
                            if is_new {
                                watcher.watch(&path, RecursiveMode::NonRecursive).ok();
                            }
                        }
                        WatchEvent::Unregister(path, cell) => {
                            if let Some(cells) = watched.get_mut(&path) {
                                cells.retain(|c| !Arc::ptr_eq(c, &cell));
                                if cells.is_empty() {
                                    watched.remove(&path);
                                    watcher.unwatch(&path).ok();
                                }
                            }
                        }
                        WatchEvent::Changed(path) => {
                            if let Some(cells) = watched.get(&path) {
                                for cell in cells {
                                    cell.store(true, Ordering::SeqCst);
                                }
                            }
                        }
                    }
                }
            });

            tx
        })
    }
}
