//! Selection Management
//!
//! Ordered, duplicate-free set of selected apps. Every mutation that changes
//! the set notifies the attached [`SelectionListener`] with the new size.

use std::sync::Arc;

use indexmap::IndexSet;
use tracing::debug;

use crate::app::App;

/// Notified whenever the selection size changes.
///
/// Runs while the request lock is held; do not call back into the request.
pub trait SelectionListener: Send + Sync {
    fn on_selection_changed(&self, selected: usize);
}

/// Selected apps in selection order
#[derive(Default, Clone)]
pub struct SelectionSet {
    apps: IndexSet<App>,
    listener: Option<Arc<dyn SelectionListener>>,
}

impl SelectionSet {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selection from previously selected apps, dropping duplicates
    pub fn from_apps(apps: impl IntoIterator<Item = App>) -> Self {
        Self {
            apps: apps.into_iter().collect(),
            listener: None,
        }
    }

    /// Attach (or detach) the change listener
    pub fn set_listener(&mut self, listener: Option<Arc<dyn SelectionListener>>) {
        self.listener = listener;
    }

    /// Add an app, returns whether it was added
    pub fn select(&mut self, app: &App) -> bool {
        if !self.apps.insert(app.clone()) {
            return false;
        }
        debug!("Selected {}", app.component());
        self.notify();
        true
    }

    /// Remove an app, returns whether it was removed
    pub fn unselect(&mut self, app: &App) -> bool {
        if !self.apps.shift_remove(app) {
            return false;
        }
        debug!("Unselected {}", app.component());
        self.notify();
        true
    }

    /// Flip the selection state of an app
    pub fn toggle(&mut self, app: &App) -> bool {
        if self.is_selected(app) {
            self.unselect(app)
        } else {
            self.select(app)
        }
    }

    /// Add every candidate not already selected, notifying once
    pub fn select_all<'a>(&mut self, candidates: impl IntoIterator<Item = &'a App>) -> bool {
        let before = self.apps.len();
        for app in candidates {
            self.apps.insert(app.clone());
        }
        let changed = self.apps.len() != before;
        if changed {
            self.notify();
        }
        changed
    }

    /// Remove everything, notifying once if anything was selected
    pub fn clear(&mut self) {
        if self.apps.is_empty() {
            return;
        }
        self.apps.clear();
        self.notify();
    }

    pub fn is_selected(&self, app: &App) -> bool {
        self.apps.contains(app)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Iterate in selection order
    pub fn iter(&self) -> impl Iterator<Item = &App> {
        self.apps.iter()
    }

    /// Copy of the selection in selection order
    pub fn to_vec(&self) -> Vec<App> {
        self.apps.iter().cloned().collect()
    }

    fn notify(&self) {
        if let Some(listener) = &self.listener {
            listener.on_selection_changed(self.apps.len());
        }
    }
}

impl std::fmt::Debug for SelectionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.apps.iter().map(App::component)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        sizes: Mutex<Vec<usize>>,
    }

    impl SelectionListener for Recorder {
        fn on_selection_changed(&self, selected: usize) {
            self.sizes.lock().push(selected);
        }
    }

    fn app(n: u32) -> App {
        App::from_component(format!("App {}", n), format!("com.app{n}/com.app{n}.Main"))
    }

    fn with_recorder() -> (SelectionSet, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let mut set = SelectionSet::new();
        set.set_listener(Some(recorder.clone()));
        (set, recorder)
    }

    #[test]
    fn test_select_twice_notifies_once() {
        let (mut set, recorder) = with_recorder();
        assert!(set.select(&app(1)));
        assert!(!set.select(&app(1)));
        assert_eq!(set.len(), 1);
        assert_eq!(*recorder.sizes.lock(), vec![1]);
    }

    #[test]
    fn test_toggle_round_trip() {
        let (mut set, recorder) = with_recorder();
        let target = app(7);
        for _ in 0..3 {
            set.toggle(&target);
            assert!(set.is_selected(&target));
            set.toggle(&target);
            assert!(!set.is_selected(&target));
        }
        assert!(set.is_empty());
        assert_eq!(*recorder.sizes.lock(), vec![1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_unselect_preserves_order() {
        let mut set = SelectionSet::new();
        for n in 1..=4 {
            set.select(&app(n));
        }
        assert!(set.unselect(&app(2)));
        assert!(!set.unselect(&app(2)));
        let order: Vec<_> = set.iter().map(|a| a.name().to_string()).collect();
        assert_eq!(order, vec!["App 1", "App 3", "App 4"]);
    }

    #[test]
    fn test_select_all_single_notification() {
        let (mut set, recorder) = with_recorder();
        set.select(&app(2));
        let candidates = vec![app(1), app(2), app(3)];
        assert!(set.select_all(&candidates));
        assert!(!set.select_all(&candidates));
        assert_eq!(set.len(), 3);
        assert_eq!(*recorder.sizes.lock(), vec![1, 3]);
    }

    #[test]
    fn test_clear_only_notifies_when_non_empty() {
        let (mut set, recorder) = with_recorder();
        set.clear();
        assert!(recorder.sizes.lock().is_empty());
        set.select(&app(1));
        set.clear();
        assert_eq!(*recorder.sizes.lock(), vec![1, 0]);
    }
}
