//! Request Orchestrator
//!
//! [`IconRequest`] is one icon-request session: it loads the filter and the
//! unthemed apps, keeps the selection, and runs the send cycle.
//!
//! Work happens on a one-shot tokio task per cycle. Results come back as
//! events on a queue which the owner drains with [`IconRequest::dispatch_events`]
//! (or [`IconRequest::wait`]); callbacks only ever run there.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use iconrequest_appfilter::{FilterParser, FilterSource, ResourceResolver};
use iconrequest_core::{
    App, AppSource, Callbacks, DeviceInfo, EventQueue, EventSender, IconSource, RequestConfig, RequestError,
    RequestEvent, RequestSnapshot, Result, SelectionSet,
};
use iconrequest_delivery::{EmailComposer, EmailRequest, EmlDraftComposer, RemoteUploader, RequestUploader};
use iconrequest_packager::{ensure_dir, PackageStage, RequestPackager};

/// Where a request currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Idle,
    LoadingFilter,
    LoadingApps,
    Ready,
    Sending(SendStage),
    Done,
    Failed,
}

/// Steps of a send cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStage {
    Saving,
    Packaging,
    Archiving,
    Uploading,
    Delivering,
}

impl From<PackageStage> for SendStage {
    fn from(stage: PackageStage) -> Self {
        match stage {
            PackageStage::SavingIcons => SendStage::Saving,
            PackageStage::WritingManifests => SendStage::Packaging,
            PackageStage::Archiving | PackageStage::CleaningUp => SendStage::Archiving,
        }
    }
}

/// The outside world a request talks to
#[derive(Clone)]
pub struct Collaborators {
    pub filters: Arc<dyn FilterSource>,
    pub resources: Option<Arc<dyn ResourceResolver>>,
    pub apps: Arc<dyn AppSource>,
    pub icons: Arc<dyn IconSource>,
    pub email: Arc<dyn EmailComposer>,
    /// Created on first remote send when unset
    pub uploader: Option<Arc<dyn RequestUploader>>,
    pub device: DeviceInfo,
}

impl Collaborators {
    pub fn new(filters: Arc<dyn FilterSource>, apps: Arc<dyn AppSource>, icons: Arc<dyn IconSource>) -> Self {
        Self {
            filters,
            resources: None,
            apps,
            icons,
            email: Arc::new(EmlDraftComposer::new()),
            uploader: None,
            device: DeviceInfo::current(),
        }
    }

    pub fn with_resources(mut self, resources: Arc<dyn ResourceResolver>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn with_email(mut self, email: Arc<dyn EmailComposer>) -> Self {
        self.email = email;
        self
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn RequestUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn with_device(mut self, device: DeviceInfo) -> Self {
        self.device = device;
        self
    }
}

/// App list and selection, guarded together
#[derive(Default)]
struct SessionState {
    apps: Option<Vec<App>>,
    selection: SelectionSet,
}

/// Phase writer that goes quiet once its generation is retired
#[derive(Clone)]
struct PhaseHandle {
    phase: Arc<RwLock<RequestPhase>>,
    current: Arc<AtomicU64>,
    generation: u64,
}

impl PhaseHandle {
    fn set(&self, next: RequestPhase) {
        if self.current.load(Ordering::SeqCst) != self.generation {
            return;
        }
        let mut phase = self.phase.write();
        debug!("Phase transition: {:?} -> {:?}", *phase, next);
        *phase = next;
    }
}

/// One icon-request session
pub struct IconRequest {
    config: RequestConfig,
    collaborators: Collaborators,
    callbacks: Callbacks,
    state: Arc<Mutex<SessionState>>,
    phase: Arc<RwLock<RequestPhase>>,
    generation: Arc<AtomicU64>,
    events: EventQueue,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IconRequest {
    /// Create a session with no callbacks attached
    pub fn new(config: RequestConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
            callbacks: Callbacks::default(),
            state: Arc::new(Mutex::new(SessionState::default())),
            phase: Arc::new(RwLock::new(RequestPhase::Idle)),
            generation: Arc::new(AtomicU64::new(0)),
            events: EventQueue::new(),
            task: Mutex::new(None),
        }
    }

    /// Rebuild a session from a snapshot.
    ///
    /// A non-empty restored selection notifies the selection listener once.
    pub fn restore(snapshot: RequestSnapshot, collaborators: Collaborators, callbacks: Callbacks) -> Self {
        let RequestSnapshot { config, apps, selected } = snapshot;
        let loaded = apps.as_ref().map(|apps| !apps.is_empty()).unwrap_or(false);

        let mut request = Self::new(config, collaborators);
        {
            let mut state = request.state.lock();
            state.apps = apps;
            state.selection = SelectionSet::from_apps(selected);
        }
        if loaded {
            *request.phase.write() = RequestPhase::Ready;
        }
        request.attach_callbacks(callbacks);

        let state = request.state.lock();
        if !state.selection.is_empty() {
            if let Some(listener) = &request.callbacks.selection {
                listener.on_selection_changed(state.selection.len());
            }
        }
        drop(state);

        info!("Restored icon request ({} selected)", request.state.lock().selection.len());
        request
    }

    /// Capture configuration, loaded apps and selection
    pub fn snapshot(&self) -> RequestSnapshot {
        let state = self.state.lock();
        RequestSnapshot {
            config: self.config.clone(),
            apps: state.apps.clone(),
            selected: state.selection.to_vec(),
        }
    }

    /// Replace the live callbacks
    pub fn attach_callbacks(&mut self, callbacks: Callbacks) {
        self.state.lock().selection.set_listener(callbacks.selection.clone());
        self.callbacks = callbacks;
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    pub fn phase(&self) -> RequestPhase {
        *self.phase.read()
    }

    fn phase_handle(&self) -> PhaseHandle {
        PhaseHandle {
            phase: Arc::clone(&self.phase),
            current: Arc::clone(&self.generation),
            generation: self.generation.load(Ordering::SeqCst),
        }
    }

    fn set_phase(&self, next: RequestPhase) {
        self.phase_handle().set(next);
    }

    fn sender(&self) -> EventSender {
        self.events.sender(self.generation.load(Ordering::SeqCst))
    }

    fn spawn<F>(&self, task: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                self.set_phase(RequestPhase::Failed);
                return Err(RequestError::precondition("No async runtime is running."));
            }
        };
        *self.task.lock() = Some(runtime.spawn(task));
        Ok(())
    }

    /// Start loading the filter and the unthemed apps.
    ///
    /// Results arrive through the load callback on the next dispatch.
    pub fn load_apps(&self) -> Result<()> {
        let callback = self
            .callbacks
            .load
            .clone()
            .ok_or_else(|| RequestError::precondition("No load callback has been set."))?;

        self.set_phase(RequestPhase::LoadingFilter);
        callback.on_loading_filter();

        let mut parser = FilterParser::new(self.config.strict_drawables);
        if let Some(resources) = &self.collaborators.resources {
            parser = parser.with_resources(Arc::clone(resources));
        }
        let filter_name = self.config.filter().map(str::to_string);
        let filters = Arc::clone(&self.collaborators.filters);
        let apps = Arc::clone(&self.collaborators.apps);
        let phase = self.phase_handle();
        let sender = self.sender();

        self.spawn(async move {
            let progress_sender = sender.clone();
            let loaded = tokio::task::spawn_blocking(move || -> Result<Vec<App>> {
                let parsed = parser.load(filters.as_ref(), filter_name.as_deref())?;
                info!("{} components already themed", parsed.themed.len());

                phase.set(RequestPhase::LoadingApps);
                let progress = |percent: u8| {
                    progress_sender.post(RequestEvent::LoadProgress(percent.min(100)));
                };
                Ok(apps.unthemed_apps(&parsed.themed, &progress))
            })
            .await;

            match loaded {
                Ok(Ok(apps)) => sender.post(RequestEvent::AppsLoaded(apps)),
                Ok(Err(e)) => sender.post(RequestEvent::LoadFailed(e)),
                Err(e) => sender.post(RequestEvent::LoadFailed(task_failed(e))),
            };
        })
    }

    /// Whether a non-empty app list has been loaded
    pub fn is_apps_loaded(&self) -> bool {
        self.state
            .lock()
            .apps
            .as_ref()
            .map(|apps| !apps.is_empty())
            .unwrap_or(false)
    }

    /// Copy of the loaded app list
    pub fn apps(&self) -> Option<Vec<App>> {
        self.state.lock().apps.clone()
    }

    pub fn select(&self, app: &App) -> bool {
        self.state.lock().selection.select(app)
    }

    pub fn unselect(&self, app: &App) -> bool {
        self.state.lock().selection.unselect(app)
    }

    pub fn toggle(&self, app: &App) -> bool {
        self.state.lock().selection.toggle(app)
    }

    /// Select every loaded app. Does nothing before a load.
    pub fn select_all(&self) -> bool {
        let mut state = self.state.lock();
        let SessionState { apps, selection } = &mut *state;
        match apps {
            Some(apps) => selection.select_all(apps.iter()),
            None => false,
        }
    }

    pub fn unselect_all(&self) {
        self.state.lock().selection.clear();
    }

    pub fn is_selected(&self, app: &App) -> bool {
        self.state.lock().selection.is_selected(app)
    }

    /// Selected apps in selection order
    pub fn selected(&self) -> Vec<App> {
        self.state.lock().selection.to_vec()
    }

    /// Package the selection and hand it off.
    ///
    /// Validation failures go to the send callback when one is attached;
    /// otherwise they are returned.
    pub fn send(&self) -> Result<()> {
        let callback = self.callbacks.send.clone();
        if let Some(callback) = &callback {
            callback.on_request_preparing();
        }

        match self.start_send() {
            Ok(()) => Ok(()),
            Err(e) => match callback {
                Some(callback) => {
                    warn!("Request not sent: {}", e);
                    callback.on_request_error(&e);
                    Ok(())
                }
                None => Err(e),
            },
        }
    }

    fn start_send(&self) -> Result<()> {
        let selected = {
            let state = self.state.lock();
            if !state.apps.as_ref().map(|apps| !apps.is_empty()).unwrap_or(false) {
                return Err(RequestError::precondition("No apps have been loaded."));
            }
            if state.selection.is_empty() {
                return Err(RequestError::precondition("No apps have been selected for sending in the request."));
            }
            state.selection.to_vec()
        };
        if !self.config.is_remote() && self.config.recipient().is_none() {
            return Err(RequestError::precondition("The recipient email is null or empty."));
        }

        let uploader = match (&self.config.remote, &self.collaborators.uploader) {
            (Some(_), Some(uploader)) => Some(Arc::clone(uploader)),
            (Some(_), None) => Some(Arc::new(RemoteUploader::new()?) as Arc<dyn RequestUploader>),
            (None, _) => None,
        };

        self.set_phase(RequestPhase::Sending(SendStage::Saving));
        if let Err(e) = ensure_dir(&self.config.save_dir) {
            self.set_phase(RequestPhase::Failed);
            return Err(e.into());
        }

        info!("Sending request for {} apps", selected.len());
        let packager = RequestPackager::new(self.config.clone(), self.collaborators.device.clone());
        let icons = Arc::clone(&self.collaborators.icons);
        let remote = self.config.remote.clone();
        let phase = self.phase_handle();
        let sender = self.sender();

        self.spawn(async move {
            let stage_phase = phase.clone();
            let packaged = tokio::task::spawn_blocking(move || {
                let today = chrono::Local::now().date_naive();
                packager.package_with_progress(&selected, icons.as_ref(), today, |stage| {
                    stage_phase.set(RequestPhase::Sending(stage.into()))
                })
            })
            .await;

            let packaged = match packaged {
                Ok(Ok(packaged)) => packaged,
                Ok(Err(e)) => {
                    sender.post(RequestEvent::SendFailed(e.into()));
                    return;
                }
                Err(e) => {
                    sender.post(RequestEvent::SendFailed(task_failed(e)));
                    return;
                }
            };

            match (remote, uploader) {
                (Some(remote), Some(uploader)) => {
                    phase.set(RequestPhase::Sending(SendStage::Uploading));
                    let apps_json = packaged.manifest.json.as_deref().unwrap_or("{}");
                    match uploader.upload(&remote, &packaged.archive, apps_json).await {
                        Ok(()) => sender.post(RequestEvent::Uploaded {
                            archive: packaged.archive,
                        }),
                        Err(e) => sender.post(RequestEvent::SendFailed(e.into())),
                    };
                }
                _ => {
                    sender.post(RequestEvent::Packaged {
                        archive: packaged.archive,
                        body: packaged.body,
                    });
                }
            }
        })
    }

    /// Run callbacks for every pending event. Returns how many were handled.
    pub fn dispatch_events(&self) -> usize {
        let current = self.generation.load(Ordering::SeqCst);
        let mut handled = 0;
        for envelope in self.events.drain() {
            if envelope.generation != current {
                debug!("Dropping event from retired request: {:?}", envelope.event);
                continue;
            }
            self.deliver(envelope.event);
            handled += 1;
        }
        handled
    }

    /// Wait for the running task, then dispatch its events
    pub async fn wait(&self) -> usize {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Request task ended abnormally: {}", e);
            }
        }
        self.dispatch_events()
    }

    fn deliver(&self, event: RequestEvent) {
        match event {
            RequestEvent::LoadProgress(percent) => {
                if let Some(callback) = &self.callbacks.load {
                    callback.on_load_progress(percent);
                }
            }
            RequestEvent::AppsLoaded(apps) => {
                info!("Loaded {} unthemed apps", apps.len());
                let loaded = apps.clone();
                self.state.lock().apps = Some(apps);
                self.set_phase(RequestPhase::Ready);
                if let Some(callback) = &self.callbacks.load {
                    callback.on_apps_loaded(&loaded);
                }
            }
            RequestEvent::LoadFailed(e) => {
                error!("Loading failed: {}", e);
                self.set_phase(RequestPhase::Failed);
                if let Some(callback) = &self.callbacks.load {
                    callback.on_load_error(&e);
                }
            }
            RequestEvent::SendFailed(e) => self.fail_send(e),
            RequestEvent::Packaged { archive, body } => {
                self.set_phase(RequestPhase::Sending(SendStage::Delivering));
                let archive = match &self.callbacks.send {
                    Some(callback) => callback.process_archive(&archive),
                    None => archive,
                };
                let email = EmailRequest {
                    recipient: self.config.recipient().unwrap_or_default().to_string(),
                    subject: self.config.effective_subject().to_string(),
                    body,
                    archive,
                };
                match self.collaborators.email.compose(&email) {
                    Ok(handoff) => {
                        info!("Request handed off at {}", handoff.display());
                        self.finish_send();
                    }
                    Err(e) => self.fail_send(e.into()),
                }
            }
            RequestEvent::Uploaded { archive } => {
                info!("Request {} uploaded", archive.display());
                self.finish_send();
            }
        }
    }

    fn finish_send(&self) {
        self.set_phase(RequestPhase::Done);
        if let Some(callback) = &self.callbacks.send {
            callback.on_request_sent();
        }
    }

    fn fail_send(&self, e: RequestError) {
        error!("Sending failed: {}", e);
        self.set_phase(RequestPhase::Failed);
        if let Some(callback) = &self.callbacks.send {
            callback.on_request_error(&e);
        }
    }

    /// Drop callbacks and state. Events from tasks still running are ignored.
    pub fn cleanup(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let dropped = self.events.drain().len();

        self.callbacks = Callbacks::default();
        {
            let mut state = self.state.lock();
            state.selection.set_listener(None);
            state.selection.clear();
            state.apps = None;
        }
        *self.phase.write() = RequestPhase::Idle;
        info!("Icon request cleaned up ({} pending events dropped)", dropped);
    }
}

fn task_failed(e: tokio::task::JoinError) -> RequestError {
    RequestError::Io(io::Error::new(io::ErrorKind::Other, format!("background task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use async_trait::async_trait;
    use iconrequest_appfilter::InlineFilter;
    use iconrequest_core::{
        IconImage, LoadCallback, ProgressSink, RemoteConfig, SelectionListener, SendCallback, ThemedComponentSet,
    };
    use iconrequest_delivery::DeliveryError;

    const FILTER: &str = r#"<resources>
    <!-- Maps -->
    <item component="ComponentInfo{com.maps/com.maps.Main}" drawable="maps" />
</resources>"#;

    const BROKEN_FILTER: &str = r#"<resources>
    <item component="ComponentInfo{com.maps/com.maps.Main}" drawable="" />
</resources>"#;

    struct Installed(Vec<App>);

    impl AppSource for Installed {
        fn unthemed_apps(&self, themed: &ThemedComponentSet, progress: &dyn ProgressSink) -> Vec<App> {
            progress.report(50);
            progress.report(100);
            self.0.iter().filter(|app| !themed.contains(app.component())).cloned().collect()
        }
    }

    struct SolidIcons;

    impl IconSource for SolidIcons {
        fn load_icon(&self, _app: &App) -> Option<IconImage> {
            Some(IconImage::Bitmap(image::RgbaImage::new(4, 4)))
        }
    }

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, entry: impl Into<String>) {
            self.log.lock().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.log.lock().clone()
        }
    }

    impl LoadCallback for Recorder {
        fn on_loading_filter(&self) {
            self.push("loading");
        }

        fn on_load_progress(&self, percent: u8) {
            self.push(format!("progress {}", percent));
        }

        fn on_apps_loaded(&self, apps: &[App]) {
            self.push(format!("loaded {}", apps.len()));
        }

        fn on_load_error(&self, error: &RequestError) {
            self.push(format!("load error: {}", error));
        }
    }

    impl SendCallback for Recorder {
        fn on_request_preparing(&self) {
            self.push("preparing");
        }

        fn on_request_error(&self, error: &RequestError) {
            self.push(format!("send error: {}", error));
        }

        fn on_request_sent(&self) {
            self.push("sent");
        }
    }

    impl SelectionListener for Recorder {
        fn on_selection_changed(&self, selected: usize) {
            self.push(format!("selected {}", selected));
        }
    }

    /// Send callback that moves the archive before hand-off
    struct Relocate {
        to: PathBuf,
        inner: Arc<Recorder>,
    }

    impl SendCallback for Relocate {
        fn process_archive(&self, archive: &Path) -> PathBuf {
            let target = self.to.join(archive.file_name().unwrap());
            std::fs::rename(archive, &target).unwrap();
            target
        }

        fn on_request_error(&self, error: &RequestError) {
            self.inner.on_request_error(error);
        }

        fn on_request_sent(&self) {
            self.inner.on_request_sent();
        }
    }

    #[derive(Default)]
    struct FakeEmail {
        sent: Mutex<Vec<EmailRequest>>,
    }

    impl EmailComposer for FakeEmail {
        fn compose(&self, request: &EmailRequest) -> std::result::Result<PathBuf, DeliveryError> {
            self.sent.lock().push(request.clone());
            Ok(request.archive.clone())
        }
    }

    struct FakeUploader {
        fail: bool,
        calls: Mutex<Vec<(String, PathBuf, String)>>,
    }

    #[async_trait]
    impl RequestUploader for FakeUploader {
        async fn upload(
            &self,
            remote: &RemoteConfig,
            archive: &Path,
            apps_json: &str,
        ) -> std::result::Result<(), DeliveryError> {
            self.calls
                .lock()
                .push((remote.endpoint("/v1/request"), archive.to_path_buf(), apps_json.to_string()));
            if self.fail {
                return Err(DeliveryError::Status {
                    status: 503,
                    body: "busy".into(),
                });
            }
            Ok(())
        }
    }

    fn installed() -> Vec<App> {
        vec![
            App::new("Maps", "com.maps", "com.maps/com.maps.Main"),
            App::new("Clock", "com.clock", "com.clock/com.clock.Main"),
            App::new("Notes", "com.notes", "com.notes/com.notes.Main"),
        ]
    }

    fn email_config(dir: &Path) -> RequestConfig {
        RequestConfig {
            save_dir: dir.join("work"),
            email: Some("designer@example.com".into()),
            ..RequestConfig::default()
        }
    }

    fn collaborators(filter: &str) -> Collaborators {
        Collaborators::new(
            Arc::new(InlineFilter::new("appfilter.xml", filter)),
            Arc::new(Installed(installed())),
            Arc::new(SolidIcons),
        )
    }

    fn callbacks(recorder: &Arc<Recorder>) -> Callbacks {
        Callbacks::new()
            .with_load(recorder.clone())
            .with_send(recorder.clone())
            .with_selection(recorder.clone())
    }

    async fn loaded_request(config: RequestConfig, collaborators: Collaborators) -> (IconRequest, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let mut request = IconRequest::new(config, collaborators);
        request.attach_callbacks(callbacks(&recorder));
        request.load_apps().unwrap();
        request.wait().await;
        (request, recorder)
    }

    #[test]
    fn test_load_without_callback() {
        let tmp = tempfile::tempdir().unwrap();
        let request = IconRequest::new(email_config(tmp.path()), collaborators(FILTER));
        let err = request.load_apps().unwrap_err();
        assert!(err.is_usage_error());
        assert_eq!(err.to_string(), "No load callback has been set.");
        assert_eq!(request.phase(), RequestPhase::Idle);
    }

    #[test]
    fn test_no_runtime_fails_the_phase() {
        let tmp = tempfile::tempdir().unwrap();
        let apps = installed();
        let snapshot = RequestSnapshot {
            config: email_config(tmp.path()),
            apps: Some(apps.clone()),
            selected: vec![apps[0].clone()],
        };
        let request = IconRequest::restore(snapshot, collaborators(FILTER), Callbacks::new());
        assert_eq!(request.phase(), RequestPhase::Ready);

        let err = request.send().unwrap_err();
        assert_eq!(err.to_string(), "No async runtime is running.");
        assert_eq!(request.phase(), RequestPhase::Failed);

        let recorder = Arc::new(Recorder::default());
        let mut loader = IconRequest::new(email_config(tmp.path()), collaborators(FILTER));
        loader.attach_callbacks(callbacks(&recorder));
        assert!(loader.load_apps().is_err());
        assert_eq!(loader.phase(), RequestPhase::Failed);
    }

    #[tokio::test]
    async fn test_load_apps_skips_themed() {
        let tmp = tempfile::tempdir().unwrap();
        let (request, recorder) = loaded_request(email_config(tmp.path()), collaborators(FILTER)).await;

        assert_eq!(request.phase(), RequestPhase::Ready);
        assert!(request.is_apps_loaded());
        let names: Vec<_> = request.apps().unwrap().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["Clock", "Notes"]);
        assert_eq!(recorder.entries(), vec!["loading", "progress 50", "progress 100", "loaded 2"]);
    }

    #[tokio::test]
    async fn test_load_fails_on_invalid_drawable() {
        let tmp = tempfile::tempdir().unwrap();
        let (request, recorder) = loaded_request(email_config(tmp.path()), collaborators(BROKEN_FILTER)).await;

        assert_eq!(request.phase(), RequestPhase::Failed);
        assert!(!request.is_apps_loaded());
        assert_eq!(
            recorder.entries(),
            vec![
                "loading".to_string(),
                "load error: Drawable for com.maps/com.maps.Main was null or empty.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_load_without_filter_lists_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RequestConfig {
            filter_name: None,
            ..email_config(tmp.path())
        };
        let (request, _) = loaded_request(config, collaborators(BROKEN_FILTER)).await;
        assert_eq!(request.apps().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_selection_through_request() {
        let tmp = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::default());
        let mut request = IconRequest::new(email_config(tmp.path()), collaborators(FILTER));
        request.attach_callbacks(Callbacks::new().with_selection(recorder.clone()));

        assert!(!request.select_all());

        let apps = installed();
        assert!(request.select(&apps[0]));
        assert!(!request.select(&apps[0]));
        assert!(request.toggle(&apps[1]));
        assert!(request.toggle(&apps[1]));
        assert!(!request.is_selected(&apps[1]));
        request.unselect_all();
        assert_eq!(recorder.entries(), vec!["selected 1", "selected 2", "selected 1", "selected 0"]);
    }

    #[tokio::test]
    async fn test_select_all_uses_loaded_apps() {
        let tmp = tempfile::tempdir().unwrap();
        let (request, recorder) = loaded_request(email_config(tmp.path()), collaborators(FILTER)).await;

        assert!(request.select_all());
        assert!(!request.select_all());
        assert_eq!(request.selected().len(), 2);
        assert_eq!(recorder.entries().last().unwrap(), "selected 2");
    }

    #[tokio::test]
    async fn test_send_preconditions_without_callback() {
        let tmp = tempfile::tempdir().unwrap();
        let request = IconRequest::new(email_config(tmp.path()), collaborators(FILTER));

        let err = request.send().unwrap_err();
        assert_eq!(err.to_string(), "No apps have been loaded.");
    }

    #[tokio::test]
    async fn test_send_with_empty_selection_touches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let (request, recorder) = loaded_request(email_config(tmp.path()), collaborators(FILTER)).await;

        request.send().unwrap();
        assert_eq!(
            recorder.entries()[4..].to_vec(),
            vec![
                "preparing".to_string(),
                "send error: No apps have been selected for sending in the request.".to_string(),
            ]
        );
        assert!(!tmp.path().join("work").exists());
        assert_eq!(request.phase(), RequestPhase::Ready);
    }

    #[tokio::test]
    async fn test_send_requires_recipient_for_email() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RequestConfig {
            email: Some("  ".into()),
            ..email_config(tmp.path())
        };
        let (request, recorder) = loaded_request(config, collaborators(FILTER)).await;
        request.select_all();

        request.send().unwrap();
        assert_eq!(
            recorder.entries().last().unwrap(),
            "send error: The recipient email is null or empty."
        );
    }

    #[tokio::test]
    async fn test_send_by_email() {
        let tmp = tempfile::tempdir().unwrap();
        let email = Arc::new(FakeEmail::default());
        let config = RequestConfig {
            subject: Some(" ".into()),
            ..email_config(tmp.path())
        };
        let (request, recorder) = loaded_request(config, collaborators(FILTER).with_email(email.clone())).await;
        request.select_all();

        request.send().unwrap();
        request.wait().await;

        assert_eq!(request.phase(), RequestPhase::Done);
        assert_eq!(recorder.entries().last().unwrap(), "sent");

        let sent = email.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "designer@example.com");
        assert_eq!(sent[0].subject, "Icon Request");
        assert!(sent[0].body.contains("Name: <b>Clock</b>"));

        let archive = &sent[0].archive;
        let name = archive.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("IconRequest-") && name.ends_with(".zip"));

        let mut entries: Vec<_> = iconrequest_packager::list_entries(archive)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        entries.sort();
        assert_eq!(entries, vec!["appfilter.xml", "com.clock.png", "com.notes.png"]);

        let left: Vec<_> = std::fs::read_dir(tmp.path().join("work")).unwrap().collect();
        assert_eq!(left.len(), 1);
    }

    #[tokio::test]
    async fn test_process_archive_rewrites_handoff() {
        let tmp = tempfile::tempdir().unwrap();
        let outbox = tempfile::tempdir().unwrap();
        let email = Arc::new(FakeEmail::default());
        let (mut request, recorder) =
            loaded_request(email_config(tmp.path()), collaborators(FILTER).with_email(email.clone())).await;
        request.attach_callbacks(Callbacks::new().with_send(Arc::new(Relocate {
            to: outbox.path().to_path_buf(),
            inner: recorder.clone(),
        })));
        request.select_all();

        request.send().unwrap();
        request.wait().await;

        let archive = email.sent.lock()[0].archive.clone();
        assert!(archive.starts_with(outbox.path()));
        assert!(archive.exists());
        assert_eq!(recorder.entries().last().unwrap(), "sent");
    }

    #[tokio::test]
    async fn test_send_remote() {
        let tmp = tempfile::tempdir().unwrap();
        let uploader = Arc::new(FakeUploader {
            fail: false,
            calls: Mutex::new(Vec::new()),
        });
        let config = RequestConfig {
            email: None,
            remote: Some(RemoteConfig::new("https://requests.example.com", "token", "me")),
            ..email_config(tmp.path())
        };
        let (request, recorder) = loaded_request(config, collaborators(FILTER).with_uploader(uploader.clone())).await;
        request.select_all();

        request.send().unwrap();
        request.wait().await;

        assert_eq!(request.phase(), RequestPhase::Done);
        assert_eq!(recorder.entries().last().unwrap(), "sent");

        let calls = uploader.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "https://requests.example.com/v1/request");
        let json: serde_json::Value = serde_json::from_str(&calls[0].2).unwrap();
        assert_eq!(json["components"][0]["componentInfo"], "com.clock/com.clock.Main");

        let entries: Vec<_> = iconrequest_packager::list_entries(&calls[0].1)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(entries, vec!["com.clock.png", "com.notes.png"]);
    }

    #[tokio::test]
    async fn test_send_remote_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let uploader = Arc::new(FakeUploader {
            fail: true,
            calls: Mutex::new(Vec::new()),
        });
        let config = RequestConfig {
            remote: Some(RemoteConfig::new("https://requests.example.com", "token", "me")),
            ..email_config(tmp.path())
        };
        let (request, recorder) = loaded_request(config, collaborators(FILTER).with_uploader(uploader)).await;
        request.select_all();

        request.send().unwrap();
        request.wait().await;

        assert_eq!(request.phase(), RequestPhase::Failed);
        let last = recorder.entries().last().unwrap().clone();
        assert!(last.starts_with("send error: Failed to send icons to the backend"));
        assert!(last.contains("503"));
    }

    #[tokio::test]
    async fn test_send_without_icons_has_nothing_to_archive() {
        struct NoIcons;
        impl IconSource for NoIcons {
            fn load_icon(&self, _app: &App) -> Option<IconImage> {
                None
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let config = RequestConfig {
            generate_markup: false,
            ..email_config(tmp.path())
        };
        let collaborators = Collaborators::new(
            Arc::new(InlineFilter::new("appfilter.xml", FILTER)),
            Arc::new(Installed(installed())),
            Arc::new(NoIcons),
        );
        let (request, recorder) = loaded_request(config, collaborators).await;
        request.select_all();

        request.send().unwrap();
        request.wait().await;

        assert_eq!(request.phase(), RequestPhase::Failed);
        assert_eq!(
            recorder.entries().last().unwrap(),
            "send error: There are no files to put into the ZIP archive."
        );
    }

    #[tokio::test]
    async fn test_cleanup_drops_late_events() {
        let tmp = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::default());
        let mut request = IconRequest::new(email_config(tmp.path()), collaborators(FILTER));
        request.attach_callbacks(callbacks(&recorder));

        request.load_apps().unwrap();
        request.cleanup();

        let late = Arc::new(Recorder::default());
        request.attach_callbacks(callbacks(&late));
        assert_eq!(request.wait().await, 0);

        assert_eq!(recorder.entries(), vec!["loading"]);
        assert!(late.entries().is_empty());
        assert!(!request.is_apps_loaded());
        assert_eq!(request.phase(), RequestPhase::Idle);
    }

    #[tokio::test]
    async fn test_snapshot_and_restore() {
        let tmp = tempfile::tempdir().unwrap();
        let (request, _) = loaded_request(email_config(tmp.path()), collaborators(FILTER)).await;
        let apps = request.apps().unwrap();
        request.select(&apps[1]);

        let json = request.snapshot().to_json().unwrap();
        let snapshot = RequestSnapshot::from_json(&json).unwrap();

        let recorder = Arc::new(Recorder::default());
        let restored = IconRequest::restore(snapshot, collaborators(FILTER), callbacks(&recorder));

        assert_eq!(recorder.entries(), vec!["selected 1"]);
        assert_eq!(restored.phase(), RequestPhase::Ready);
        assert!(restored.is_selected(&apps[1]));
        assert_eq!(restored.config().recipient(), Some("designer@example.com"));
    }
}
