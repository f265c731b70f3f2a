//! The compositor: receives committed frames, rasters and draws them, and
//! paces animation frames.
//!
//! # Threads
//!
//! - The UI thread calls [`Compositor::raster_and_draw`] and
//!   [`Compositor::schedule_animation_frame`] in a loop and forwards input.
//! - Each tab's worker calls [`FrameSink::commit`] when a frame is ready.
//! - The timer thread runs the animation-frame callback.
//!
//! All of them meet at one lock around [`FrameState`]. It is held only to
//! read or flip bookkeeping; rendering and rasterization happen outside it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::{Duration, Instant};

use image::RgbaImage;
use kestrel_css::{DisplayList, FontMetrics};
use tiny_skia::{Color, FillRule, Mask, PathBuilder, Pixmap, PixmapPaint, Transform};
use tracing::{debug, debug_span, trace, warn};

use crate::chrome::Chrome;
use crate::commit::{CommitData, FrameSink, TabId, clamp_scroll};
use crate::config::BrowserConfig;
use crate::error::{BrowserError, RasterError};
use crate::font::FontCache;
use crate::loader::DocumentLoader;
use crate::present::{Presenter, to_rgba_image};
use crate::raster::{SkiaCanvas, new_surface};
use crate::script::ScriptHostFactory;
use crate::tab::{Tab, TabServices};
use crate::task::{Task, TaskRunner};
use crate::timer::{TimerId, TimerService};

/// The compositor's view of the active tab's latest frame.
///
/// Only the active tab's commits are accepted; a commit from any other tab
/// raced with a tab switch and is dropped.
#[derive(Debug, Clone)]
pub struct FrameState {
    /// Tab whose frames are shown.
    pub active_tab: Option<TabId>,
    /// URL of the last accepted frame.
    pub url: Option<String>,
    /// Scroll offset of the content area.
    pub scroll: f32,
    /// Content height of the last accepted frame.
    pub height: f32,
    /// Display list of the last accepted frame.
    pub display_list: Option<Arc<DisplayList>>,
    /// A frame was accepted or scrolled but not yet drawn.
    pub needs_raster_and_draw: bool,
    /// The active tab asked for an animation frame.
    pub needs_animation_frame: bool,
    /// Animation-frame timer armed and not yet answered by a commit. While
    /// set, no further frame is scheduled.
    pub animation_timer: Option<TimerId>,
    /// Bumped whenever drawable state changes, so a draw can tell whether
    /// it is still current.
    pub generation: u64,
    /// Window width.
    pub width: u32,
    /// Window height, chrome included.
    pub height_px: u32,
    /// Address bar geometry.
    pub chrome: Chrome,
}

impl FrameState {
    /// Empty state for a window of the given size.
    #[must_use]
    pub fn new(config: &BrowserConfig, metrics: &dyn FontMetrics) -> Self {
        Self {
            active_tab: None,
            url: None,
            scroll: 0.0,
            height: 0.0,
            display_list: None,
            needs_raster_and_draw: false,
            needs_animation_frame: false,
            animation_timer: None,
            generation: 0,
            width: config.width,
            height_px: config.height,
            chrome: Chrome::new(config, config.width as f32, metrics),
        }
    }

    /// Height of the content area below the chrome.
    #[must_use]
    pub fn tab_height(&self) -> f32 {
        (self.height_px as f32 - self.chrome.bottom()).max(0.0)
    }

    /// Take a committed frame if it comes from the active tab. Returns
    /// whether it was accepted. An accepted commit completes the animation
    /// frame in flight, so the next one may be scheduled.
    pub fn apply_commit(&mut self, tab: TabId, data: CommitData) -> bool {
        if self.active_tab != Some(tab) {
            return false;
        }
        self.animation_timer = None;
        self.url = data.url;
        if let Some(scroll) = data.scroll {
            self.scroll = scroll;
        }
        self.height = data.height;
        if let Some(list) = data.display_list {
            self.display_list = Some(Arc::new(list));
        }
        self.mark_dirty();
        true
    }

    /// Note that `tab` wants an animation frame. Ignored unless it is the
    /// active tab.
    pub fn request_animation_frame(&mut self, tab: TabId) -> bool {
        if self.active_tab == Some(tab) {
            self.needs_animation_frame = true;
            true
        } else {
            false
        }
    }

    /// Make `tab` the shown tab and forget the previous tab's frame.
    pub fn activate(&mut self, tab: TabId) {
        self.active_tab = Some(tab);
        self.scroll = 0.0;
        self.url = None;
        self.height = 0.0;
        self.display_list = None;
        self.needs_animation_frame = true;
        self.animation_timer = None;
        self.mark_dirty();
    }

    /// Scroll the content by `delta`, clamped to the content height.
    pub fn scroll_by(&mut self, delta: f32) {
        self.scroll = clamp_scroll(self.scroll + delta, self.height, self.tab_height());
        self.needs_animation_frame = true;
        self.mark_dirty();
    }

    const fn mark_dirty(&mut self) {
        self.needs_raster_and_draw = true;
        self.generation += 1;
    }
}

/// What a draw needs, copied out of [`FrameState`] under the lock.
struct FrameSnapshot {
    url: String,
    scroll: f32,
    height: f32,
    display_list: Option<Arc<DisplayList>>,
    generation: u64,
    width: u32,
    height_px: u32,
    chrome: Chrome,
}

/// Raster targets, reused between frames while their size is unchanged.
#[derive(Default)]
struct Surfaces {
    tab: Option<Pixmap>,
    chrome: Option<Pixmap>,
    root: Option<Pixmap>,
}

struct TabHandle {
    id: TabId,
    runner: TaskRunner<Tab>,
}

/// Shows the active tab and routes input to it.
pub struct Compositor {
    this: Weak<Self>,
    config: BrowserConfig,
    fonts: Arc<FontCache>,
    loader: Arc<dyn DocumentLoader>,
    scripts: ScriptHostFactory,
    timers: TimerService,
    state: Mutex<FrameState>,
    tabs: Mutex<Vec<TabHandle>>,
    next_tab: AtomicUsize,
    surfaces: Mutex<Surfaces>,
    presenter: Mutex<Box<dyn Presenter>>,
    frames_dispatched: AtomicUsize,
    frames_drawn: AtomicUsize,
}

impl Compositor {
    /// Start a compositor with no tabs.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer thread cannot be started.
    pub fn new(
        config: BrowserConfig,
        fonts: Arc<FontCache>,
        loader: Arc<dyn DocumentLoader>,
        scripts: ScriptHostFactory,
        presenter: Box<dyn Presenter>,
    ) -> Result<Arc<Self>, BrowserError> {
        let timers = TimerService::start()?;
        let state = FrameState::new(&config, fonts.as_ref());
        Ok(Arc::new_cyclic(|this| Self {
            this: this.clone(),
            config,
            fonts,
            loader,
            scripts,
            timers,
            state: Mutex::new(state),
            tabs: Mutex::new(Vec::new()),
            next_tab: AtomicUsize::new(0),
            surfaces: Mutex::new(Surfaces::default()),
            presenter: Mutex::new(presenter),
            frames_dispatched: AtomicUsize::new(0),
            frames_drawn: AtomicUsize::new(0),
        }))
    }

    fn lock(&self) -> MutexGuard<'_, FrameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_tabs(&self) -> MutexGuard<'_, Vec<TabHandle>> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the bookkeeping state.
    #[must_use]
    pub fn state(&self) -> FrameState {
        self.lock().clone()
    }

    /// Open a tab loading `url` and make it active.
    ///
    /// # Errors
    ///
    /// Returns an error if the tab's worker cannot be started.
    pub fn new_tab(&self, url: &str) -> Result<TabId, BrowserError> {
        let id = TabId(self.next_tab.fetch_add(1, Ordering::SeqCst) as u64);
        let (width, tab_height) = {
            let state = self.lock();
            (state.width, state.tab_height())
        };
        let services = TabServices {
            config: self.config.clone(),
            metrics: Arc::clone(&self.fonts) as Arc<dyn FontMetrics>,
            loader: Arc::clone(&self.loader),
            scripts: Arc::clone(&self.scripts),
            timers: self.timers.clone(),
        };
        let sink: Weak<dyn FrameSink> = self.this.clone();

        let mut runner = TaskRunner::new(format!("tab-{}", id.0));
        let tab = Tab::new(id, services, sink, runner.sender(), width, tab_height);
        let url = url.to_string();
        runner.schedule(Task::new("load", move |tab: &mut Tab| tab.load(&url, None)));
        runner.start(tab, Tab::shutdown)?;
        self.lock_tabs().push(TabHandle { id, runner });
        debug!(tab = id.0, "opened tab");

        self.set_active_tab(id);
        Ok(id)
    }

    /// Show `tab`. Its next animation frame repaints from scratch.
    pub fn set_active_tab(&self, tab: TabId) {
        {
            let mut state = self.lock();
            if let Some(timer) = state.animation_timer {
                let _ = self.timers.cancel(timer);
            }
            state.activate(tab);
        }
        self.schedule_on(
            tab,
            Task::new("activate", |tab: &mut Tab| tab.set_needs_render()),
        );
    }

    /// Navigate the active tab, abandoning any work still queued for it.
    pub fn schedule_load(&self, url: &str, payload: Option<&str>) {
        let mut state = self.lock();
        let Some(active) = state.active_tab else {
            return;
        };
        let url = url.to_string();
        let payload = payload.map(str::to_string);
        let tabs = self.lock_tabs();
        if let Some(handle) = tabs.iter().find(|h| h.id == active) {
            handle.runner.clear_pending();
            // The dropped tasks may include the frame that would have
            // answered the armed timer.
            if let Some(timer) = state.animation_timer.take() {
                let _ = self.timers.cancel(timer);
            }
            handle.runner.schedule(Task::new("load", move |tab: &mut Tab| {
                tab.load(&url, payload.as_deref());
            }));
        }
    }

    /// Go back in the active tab's history.
    pub fn handle_back(&self) {
        let active = self.lock().active_tab;
        if let Some(active) = active {
            self.schedule_on(active, Task::new("back", Tab::go_back));
        }
    }

    /// A click at window coordinates. Clicks below the chrome go to the
    /// active tab in its own coordinates.
    pub fn handle_click(&self, x: f32, y: f32) {
        let (active, chrome_bottom) = {
            let state = self.lock();
            (state.active_tab, state.chrome.bottom())
        };
        let Some(active) = active else {
            return;
        };
        if y < chrome_bottom {
            trace!(x, y, "click on chrome ignored");
            return;
        }
        let tab_y = y - chrome_bottom;
        self.schedule_on(
            active,
            Task::new("click", move |tab: &mut Tab| tab.click(x, tab_y)),
        );
    }

    /// A key press. Only printable ASCII reaches the page.
    pub fn handle_key(&self, ch: char) {
        if !(' '..='~').contains(&ch) {
            return;
        }
        let active = self.lock().active_tab;
        if let Some(active) = active {
            self.schedule_on(
                active,
                Task::new("keypress", move |tab: &mut Tab| tab.keypress(ch)),
            );
        }
    }

    /// Scroll down by one step.
    pub fn handle_down(&self) {
        let mut state = self.lock();
        if state.active_tab.is_some() {
            state.scroll_by(self.config.scroll_step);
        }
    }

    /// The window changed size.
    pub fn resize(&self, width: u32, height: u32) {
        let tab_height = {
            let mut state = self.lock();
            state.width = width;
            state.height_px = height;
            state.chrome = Chrome::new(&self.config, width as f32, self.fonts.as_ref());
            state.mark_dirty();
            state.tab_height()
        };
        for handle in self.lock_tabs().iter() {
            handle.runner.schedule(Task::new("resize", move |tab: &mut Tab| {
                tab.resize(width, tab_height);
            }));
        }
    }

    /// Stop every tab's worker and the timer thread.
    pub fn handle_quit(&self) {
        let tabs = std::mem::take(&mut *self.lock_tabs());
        for handle in tabs {
            let id = handle.id;
            if handle.runner.join().is_none() {
                warn!(tab = id.0, "tab worker did not shut down cleanly");
            }
        }
        self.timers.shutdown();
        debug!("compositor shut down");
    }

    fn schedule_on(&self, tab: TabId, task: Task<Tab>) {
        let tabs = self.lock_tabs();
        if let Some(handle) = tabs.iter().find(|h| h.id == tab) {
            handle.runner.schedule(task);
        }
    }

    /// Arm the animation-frame timer if the active tab asked for a frame
    /// and no frame is in flight. Returns whether a timer was armed.
    ///
    /// A frame is in flight from arming until the active tab commits, so
    /// any number of requests in that window produce one frame.
    pub fn schedule_animation_frame(&self) -> bool {
        let mut state = self.lock();
        if !state.needs_animation_frame || state.animation_timer.is_some() {
            return false;
        }
        let this = self.this.clone();
        let timer = self.timers.schedule(self.config.refresh_interval, move || {
            if let Some(compositor) = this.upgrade() {
                compositor.dispatch_animation_frame();
            }
        });
        state.animation_timer = Some(timer);
        true
    }

    /// Timer callback: hand the current scroll offset to the active tab
    /// with a `run_animation_frame` task. The timer stays armed until the
    /// tab commits.
    fn dispatch_animation_frame(&self) {
        let (active, scroll) = {
            let mut state = self.lock();
            state.needs_animation_frame = false;
            (state.active_tab, state.scroll)
        };
        let Some(active) = active else {
            return;
        };
        let _ = self.frames_dispatched.fetch_add(1, Ordering::SeqCst);
        trace!(tab = active.0, scroll, "dispatching animation frame");
        self.schedule_on(
            active,
            Task::new("animation-frame", move |tab: &mut Tab| {
                tab.run_animation_frame(scroll);
            }),
        );
    }

    /// Raster the chrome and the active tab's frame, composite them, and
    /// present the result, if anything changed. Returns whether a frame
    /// was drawn.
    ///
    /// # Errors
    ///
    /// Returns an error if a surface cannot be allocated or the presenter
    /// fails. The frame stays pending and is retried next time.
    pub fn raster_and_draw(&self) -> Result<bool, RasterError> {
        let snapshot = {
            let state = self.lock();
            if !state.needs_raster_and_draw {
                return Ok(false);
            }
            FrameSnapshot {
                url: state.url.clone().unwrap_or_default(),
                scroll: state.scroll,
                height: state.height,
                display_list: state.display_list.clone(),
                generation: state.generation,
                width: state.width,
                height_px: state.height_px,
                chrome: state.chrome.clone(),
            }
        };
        let _span = debug_span!("raster_and_draw", generation = snapshot.generation).entered();

        let mut surfaces = self.surfaces.lock().unwrap_or_else(PoisonError::into_inner);
        self.raster_tab(&mut surfaces, &snapshot)?;
        self.raster_chrome(&mut surfaces, &snapshot)?;
        let root = draw(&mut surfaces, &snapshot)?;
        self.presenter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .present(root)?;
        drop(surfaces);
        let _ = self.frames_drawn.fetch_add(1, Ordering::SeqCst);

        let mut state = self.lock();
        if state.generation == snapshot.generation {
            state.needs_raster_and_draw = false;
        }
        Ok(true)
    }

    fn raster_tab(&self, surfaces: &mut Surfaces, frame: &FrameSnapshot) -> Result<(), RasterError> {
        let tab_height = (frame.height_px as f32 - frame.chrome.bottom()).max(1.0);
        let height = frame.height.max(tab_height).ceil() as u32;
        let surface = reuse_surface(&mut surfaces.tab, frame.width, height)?;
        if let Some(list) = &frame.display_list {
            let mut canvas = SkiaCanvas::new(surface, &self.fonts);
            list.execute(&mut canvas);
            canvas.finish();
        }
        Ok(())
    }

    fn raster_chrome(
        &self,
        surfaces: &mut Surfaces,
        frame: &FrameSnapshot,
    ) -> Result<(), RasterError> {
        let height = frame.chrome.bottom().ceil() as u32 + 1;
        let surface = reuse_surface(&mut surfaces.chrome, frame.width, height)?;
        let list = frame
            .chrome
            .paint(&frame.url, frame.width as f32, self.fonts.as_ref());
        let mut canvas = SkiaCanvas::new(surface, &self.fonts);
        list.execute(&mut canvas);
        canvas.finish();
        Ok(())
    }

    /// Step the UI loop until `frames` frames have been drawn or `timeout`
    /// passes. Returns the number drawn.
    ///
    /// # Errors
    ///
    /// Returns the first raster failure.
    pub fn pump(&self, frames: usize, timeout: Duration) -> Result<usize, RasterError> {
        let deadline = Instant::now() + timeout;
        let mut drawn = 0;
        while drawn < frames && Instant::now() < deadline {
            if self.raster_and_draw()? {
                drawn += 1;
            }
            let _ = self.schedule_animation_frame();
            thread::sleep(Duration::from_millis(2));
        }
        Ok(drawn)
    }

    /// Number of animation frames handed to tabs.
    #[must_use]
    pub fn frames_dispatched(&self) -> usize {
        self.frames_dispatched.load(Ordering::SeqCst)
    }

    /// Number of frames drawn and presented.
    #[must_use]
    pub fn frames_drawn(&self) -> usize {
        self.frames_drawn.load(Ordering::SeqCst)
    }

    /// Display list of the frame currently shown.
    #[must_use]
    pub fn active_display_list(&self) -> Option<Arc<DisplayList>> {
        self.lock().display_list.clone()
    }

    /// The last composited frame as an image.
    #[must_use]
    pub fn screenshot(&self) -> Option<RgbaImage> {
        let surfaces = self.surfaces.lock().unwrap_or_else(PoisonError::into_inner);
        surfaces.root.as_ref().map(to_rgba_image)
    }
}

impl FrameSink for Compositor {
    fn commit(&self, tab: TabId, data: CommitData) {
        let mut state = self.lock();
        if state.apply_commit(tab, data) {
            trace!(tab = tab.0, generation = state.generation, "accepted commit");
        } else {
            trace!(tab = tab.0, "dropped commit from inactive tab");
        }
    }

    fn set_needs_animation_frame(&self, tab: TabId) {
        let _ = self.lock().request_animation_frame(tab);
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        self.timers.shutdown();
    }
}

/// The surface in `slot`, reallocated only if its size changed and
/// cleared to white otherwise.
fn reuse_surface(slot: &mut Option<Pixmap>, width: u32, height: u32) -> Result<&mut Pixmap, RasterError> {
    let reusable = slot
        .as_ref()
        .is_some_and(|s| s.width() == width && s.height() == height);
    if !reusable {
        *slot = Some(new_surface(width, height, Color::WHITE)?);
    }
    let surface = slot.as_mut().ok_or(RasterError::Surface { width, height })?;
    if reusable {
        surface.fill(Color::WHITE);
    }
    Ok(surface)
}

/// Composite the tab surface, shifted by the chrome height minus the
/// scroll and clipped to the content area, then the chrome on top.
fn draw<'a>(surfaces: &'a mut Surfaces, frame: &FrameSnapshot) -> Result<&'a Pixmap, RasterError> {
    let (width, height) = (frame.width, frame.height_px);
    let chrome_bottom = frame.chrome.bottom();
    let root = reuse_surface(&mut surfaces.root, width, height)?;

    if let Some(tab) = &surfaces.tab {
        let mut clip = Mask::new(width, height).ok_or(RasterError::Surface { width, height })?;
        let content = tiny_skia::Rect::from_xywh(
            0.0,
            chrome_bottom,
            width as f32,
            (height as f32 - chrome_bottom).max(1.0),
        );
        if let Some(content) = content {
            clip.fill_path(
                &PathBuilder::from_rect(content),
                FillRule::Winding,
                false,
                Transform::identity(),
            );
        }
        root.draw_pixmap(
            0,
            0,
            tab.as_ref(),
            &PixmapPaint::default(),
            Transform::from_translate(0.0, chrome_bottom - frame.scroll),
            Some(&clip),
        );
    }
    if let Some(chrome) = &surfaces.chrome {
        root.draw_pixmap(
            0,
            0,
            chrome.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_css::ApproximateFontMetrics;

    fn state() -> FrameState {
        FrameState::new(&BrowserConfig::default(), &ApproximateFontMetrics)
    }

    fn commit(url: &str, height: f32) -> CommitData {
        CommitData {
            url: Some(url.to_string()),
            scroll: None,
            height,
            display_list: Some(DisplayList::new()),
        }
    }

    #[test]
    fn test_commit_from_inactive_tab_is_dropped() {
        let mut state = state();
        state.activate(TabId(1));
        assert!(state.apply_commit(TabId(1), commit("http://a/", 500.0)));
        let before = state.clone();

        state.activate(TabId(2));
        let after_switch = state.clone();
        assert!(!state.apply_commit(TabId(1), commit("http://late/", 900.0)));
        assert_eq!(state.url, after_switch.url);
        assert_eq!(state.generation, after_switch.generation);
        assert!(state.display_list.is_none());
        assert_ne!(before.generation, after_switch.generation);
    }

    #[test]
    fn test_commit_keeps_scroll_unless_given() {
        let mut state = state();
        state.activate(TabId(0));
        state.scroll = 40.0;
        assert!(state.apply_commit(TabId(0), commit("http://a/", 2000.0)));
        assert!((state.scroll - 40.0).abs() < f32::EPSILON);

        let mut with_scroll = commit("http://a/", 2000.0);
        with_scroll.scroll = Some(0.0);
        assert!(state.apply_commit(TabId(0), with_scroll));
        assert!(state.scroll.abs() < f32::EPSILON);
    }

    #[test]
    fn test_commit_without_display_list_keeps_previous() {
        let mut state = state();
        state.activate(TabId(0));
        assert!(state.apply_commit(TabId(0), commit("http://a/", 100.0)));
        let shown = state.display_list.clone().expect("display list");
        let mut idle = commit("http://a/", 100.0);
        idle.display_list = None;
        assert!(state.apply_commit(TabId(0), idle));
        assert!(Arc::ptr_eq(&shown, state.display_list.as_ref().expect("kept")));
    }

    #[test]
    fn test_animation_frame_requests_only_from_active_tab() {
        let mut state = state();
        state.activate(TabId(3));
        state.needs_animation_frame = false;
        assert!(!state.request_animation_frame(TabId(4)));
        assert!(!state.needs_animation_frame);
        assert!(state.request_animation_frame(TabId(3)));
        assert!(state.needs_animation_frame);
    }

    #[test]
    fn test_animation_timer_is_released_by_active_commit_only() {
        let timers = TimerService::start().expect("timer thread");
        let mut state = state();
        state.activate(TabId(1));
        state.animation_timer = Some(timers.schedule(Duration::from_secs(60), || {}));

        assert!(!state.apply_commit(TabId(2), commit("http://other/", 100.0)));
        assert!(state.animation_timer.is_some());

        assert!(state.apply_commit(TabId(1), commit("http://a/", 100.0)));
        assert!(state.animation_timer.is_none());

        state.animation_timer = Some(timers.schedule(Duration::from_secs(60), || {}));
        state.activate(TabId(2));
        assert!(state.animation_timer.is_none());
        timers.shutdown();
    }

    #[test]
    fn test_scroll_is_clamped_to_content() {
        let mut state = state();
        state.activate(TabId(0));
        state.height = 400.0;
        state.scroll_by(100.0);
        assert!(state.scroll.abs() < f32::EPSILON);

        state.height = 1000.0;
        for _ in 0..10 {
            state.scroll_by(100.0);
        }
        let max = 1000.0 - state.tab_height();
        assert!((state.scroll - max).abs() < 1e-3);
    }
}
