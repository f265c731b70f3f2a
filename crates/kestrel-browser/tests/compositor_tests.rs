//! Tests for the commit/raster/draw protocol and animation-frame pacing.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kestrel_browser::css::{ColorValue, DisplayCommand, DisplayList, Rect};
use kestrel_browser::dom::NodeId;
use kestrel_browser::{
    BrowserConfig, CommitData, Compositor, DocumentApi, FontCache, FrameSink, HeadlessPresenter,
    MemoryLoader, ScriptError, ScriptHost, ScriptHostFactory, TabId, no_script,
};

fn compositor_with(
    loader: MemoryLoader,
    scripts: ScriptHostFactory,
) -> (Arc<Compositor>, HeadlessPresenter) {
    let presenter = HeadlessPresenter::new();
    let compositor = Compositor::new(
        BrowserConfig::default(),
        Arc::new(FontCache::empty()),
        Arc::new(loader),
        scripts,
        Box::new(presenter.clone()),
    )
    .expect("compositor");
    (compositor, presenter)
}

fn compositor(loader: MemoryLoader) -> (Arc<Compositor>, HeadlessPresenter) {
    compositor_with(loader, no_script())
}

/// Run the UI loop until `done` holds, for at most five seconds.
fn wait_until(compositor: &Compositor, mut done: impl FnMut(&Compositor) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        let _ = compositor
            .pump(1, Duration::from_millis(20))
            .expect("raster and draw");
        if done(compositor) {
            return true;
        }
    }
    false
}

fn shown_texts(compositor: &Compositor) -> Vec<String> {
    compositor
        .active_display_list()
        .map(|list| {
            list.flatten()
                .into_iter()
                .filter_map(|cmd| match cmd {
                    DisplayCommand::Text { text, .. } => Some(text.clone()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn frame(url: &str, height: f32) -> CommitData {
    CommitData {
        url: Some(url.to_string()),
        scroll: None,
        height,
        display_list: Some(DisplayList::from(vec![DisplayCommand::Rect {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            color: ColorValue::BLACK,
        }])),
    }
}

#[test]
fn test_commit_after_tab_switch_leaves_frame_unchanged() {
    let (compositor, _) = compositor(MemoryLoader::new());
    compositor.set_active_tab(TabId(1));
    compositor.commit(TabId(1), frame("http://a/", 800.0));
    assert_eq!(compositor.state().url.as_deref(), Some("http://a/"));

    compositor.set_active_tab(TabId(2));
    let before = compositor.state();
    compositor.commit(TabId(1), frame("http://late/", 1200.0));
    let after = compositor.state();

    assert_eq!(after.url, before.url);
    assert_eq!(after.generation, before.generation);
    assert!((after.height - before.height).abs() < f32::EPSILON);
    assert!(after.display_list.is_none());
}

fn wait_for_dispatch(compositor: &Compositor, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while compositor.frames_dispatched() < count && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_many_frame_requests_arm_one_timer_and_dispatch_once() {
    let (compositor, _) = compositor(MemoryLoader::new());
    compositor.set_active_tab(TabId(7));

    let mut armed = 0;
    for _ in 0..20 {
        compositor.set_needs_animation_frame(TabId(7));
        if compositor.schedule_animation_frame() {
            armed += 1;
        }
    }
    assert_eq!(armed, 1);

    wait_for_dispatch(&compositor, 1);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(compositor.frames_dispatched(), 1);
    assert!(!compositor.state().needs_animation_frame);
}

#[test]
fn test_frame_in_flight_holds_back_the_next_until_commit() {
    let (compositor, _) = compositor(MemoryLoader::new());
    compositor.set_active_tab(TabId(7));
    assert!(compositor.schedule_animation_frame());
    wait_for_dispatch(&compositor, 1);

    // Dispatched but not yet committed: a new request must wait.
    compositor.set_needs_animation_frame(TabId(7));
    assert!(!compositor.schedule_animation_frame());
    assert!(compositor.state().animation_timer.is_some());
    thread::sleep(Duration::from_millis(100));
    assert_eq!(compositor.frames_dispatched(), 1);

    // A commit from another tab does not complete the frame.
    compositor.commit(TabId(8), frame("http://other/", 100.0));
    assert!(!compositor.schedule_animation_frame());

    compositor.commit(TabId(7), frame("http://a/", 100.0));
    assert!(compositor.state().animation_timer.is_none());
    assert!(compositor.schedule_animation_frame());
    wait_for_dispatch(&compositor, 2);
    assert_eq!(compositor.frames_dispatched(), 2);
}

#[test]
fn test_switching_tabs_releases_the_frame_in_flight() {
    let (compositor, _) = compositor(MemoryLoader::new());
    compositor.set_active_tab(TabId(1));
    assert!(compositor.schedule_animation_frame());
    wait_for_dispatch(&compositor, 1);

    compositor.set_active_tab(TabId(2));
    assert!(compositor.state().animation_timer.is_none());
    assert!(compositor.schedule_animation_frame());
}

#[test]
fn test_frame_request_from_inactive_tab_is_ignored() {
    let (compositor, _) = compositor(MemoryLoader::new());
    compositor.set_active_tab(TabId(1));
    compositor.commit(TabId(1), frame("http://a/", 100.0));
    let _ = compositor.raster_and_draw().expect("draw");
    // Activation itself requested a frame; let it go out and complete.
    assert!(compositor.schedule_animation_frame());
    wait_for_dispatch(&compositor, 1);
    compositor.commit(TabId(1), frame("http://a/", 100.0));
    assert!(compositor.state().animation_timer.is_none());

    compositor.set_needs_animation_frame(TabId(2));
    assert!(!compositor.state().needs_animation_frame);
    assert!(!compositor.schedule_animation_frame());
}

#[test]
fn test_draw_clears_flag_and_presents() {
    let (compositor, presenter) = compositor(MemoryLoader::new());
    compositor.set_active_tab(TabId(0));
    compositor.commit(TabId(0), frame("http://a/", 100.0));
    assert!(compositor.state().needs_raster_and_draw);

    assert!(compositor.raster_and_draw().expect("draw"));
    assert!(!compositor.state().needs_raster_and_draw);
    assert!(!compositor.raster_and_draw().expect("nothing to draw"));
    assert_eq!(presenter.frames(), 1);

    let shot = compositor.screenshot().expect("frame drawn");
    assert_eq!(shot.dimensions(), (800, 600));
}

#[test]
fn test_scrolling_short_page_stays_at_top() {
    let (compositor, _) = compositor(MemoryLoader::new());
    compositor.set_active_tab(TabId(0));
    compositor.commit(TabId(0), frame("http://a/", 400.0));
    for _ in 0..5 {
        compositor.handle_down();
    }
    assert!(compositor.state().scroll.abs() < f32::EPSILON);
}

#[test]
fn test_scrolling_long_page_stops_at_end() {
    let (compositor, _) = compositor(MemoryLoader::new());
    compositor.set_active_tab(TabId(0));
    compositor.commit(TabId(0), frame("http://a/", 1000.0));
    for _ in 0..20 {
        compositor.handle_down();
    }
    let state = compositor.state();
    assert!((state.scroll - (1000.0 - state.tab_height())).abs() < 1e-3);
}

#[test]
fn test_loaded_page_reaches_the_screen() {
    let loader = MemoryLoader::new()
        .with(
            "http://test/",
            r#"<link rel="stylesheet" href="/s.css"><p>hello world</p>"#,
        )
        .with("http://test/s.css", "p { color: blue; }");
    let (compositor, presenter) = compositor(loader);
    let _ = compositor.new_tab("http://test/").expect("tab");

    assert!(wait_until(&compositor, |c| shown_texts(c) == ["hello", "world"]));
    assert_eq!(compositor.state().url.as_deref(), Some("http://test/"));
    assert!(presenter.frames() >= 1);

    let list = compositor.active_display_list().expect("frame");
    let blue = list.flatten().into_iter().any(|cmd| {
        matches!(
            cmd,
            DisplayCommand::Text { color, .. } if *color == ColorValue::rgb(0, 0, 255)
        )
    });
    assert!(blue);
    compositor.handle_quit();
}

#[test]
fn test_switching_tabs_drops_old_tab_frames() {
    let loader = MemoryLoader::new()
        .with("http://test/a", "<p>first</p>")
        .with("http://test/b", "<p>second</p>");
    let (compositor, _) = compositor(loader);
    let first = compositor.new_tab("http://test/a").expect("tab a");
    assert!(wait_until(&compositor, |c| shown_texts(c) == ["first"]));

    let second = compositor.new_tab("http://test/b").expect("tab b");
    assert_ne!(first, second);
    assert!(wait_until(&compositor, |c| shown_texts(c) == ["second"]));

    // Give the first tab every chance to commit again.
    let _ = compositor.pump(5, Duration::from_millis(200)).expect("pump");
    assert_eq!(compositor.state().url.as_deref(), Some("http://test/b"));
    assert_eq!(shown_texts(&compositor), ["second"]);

    compositor.set_active_tab(first);
    assert!(wait_until(&compositor, |c| shown_texts(c) == ["first"]));
    compositor.handle_quit();
}

#[test]
fn test_click_and_navigation_through_compositor() {
    let loader = MemoryLoader::new()
        .with("http://test/", r#"<a href="/next">go</a>"#)
        .with("http://test/next", "<p>next page</p>");
    let (compositor, _) = compositor(loader);
    let _ = compositor.new_tab("http://test/").expect("tab");
    assert!(wait_until(&compositor, |c| shown_texts(c) == ["go"]));

    // The chrome is 30px tall with approximate metrics; the link sits at
    // y = 20.4 .. 32.4 in tab coordinates.
    let chrome = compositor.state().chrome.bottom();
    compositor.handle_click(18.0, chrome + 25.0);
    assert!(wait_until(&compositor, |c| shown_texts(c) == ["next", "page"]));
    assert_eq!(compositor.state().url.as_deref(), Some("http://test/next"));

    compositor.handle_back();
    assert!(wait_until(&compositor, |c| shown_texts(c) == ["go"]));
    compositor.handle_quit();
}

/// Replaces the first paragraph's contents from a timeout set by the page
/// script.
struct TimeoutHost;

impl ScriptHost for TimeoutHost {
    fn run(&mut self, _: &str, _: &str, document: &mut dyn DocumentApi) -> Result<(), ScriptError> {
        document.set_timeout(1, Duration::from_millis(10));
        Ok(())
    }

    fn dispatch_event(
        &mut self,
        _: &str,
        _: NodeId,
        _: &mut dyn DocumentApi,
    ) -> Result<bool, ScriptError> {
        Ok(false)
    }

    fn run_timeout(&mut self, handle: u64, document: &mut dyn DocumentApi) -> Result<(), ScriptError> {
        let paragraphs = document
            .query_selector_all("p")
            .map_err(|err| ScriptError::Runtime {
                name: format!("timeout {handle}"),
                message: err.to_string(),
            })?;
        if let Some(&first) = paragraphs.first() {
            document.set_inner_html(first, "changed");
        }
        Ok(())
    }

    fn run_animation_frame_handlers(&mut self, _: &mut dyn DocumentApi) -> Result<(), ScriptError> {
        Ok(())
    }
}

#[test]
fn test_script_timeout_mutation_is_repainted() {
    let loader = MemoryLoader::new()
        .with("http://test/", r#"<script src="app.js"></script><p>original</p>"#)
        .with("http://test/app.js", "setTimeout(change, 10)");
    let factory: ScriptHostFactory = Arc::new(|| Box::new(TimeoutHost) as Box<dyn ScriptHost>);
    let (compositor, _) = compositor_with(loader, factory);
    let _ = compositor.new_tab("http://test/").expect("tab");

    assert!(wait_until(&compositor, |c| shown_texts(c) == ["changed"]));
    compositor.handle_quit();
}
