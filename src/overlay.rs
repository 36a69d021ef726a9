//! Overlay lifecycle for the embedded authorization surface
//!
//! The crate never touches a real display. Presentation is an injected
//! `OverlayChrome` capability; this module owns the lifecycle rules around
//! it: the layout decision, scroll-lock scoping, settle-once teardown, and
//! the user-dismiss signal the poll loop races against.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Viewport width (px) below which the surface takes the whole screen
pub const FULL_SCREEN_MAX_WIDTH: u32 = 500;
/// Floating panel width (px)
pub const PANEL_WIDTH: u32 = 414;
/// Floating panel height (px)
pub const PANEL_HEIGHT: u32 = 736;

/// Visual placement of the surface, decided by viewport width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayLayout {
    FullScreen,
    Floating { width: u32, height: u32 },
}

impl OverlayLayout {
    /// Pick a layout for the given viewport width
    #[must_use]
    pub fn for_viewport(width: u32) -> Self {
        if width < FULL_SCREEN_MAX_WIDTH {
            Self::FullScreen
        } else {
            Self::Floating {
                width: PANEL_WIDTH,
                height: PANEL_HEIGHT,
            }
        }
    }

    /// Whether the chrome should render a close affordance.
    /// Full-screen surfaces have none; the host decides how to leave.
    #[must_use]
    pub fn has_close_button(self) -> bool {
        matches!(self, Self::Floating { .. })
    }
}

/// Description of the surface handed to the presentation layer
#[derive(Debug, Clone)]
pub struct SurfaceSpec {
    pub url: String,
    pub layout: OverlayLayout,
}

/// Callback the chrome fires when the user dismisses the surface
pub type DismissCallback = Box<dyn Fn() + Send + Sync>;

/// Presentation capability: mounts and removes the visual surface
///
/// Presentation operations are assumed not to fail; a missing display is an
/// environment precondition, not a recoverable error. Implementations must
/// remove the surface themselves before invoking `on_dismiss`, and must
/// tolerate repeated `unmount` and `set_scroll_locked` calls.
pub trait OverlayChrome: Send + Sync {
    /// Current viewport width in pixels, used for the layout decision
    fn viewport_width(&self) -> u32;

    /// Mount the surface. `on_dismiss` fires at most once, after the chrome
    /// has removed the surface in response to an explicit user action.
    fn mount(&self, spec: &SurfaceSpec, on_dismiss: DismissCallback);

    /// Remove the surface if it is still mounted
    fn unmount(&self);

    /// Toggle background scroll suppression
    fn set_scroll_locked(&self, locked: bool);
}

struct OverlayShared {
    chrome: Arc<dyn OverlayChrome>,
    closed: AtomicBool,
    dismissed: AtomicBool,
    dismiss_signal: Notify,
}

impl OverlayShared {
    /// First caller wins; every later call is a no-op
    fn settle(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }
}

/// Live handle to a mounted authorization surface
///
/// Exactly one handle is active per handshake. Teardown happens exactly once
/// across all exit paths (result, timeout, user dismissal, drop); the scroll
/// lock is released on whichever path settles first.
pub struct OverlayHandle {
    shared: Arc<OverlayShared>,
}

impl OverlayHandle {
    /// Mount the surface for `url` and acquire the scroll lock
    #[must_use]
    pub fn open(chrome: Arc<dyn OverlayChrome>, url: &str) -> Self {
        let layout = OverlayLayout::for_viewport(chrome.viewport_width());
        let spec = SurfaceSpec {
            url: url.to_string(),
            layout,
        };

        let shared = Arc::new(OverlayShared {
            chrome: Arc::clone(&chrome),
            closed: AtomicBool::new(false),
            dismissed: AtomicBool::new(false),
            dismiss_signal: Notify::new(),
        });

        chrome.set_scroll_locked(true);

        let hook = Arc::clone(&shared);
        chrome.mount(
            &spec,
            Box::new(move || {
                // The chrome already removed the surface on this path;
                // only the scroll lock and the signal are left to us.
                if hook.settle() {
                    hook.chrome.set_scroll_locked(false);
                    hook.dismissed.store(true, Ordering::SeqCst);
                    hook.dismiss_signal.notify_one();
                }
            }),
        );

        log::debug!("overlay mounted ({layout:?})");
        Self { shared }
    }

    /// Remove the surface and release the scroll lock; no-op when already
    /// closed or dismissed
    pub fn close(&self) {
        if self.shared.settle() {
            self.shared.chrome.unmount();
            self.shared.chrome.set_scroll_locked(false);
            log::debug!("overlay closed");
        }
    }

    /// Resolves once the user has dismissed the surface
    ///
    /// A dismissal that happened before this future is polled is still
    /// observed; the signal holds its permit.
    pub async fn dismissed(&self) {
        if self.shared.dismissed.load(Ordering::SeqCst) {
            return;
        }
        self.shared.dismiss_signal.notified().await;
    }

    /// Whether the surface has been torn down (on any path)
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl Drop for OverlayHandle {
    fn drop(&mut self) {
        self.close();
    }
}
