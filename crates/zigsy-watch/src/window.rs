//! Foreground window watcher.
//!
//! On Windows the probe reads the foreground title and the image name of the
//! owning process. On other platforms it returns `ZigsyError::Window`.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
#[cfg(not(target_os = "windows"))]
use tracing::warn;

use zigsy_core::error::Result;
#[cfg(not(target_os = "windows"))]
use zigsy_core::error::ZigsyError;
use zigsy_core::types::WindowSnapshot;

use crate::controller::WatcherHandle;

/// OS window introspection.
pub trait WindowIntrospector: Send + Sync {
    /// The current foreground window, or `None` when there is none.
    fn foreground_window(&self) -> Result<Option<WindowSnapshot>>;
}

/// Latest accepted foreground window, shared with readers.
#[derive(Clone, Debug, Default)]
pub struct WindowState {
    latest: Arc<RwLock<Option<WindowSnapshot>>>,
}

impl WindowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<WindowSnapshot> {
        self.latest.read().ok().and_then(|s| s.clone())
    }

    pub fn publish(&self, snapshot: WindowSnapshot) {
        if let Ok(mut latest) = self.latest.write() {
            *latest = Some(snapshot);
        }
    }
}

/// Rejects the assistant's own windows and titles with nothing to say.
#[derive(Clone, Debug)]
pub struct WindowFilter {
    ignored_processes: Vec<String>,
    own_name: String,
}

impl WindowFilter {
    pub fn new(ignored_processes: &[String], own_name: &str) -> Self {
        Self {
            ignored_processes: ignored_processes.iter().map(|p| p.to_lowercase()).collect(),
            own_name: own_name.to_lowercase(),
        }
    }

    pub fn accepts(&self, snapshot: &WindowSnapshot) -> bool {
        let process = snapshot.process_name.to_lowercase();
        if self.ignored_processes.iter().any(|p| process.contains(p.as_str())) {
            return false;
        }

        let title = snapshot.title.trim();
        if !self.own_name.is_empty() && title.to_lowercase().contains(&self.own_name) {
            return false;
        }
        !(title.chars().count() < 3 || title.chars().all(|c| c.is_ascii_digit()))
    }
}

pub struct WindowWatcher<W: WindowIntrospector + 'static> {
    probe: Arc<W>,
    state: WindowState,
    filter: WindowFilter,
    poll_interval: Duration,
}

impl<W: WindowIntrospector + 'static> WindowWatcher<W> {
    pub fn new(probe: Arc<W>, state: WindowState, filter: WindowFilter, poll_interval: Duration) -> Self {
        Self {
            probe,
            state,
            filter,
            poll_interval,
        }
    }

    /// Probe once; returns whether a new snapshot was published.
    pub fn poll_once(&self) -> Result<bool> {
        let Some(mut snapshot) = self.probe.foreground_window()? else {
            return Ok(false);
        };
        snapshot.process_name = snapshot.process_name.trim().to_lowercase();
        snapshot.title = snapshot.title.trim().to_string();

        if !self.filter.accepts(&snapshot) {
            return Ok(false);
        }
        self.state.publish(snapshot);
        Ok(true)
    }

    pub fn spawn(self, cancel_token: CancellationToken) -> WatcherHandle {
        let token = cancel_token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = self.poll_interval.as_millis() as u64, "Window watcher started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.poll_once() {
                            debug!(error = %e, "Foreground window probe failed");
                        }
                    }
                    _ = token.cancelled() => {
                        info!("Window watcher shutting down");
                        break;
                    }
                }
            }
        });
        WatcherHandle::new("window", cancel_token, handle)
    }
}

// =============================================================================
// Windows implementation
// =============================================================================

/// Foreground window probe backed by Win32.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForegroundWindowProbe;

#[cfg(target_os = "windows")]
impl WindowIntrospector for ForegroundWindowProbe {
    fn foreground_window(&self) -> Result<Option<WindowSnapshot>> {
        use windows_sys::Win32::UI::WindowsAndMessaging::{
            GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
        };

        // SAFETY: plain Win32 queries on the current foreground handle; every
        // buffer handed out is sized by the length passed with it.
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd == 0 {
                return Ok(None);
            }

            let capacity = GetWindowTextLengthW(hwnd).max(0) + 1;
            let mut title = vec![0u16; capacity as usize];
            let copied = GetWindowTextW(hwnd, title.as_mut_ptr(), capacity).max(0) as usize;
            title.truncate(copied);

            let mut pid = 0u32;
            GetWindowThreadProcessId(hwnd, &mut pid);

            Ok(Some(WindowSnapshot {
                title: String::from_utf16_lossy(&title),
                process_name: process_image_path(pid)
                    .map(|path| process_name_from_image(&path))
                    .unwrap_or_default(),
            }))
        }
    }
}

/// Full image path of process `pid`, if it can be queried.
#[cfg(target_os = "windows")]
fn process_image_path(pid: u32) -> Option<String> {
    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Threading::{
        OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };

    // SAFETY: the handle is checked before use and closed on every path.
    unsafe {
        let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if process == 0 {
            return None;
        }
        let mut buf = [0u16; 1024];
        let mut len = buf.len() as u32;
        let ok = QueryFullProcessImageNameW(process, PROCESS_NAME_WIN32, buf.as_mut_ptr(), &mut len);
        CloseHandle(process);
        (ok != 0).then(|| String::from_utf16_lossy(&buf[..len as usize]))
    }
}

/// `C:\Program Files\App\Chrome.exe` becomes `chrome`.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn process_name_from_image(image: &str) -> String {
    let file = image.rsplit(['\\', '/']).next().unwrap_or(image);
    let stem = match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    };
    stem.to_lowercase()
}

// =============================================================================
// Non-Windows stub
// =============================================================================

#[cfg(not(target_os = "windows"))]
impl WindowIntrospector for ForegroundWindowProbe {
    fn foreground_window(&self) -> Result<Option<WindowSnapshot>> {
        warn!("ForegroundWindowProbe called on non-Windows platform");
        Err(ZigsyError::Window(
            "Foreground window detection is only available on Windows".into(),
        ))
    }
}
