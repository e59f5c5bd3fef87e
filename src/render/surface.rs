use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::core::{FrameMask, FrameOption, FrameTemplate};
use crate::error::{ForgeError, ForgeResult};

/// Top-level tabs of the card creator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Tab {
    Frame,
    Text,
    Art,
    SetSymbol,
    Collector,
}

/// Which half of the card a text field belongs to. Single cards only use `Top`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Half {
    Top,
    Bottom,
}

/// Text slots listed in the text tab.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TextSlot {
    ManaCost,
    Title,
    Type,
    Rules,
    PowerToughness,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CollectorField {
    Artist,
    Number,
    Rarity,
}

/// Clickable or observable elements of the creator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Control {
    Tab(Tab),
    /// Panel that becomes visible once its tab is open.
    Panel(Tab),
    FramePack(FrameTemplate),
    FrameOption(FrameOption),
    AddFrame(FrameMask),
    TextSlot(Half, TextSlot),
    ArtUpload,
    ArtLoaded,
    SetSymbolLoaded,
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Tab(tab) => write!(f, "{:?} tab", tab),
            Control::Panel(tab) => write!(f, "{:?} panel", tab),
            Control::FramePack(template) => write!(f, "{:?} frame pack", template),
            Control::FrameOption(option) => write!(f, "frame option {}", option.0),
            Control::AddFrame(mask) => write!(f, "add frame ({:?})", mask),
            Control::TextSlot(half, slot) => write!(f, "{:?} {:?} text slot", half, slot),
            Control::ArtUpload => write!(f, "art upload"),
            Control::ArtLoaded => write!(f, "art preview"),
            Control::SetSymbolLoaded => write!(f, "set symbol preview"),
        }
    }
}

/// Inputs that accept typed text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Input {
    /// Shared editor for whichever text slot is selected.
    TextEditor,
    SetSymbolUrl,
    Collector(CollectorField),
}

/// Whether typing replaces the field content or appends to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    Append,
    Replace,
}

/// Progress notifications for an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    InProgress { received: u64, total: Option<u64> },
    Completed { path: PathBuf },
    Canceled,
}

/// Session with a remote card creator.
///
/// Implementations own their transport (browser automation, remote protocol);
/// callers bound every call with their own timeout, so an implementation may
/// wait as long as it likes.
#[async_trait]
pub trait RenderSurface: Send {
    async fn select(&mut self, control: Control) -> ForgeResult<()>;

    /// Resolve once `control` is visible.
    async fn wait_visible(&mut self, control: Control) -> ForgeResult<()>;

    async fn set_text(&mut self, input: Input, value: &str, mode: EntryMode) -> ForgeResult<()>;

    async fn press_enter(&mut self, input: Input) -> ForgeResult<()>;

    /// Drop any file previously chosen in an upload control.
    async fn clear_file(&mut self, control: Control) -> ForgeResult<()>;

    async fn upload_file(&mut self, control: Control, path: &Path) -> ForgeResult<()>;

    async fn trigger_download(&mut self) -> ForgeResult<()>;

    /// Next event of the export started by [`RenderSurface::trigger_download`].
    async fn next_download_event(&mut self) -> ForgeResult<DownloadEvent>;

    /// Return the creator to a fresh session.
    async fn reset(&mut self) -> ForgeResult<()>;
}

/// Run `fut`, failing with [`ForgeError::SurfaceTimeout`] once `limit` elapses.
pub async fn bounded<T, F, D>(limit: Duration, what: D, fut: F) -> ForgeResult<T>
where
    F: Future<Output = ForgeResult<T>>,
    D: FnOnce() -> String,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ForgeError::SurfaceTimeout {
            what: what(),
            waited: limit,
        }),
    }
}

/// Wait for the current export to finish, folding the event stream into one result.
pub async fn await_download<S>(surface: &mut S, name: &str, limit: Duration) -> ForgeResult<PathBuf>
where
    S: RenderSurface + ?Sized,
{
    let events = async {
        loop {
            match surface.next_download_event().await? {
                DownloadEvent::InProgress { received, total } => {
                    tracing::trace!(name, received, ?total, "download progress");
                }
                DownloadEvent::Completed { path } => return Ok(path),
                DownloadEvent::Canceled => {
                    return Err(ForgeError::DownloadCanceled {
                        name: name.to_string(),
                    });
                }
            }
        }
    };
    bounded(limit, || format!("download of '{}'", name), events).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fake::{Call, DownloadScript, ScriptedSurface};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn bounded_passes_results_through() {
        let value = bounded(Duration::from_secs(1), || "noop".into(), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn bounded_names_what_it_waited_for() {
        let err = bounded(
            Duration::from_millis(20),
            || "art preview".into(),
            std::future::pending::<ForgeResult<()>>(),
        )
        .await
        .unwrap_err();
        match err {
            ForgeError::SurfaceTimeout { what, waited } => {
                assert_eq!(what, "art preview");
                assert_eq!(waited, Duration::from_millis(20));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn download_completes_after_progress_events() {
        let dir = tempfile::tempdir().unwrap();
        let mut surface = ScriptedSurface::new(dir.path(), vec![DownloadScript::Complete]);
        surface.trigger_download().await.unwrap();

        let path = await_download(&mut surface, "", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(path, dir.path().join(".png"));
        assert_eq!(surface.calls(), &[Call::Download]);
    }

    #[tokio::test]
    async fn canceled_download_names_the_unit() {
        let dir = tempfile::tempdir().unwrap();
        let mut surface = ScriptedSurface::new(dir.path(), vec![DownloadScript::Cancel]);
        surface.trigger_download().await.unwrap();

        let err = await_download(&mut surface, "Shock", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::DownloadCanceled { ref name } if name == "Shock"));
    }

    #[tokio::test]
    async fn silent_download_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut surface = ScriptedSurface::new(dir.path(), vec![DownloadScript::Stall]);
        surface.trigger_download().await.unwrap();

        let err = await_download(&mut surface, "Shock", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::SurfaceTimeout { .. }));
    }

    #[test]
    fn controls_display_for_log_lines() {
        assert_eq!(Control::Tab(Tab::SetSymbol).to_string(), "SetSymbol tab");
        assert_eq!(Control::FrameOption(FrameOption(6)).to_string(), "frame option 6");
    }
}
