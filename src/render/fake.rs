//! Scripted in-memory surface for exercising the orchestrator.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{ForgeError, ForgeResult};
use crate::render::surface::{
    Control, DownloadEvent, EntryMode, Half, Input, RenderSurface, TextSlot,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Select(Control),
    Wait(Control),
    Text(Input, String, EntryMode),
    Enter(Input),
    ClearFile,
    Upload(PathBuf),
    Download,
    Reset,
}

/// How the next triggered download plays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadScript {
    Complete,
    Cancel,
    Stall,
}

pub struct ScriptedSurface {
    download_dir: PathBuf,
    scripts: VecDeque<DownloadScript>,
    events: VecDeque<DownloadEvent>,
    calls: Vec<Call>,
    slot: Option<(Half, TextSlot)>,
    title: String,
    stall: Option<Control>,
    export_name: Option<String>,
    failing_resets: usize,
}

impl ScriptedSurface {
    pub fn new(download_dir: &Path, scripts: Vec<DownloadScript>) -> Self {
        Self {
            download_dir: download_dir.to_path_buf(),
            scripts: scripts.into(),
            events: VecDeque::new(),
            calls: Vec::new(),
            slot: None,
            title: String::new(),
            stall: None,
            export_name: None,
            failing_resets: 0,
        }
    }

    /// Never report `control` as visible the first time it is awaited.
    pub fn stall_once(mut self, control: Control) -> Self {
        self.stall = Some(control);
        self
    }

    /// Always export to `file_name` instead of `<title>.png`.
    pub fn exports_to(mut self, file_name: &str) -> Self {
        self.export_name = Some(file_name.to_string());
        self
    }

    /// Refuse the next `count` resets.
    pub fn failing_resets(mut self, count: usize) -> Self {
        self.failing_resets = count;
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }
}

#[async_trait]
impl RenderSurface for ScriptedSurface {
    async fn select(&mut self, control: Control) -> ForgeResult<()> {
        if let Control::TextSlot(half, slot) = control {
            self.slot = Some((half, slot));
        }
        self.calls.push(Call::Select(control));
        Ok(())
    }

    async fn wait_visible(&mut self, control: Control) -> ForgeResult<()> {
        self.calls.push(Call::Wait(control));
        if self.stall == Some(control) {
            self.stall = None;
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn set_text(&mut self, input: Input, value: &str, mode: EntryMode) -> ForgeResult<()> {
        if input == Input::TextEditor && self.slot == Some((Half::Top, TextSlot::Title)) {
            match mode {
                EntryMode::Replace => self.title = value.to_string(),
                EntryMode::Append => self.title.push_str(value),
            }
        }
        self.calls.push(Call::Text(input, value.to_string(), mode));
        Ok(())
    }

    async fn press_enter(&mut self, input: Input) -> ForgeResult<()> {
        self.calls.push(Call::Enter(input));
        Ok(())
    }

    async fn clear_file(&mut self, _control: Control) -> ForgeResult<()> {
        self.calls.push(Call::ClearFile);
        Ok(())
    }

    async fn upload_file(&mut self, _control: Control, path: &Path) -> ForgeResult<()> {
        self.calls.push(Call::Upload(path.to_path_buf()));
        Ok(())
    }

    async fn trigger_download(&mut self) -> ForgeResult<()> {
        self.calls.push(Call::Download);
        match self.scripts.pop_front() {
            Some(DownloadScript::Complete) => {
                let file_name = match &self.export_name {
                    Some(name) => name.clone(),
                    None => format!("{}.png", self.title),
                };
                let path = self.download_dir.join(file_name);
                std::fs::create_dir_all(&self.download_dir).ok();
                std::fs::write(&path, b"png").ok();
                self.events.push_back(DownloadEvent::InProgress {
                    received: 1,
                    total: Some(3),
                });
                self.events.push_back(DownloadEvent::Completed { path });
            }
            Some(DownloadScript::Cancel) => {
                self.events.push_back(DownloadEvent::InProgress {
                    received: 1,
                    total: None,
                });
                self.events.push_back(DownloadEvent::Canceled);
            }
            Some(DownloadScript::Stall) | None => {}
        }
        Ok(())
    }

    async fn next_download_event(&mut self) -> ForgeResult<DownloadEvent> {
        match self.events.pop_front() {
            Some(event) => Ok(event),
            None => std::future::pending().await,
        }
    }

    async fn reset(&mut self) -> ForgeResult<()> {
        self.calls.push(Call::Reset);
        if self.failing_resets > 0 {
            self.failing_resets -= 1;
            return Err(ForgeError::Surface("reset refused".into()));
        }
        self.events.clear();
        self.slot = None;
        self.title.clear();
        Ok(())
    }
}
