use std::path::PathBuf;

const ART_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Artwork directory with files named after the card's sequence number.
#[derive(Debug, Clone)]
pub struct ArtLibrary {
    dir: PathBuf,
}

impl ArtLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// First existing `<seq>.<ext>`; missing art is not an error.
    pub async fn find(&self, seq: u32) -> Option<PathBuf> {
        for ext in ART_EXTENSIONS {
            let candidate = self.dir.join(format!("{}.{}", seq, ext));
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }
}
