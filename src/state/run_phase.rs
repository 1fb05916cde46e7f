/// Run phase definitions for tracking the progress of one mirror run
use std::fmt;

/// The phase a run is in
///
/// A run moves strictly forward:
/// `Pending → Crawling(0) → … → Crawling(n) → DownloadingAssets → Archiving → Done`.
/// Crawling may end early at any depth when the frontier runs dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Run directory created, nothing fetched yet
    Pending,

    /// Pages at the given depth are being fetched
    Crawling { depth: u32 },

    /// Crawl finished; collected assets are being downloaded
    DownloadingAssets,

    /// Output tree is being packaged
    Archiving,

    /// Archive written, manifest built
    Done,
}

impl RunPhase {
    /// Returns true if the run has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if a transition from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        match (self, next) {
            (Self::Pending, Self::Crawling { depth: 0 }) => true,
            (Self::Crawling { depth }, Self::Crawling { depth: next_depth }) => {
                next_depth == depth + 1
            }
            (Self::Pending | Self::Crawling { .. }, Self::DownloadingAssets) => true,
            (Self::DownloadingAssets, Self::Archiving) => true,
            (Self::Archiving, Self::Done) => true,
            _ => false,
        }
    }

    /// Short label used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Crawling { .. } => "crawling",
            Self::DownloadingAssets => "downloading_assets",
            Self::Archiving => "archiving",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crawling { depth } => write!(f, "crawling(depth={})", depth),
            other => f.write_str(other.label()),
        }
    }
}
