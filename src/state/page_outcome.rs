/// Outcome definitions for one page unit of work
use std::fmt;

/// What happened to a page dispatched to a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    // ===== Success =====
    /// Page was fetched, rewritten and written to disk
    Saved,

    // ===== Skips (never fetched) =====
    /// Another worker already claimed this URL
    AlreadyVisited,

    /// Page lies deeper than the configured maximum
    DepthExceeded,

    // ===== Skips (fetched, nothing kept) =====
    /// Neither strategy returned usable content
    NoContent,

    /// Content-Type is not HTML
    NotHtml,

    // ===== Errors =====
    /// Rewriting the markup failed
    RewriteFailed,

    /// Writing the page to disk failed
    WriteFailed,
}

impl PageOutcome {
    /// Returns true if the page ended up in the output tree
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved)
    }

    /// Returns true if the page was passed over without an error
    ///
    /// Covers pages never fetched and pages whose content was not worth keeping.
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::AlreadyVisited | Self::DepthExceeded | Self::NoContent | Self::NotHtml
        )
    }

    /// Returns true if processing a usable page failed
    pub fn is_error(&self) -> bool {
        matches!(self, Self::RewriteFailed | Self::WriteFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::AlreadyVisited => "already_visited",
            Self::DepthExceeded => "depth_exceeded",
            Self::NoContent => "no_content",
            Self::NotHtml => "not_html",
            Self::RewriteFailed => "rewrite_failed",
            Self::WriteFailed => "write_failed",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
