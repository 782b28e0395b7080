use serde::Serialize;
use std::collections::BTreeMap;

use super::cut::CutId;
use super::media::MimeKind;
use super::reference::MediaReference;

/// A cut whose video reference was rewritten by a repair sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairedCut {
    pub previous: MediaReference,
    pub current: MediaReference,
    pub healed_type: MimeKind,
    pub size_bytes: usize,
    /// Payload was located through the legacy key search rather than the
    /// recorded reference.
    pub recovered_by_fallback: bool,
}

/// Result of one repair sweep. Not persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairReport {
    pub repaired: BTreeMap<CutId, RepairedCut>,
    pub failed: BTreeMap<CutId, String>,
    pub skipped_confirmed: Vec<CutId>,
    /// A quota/auth failure stopped the sweep before every cut was visited.
    pub aborted: bool,
    pub cancelled: bool,
    pub messages: Vec<String>,
}

impl RepairReport {
    /// Number of successful repairs.
    pub fn count(&self) -> usize {
        self.repaired.len()
    }

    pub fn summary(&self) -> String {
        let mut text = format!("Repaired {} cut(s)", self.count());
        if !self.failed.is_empty() {
            text.push_str(&format!(", {} failed", self.failed.len()));
        }
        if self.aborted {
            text.push_str(" (aborted)");
        } else if self.cancelled {
            text.push_str(" (cancelled)");
        }
        text
    }
}
