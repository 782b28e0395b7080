pub mod cut;
pub mod media;
pub mod reference;
pub mod repair;
pub mod status;

pub use cut::{
    AudioSourceSelection, Cut, CutId, CutPatch, DurationMaster, ProjectId, TrimWindow, VolumeMap,
};
pub use media::{is_generic_mime, MediaKind, MimeKind};
pub use reference::{decode_embedded, MediaReference, StoreHandle};
pub use repair::{RepairReport, RepairedCut};
pub use status::{LoadState, VideoClipStatus};
