//! Overlay synchronization
//!
//! An overlay is one absolutely positioned container inserted next to the
//! target element, holding one outlined text block per OCR block. The
//! geometry is recomputed from the current [`Document`](crate::dom::Document)
//! whenever an event the session registered for arrives.
//!
//! - [`layout`]: pure placement math (container offset, block percentages, font scaling)
//! - [`session`]: typed keys and the registrations of one attach call
//! - [`surface`]: the write side, either the live page or an in-memory map
//! - [`synchronizer`]: attach / recompute / detach

pub mod layout;
pub mod session;
pub mod surface;
pub mod synchronizer;

pub use layout::{BlockLayout, ContainerLayout, OverlayLayout, TextFlow};
pub use session::{BlockKey, ContainerKey, OverlaySession, Registration, SessionId};
pub use surface::{BlockContent, BlockPatch, MemorySurface, OverlayPatch, OverlaySurface, RenderedOverlay};
pub use synchronizer::OverlaySynchronizer;
