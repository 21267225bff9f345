//! Core abstractions for postfx.
//!
//! This crate provides the GPU-agnostic half of the post-processing stack:
//! - [`EffectComposer`], the ordered pass chain executed once per frame
//! - [`Pass`] and [`Effect`] traits implemented by rendering backends
//! - [`EffectPass`], which composites a list of effects into a single pass
//! - [`ComposerLifecycle`], which maps mount/resize/rebuild/unmount events onto the composer
//! - [`FrameScheduler`] and [`FrameClock`] for driving per-frame callbacks

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod composer;
pub mod effect;
pub mod effect_pass;
pub mod error;
pub mod lifecycle;
pub mod options;
pub mod pass;
pub mod scheduler;
pub mod size;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{Backend, Binding, PassFactory};
pub use composer::EffectComposer;
pub use effect::{Effect, EffectContext};
pub use effect_pass::EffectPass;
pub use error::{ComposerError, Result};
pub use lifecycle::{ComposerContext, ComposerLifecycle, LifecycleState};
pub use options::ComposerOptions;
pub use pass::{Pass, PassId, PassKind};
pub use scheduler::{FrameClock, FrameScheduler, SubscriptionId};
pub use size::{FrameBufferType, Size};
