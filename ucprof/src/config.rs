//! Compile-time configuration.
//!
//! `BUFFER_SIZE` and `CHANNEL_INDEX` are generated by the build script and can be overridden
//! with the `UCPROF_BUFFER_SIZE` and `UCPROF_CHANNEL` environment variables at build time.

use core::ffi::CStr;

use crate::transport::{ChannelIndex, OverflowPolicy};

include!(concat!(env!("OUT_DIR"), "/config.rs"));

/// Name the up channel is registered under. Host tools look it up by this name.
///
/// NUL terminated, so it can be handed to the C side as is.
pub const CHANNEL_NAME: &CStr = c"ucprof";

/// Everything needed to bind the trace channel, apart from the buffer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub index: ChannelIndex,
    pub name: &'static CStr,
    pub policy: OverflowPolicy,
}

impl ChannelConfig {
    /// Configured channel index and name, never blocking on a full buffer.
    pub const DEFAULT: ChannelConfig = ChannelConfig {
        index: CHANNEL_INDEX,
        name: CHANNEL_NAME,
        policy: OverflowPolicy::Trim,
    };

    pub const fn with_index(mut self, index: ChannelIndex) -> Self {
        self.index = index;
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
