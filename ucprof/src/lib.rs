//! Function entry/exit tracer for RTOS targets.
//!
//! Every instrumented function calls [`Tracer::on_enter`] before its body and [`Tracer::on_exit`]
//! after it returns. Each call emits one fixed-size [`Record`] (label, timestamp, context,
//! function address) into an RTT-style up channel, where a host tool drains it and rebuilds a
//! call timeline per context.
//!
//! The crate does not own the transport, the clock or the scheduler. They are reached through
//! [`Transport`] and the [`port`] traits, so the same hook logic runs against SEGGER RTT and
//! FreeRTOS on a target (see the `ucprof-ffi` crate), or against [`rtt::UpChannels`] and a mock
//! platform in tests.
//!
//! Rust has no automatic equivalent of `-finstrument-functions`: code built with it links
//! against the `__cyg_profile_func_*` symbols exported by `ucprof-ffi`, everything else calls
//! the hook pair by hand at function boundaries.
#![no_std]

#[cfg(test)]
extern crate std;

pub mod buffer;
pub mod config;
mod error;
pub mod port;
pub mod record;
pub mod rtt;
pub mod tracer;
pub mod transport;

pub use buffer::ChannelBuffer;
pub use config::ChannelConfig;
pub use error::Error;
pub use port::{ContextSource, InterruptProbe, Platform, TimeSource};
pub use record::{EventKind, Record, RECORD_SIZE};
pub use tracer::Tracer;
pub use transport::{ChannelIndex, OverflowPolicy, Transport};
