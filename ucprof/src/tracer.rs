//! The hook pair and the channel it writes to.
//!
//! Hooks run on every instrumented call, so they never allocate, never log and never report
//! failure. A record is either written in full under the channel lock, truncated by the
//! transport's overflow policy, or not produced at all when called from an interrupt handler.

use core::ffi::c_void;

use crate::config::ChannelConfig;
use crate::error::Error;
use crate::port::Platform;
#[cfg(feature = "enabled")]
use crate::record::Record;
use crate::record::EventKind;
#[cfg(feature = "enabled")]
use crate::transport::ChannelLock;
use crate::transport::Transport;

pub struct Tracer<T, P> {
    transport: T,
    platform: P,
    config: ChannelConfig,
}

impl<T, P> Tracer<T, P> {
    pub const fn new(transport: T, platform: P, config: ChannelConfig) -> Self {
        Tracer {
            transport,
            platform,
            config,
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }
}

impl<T: Transport, P: Platform> Tracer<T, P> {
    /// Records that `this_fn` was entered. `call_site` is accepted for the instrumentation ABI
    /// but not recorded.
    #[inline]
    pub fn on_enter(&self, this_fn: *const c_void, call_site: *const c_void) {
        let _ = call_site;
        self.emit(EventKind::Enter, this_fn);
    }

    /// Records that `this_fn` returned.
    #[inline]
    pub fn on_exit(&self, this_fn: *const c_void, call_site: *const c_void) {
        let _ = call_site;
        self.emit(EventKind::Exit, this_fn);
    }

    cfg_if::cfg_if! {
        if #[cfg(feature = "enabled")] {
            /// Binds `buffer` to the configured channel. Call once, before any traced function
            /// runs.
            ///
            /// The buffer belongs to the channel for the rest of the session. A buffer too small
            /// for a single record is accepted: records are then truncated at runtime, which is
            /// not a configuration error.
            pub fn init(&self, buffer: &'static mut [u8]) -> Result<(), Error> {
                log::debug!(
                    "binding up channel {} ({:?}) to {} byte buffer, {:?} on overflow",
                    self.config.index,
                    self.config.name,
                    buffer.len(),
                    self.config.policy
                );
                self.transport.configure(&self.config, buffer).map_err(|err| {
                    log::error!("cannot bind up channel {}: {}", self.config.index, err);
                    err
                })
            }

            fn emit(&self, kind: EventKind, this_fn: *const c_void) {
                // The lock is not interrupt safe and ISRs must stay short.
                if self.platform.in_interrupt() {
                    return;
                }

                let channel = ChannelLock::acquire(&self.transport, self.config.index);
                // Sampled under the lock, so stream order and timestamp order agree.
                let record = Record {
                    kind,
                    timestamp: self.platform.now(),
                    context: self.platform.current_context_id(),
                    function: this_fn as usize,
                };
                // Truncated or dropped writes are accepted under load.
                let _ = channel.write(&record.encode());
            }
        } else {
            /// Tracing is compiled out: always succeeds and leaves the transport alone.
            pub fn init(&self, buffer: &'static mut [u8]) -> Result<(), Error> {
                let _ = buffer;
                Ok(())
            }

            #[inline(always)]
            fn emit(&self, _kind: EventKind, _this_fn: *const c_void) {}
        }
    }
}
