//! ucprof for C firmware.
//!
//! Exports `ucprof_init` and the `-finstrument-functions` hooks
//! (`__cyg_profile_func_enter`/`__cyg_profile_func_exit`). The firmware provides the
//! `ucprof_port_*` functions declared in `include/ucprof.h`, usually thin wrappers around
//! `SEGGER_RTT_ConfigUpBuffer`, `SEGGER_RTT_LOCK`/`UNLOCK`, `SEGGER_RTT_WriteNoLock`, the
//! SystemView timestamp, `xTaskGetCurrentTaskHandle` and `xPortIsInsideInterrupt`.
//! Port functions must be compiled without `-finstrument-functions`, or every hook recurses.
#![cfg_attr(target_os = "none", no_std)]

use core::ffi::{c_char, c_int, c_uint, c_void};

use ucprof::{
    ChannelConfig, ChannelIndex, ContextSource, Error, InterruptProbe, TimeSource, Tracer,
    Transport,
};

extern "C" {
    fn ucprof_port_config_up_buffer(
        index: c_uint,
        name: *const c_char,
        buffer: *mut c_void,
        size: c_uint,
        flags: c_uint,
    ) -> c_int;
    fn ucprof_port_lock();
    fn ucprof_port_unlock();
    fn ucprof_port_write_no_lock(index: c_uint, data: *const c_void, len: c_uint) -> c_uint;
    fn ucprof_port_timestamp() -> u32;
    fn ucprof_port_current_task() -> *mut c_void;
    fn ucprof_port_in_isr() -> c_int;
}

/// RTT up buffers behind the port layer.
pub struct PortTransport;

impl Transport for PortTransport {
    fn configure(&self, config: &ChannelConfig, buffer: &'static mut [u8]) -> Result<(), Error> {
        let status = unsafe {
            ucprof_port_config_up_buffer(
                config.index,
                config.name.as_ptr(),
                buffer.as_mut_ptr() as *mut c_void,
                buffer.len() as c_uint,
                config.policy.flags(),
            )
        };
        if status < 0 {
            return Err(Error::Rejected { status });
        }
        Ok(())
    }

    // RTT has one lock for all channels.
    fn lock(&self, _channel: ChannelIndex) {
        unsafe { ucprof_port_lock() }
    }

    unsafe fn unlock(&self, _channel: ChannelIndex) {
        ucprof_port_unlock()
    }

    unsafe fn write_unlocked(&self, channel: ChannelIndex, data: &[u8]) -> usize {
        ucprof_port_write_no_lock(channel, data.as_ptr() as *const c_void, data.len() as c_uint)
            as usize
    }
}

/// Clock, task handle and ISR probe behind the port layer.
pub struct RtosPort;

impl TimeSource for RtosPort {
    fn now(&self) -> u32 {
        unsafe { ucprof_port_timestamp() }
    }
}

impl ContextSource for RtosPort {
    fn current_context_id(&self) -> u32 {
        // Task handles are addresses. The record keeps the low 32 bits.
        unsafe { ucprof_port_current_task() as usize as u32 }
    }
}

impl InterruptProbe for RtosPort {
    fn in_interrupt(&self) -> bool {
        unsafe { ucprof_port_in_isr() != 0 }
    }
}

static TRACER: Tracer<PortTransport, RtosPort> =
    Tracer::new(PortTransport, RtosPort, ChannelConfig::DEFAULT);

cfg_if::cfg_if! {
    if #[cfg(feature = "enabled")] {
        static BUFFER: ucprof::ChannelBuffer<{ ucprof::config::BUFFER_SIZE }> =
            ucprof::ChannelBuffer::new();

        /// Binds the trace channel. Call once, before the first instrumented function runs.
        ///
        /// Returns `0` on success and a negative status on failure. A repeated call fails
        /// without touching the channel that is already bound.
        #[no_mangle]
        pub extern "C" fn ucprof_init() -> c_int {
            let buffer = match BUFFER.take() {
                Some(buffer) => buffer,
                None => {
                    log::warn!("ucprof_init called more than once");
                    return Error::BufferTaken.status();
                }
            };
            match TRACER.init(buffer) {
                Ok(()) => 0,
                Err(err) => err.status(),
            }
        }
    } else {
        /// Tracing is compiled out: always `0`.
        #[no_mangle]
        pub extern "C" fn ucprof_init() -> c_int {
            0
        }
    }
}

#[no_mangle]
pub extern "C" fn __cyg_profile_func_enter(this_fn: *mut c_void, call_site: *mut c_void) {
    TRACER.on_enter(this_fn, call_site);
}

#[no_mangle]
pub extern "C" fn __cyg_profile_func_exit(this_fn: *mut c_void, call_site: *mut c_void) {
    TRACER.on_exit(this_fn, call_site);
}

// Need our own panic handler when linked as a bare-metal staticlib.
#[cfg(all(target_os = "none", feature = "panic-handler"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[cfg(test)]
mod tests {
    //! Stands in for the firmware's port layer.

    use super::*;
    use std::ffi::CStr;
    use std::ptr;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    static CONFIGURED: Mutex<Vec<(u32, String, usize, u32)>> = Mutex::new(Vec::new());
    static WRITTEN: Mutex<Vec<u8>> = Mutex::new(Vec::new());
    static LOCKED: AtomicBool = AtomicBool::new(false);
    static IN_ISR: AtomicBool = AtomicBool::new(false);
    static TICK: AtomicU32 = AtomicU32::new(0);
    static LOCKS: AtomicU32 = AtomicU32::new(0);

    #[no_mangle]
    extern "C" fn ucprof_port_config_up_buffer(
        index: c_uint,
        name: *const c_char,
        _buffer: *mut c_void,
        size: c_uint,
        flags: c_uint,
    ) -> c_int {
        let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
        CONFIGURED
            .lock()
            .unwrap()
            .push((index, name, size as usize, flags));
        0
    }

    #[no_mangle]
    extern "C" fn ucprof_port_lock() {
        assert!(!LOCKED.swap(true, Ordering::SeqCst));
        LOCKS.fetch_add(1, Ordering::SeqCst);
    }

    #[no_mangle]
    extern "C" fn ucprof_port_unlock() {
        assert!(LOCKED.swap(false, Ordering::SeqCst));
    }

    #[no_mangle]
    extern "C" fn ucprof_port_write_no_lock(
        _index: c_uint,
        data: *const c_void,
        len: c_uint,
    ) -> c_uint {
        assert!(LOCKED.load(Ordering::SeqCst));
        let data = unsafe { std::slice::from_raw_parts(data as *const u8, len as usize) };
        WRITTEN.lock().unwrap().extend_from_slice(data);
        len
    }

    #[no_mangle]
    extern "C" fn ucprof_port_timestamp() -> u32 {
        TICK.load(Ordering::SeqCst)
    }

    #[no_mangle]
    extern "C" fn ucprof_port_current_task() -> *mut c_void {
        7 as *mut c_void
    }

    #[no_mangle]
    extern "C" fn ucprof_port_in_isr() -> c_int {
        IN_ISR.load(Ordering::SeqCst) as c_int
    }

    #[cfg(feature = "enabled")]
    fn configured(index: u32) -> Vec<(u32, String, usize, u32)> {
        CONFIGURED
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.0 == index)
            .cloned()
            .collect()
    }

    #[cfg(feature = "enabled")]
    #[test]
    fn channel_name_reaches_the_port() {
        let index = ucprof::config::CHANNEL_INDEX + 1;
        let config = ChannelConfig {
            index,
            name: c"other",
            policy: ucprof::OverflowPolicy::Skip,
        };
        PortTransport
            .configure(&config, vec![0u8; 32].leak())
            .unwrap();

        assert_eq!(
            configured(index),
            [(index, String::from("other"), 32, ucprof::OverflowPolicy::Skip.flags())]
        );
    }

    // One test drives the whole session: the port state above is process wide.
    #[cfg(feature = "enabled")]
    #[test]
    fn session() {
        use ucprof::{EventKind, Record};

        assert_eq!(ucprof_init(), 0);
        assert_eq!(
            configured(ucprof::config::CHANNEL_INDEX),
            [(
                ucprof::config::CHANNEL_INDEX,
                String::from("ucprof"),
                ucprof::config::BUFFER_SIZE,
                ucprof::OverflowPolicy::Trim.flags()
            )]
        );

        assert!(ucprof_init() < 0);
        assert_eq!(configured(ucprof::config::CHANNEL_INDEX).len(), 1);

        let this_fn = 0x2000 as *mut c_void;
        TICK.store(100, Ordering::SeqCst);
        __cyg_profile_func_enter(this_fn, ptr::null_mut());
        TICK.store(105, Ordering::SeqCst);
        __cyg_profile_func_exit(this_fn, ptr::null_mut());

        IN_ISR.store(true, Ordering::SeqCst);
        __cyg_profile_func_enter(this_fn, ptr::null_mut());
        IN_ISR.store(false, Ordering::SeqCst);

        let enter = Record {
            kind: EventKind::Enter,
            timestamp: 100,
            context: 7,
            function: 0x2000,
        };
        let exit = Record {
            kind: EventKind::Exit,
            timestamp: 105,
            ..enter
        };
        let mut expected = enter.encode().to_vec();
        expected.extend_from_slice(&exit.encode());
        assert_eq!(*WRITTEN.lock().unwrap(), expected);
        assert_eq!(LOCKS.load(Ordering::SeqCst), 2);
        assert!(!LOCKED.load(Ordering::SeqCst));
    }

    #[cfg(not(feature = "enabled"))]
    #[test]
    fn compiled_out() {
        assert_eq!(ucprof_init(), 0);
        assert_eq!(ucprof_init(), 0);

        __cyg_profile_func_enter(0x2000 as *mut c_void, ptr::null_mut());
        __cyg_profile_func_exit(0x2000 as *mut c_void, ptr::null_mut());

        assert!(CONFIGURED.lock().unwrap().is_empty());
        assert!(WRITTEN.lock().unwrap().is_empty());
        assert_eq!(LOCKS.load(Ordering::SeqCst), 0);
    }
}
