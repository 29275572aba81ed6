//! Task watchdog (TWDT) subscription for the control-loop task.
//!
//! A watering blocks the loop for `watering_duration_ms`, so the timeout
//! must exceed one watering plus one loop interval.  The config store
//! rejects settings that break this.
//!
//! Feed once per loop iteration.  Dropping the handle unsubscribes the task.

use core::cell::Cell;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
use log::{info, warn};

pub struct Watchdog {
    timeout_ms: u32,
    subscribed: bool,
    feeds: Cell<u32>,
}

impl Watchdog {
    /// Reconfigure the TWDT to `timeout_ms` (panic on expiry) and subscribe
    /// the calling task.  Failure to subscribe is logged, not fatal.
    pub fn new(timeout_ms: u32) -> Self {
        let subscribed = Self::subscribe(timeout_ms);
        if subscribed {
            info!("watchdog: {}ms, panic on expiry", timeout_ms);
        } else {
            warn!("watchdog: not subscribed, loop stalls will go unnoticed");
        }
        Self {
            timeout_ms,
            subscribed,
            feeds: Cell::new(0),
        }
    }

    #[cfg(target_os = "espidf")]
    fn subscribe(timeout_ms: u32) -> bool {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: plain FFI calls with a config that outlives them.
        unsafe {
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK as i32 {
                warn!("watchdog: reconfigure returned {}", ret);
            }
            esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK as i32
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn subscribe(_timeout_ms: u32) -> bool {
        true
    }

    pub fn feed(&self) {
        if !self.subscribed {
            return;
        }
        #[cfg(target_os = "espidf")]
        {
            unsafe {
                esp_task_wdt_reset();
            }
        }
        self.feeds.set(self.feeds.get().wrapping_add(1));
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Feeds since subscription.
    pub fn feeds(&self) -> u32 {
        self.feeds.get()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: removes the calling task, which was added in `new`.
                unsafe {
                    esp_task_wdt_delete(core::ptr::null_mut());
                }
            }
        }
    }
}
