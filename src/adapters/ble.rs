//! BLE link adapter.
//!
//! Implements [`LinkPort`]: the GATT peripheral the companion app talks to
//! for reading sensor values and pushing trained models.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                      | Perms | Payload                 |
//! |----------------|---------------------------|-------|-------------------------|
//! | Moisture       | `00001000-0000-1000-8000-00805f9b34fb` | Read  | `"41.25"` (%)  |
//! | Temperature    | `00002000-0000-1000-8000-00805f9b34fb` | Read  | `"22.90"` (°C) |
//! | Model          | `00003000-0000-1000-8000-00805f9b34fb` | Write | ≤ 512-byte fragment |
//!
//! The companion app finds characteristics by UUID prefix, so only the
//! first 32 bits are load-bearing.
//!
//! ## Callback bridge
//!
//! Bluedroid callbacks run in the Bluedroid task and cannot capture Rust
//! state.  They only copy a model write into [`LinkShared`] and flip the
//! connection flag; [`BleLink`] drains that from the main loop.

use core::fmt::Write as _;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use log::{debug, info, warn};

use crate::app::ports::{Fragment, LinkPort};
use crate::error::CommsError;
use crate::model::MAX_FRAGMENT_LEN;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x00000100_0000_1000_8000_00805f9b34fb;
pub const CHAR_MOISTURE: u128 = 0x00001000_0000_1000_8000_00805f9b34fb;
pub const CHAR_TEMPERATURE: u128 = 0x00002000_0000_1000_8000_00805f9b34fb;
pub const CHAR_MODEL: u128 = 0x00003000_0000_1000_8000_00805f9b34fb;

/// Fragments buffered between two control cycles.
pub const FRAGMENT_QUEUE_DEPTH: usize = 8;

/// Longest encoded reading, e.g. `"-1234567.89"`.
pub const READING_MAX_LEN: usize = 16;

pub type Reading = heapless::String<READING_MAX_LEN>;

/// Render a reading the way the companion app parses it: two decimals.
pub fn encode_reading(value: f32) -> Reading {
    let mut out = Reading::new();
    if write!(out, "{:.2}", value).is_err() {
        // Out of range for the characteristic; publish an unparsable value
        // rather than a truncated number.
        out.clear();
        let _ = out.push_str("nan");
    }
    out
}

// ───────────────────────────────────────────────────────────────
// Shared state between Bluedroid callbacks and the main loop
// ───────────────────────────────────────────────────────────────

pub struct LinkShared {
    connected: AtomicBool,
    /// Set when a write was lost after the peer saw it acknowledged.
    interrupted: AtomicBool,
    fragments: Mutex<heapless::Deque<Fragment, FRAGMENT_QUEUE_DEPTH>>,
}

impl LinkShared {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
            fragments: Mutex::new(heapless::Deque::new()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
        if !connected {
            // A half-delivered transfer is not resumed across connections.
            self.interrupt();
        }
    }

    /// Drop everything queued and flag the transfer in flight as broken.
    fn interrupt(&self) {
        if let Ok(mut q) = self.fragments.lock() {
            q.clear();
        }
        self.interrupted.store(true, Ordering::Release);
    }

    /// Whether a transfer was interrupted since the last call.
    pub fn take_interrupted(&self) -> bool {
        self.interrupted.swap(false, Ordering::AcqRel)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Queue one write to the model characteristic.
    ///
    /// The GATT layer has already acknowledged the write, so a rejected
    /// fragment leaves a hole in the transfer.  Rejection clears the queue
    /// and raises [`take_interrupted`](Self::take_interrupted) so the
    /// controller restarts reassembly instead of splicing the peer's next
    /// transfer onto stale bytes.
    pub fn on_model_write(&self, data: &[u8]) -> Result<(), CommsError> {
        let Ok(fragment) = Fragment::from_slice(data) else {
            warn!(
                "BLE: model write of {} bytes exceeds {}",
                data.len(),
                MAX_FRAGMENT_LEN
            );
            self.interrupt();
            return Err(CommsError::FragmentTooLong);
        };
        let pushed = match self.fragments.lock() {
            Ok(mut q) => q.push_back(fragment).is_ok(),
            Err(_) => false,
        };
        if !pushed {
            warn!("BLE: fragment queue full, dropping {} bytes", data.len());
            self.interrupt();
            return Err(CommsError::FragmentQueueFull);
        }
        Ok(())
    }

    fn pop(&self) -> Option<Fragment> {
        self.fragments.lock().ok()?.pop_front()
    }

    pub fn queued(&self) -> usize {
        self.fragments.lock().map_or(0, |q| q.len())
    }
}

impl Default for LinkShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Instance the Bluedroid callbacks write into.
pub static LINK: LinkShared = LinkShared::new();

// ───────────────────────────────────────────────────────────────
// ESP-IDF GATT server
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
use core::sync::atomic::AtomicU32;

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_MOISTURE_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_TEMPERATURE_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_MODEL_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CHAR_STEP: AtomicU32 = AtomicU32::new(0);

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    unsafe {
        t.uuid.uuid128 = uuid.to_le_bytes();
    }
    t
}

#[cfg(target_os = "espidf")]
unsafe fn add_gatt_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32, max_len: u16) {
    use esp_idf_svc::sys::*;
    let mut char_uuid = uuid128_to_esp(uuid);
    let mut value = esp_attr_value_t {
        attr_max_len: max_len,
        attr_len: 0,
        attr_value: core::ptr::null_mut(),
    };
    let mut control = esp_attr_control_t {
        auto_rsp: ESP_GATT_AUTO_RSP as u8,
    };
    unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut char_uuid,
            perm as esp_gatt_perm_t,
            prop as esp_gatt_char_prop_t,
            &mut value,
            &mut control,
        );
    }
}

#[cfg(target_os = "espidf")]
unsafe fn start_advertising() {
    use esp_idf_svc::sys::*;
    let mut adv_params = esp_ble_adv_params_t {
        adv_int_min: 0x20,
        adv_int_max: 0x40,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        ..unsafe { core::mem::zeroed() }
    };
    unsafe {
        esp_ble_gap_start_advertising(&mut adv_params);
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising started");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    BLE_GATTS_IF.store(gatts_if as u32, Ordering::Relaxed);

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid128_to_esp(SERVICE_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            };
            unsafe {
                esp_ble_gatts_create_service(gatts_if, &mut svc_id, 8);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let svc_handle = unsafe { (*param).create.service_handle };
            BLE_SVC_HANDLE.store(svc_handle as u32, Ordering::Relaxed);
            log::info!("BLE GATTS: service created (handle={})", svc_handle);
            BLE_CHAR_STEP.store(1, Ordering::Relaxed);
            unsafe {
                esp_ble_gatts_start_service(svc_handle);
                add_gatt_char(
                    svc_handle,
                    CHAR_MOISTURE,
                    ESP_GATT_PERM_READ,
                    ESP_GATT_CHAR_PROP_BIT_READ,
                    READING_MAX_LEN as u16,
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let handle = unsafe { (*param).add_char.attr_handle };
            let svc_handle = BLE_SVC_HANDLE.load(Ordering::Relaxed) as u16;
            match BLE_CHAR_STEP.load(Ordering::Relaxed) {
                1 => {
                    BLE_MOISTURE_HANDLE.store(handle as u32, Ordering::Relaxed);
                    log::info!("BLE GATTS: moisture char (handle={})", handle);
                    BLE_CHAR_STEP.store(2, Ordering::Relaxed);
                    unsafe {
                        add_gatt_char(
                            svc_handle,
                            CHAR_TEMPERATURE,
                            ESP_GATT_PERM_READ,
                            ESP_GATT_CHAR_PROP_BIT_READ,
                            READING_MAX_LEN as u16,
                        );
                    }
                }
                2 => {
                    BLE_TEMPERATURE_HANDLE.store(handle as u32, Ordering::Relaxed);
                    log::info!("BLE GATTS: temperature char (handle={})", handle);
                    BLE_CHAR_STEP.store(3, Ordering::Relaxed);
                    unsafe {
                        add_gatt_char(
                            svc_handle,
                            CHAR_MODEL,
                            ESP_GATT_PERM_WRITE,
                            ESP_GATT_CHAR_PROP_BIT_WRITE,
                            MAX_FRAGMENT_LEN as u16,
                        );
                    }
                }
                3 => {
                    BLE_MODEL_HANDLE.store(handle as u32, Ordering::Relaxed);
                    BLE_CHAR_STEP.store(4, Ordering::Relaxed);
                    log::info!("BLE GATTS: model char (handle={}), all registered", handle);
                }
                _ => {}
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let conn_id = unsafe { (*param).connect.conn_id };
            log::info!("BLE GATTS: client connected (conn_id={})", conn_id);
            LINK.set_connected(true);
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            log::info!("BLE GATTS: client disconnected");
            LINK.set_connected(false);
            unsafe {
                start_advertising();
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            if p.handle as u32 == BLE_MODEL_HANDLE.load(Ordering::Relaxed) {
                let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
                let _ = LINK.on_model_write(data);
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Failed,
}

pub struct BleLink {
    state: BleState,
    shared: &'static LinkShared,
    device_name: heapless::String<{ crate::config::DEVICE_NAME_MAX }>,
    moisture: Reading,
    temperature: Reading,
}

impl BleLink {
    /// Adapter over the global callback bridge.
    pub fn new(device_name: &str) -> Self {
        Self::with_shared(device_name, &LINK)
    }

    /// Adapter over an explicit bridge; host tests use their own.
    pub fn with_shared(device_name: &str, shared: &'static LinkShared) -> Self {
        let mut name = heapless::String::new();
        for c in device_name.chars() {
            if name.push(c).is_err() {
                break;
            }
        }
        Self {
            state: BleState::Idle,
            shared,
            device_name: name,
            moisture: Reading::new(),
            temperature: Reading::new(),
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Last values handed to the read characteristics.
    pub fn published(&self) -> (&str, &str) {
        (self.moisture.as_str(), self.temperature.as_str())
    }

    pub fn start(&mut self) -> Result<(), CommsError> {
        info!("BLE: starting advertising as '{}'", self.device_name);
        match self.platform_start() {
            Ok(()) => {
                self.state = BleState::Advertising;
                Ok(())
            }
            Err(e) => {
                self.state = BleState::Failed;
                Err(e)
            }
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> Result<(), CommsError> {
        use esp_idf_svc::sys::*;
        unsafe {
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();

            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_init failed ({})", ret);
                return Err(CommsError::BleInitFailed);
            }
            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_enable failed ({})", ret);
                return Err(CommsError::BleInitFailed);
            }
            let ret = esp_bluedroid_init();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_init failed ({})", ret);
                return Err(CommsError::BleInitFailed);
            }
            let ret = esp_bluedroid_enable();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_enable failed ({})", ret);
                return Err(CommsError::BleInitFailed);
            }

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            esp_ble_gatts_app_register(0);
            // Room for a full 512-byte fragment in one write.
            esp_ble_gatt_set_local_mtu(517);

            let mut name: heapless::Vec<u8, { crate::config::DEVICE_NAME_MAX + 1 }> =
                heapless::Vec::new();
            let _ = name.extend_from_slice(self.device_name.as_bytes());
            let _ = name.push(0);
            esp_ble_gap_set_device_name(name.as_ptr() as *const _);

            start_advertising();
        }
        info!(
            "BLE(espidf): Bluedroid stack initialized, advertising as '{}'",
            self.device_name
        );
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> Result<(), CommsError> {
        info!(
            "BLE(sim): advertising '{}' (service {:032x})",
            self.device_name, SERVICE_UUID
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_set_readings(&mut self) {
        use esp_idf_svc::sys::*;
        for (handle, value) in [
            (&BLE_MOISTURE_HANDLE, &self.moisture),
            (&BLE_TEMPERATURE_HANDLE, &self.temperature),
        ] {
            let handle = handle.load(Ordering::Relaxed);
            if handle != 0 {
                unsafe {
                    esp_ble_gatts_set_attr_value(
                        handle as u16,
                        value.len() as u16,
                        value.as_ptr(),
                    );
                }
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_set_readings(&mut self) {
        debug!(
            "BLE(sim): moisture={} temperature={}",
            self.moisture, self.temperature
        );
    }
}

// ───────────────────────────────────────────────────────────────
// LinkPort implementation
// ───────────────────────────────────────────────────────────────

impl LinkPort for BleLink {
    fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    fn take_fragment(&mut self) -> Option<Fragment> {
        self.shared.pop()
    }

    fn take_transfer_interrupted(&mut self) -> bool {
        self.shared.take_interrupted()
    }

    fn publish_readings(&mut self, moisture: f32, temperature: f32) {
        self.moisture = encode_reading(moisture);
        self.temperature = encode_reading(temperature);
        self.platform_set_readings();
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
