//! ADC1 oneshot unit with a single configured channel.
//!
//! On ESP-IDF the unit handle is created in [`OneshotAdc::new`] and released
//! on drop.  On the host a conversion returns an injectable raw code so the
//! sensors above it run unchanged in tests.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
use log::info;

/// Largest 12-bit conversion result.
pub const FULL_SCALE: u16 = 4095;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcError {
    UnitInit(i32),
    ChannelConfig { channel: u32, rc: i32 },
    Read { channel: u32, rc: i32 },
}

impl core::fmt::Display for AdcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnitInit(rc) => write!(f, "ADC1 unit init failed (rc={})", rc),
            Self::ChannelConfig { channel, rc } => {
                write!(f, "ADC1 CH{} config failed (rc={})", channel, rc)
            }
            Self::Read { channel, rc } => write!(f, "ADC1 CH{} read failed (rc={})", channel, rc),
        }
    }
}

impl From<AdcError> for crate::error::Error {
    fn from(_: AdcError) -> Self {
        Self::Init("adc")
    }
}

pub struct OneshotAdc {
    channel: u32,
    #[cfg(target_os = "espidf")]
    handle: adc_oneshot_unit_handle_t,
    #[cfg(not(target_os = "espidf"))]
    sim_raw: AtomicU16,
}

impl OneshotAdc {
    /// Claim ADC1 and configure `channel` for 12-bit, 0–3.3 V conversions.
    #[cfg(target_os = "espidf")]
    pub fn new(channel: u32) -> Result<Self, AdcError> {
        let unit_cfg = adc_oneshot_unit_init_cfg_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..Default::default()
        };
        let mut handle: adc_oneshot_unit_handle_t = core::ptr::null_mut();
        // SAFETY: both pointers are valid for the duration of the call.
        let ret = unsafe { adc_oneshot_new_unit(&unit_cfg, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(AdcError::UnitInit(ret));
        }

        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        // SAFETY: `handle` was just created and is owned here.
        let ret = unsafe { adc_oneshot_config_channel(handle, channel, &chan_cfg) };
        if ret != ESP_OK as i32 {
            unsafe {
                adc_oneshot_del_unit(handle);
            }
            return Err(AdcError::ChannelConfig { channel, rc: ret });
        }

        info!("adc: ADC1 CH{} configured (12 bit, 12 dB)", channel);
        Ok(Self { channel, handle })
    }

    /// Host build: conversions return the last injected code (mid-scale
    /// until set).
    #[cfg(not(target_os = "espidf"))]
    pub fn new(channel: u32) -> Result<Self, AdcError> {
        info!("adc(sim): ADC1 CH{}", channel);
        Ok(Self {
            channel,
            sim_raw: AtomicU16::new(FULL_SCALE / 2 + 1),
        })
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    #[cfg(target_os = "espidf")]
    pub fn read(&self) -> Result<u16, AdcError> {
        let mut raw: i32 = 0;
        // SAFETY: `handle` stays valid until drop.
        let ret = unsafe { adc_oneshot_read(self.handle, self.channel, &mut raw) };
        if ret != ESP_OK as i32 {
            return Err(AdcError::Read {
                channel: self.channel,
                rc: ret,
            });
        }
        Ok(raw.clamp(0, i32::from(FULL_SCALE)) as u16)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read(&self) -> Result<u16, AdcError> {
        Ok(self.sim_raw.load(Ordering::Relaxed))
    }

    /// Set the code the next host conversions return.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim_raw(&self, raw: u16) {
        self.sim_raw.store(raw.min(FULL_SCALE), Ordering::Relaxed);
    }
}

#[cfg(target_os = "espidf")]
impl Drop for OneshotAdc {
    fn drop(&mut self) {
        // SAFETY: the handle is not used after this point.
        unsafe {
            adc_oneshot_del_unit(self.handle);
        }
    }
}
