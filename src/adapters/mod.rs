//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                |
//! |------------|--------------|----------------------------|
//! | `ble`      | LinkPort     | Bluedroid GATT server      |
//! | `hardware` | SensorPort   | NTC ADC, simulated soil    |
//! |            | ActuatorPort | Pump GPIO                  |
//! | `log_sink` | EventSink    | Serial log output          |
//! | `nvs`      | ConfigPort   | NVS / in-memory store      |
//! | `time`     | TimePort     | ESP32 system timer         |

pub mod ble;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
