//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter    | Implements | Connects to                          |
//! |------------|------------|--------------------------------------|
//! | `time`     | TimePort   | ESP32 system timer / `std::time`     |
//! | `modem_at` | ModemPort  | cellular modem AT link (UART)        |
//! | `wifi_sta` | WifiPort   | ESP-IDF WiFi STA driver              |
//!
//! Every adapter is cfg-gated: real driver calls on
//! `target_os = "espidf"`, simulation stubs everywhere else so the
//! whole core is testable on the host.

pub mod modem_at;
pub mod time;
pub mod wifi_sta;
