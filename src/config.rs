//! Connectivity configuration.
//!
//! All tunable parameters for the dual-transport link: transport policy,
//! WiFi and cellular credentials, stage timeouts and the optional TLS
//! root certificate handed to stream adapters.

use serde::{Deserialize, Serialize};

/// How long a foreground or monitor WiFi connect may poll before failing.
pub const WIFI_CONNECT_TIMEOUT_MS: u64 = 3_000;

/// Default timeout for a stream adapter's TCP connect.
pub const STREAM_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Idle period between monitor-task liveness checks.
pub const MONITOR_PERIOD_MS: u64 = 1_000;

/// Transport selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetMode {
    /// Prefer WiFi, fall back to cellular.
    WifiFirst,
    /// Never bring up the modem.
    WifiOnly,
    /// Never bring up WiFi.
    GsmOnly,
}

/// Core connectivity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetConfig {
    /// Transport policy. Forced to [`NetMode::GsmOnly`] by
    /// [`NetManager::begin`](crate::manager::NetManager::begin) when no
    /// SSID is configured.
    pub mode: NetMode,

    // --- WiFi ---
    /// Station SSID. Empty means WiFi is unavailable.
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,

    // --- Cellular ---
    /// GPRS access point name.
    pub gsm_apn: heapless::String<32>,
    pub gsm_user: heapless::String<32>,
    pub gsm_password: heapless::String<32>,
    /// SIM PIN. Empty means the SIM needs no unlock.
    pub sim_pin: heapless::String<8>,

    // --- Timing ---
    /// WiFi association poll budget (milliseconds).
    pub wifi_timeout_ms: u64,
    /// Stream adapter TCP connect timeout (milliseconds).
    pub stream_connect_timeout_ms: u64,

    // --- TLS ---
    /// PEM root certificate for the TLS stream decorator.
    /// `None` leaves stream adapters on the raw transport.
    pub tls_root_ca: Option<String>,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            mode: NetMode::WifiFirst,
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),
            gsm_apn: heapless::String::try_from("data").unwrap_or_default(),
            gsm_user: heapless::String::new(),
            gsm_password: heapless::String::new(),
            sim_pin: heapless::String::new(),
            wifi_timeout_ms: WIFI_CONNECT_TIMEOUT_MS,
            stream_connect_timeout_ms: STREAM_CONNECT_TIMEOUT_MS,
            tls_root_ca: None,
        }
    }
}

impl NetConfig {
    /// Whether a WiFi network is configured at all.
    pub fn wifi_configured(&self) -> bool {
        !self.wifi_ssid.is_empty()
    }

    /// The SIM PIN, if one was configured.
    pub fn sim_pin(&self) -> Option<&str> {
        if self.sim_pin.is_empty() {
            None
        } else {
            Some(self.sim_pin.as_str())
        }
    }
}
