//! Port traits — the boundary between the connectivity core and its
//! collaborators.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NetManager / transports (domain)
//! ```
//!
//! The modem AT-command driver, the WiFi driver and the clock sit behind
//! these traits, so the bring-up state machines and the arbitration logic
//! run unchanged against real hardware, host simulations and test mocks.
//!
//! The traits are object-safe on purpose: the modem is a single shared
//! resource handed around as `Arc<Mutex<dyn ModemPort>>` (the manager
//! drives bring-up through it while Gsm-bound stream adapters use its
//! socket channel).

// ───────────────────────────────────────────────────────────────
// Modem port (AT-command driver collaborator)
// ───────────────────────────────────────────────────────────────

/// SIM card state as reported by the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimStatus {
    /// SIM present and unlocked.
    Ready,
    /// SIM waiting for a PIN.
    Locked,
    /// SIM missing or unreadable.
    Error,
}

/// Radio access technology selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NetworkMode {
    Automatic = 2,
    GsmOnly = 13,
    WcdmaOnly = 14,
    LteOnly = 38,
}

/// AT-command driver surface (TinyGSM-shaped collaborator).
///
/// Predicate-style methods return `bool` the way the underlying AT
/// driver does; the caller decides whether a refusal is fatal.  The
/// `tcp_*` family is the modem's single GPRS socket channel, consumed
/// by Gsm-bound stream adapters.
pub trait ModemPort: Send {
    /// Toggle the power/reset control lines with their fixed settle
    /// delays and restart the serial link.  Pin and UART wiring are the
    /// implementation's concern.
    fn hard_reset(&mut self);

    /// Initialise the modem. Idempotent; cheap when already initialised.
    fn init(&mut self) -> bool;

    /// Request a radio access technology. Refusals are non-fatal.
    fn set_network_mode(&mut self, mode: NetworkMode) -> bool;

    fn modem_name(&mut self) -> String;
    fn modem_info(&mut self) -> String;

    fn sim_status(&mut self) -> SimStatus;
    fn sim_unlock(&mut self, pin: &str) -> bool;

    /// Block until network registration or `timeout_ms`, whichever first.
    fn wait_for_network(&mut self, timeout_ms: u64) -> bool;
    fn is_network_connected(&mut self) -> bool;

    fn gprs_connect(&mut self, apn: &str, user: &str, password: &str) -> bool;
    fn is_gprs_connected(&mut self) -> bool;
    fn gprs_disconnect(&mut self) -> bool;

    // ── Observability ─────────────────────────────────────────
    fn sim_ccid(&mut self) -> String;
    fn imei(&mut self) -> String;
    fn imsi(&mut self) -> String;
    fn operator_name(&mut self) -> String;
    fn local_ip(&mut self) -> String;
    /// Signal quality in the driver's native units (CSQ).
    fn signal_quality(&mut self) -> i32;

    // ── GPRS socket channel ───────────────────────────────────
    fn tcp_connect(&mut self, host: &str, port: u16, timeout_ms: u64) -> bool;
    fn tcp_write(&mut self, data: &[u8]) -> usize;
    /// Non-blocking read; `0` means no data pending.
    fn tcp_read(&mut self, buf: &mut [u8]) -> usize;
    fn tcp_peek(&mut self) -> Option<u8>;
    fn tcp_available(&mut self) -> usize;
    fn tcp_close(&mut self);
    fn tcp_connected(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// WiFi port (station driver collaborator)
// ───────────────────────────────────────────────────────────────

/// WiFi station driver surface.
///
/// `begin` only *starts* association; completion is observed by polling
/// [`is_connected`](WifiPort::is_connected), which always reflects the
/// driver's live status, never a cached flag.
pub trait WifiPort: Send {
    fn begin(&mut self, ssid: &str, password: &str);
    fn is_connected(&mut self) -> bool;
    fn disconnect(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source used by every deadline and pause in the core.
///
/// Tests drive a manual clock through this trait so bring-up budgets
/// and retry ceilings are exercised without wall-clock waits.
pub trait TimePort: Send + Sync {
    /// Milliseconds since an arbitrary epoch (monotonic).
    fn now_ms(&self) -> u64;
    fn sleep_ms(&self, ms: u64);
}
