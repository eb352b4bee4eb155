//! Cellular modem transport — multi-stage bring-up state machine.
//!
//! Bring-up is sequential: **Reset → Init → NetworkWait → GprsConnect**.
//! Every stage is a [`Bounded`] retry loop with its own wall-clock
//! budget; the Reset stage additionally caps consecutive init failures.
//! The GprsConnect stage doubles as the standalone
//! [`connect`](ModemTransport::connect) entry point so the background
//! monitor can re-attach without repeating the expensive Reset/Init
//! work.
//!
//! The modem itself is a single shared resource: the same
//! `Arc<Mutex<dyn ModemPort>>` backs bring-up here and the GPRS socket
//! channel used by Gsm-bound stream adapters.  Concurrent bring-up from
//! two contexts is out of contract.

use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::config::NetConfig;
use crate::error::Result;
use crate::ports::{ModemPort, NetworkMode, SimStatus, TimePort};
use crate::retry::Bounded;
use crate::util::lock;

// ───────────────────────────────────────────────────────────────
// Stage budgets
// ───────────────────────────────────────────────────────────────

const RESET_BUDGET_MS: u64 = 20_000;
const INIT_BUDGET_MS: u64 = 20_000;
const NETWORK_BUDGET_MS: u64 = 20_000;
const GPRS_BUDGET_MS: u64 = 10_000;

/// Consecutive init failures tolerated during Reset; the next one
/// aborts the whole bring-up.
const RESET_FAILURE_CEILING: u32 = 2;

/// Pause after a failed NetworkWait or GprsConnect attempt.
const STAGE_PAUSE_MS: u64 = 1_000;

// ───────────────────────────────────────────────────────────────
// Diagnostics
// ───────────────────────────────────────────────────────────────

/// Identity and link readings collected after a successful GPRS attach.
/// Observability only — never consulted by control flow.
#[derive(Debug, Clone)]
pub struct ModemDiagnostics {
    pub ccid: String,
    pub imei: String,
    pub imsi: String,
    pub operator_name: String,
    pub local_ip: String,
    pub signal_quality: i32,
}

// ───────────────────────────────────────────────────────────────
// ModemTransport
// ───────────────────────────────────────────────────────────────

/// Bring-up and reconnect driver for the cellular modem.
pub struct ModemTransport {
    modem: Arc<Mutex<dyn ModemPort>>,
    clock: Arc<dyn TimePort>,
}

impl ModemTransport {
    pub fn new(modem: Arc<Mutex<dyn ModemPort>>, clock: Arc<dyn TimePort>) -> Self {
        Self { modem, clock }
    }

    /// Full bring-up: Reset → Init → NetworkWait → GprsConnect.
    pub fn start(&mut self, cfg: &NetConfig) -> Result<()> {
        self.reset_stage()?;
        self.init_stage(cfg)?;
        self.network_wait_stage()?;
        self.connect(cfg)
    }

    /// Standalone GPRS attach (the GprsConnect stage only).
    pub fn connect(&mut self, cfg: &NetConfig) -> Result<()> {
        let modem = Arc::clone(&self.modem);
        Bounded::new(GPRS_BUDGET_MS)
            .with_pause_ms(STAGE_PAUSE_MS)
            .run(&*self.clock, || {
                let mut m = lock(&modem);
                info!("Modem: attaching GPRS (APN '{}')", cfg.gsm_apn);
                if !m.gprs_connect(&cfg.gsm_apn, &cfg.gsm_user, &cfg.gsm_password) {
                    warn!("Modem: GPRS attach failed");
                    return false;
                }
                if m.is_gprs_connected() {
                    info!("Modem: GPRS connected");
                } else {
                    warn!("Modem: GPRS attach accepted but not connected");
                }
                true
            })
            .map_err(|e| e.at_stage("gprs connect"))?;

        let diag = self.collect_diagnostics();
        info!(
            "Modem: CCID={} IMEI={} IMSI={} operator='{}' ip={} csq={}",
            diag.ccid, diag.imei, diag.imsi, diag.operator_name, diag.local_ip,
            diag.signal_quality
        );
        Ok(())
    }

    /// GPRS detach.
    pub fn end(&mut self) {
        lock(&self.modem).gprs_disconnect();
        info!("Modem: GPRS disconnected");
    }

    /// Live network registration status.
    pub fn is_network_connected(&mut self) -> bool {
        lock(&self.modem).is_network_connected()
    }

    // ── Stages ────────────────────────────────────────────────

    /// Reset: power-cycle, restart the serial link, init.  A third
    /// failed init aborts the whole bring-up, not just this stage.
    fn reset_stage(&mut self) -> Result<()> {
        let modem = Arc::clone(&self.modem);
        Bounded::new(RESET_BUDGET_MS)
            .with_failure_ceiling(RESET_FAILURE_CEILING)
            .run(&*self.clock, || {
                let mut m = lock(&modem);
                m.hard_reset();
                info!("Modem: initialising...");
                if !m.init() {
                    warn!("Modem: init failed");
                    return false;
                }
                if m.set_network_mode(NetworkMode::LteOnly) {
                    info!("Modem: network mode set to LTE-only");
                } else {
                    warn!("Modem: network mode request refused, continuing");
                }
                true
            })
            .map_err(|e| e.at_stage("modem reset"))
    }

    /// Init: idempotent re-init, identity readout, SIM unlock if needed.
    fn init_stage(&mut self, cfg: &NetConfig) -> Result<()> {
        let modem = Arc::clone(&self.modem);
        Bounded::new(INIT_BUDGET_MS)
            .run(&*self.clock, || {
                let mut m = lock(&modem);
                if !m.init() {
                    warn!("Modem: re-init failed");
                    return false;
                }
                info!("Modem: name '{}'", m.modem_name());
                info!("Modem: info '{}'", m.modem_info());
                if let Some(pin) = cfg.sim_pin() {
                    if m.sim_status() != SimStatus::Ready {
                        if m.sim_unlock(pin) {
                            info!("Modem: SIM unlocked");
                        } else {
                            warn!("Modem: SIM unlock failed");
                        }
                    }
                }
                true
            })
            .map_err(|e| e.at_stage("modem init"))
    }

    /// NetworkWait: poll registration with an inner wait of half the
    /// stage budget per attempt.
    fn network_wait_stage(&mut self) -> Result<()> {
        let modem = Arc::clone(&self.modem);
        Bounded::new(NETWORK_BUDGET_MS)
            .with_pause_ms(STAGE_PAUSE_MS)
            .run(&*self.clock, || {
                let mut m = lock(&modem);
                info!("Modem: waiting for network...");
                if !m.wait_for_network(NETWORK_BUDGET_MS / 2) {
                    warn!("Modem: network wait timed out");
                    return false;
                }
                if m.is_network_connected() {
                    info!("Modem: network registered");
                } else {
                    warn!("Modem: network wait passed but not registered");
                }
                true
            })
            .map_err(|e| e.at_stage("network wait"))
    }

    fn collect_diagnostics(&mut self) -> ModemDiagnostics {
        let mut m = lock(&self.modem);
        ModemDiagnostics {
            ccid: m.sim_ccid(),
            imei: m.imei(),
            imsi: m.imsi(),
            operator_name: m.operator_name(),
            local_ip: m.local_ip(),
            signal_quality: m.signal_quality(),
        }
    }
}
