//! Mock collaborators for integration tests.
//!
//! The WiFi side reuses the crate's host simulation (`WifiSta` +
//! `SimLink`); the modem is scripted here so tests can fail individual
//! bring-up stages and inspect the GPRS socket traffic without real
//! hardware.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use netmux::adapters::time::ManualClock;
use netmux::adapters::wifi_sta::{SimLink, WifiSta};
use netmux::manager::LinkKind;
use netmux::ports::{ModemPort, NetworkMode, SimStatus};
use netmux::{NetConfig, NetManager};

// ── Scripted modem ────────────────────────────────────────────

/// Shared knobs and recorders for [`MockModem`].  Cloning shares state,
/// so tests keep a handle after the modem moves into the manager.
#[derive(Clone)]
pub struct ModemScript {
    pub network_up: Arc<AtomicBool>,
    pub gprs_ok: Arc<AtomicBool>,
    pub tcp_ok: Arc<AtomicBool>,
    pub init_calls: Arc<AtomicU32>,
    pub gprs_calls: Arc<AtomicU32>,
    pub detached: Arc<AtomicBool>,
    /// Bytes the "network" holds for the device.
    pub rx: Arc<Mutex<VecDeque<u8>>>,
    /// Bytes the device wrote.
    pub tx: Arc<Mutex<Vec<u8>>>,
    tcp_connected: Arc<AtomicBool>,
    clock: Arc<AtomicU64>,
}

#[allow(dead_code)]
impl ModemScript {
    pub fn push_rx(&self, data: &[u8]) {
        self.rx.lock().unwrap().extend(data.iter().copied());
    }

    pub fn tx_bytes(&self) -> Vec<u8> {
        self.tx.lock().unwrap().clone()
    }
}

/// Modem whose behavior is steered through [`ModemScript`].  Every
/// operation charges fake time so stage budgets stay meaningful under
/// the manual clock.
pub struct MockModem {
    s: ModemScript,
}

impl MockModem {
    pub fn new(clock: &ManualClock) -> (Self, ModemScript) {
        let script = ModemScript {
            network_up: Arc::new(AtomicBool::new(true)),
            gprs_ok: Arc::new(AtomicBool::new(true)),
            tcp_ok: Arc::new(AtomicBool::new(true)),
            init_calls: Arc::new(AtomicU32::new(0)),
            gprs_calls: Arc::new(AtomicU32::new(0)),
            detached: Arc::new(AtomicBool::new(false)),
            rx: Arc::new(Mutex::new(VecDeque::new())),
            tx: Arc::new(Mutex::new(Vec::new())),
            tcp_connected: Arc::new(AtomicBool::new(false)),
            clock: clock.cell(),
        };
        (Self { s: script.clone() }, script)
    }

    fn tick(&self, ms: u64) {
        self.s.clock.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ModemPort for MockModem {
    fn hard_reset(&mut self) {
        self.tick(200);
    }

    fn init(&mut self) -> bool {
        self.tick(100);
        self.s.init_calls.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn set_network_mode(&mut self, _mode: NetworkMode) -> bool {
        true
    }

    fn modem_name(&mut self) -> String {
        "MockModem".into()
    }

    fn modem_info(&mut self) -> String {
        "mock".into()
    }

    fn sim_status(&mut self) -> SimStatus {
        SimStatus::Ready
    }

    fn sim_unlock(&mut self, _pin: &str) -> bool {
        true
    }

    fn wait_for_network(&mut self, timeout_ms: u64) -> bool {
        if self.s.network_up.load(Ordering::SeqCst) {
            self.tick(50);
            true
        } else {
            self.tick(timeout_ms);
            false
        }
    }

    fn is_network_connected(&mut self) -> bool {
        self.s.network_up.load(Ordering::SeqCst)
    }

    fn gprs_connect(&mut self, _apn: &str, _user: &str, _password: &str) -> bool {
        self.tick(100);
        self.s.gprs_calls.fetch_add(1, Ordering::SeqCst);
        self.s.gprs_ok.load(Ordering::SeqCst)
    }

    fn is_gprs_connected(&mut self) -> bool {
        self.s.gprs_ok.load(Ordering::SeqCst)
    }

    fn gprs_disconnect(&mut self) -> bool {
        self.s.detached.store(true, Ordering::SeqCst);
        true
    }

    fn sim_ccid(&mut self) -> String {
        "8986".into()
    }

    fn imei(&mut self) -> String {
        "867".into()
    }

    fn imsi(&mut self) -> String {
        "460".into()
    }

    fn operator_name(&mut self) -> String {
        "MockNet".into()
    }

    fn local_ip(&mut self) -> String {
        "10.0.0.9".into()
    }

    fn signal_quality(&mut self) -> i32 {
        21
    }

    fn tcp_connect(&mut self, _host: &str, _port: u16, _timeout_ms: u64) -> bool {
        let ok = self.s.tcp_ok.load(Ordering::SeqCst);
        self.s.tcp_connected.store(ok, Ordering::SeqCst);
        ok
    }

    fn tcp_write(&mut self, data: &[u8]) -> usize {
        if !self.s.tcp_connected.load(Ordering::SeqCst) {
            return 0;
        }
        self.s.tx.lock().unwrap().extend_from_slice(data);
        data.len()
    }

    fn tcp_read(&mut self, buf: &mut [u8]) -> usize {
        let mut rx = self.s.rx.lock().unwrap();
        let n = rx.len().min(buf.len());
        for slot in buf.iter_mut().take(n) {
            *slot = rx.pop_front().unwrap_or(0);
        }
        n
    }

    fn tcp_peek(&mut self) -> Option<u8> {
        self.s.rx.lock().unwrap().front().copied()
    }

    fn tcp_available(&mut self) -> usize {
        self.s.rx.lock().unwrap().len()
    }

    fn tcp_close(&mut self) {
        self.s.tcp_connected.store(false, Ordering::SeqCst);
    }

    fn tcp_connected(&mut self) -> bool {
        self.s.tcp_connected.load(Ordering::SeqCst)
    }
}

// ── Test rig ──────────────────────────────────────────────────

/// A manager wired to fully scripted collaborators, plus the handles
/// needed to steer them.
pub struct Rig {
    pub net: NetManager,
    pub link: SimLink,
    pub modem: ModemScript,
    pub clock: ManualClock,
    pub events: Arc<Mutex<Vec<(bool, LinkKind)>>>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        let clock = ManualClock::new();
        let link = SimLink::new();
        // Link starts down so one-shot wifi_task passes drive the flag.
        link.set_up(false);
        let wifi = WifiSta::with_link(link.clone());
        let (modem, script) = MockModem::new(&clock);

        let net = NetManager::new(wifi, modem, clock.clone());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        net.set_on_change(move |connected, kind| {
            sink.lock().unwrap().push((connected, kind));
        });

        Self {
            net,
            link,
            modem: script,
            clock,
            events,
        }
    }

    pub fn begin(&self, cfg: NetConfig) {
        self.net.begin(cfg);
    }

    pub fn config_with_ssid(ssid: &str) -> NetConfig {
        let mut cfg = NetConfig::default();
        cfg.wifi_ssid = heapless::String::try_from(ssid).unwrap();
        // Short budget keeps failed silent reconnects to one attempt.
        cfg.wifi_timeout_ms = 500;
        cfg
    }

    /// One-shot WiFi monitor pass that should establish the link.
    pub fn bring_wifi_up(&self) {
        self.link.set_join_allowed(true);
        self.link.set_up(false);
        self.net.wifi_task(false);
        assert_eq!(self.net.kind(), LinkKind::Wifi);
    }

    /// One-shot WiFi monitor pass with association refused.
    pub fn drop_wifi(&self) {
        self.link.set_join_allowed(false);
        self.link.set_up(false);
        self.net.wifi_task(false);
    }

    /// Standalone GPRS attach that should succeed.
    pub fn bring_gsm_up(&self) {
        self.modem.gprs_ok.store(true, Ordering::SeqCst);
        assert!(self.net.gsm_reconnect());
    }

    pub fn kinds_seen(&self) -> Vec<LinkKind> {
        self.events.lock().unwrap().iter().map(|(_, k)| *k).collect()
    }
}
