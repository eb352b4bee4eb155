//! Connectivity manager — transport arbitration and change notification.
//!
//! [`NetManager`] owns the configuration, both transports and the
//! derived link kind.  `start()` performs the synchronous first bring-up
//! and spawns the perpetual WiFi monitor; the monitors write the
//! per-transport connectivity flags and [`poll`](NetManager::poll)
//! recomputes the kind from them under strict priority
//! Wifi > Gsm > None, firing the change callback exactly once per
//! transition.
//!
//! ## Shared state
//!
//! The manager is a cloneable handle over one shared inner state.  The
//! connectivity flags and the last-connection timestamp are atomics:
//! each is written by its owning monitor (or the synchronous `start()`
//! path) and read everywhere else without locking.  A racing read costs
//! at most one stale recompute, corrected on the next `poll()`.  Kind
//! transitions themselves are serialised by a small arbitration lock so
//! the once-per-transition callback guarantee holds across threads.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{error, info, warn};

use crate::config::{NetConfig, NetMode, MONITOR_PERIOD_MS};
use crate::ports::{ModemPort, TimePort, WifiPort};
use crate::transport::{ModemTransport, WifiTransport};
use crate::util::lock;

// ───────────────────────────────────────────────────────────────
// Link kind
// ───────────────────────────────────────────────────────────────

/// Which transport currently carries traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LinkKind {
    #[default]
    None = 0,
    Wifi = 1,
    Gsm = 2,
}

impl LinkKind {
    /// Pure arbitration: WiFi wins over GSM wins over nothing.
    pub fn arbitrate(wifi_up: bool, gsm_up: bool) -> Self {
        if wifi_up {
            Self::Wifi
        } else if gsm_up {
            Self::Gsm
        } else {
            Self::None
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Wifi,
            2 => Self::Gsm,
            _ => Self::None,
        }
    }
}

/// Change notification: `(connected, kind)`.
pub type ChangeCallback = Box<dyn FnMut(bool, LinkKind) + Send>;

// ───────────────────────────────────────────────────────────────
// Shared inner state
// ───────────────────────────────────────────────────────────────

struct ArbState {
    kind: LinkKind,
    on_change: Option<ChangeCallback>,
}

struct NetInner {
    config: Mutex<NetConfig>,
    started: AtomicBool,

    // Written by the owning monitor / synchronous start path only.
    wifi_up: AtomicBool,
    gsm_up: AtomicBool,

    gsm_allowed: AtomicBool,
    last_link_at_ms: AtomicU64,
    connect_failures: AtomicU32,

    // Mirror of `arb.kind` for lock-free reads on the stream hot path.
    kind_cell: AtomicU8,
    arb: Mutex<ArbState>,

    wifi: Mutex<WifiTransport>,
    modem_tx: Mutex<ModemTransport>,
    modem: Arc<Mutex<dyn ModemPort>>,
    clock: Arc<dyn TimePort>,
}

// ───────────────────────────────────────────────────────────────
// NetManager
// ───────────────────────────────────────────────────────────────

/// Cloneable handle to the process-wide connectivity state.
///
/// One instance per process is the intended deployment; nothing
/// enforces it, but the transports behind a second instance would
/// fight over the same radios.
#[derive(Clone)]
pub struct NetManager {
    inner: Arc<NetInner>,
}

impl NetManager {
    pub fn new(
        wifi: impl WifiPort + 'static,
        modem: impl ModemPort + 'static,
        clock: impl TimePort + 'static,
    ) -> Self {
        let clock: Arc<dyn TimePort> = Arc::new(clock);
        let modem: Arc<Mutex<dyn ModemPort>> = Arc::new(Mutex::new(modem));
        let wifi = WifiTransport::new(Box::new(wifi), Arc::clone(&clock));
        let modem_tx = ModemTransport::new(Arc::clone(&modem), Arc::clone(&clock));

        Self {
            inner: Arc::new(NetInner {
                config: Mutex::new(NetConfig::default()),
                started: AtomicBool::new(false),
                wifi_up: AtomicBool::new(false),
                gsm_up: AtomicBool::new(false),
                gsm_allowed: AtomicBool::new(true),
                last_link_at_ms: AtomicU64::new(0),
                connect_failures: AtomicU32::new(0),
                kind_cell: AtomicU8::new(LinkKind::None as u8),
                arb: Mutex::new(ArbState {
                    kind: LinkKind::None,
                    on_change: None,
                }),
                wifi: Mutex::new(wifi),
                modem_tx: Mutex::new(modem_tx),
                modem,
                clock,
            }),
        }
    }

    // ── Configuration ─────────────────────────────────────────

    /// Store the configuration.  Without an SSID the mode is forced to
    /// [`NetMode::GsmOnly`] regardless of what the caller asked for.
    pub fn begin(&self, mut config: NetConfig) {
        if !config.wifi_configured() && config.mode != NetMode::GsmOnly {
            info!("Net: no WiFi SSID configured, forcing GSM-only mode");
            config.mode = NetMode::GsmOnly;
        }
        *lock(&self.inner.config) = config;
    }

    /// Register the `(connected, kind)` change callback.
    pub fn set_on_change(&self, cb: impl FnMut(bool, LinkKind) + Send + 'static) {
        lock(&self.inner.arb).on_change = Some(Box::new(cb));
    }

    /// Globally allow or forbid GSM use by stream adapters.
    pub fn set_gsm_allowed(&self, allowed: bool) {
        self.inner.gsm_allowed.store(allowed, Ordering::Release);
    }

    pub fn gsm_allowed(&self) -> bool {
        self.inner.gsm_allowed.load(Ordering::Acquire)
    }

    pub fn mode(&self) -> NetMode {
        lock(&self.inner.config).mode
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring up the configured transports and spawn the WiFi monitor.
    ///
    /// Idempotent: a second call logs and returns.  A failed transport
    /// does not stop the other one from coming up; the monitors keep
    /// retrying for the life of the process.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            warn!("Net: start() called while already started, ignored");
            return;
        }

        let cfg = lock(&self.inner.config).clone();

        if cfg.mode != NetMode::WifiOnly {
            // Single synchronous attempt; the GSM monitor re-attaches later.
            let up = match lock(&self.inner.modem_tx).start(&cfg) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Net: GSM bring-up failed ({e})");
                    false
                }
            };
            self.inner.gsm_up.store(up, Ordering::Release);
        }

        if cfg.mode != NetMode::GsmOnly {
            let up = match lock(&self.inner.wifi).connect(
                &cfg.wifi_ssid,
                &cfg.wifi_password,
                cfg.wifi_timeout_ms,
                false,
            ) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Net: WiFi bring-up failed ({e})");
                    false
                }
            };
            self.inner.wifi_up.store(up, Ordering::Release);

            let monitor = self.clone();
            let spawned = thread::Builder::new()
                .name("net-wifi".into())
                .stack_size(16 * 1024)
                .spawn(move || {
                    info!("Net: WiFi monitor starting");
                    monitor.wifi_task(true);
                });
            if let Err(e) = spawned {
                error!("Net: failed to spawn WiFi monitor: {e}");
            }
        }

        self.poll();
    }

    /// Tear down the active transport, force the kind to None and fire
    /// the change callback.
    pub fn end(&self) {
        match self.kind() {
            LinkKind::Gsm => lock(&self.inner.modem_tx).end(),
            LinkKind::Wifi => lock(&self.inner.wifi).end(),
            LinkKind::None => {}
        }

        let mut arb = lock(&self.inner.arb);
        arb.kind = LinkKind::None;
        self.inner
            .kind_cell
            .store(LinkKind::None as u8, Ordering::Release);
        if let Some(cb) = arb.on_change.as_mut() {
            cb(false, LinkKind::None);
        }
    }

    // ── Arbitration ───────────────────────────────────────────

    /// Recompute the link kind from the connectivity flags; on a
    /// transition, store it and fire the change callback.
    pub fn poll(&self) {
        let new_kind = LinkKind::arbitrate(
            self.inner.wifi_up.load(Ordering::Acquire),
            self.inner.gsm_up.load(Ordering::Acquire),
        );

        let mut arb = lock(&self.inner.arb);
        if arb.kind == new_kind {
            return;
        }
        arb.kind = new_kind;
        self.inner.kind_cell.store(new_kind as u8, Ordering::Release);
        info!("Net: link is now {:?}", new_kind);

        let connected = new_kind != LinkKind::None && self.live_status(new_kind);
        if let Some(cb) = arb.on_change.as_mut() {
            cb(connected, new_kind);
        }
    }

    /// The currently authoritative transport.
    pub fn kind(&self) -> LinkKind {
        LinkKind::from_u8(self.inner.kind_cell.load(Ordering::Acquire))
    }

    /// Whether the device is connected: the kind must be settled *and*
    /// the active transport's live status must confirm it — the cached
    /// flags alone are not authoritative here.
    pub fn connected(&self) -> bool {
        let kind = self.kind();
        kind != LinkKind::None && self.live_status(kind)
    }

    fn live_status(&self, kind: LinkKind) -> bool {
        match kind {
            LinkKind::Wifi => lock(&self.inner.wifi).status(),
            LinkKind::Gsm => lock(&self.inner.modem).is_network_connected(),
            LinkKind::None => false,
        }
    }

    // ── Monitors ──────────────────────────────────────────────

    /// WiFi monitor body.  With `run_forever` this loops for the life
    /// of the process; otherwise it performs exactly one
    /// check-and-maybe-reconnect pass (one-shot recovery, tests).
    pub fn wifi_task(&self, run_forever: bool) {
        if self.mode() == NetMode::GsmOnly {
            return;
        }

        loop {
            if lock(&self.inner.wifi).status() {
                self.inner.clock.sleep_ms(MONITOR_PERIOD_MS);
            } else {
                let cfg = lock(&self.inner.config).clone();
                let up = lock(&self.inner.wifi)
                    .connect(&cfg.wifi_ssid, &cfg.wifi_password, cfg.wifi_timeout_ms, true)
                    .is_ok();
                self.inner.wifi_up.store(up, Ordering::Release);
                if up {
                    self.stamp_link();
                    info!("Net: WiFi reconnected");
                }
                self.poll();
            }

            if !run_forever {
                break;
            }
        }
    }

    /// GSM monitor body: idle while the modem is registered, otherwise
    /// re-attach via the standalone GPRS path.
    pub fn gsm_task(&self, run_forever: bool) {
        if self.mode() == NetMode::WifiOnly {
            return;
        }

        loop {
            if lock(&self.inner.modem).is_network_connected() {
                self.inner.clock.sleep_ms(MONITOR_PERIOD_MS);
            } else {
                self.gsm_reconnect();
            }

            if !run_forever {
                break;
            }
        }
    }

    /// One standalone GPRS re-attach (no Reset/Init), recording the
    /// result and re-settling the kind.
    pub fn gsm_reconnect(&self) -> bool {
        if self.mode() == NetMode::WifiOnly {
            return false;
        }

        let cfg = lock(&self.inner.config).clone();
        let up = match lock(&self.inner.modem_tx).connect(&cfg) {
            Ok(()) => true,
            Err(e) => {
                warn!("Net: GSM re-attach failed ({e})");
                false
            }
        };
        self.inner.gsm_up.store(up, Ordering::Release);
        if up {
            self.stamp_link();
            info!("Net: GSM reconnected");
        }
        self.poll();
        up
    }

    fn stamp_link(&self) {
        self.inner
            .last_link_at_ms
            .store(self.inner.clock.now_ms(), Ordering::Release);
    }

    // ── Stream adapter support ────────────────────────────────

    /// Timestamp of the most recent transport (re)connection.
    pub fn last_link_at_ms(&self) -> u64 {
        self.inner.last_link_at_ms.load(Ordering::Acquire)
    }

    /// Consecutive failed stream `connect()` calls.
    pub fn connect_failures(&self) -> u32 {
        self.inner.connect_failures.load(Ordering::Acquire)
    }

    pub(crate) fn note_connect_failure(&self) -> u32 {
        self.inner.connect_failures.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn reset_connect_failures(&self) {
        self.inner.connect_failures.store(0, Ordering::Release);
    }

    pub(crate) fn modem_handle(&self) -> Arc<Mutex<dyn ModemPort>> {
        Arc::clone(&self.inner.modem)
    }

    pub(crate) fn tls_root_ca(&self) -> Option<String> {
        lock(&self.inner.config).tls_root_ca.clone()
    }

    pub(crate) fn stream_connect_timeout_ms(&self) -> u64 {
        lock(&self.inner.config).stream_connect_timeout_ms
    }
}
