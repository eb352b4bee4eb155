//! Cellular modem AT-driver adapter.
//!
//! Implements [`ModemPort`] — the collaborator boundary for the
//! SIM7600-class modem (SIMA7670 answers the same AT set).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: drives the modem over UART with the
//!   power/reset lines on GPIO.  The UART/pin bring-up is deferred
//!   until the board wiring lands; each call logs and reports a
//!   conservative answer in the meantime.
//! - **all other targets**: a simulation. Control-plane calls succeed
//!   deterministically; the GPRS socket channel is backed by a real
//!   host TCP socket so upper layers can be exercised end-to-end.

#[cfg(target_os = "espidf")]
use log::{info, warn};

#[cfg(target_os = "espidf")]
use crate::ports::{ModemPort, NetworkMode, SimStatus};

// ───────────────────────────────────────────────────────────────
// ESP-IDF implementation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct AtModem;

#[cfg(target_os = "espidf")]
impl AtModem {
    pub fn new() -> Self {
        // UART2 @ 115200 8N1 plus PWR/RESET GPIOs come from the board
        // definition; threading them in follows the peripheral wiring
        // used by the other espidf adapters.
        Self
    }
}

#[cfg(target_os = "espidf")]
impl ModemPort for AtModem {
    fn hard_reset(&mut self) {
        info!("Modem(espidf): hard reset deferred until GPIO wiring");
    }

    fn init(&mut self) -> bool {
        info!("Modem(espidf): AT init deferred until UART wiring");
        true
    }

    fn set_network_mode(&mut self, mode: NetworkMode) -> bool {
        info!("Modem(espidf): CNMP={} deferred", mode as u8);
        true
    }

    fn modem_name(&mut self) -> String {
        String::new()
    }

    fn modem_info(&mut self) -> String {
        String::new()
    }

    fn sim_status(&mut self) -> SimStatus {
        SimStatus::Ready
    }

    fn sim_unlock(&mut self, _pin: &str) -> bool {
        true
    }

    fn wait_for_network(&mut self, _timeout_ms: u64) -> bool {
        warn!("Modem(espidf): network wait deferred, reporting unregistered");
        false
    }

    fn is_network_connected(&mut self) -> bool {
        false
    }

    fn gprs_connect(&mut self, apn: &str, _user: &str, _password: &str) -> bool {
        warn!("Modem(espidf): GPRS attach to '{apn}' deferred");
        false
    }

    fn is_gprs_connected(&mut self) -> bool {
        false
    }

    fn gprs_disconnect(&mut self) -> bool {
        true
    }

    fn sim_ccid(&mut self) -> String {
        String::new()
    }

    fn imei(&mut self) -> String {
        String::new()
    }

    fn imsi(&mut self) -> String {
        String::new()
    }

    fn operator_name(&mut self) -> String {
        String::new()
    }

    fn local_ip(&mut self) -> String {
        String::new()
    }

    fn signal_quality(&mut self) -> i32 {
        99 // CSQ "unknown"
    }

    fn tcp_connect(&mut self, _host: &str, _port: u16, _timeout_ms: u64) -> bool {
        false
    }

    fn tcp_write(&mut self, _data: &[u8]) -> usize {
        0
    }

    fn tcp_read(&mut self, _buf: &mut [u8]) -> usize {
        0
    }

    fn tcp_peek(&mut self) -> Option<u8> {
        None
    }

    fn tcp_available(&mut self) -> usize {
        0
    }

    fn tcp_close(&mut self) {}

    fn tcp_connected(&mut self) -> bool {
        false
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub use sim::AtModem;

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::io::{Read, Write};
    use std::net::{TcpStream, ToSocketAddrs};
    use std::time::Duration;

    use log::info;

    use crate::ports::{ModemPort, NetworkMode, SimStatus};

    /// Simulated SIM7600: registered and GPRS-capable once initialised,
    /// with the socket channel bridged onto a host TCP socket.
    pub struct AtModem {
        initialised: bool,
        registered: bool,
        gprs_up: bool,
        sim: SimStatus,
        socket: Option<TcpStream>,
    }

    impl Default for AtModem {
        fn default() -> Self {
            Self::new()
        }
    }

    impl AtModem {
        pub fn new() -> Self {
            Self {
                initialised: false,
                registered: false,
                gprs_up: false,
                sim: SimStatus::Ready,
                socket: None,
            }
        }
    }

    impl ModemPort for AtModem {
        fn hard_reset(&mut self) {
            info!("Modem(sim): hard reset");
            self.initialised = false;
            self.registered = false;
            self.gprs_up = false;
            self.socket = None;
        }

        fn init(&mut self) -> bool {
            self.initialised = true;
            true
        }

        fn set_network_mode(&mut self, mode: NetworkMode) -> bool {
            info!("Modem(sim): network mode {:?}", mode);
            true
        }

        fn modem_name(&mut self) -> String {
            "SIM7600(sim)".into()
        }

        fn modem_info(&mut self) -> String {
            "simulated firmware".into()
        }

        fn sim_status(&mut self) -> SimStatus {
            self.sim
        }

        fn sim_unlock(&mut self, _pin: &str) -> bool {
            self.sim = SimStatus::Ready;
            true
        }

        fn wait_for_network(&mut self, _timeout_ms: u64) -> bool {
            self.registered = self.initialised;
            self.registered
        }

        fn is_network_connected(&mut self) -> bool {
            self.registered
        }

        fn gprs_connect(&mut self, _apn: &str, _user: &str, _password: &str) -> bool {
            self.gprs_up = self.registered;
            self.gprs_up
        }

        fn is_gprs_connected(&mut self) -> bool {
            self.gprs_up
        }

        fn gprs_disconnect(&mut self) -> bool {
            self.gprs_up = false;
            self.socket = None;
            true
        }

        fn sim_ccid(&mut self) -> String {
            "89860000000000000000".into()
        }

        fn imei(&mut self) -> String {
            "867000000000000".into()
        }

        fn imsi(&mut self) -> String {
            "460000000000000".into()
        }

        fn operator_name(&mut self) -> String {
            "SimNet".into()
        }

        fn local_ip(&mut self) -> String {
            "10.64.0.2".into()
        }

        fn signal_quality(&mut self) -> i32 {
            19
        }

        fn tcp_connect(&mut self, host: &str, port: u16, timeout_ms: u64) -> bool {
            if !self.gprs_up {
                return false;
            }
            let Ok(mut addrs) = (host, port).to_socket_addrs() else {
                return false;
            };
            let Some(addr) = addrs.next() else {
                return false;
            };
            match TcpStream::connect_timeout(&addr, Duration::from_millis(timeout_ms)) {
                Ok(stream) => {
                    if stream.set_nonblocking(true).is_err() {
                        return false;
                    }
                    self.socket = Some(stream);
                    true
                }
                Err(_) => false,
            }
        }

        fn tcp_write(&mut self, data: &[u8]) -> usize {
            match self.socket.as_mut() {
                Some(s) => s.write(data).unwrap_or(0),
                None => 0,
            }
        }

        fn tcp_read(&mut self, buf: &mut [u8]) -> usize {
            match self.socket.as_mut() {
                Some(s) => match s.read(buf) {
                    Ok(0) => {
                        self.socket = None;
                        0
                    }
                    Ok(n) => n,
                    Err(_) => 0,
                },
                None => 0,
            }
        }

        fn tcp_peek(&mut self) -> Option<u8> {
            let s = self.socket.as_mut()?;
            let mut b = [0u8; 1];
            match s.peek(&mut b) {
                Ok(1..) => Some(b[0]),
                _ => None,
            }
        }

        fn tcp_available(&mut self) -> usize {
            let Some(s) = self.socket.as_mut() else {
                return 0;
            };
            let mut probe = [0u8; 256];
            s.peek(&mut probe).unwrap_or(0)
        }

        fn tcp_close(&mut self) {
            self.socket = None;
        }

        fn tcp_connected(&mut self) -> bool {
            self.socket.is_some()
        }
    }

}
