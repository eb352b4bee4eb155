//! Transport-agnostic stream facade.
//!
//! [`NetStream`] is what upper-layer protocol clients get: a byte stream
//! bound at construction to whichever transport was active at that
//! moment.  Every operation re-validates the binding against the live
//! manager state — a later failover or reconnect makes the adapter
//! stale, and stale adapters degrade to silent no-ops returning neutral
//! sentinels instead of forwarding to the wrong transport.
//!
//! ## Ownership
//!
//! The facade owns at most one boxed [`RawStream`].  When a TLS root
//! certificate is configured that box is a [`TlsStream`](tls::TlsStream)
//! decorator which in turn exclusively owns the raw socket, so dropping
//! the facade (or calling [`stop`](NetStream::stop)) tears down the
//! whole chain at one point.

pub mod tls;

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};

use crate::error::{Error, StreamError};
use crate::manager::{LinkKind, NetManager};
use crate::ports::ModemPort;
use crate::util::lock;

// ───────────────────────────────────────────────────────────────
// Raw stream contract
// ───────────────────────────────────────────────────────────────

/// Byte-stream surface implemented by the concrete per-transport
/// sockets and by the TLS decorator.
///
/// Reads are non-blocking: `Ok(0)` means no data pending, not EOF
/// (EOF surfaces as [`StreamError::NotConnected`]).
pub trait RawStream: Send {
    fn connect(&mut self, host: &str, port: u16, timeout_ms: u64) -> Result<(), StreamError>;
    fn write(&mut self, data: &[u8]) -> Result<usize, StreamError>;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError>;
    fn peek_byte(&mut self) -> Option<u8>;
    fn available(&mut self) -> usize;
    fn flush(&mut self) -> Result<(), StreamError>;
    fn close(&mut self);
    fn is_connected(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// WiFi socket (plain TCP through the OS stack)
// ───────────────────────────────────────────────────────────────

/// Probe depth for [`RawStream::available`] on OS sockets.
const AVAILABLE_PROBE_BYTES: usize = 512;

/// TCP socket routed through the OS network stack (lwIP on ESP-IDF,
/// the host stack in simulation).  Non-blocking once connected.
pub struct WifiSocket {
    stream: Option<TcpStream>,
}

impl WifiSocket {
    pub fn new() -> Self {
        Self { stream: None }
    }
}

impl RawStream for WifiSocket {
    fn connect(&mut self, host: &str, port: u16, timeout_ms: u64) -> Result<(), StreamError> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|_| StreamError::Io)?
            .next()
            .ok_or(StreamError::Io)?;
        let stream = TcpStream::connect_timeout(&addr, Duration::from_millis(timeout_ms))
            .map_err(|_| StreamError::Io)?;
        stream.set_nonblocking(true).map_err(|_| StreamError::Io)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        let stream = self.stream.as_mut().ok_or(StreamError::NotConnected)?;
        match stream.write(data) {
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(_) => {
                self.stream.take();
                Err(StreamError::Io)
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let stream = self.stream.as_mut().ok_or(StreamError::NotConnected)?;
        match stream.read(buf) {
            Ok(0) => {
                self.stream.take();
                Err(StreamError::NotConnected)
            }
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(_) => {
                self.stream.take();
                Err(StreamError::Io)
            }
        }
    }

    fn peek_byte(&mut self) -> Option<u8> {
        let stream = self.stream.as_mut()?;
        let mut b = [0u8; 1];
        match stream.peek(&mut b) {
            Ok(1..) => Some(b[0]),
            _ => None,
        }
    }

    fn available(&mut self) -> usize {
        let Some(stream) = self.stream.as_mut() else {
            return 0;
        };
        let mut probe = [0u8; AVAILABLE_PROBE_BYTES];
        match stream.peek(&mut probe) {
            Ok(n) => n,
            Err(_) => 0,
        }
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        let stream = self.stream.as_mut().ok_or(StreamError::NotConnected)?;
        stream.flush().map_err(|_| StreamError::Io)
    }

    fn close(&mut self) {
        self.stream.take();
    }

    fn is_connected(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        let mut b = [0u8; 1];
        match stream.peek(&mut b) {
            // Peer closed the connection.
            Ok(0) => {
                self.stream.take();
                false
            }
            Ok(_) => true,
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => true,
            Err(_) => {
                self.stream.take();
                false
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Modem socket (GPRS socket channel on the shared modem)
// ───────────────────────────────────────────────────────────────

/// Socket tunnelled through the modem's GPRS channel.  Shares the
/// modem handle with the manager; each call holds the modem lock only
/// for its own duration.
pub struct ModemSocket {
    modem: Arc<Mutex<dyn ModemPort>>,
}

impl ModemSocket {
    pub fn new(modem: Arc<Mutex<dyn ModemPort>>) -> Self {
        Self { modem }
    }
}

impl RawStream for ModemSocket {
    fn connect(&mut self, host: &str, port: u16, timeout_ms: u64) -> Result<(), StreamError> {
        if lock(&self.modem).tcp_connect(host, port, timeout_ms) {
            Ok(())
        } else {
            Err(StreamError::Io)
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        Ok(lock(&self.modem).tcp_write(data))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        Ok(lock(&self.modem).tcp_read(buf))
    }

    fn peek_byte(&mut self) -> Option<u8> {
        lock(&self.modem).tcp_peek()
    }

    fn available(&mut self) -> usize {
        lock(&self.modem).tcp_available()
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        // The AT driver flushes per write command.
        Ok(())
    }

    fn close(&mut self) {
        lock(&self.modem).tcp_close();
    }

    fn is_connected(&mut self) -> bool {
        lock(&self.modem).tcp_connected()
    }
}

// ───────────────────────────────────────────────────────────────
// NetStream facade
// ───────────────────────────────────────────────────────────────

/// Failed `connect()` calls in a row that trigger a diagnostic.
const CONNECT_FAILURE_DIAG_THRESHOLD: u32 = 2;

/// A byte stream bound to whichever transport was active when it was
/// created.
///
/// All operations return neutral sentinels (`0`, `-1`, `false`) once
/// the binding is stale; nothing is ever forwarded to a transport other
/// than the one captured at construction.
pub struct NetStream {
    net: NetManager,
    bound_kind: LinkKind,
    bound_at_ms: u64,
    stream: Option<Box<dyn RawStream>>,
}

impl NetStream {
    /// Bind to the manager's current transport.
    ///
    /// With a TLS root certificate configured the raw socket is wrapped
    /// in a [`TlsStream`](tls::TlsStream) decorator; the decorator owns
    /// the socket and this adapter owns the decorator.
    pub fn new(net: &NetManager) -> Self {
        let bound_kind = net.kind();
        let bound_at_ms = net.last_link_at_ms();

        let raw: Option<Box<dyn RawStream>> = match bound_kind {
            LinkKind::Wifi => Some(Box::new(WifiSocket::new())),
            LinkKind::Gsm => Some(Box::new(ModemSocket::new(net.modem_handle()))),
            LinkKind::None => {
                debug!("NetStream: created with no active link");
                None
            }
        };

        let stream = match (raw, net.tls_root_ca()) {
            (Some(inner), Some(root_ca)) => {
                Some(Box::new(tls::TlsStream::new(inner, root_ca)) as Box<dyn RawStream>)
            }
            (raw, _) => raw,
        };

        Self {
            net: net.clone(),
            bound_kind,
            bound_at_ms,
            stream,
        }
    }

    /// The link kind captured at construction.
    pub fn bound_kind(&self) -> LinkKind {
        self.bound_kind
    }

    // ── Binding validation ────────────────────────────────────
    //
    // Re-checked on every call, never cached: the manager state moves
    // underneath long-lived adapters.

    fn guard(&self) -> Result<(), Error> {
        if self.net.kind() != self.bound_kind {
            return Err(Error::StaleAdapter);
        }
        if self.bound_kind == LinkKind::None {
            return Err(Error::TransportAbsent);
        }
        if self.net.last_link_at_ms() > self.bound_at_ms {
            return Err(Error::StaleAdapter);
        }
        if self.stream.is_none() {
            return Err(Error::TransportAbsent);
        }
        if self.bound_kind == LinkKind::Gsm && !self.net.gsm_allowed() {
            return Err(Error::TransportDisabled);
        }
        Ok(())
    }

    fn reject(&self, op: &'static str, e: Error) {
        debug!("NetStream: {op} rejected ({e}), kind={:?}", self.bound_kind);
    }

    // ── Stream contract ───────────────────────────────────────

    /// Connect to `host:port` with the configured timeout.
    pub fn connect(&mut self, host: &str, port: u16) -> bool {
        let timeout_ms = self.net.stream_connect_timeout_ms();
        self.connect_with_timeout(host, port, timeout_ms)
    }

    /// Connect with an explicit timeout.
    ///
    /// Genuine connect failures feed the manager-wide consecutive
    /// failure counter; binding-guard rejections do not.
    pub fn connect_with_timeout(&mut self, host: &str, port: u16, timeout_ms: u64) -> bool {
        if let Err(e) = self.guard() {
            self.reject("connect", e);
            return false;
        }
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        let ok = stream.connect(host, port, timeout_ms).is_ok();
        if ok {
            self.net.reset_connect_failures();
        } else {
            let failures = self.net.note_connect_failure();
            if failures >= CONNECT_FAILURE_DIAG_THRESHOLD {
                warn!("NetStream: connect failed {failures} times in a row");
            }
        }
        ok
    }

    /// Write a buffer; returns bytes accepted (0 when stale or failed).
    pub fn write(&mut self, data: &[u8]) -> usize {
        if let Err(e) = self.guard() {
            self.reject("write", e);
            return 0;
        }
        match self.stream.as_mut() {
            Some(s) => s.write(data).unwrap_or(0),
            None => 0,
        }
    }

    /// Write a single byte.
    pub fn write_byte(&mut self, b: u8) -> usize {
        self.write(&[b])
    }

    /// Bytes immediately readable (0 when stale).
    pub fn available(&mut self) -> i32 {
        if let Err(e) = self.guard() {
            self.reject("available", e);
            return 0;
        }
        match self.stream.as_mut() {
            Some(s) => s.available() as i32,
            None => 0,
        }
    }

    /// Read one byte; `-1` when no data, `0` when stale.
    pub fn read(&mut self) -> i32 {
        if let Err(e) = self.guard() {
            self.reject("read", e);
            return 0;
        }
        let mut b = [0u8; 1];
        match self.stream.as_mut() {
            Some(s) => match s.read(&mut b) {
                Ok(1..) => i32::from(b[0]),
                _ => -1,
            },
            None => -1,
        }
    }

    /// Read into a buffer; bytes read, `-1` on stream error, `0` when
    /// stale or no data.
    pub fn read_buf(&mut self, buf: &mut [u8]) -> i32 {
        if let Err(e) = self.guard() {
            self.reject("read_buf", e);
            return 0;
        }
        match self.stream.as_mut() {
            Some(s) => match s.read(buf) {
                Ok(n) => n as i32,
                Err(_) => -1,
            },
            None => -1,
        }
    }

    /// Peek at the next byte; `-1` when none, `0` when stale.
    pub fn peek(&mut self) -> i32 {
        if let Err(e) = self.guard() {
            self.reject("peek", e);
            return 0;
        }
        match self.stream.as_mut() {
            Some(s) => s.peek_byte().map_or(-1, i32::from),
            None => -1,
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.guard() {
            self.reject("flush", e);
            return;
        }
        if let Some(s) = self.stream.as_mut() {
            let _ = s.flush();
        }
    }

    /// Close the connection and drop the owned stream chain.
    pub fn stop(&mut self) {
        if let Err(e) = self.guard() {
            self.reject("stop", e);
            return;
        }
        if let Some(mut s) = self.stream.take() {
            s.close();
        }
    }

    /// Whether the bound stream is live (false when stale).
    pub fn connected(&mut self) -> bool {
        if let Err(e) = self.guard() {
            self.reject("connected", e);
            return false;
        }
        match self.stream.as_mut() {
            Some(s) => s.is_connected(),
            None => false,
        }
    }
}
