//! Physical transports.
//!
//! | Transport | Bring-up shape                                   |
//! |-----------|--------------------------------------------------|
//! | `modem`   | Reset → Init → NetworkWait → GprsConnect, each a bounded-retry stage |
//! | `wifi`    | single bounded-retry association poll            |

pub mod modem;
pub mod wifi;

pub use modem::{ModemDiagnostics, ModemTransport};
pub use wifi::WifiTransport;
