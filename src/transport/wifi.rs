//! WiFi transport — single-stage connect with bounded polling.

use std::sync::Arc;

use log::info;

use crate::error::Result;
use crate::ports::{TimePort, WifiPort};
use crate::retry::Bounded;

/// Interval between association status polls.
const POLL_INTERVAL_MS: u64 = 500;

/// Thin bring-up wrapper over a [`WifiPort`] driver.
pub struct WifiTransport {
    driver: Box<dyn WifiPort>,
    clock: Arc<dyn TimePort>,
}

impl WifiTransport {
    pub fn new(driver: Box<dyn WifiPort>, clock: Arc<dyn TimePort>) -> Self {
        Self { driver, clock }
    }

    /// Begin association and poll until connected or `timeout_ms` elapses.
    ///
    /// A zero timeout fails immediately without polling.  `silent`
    /// suppresses progress logging for background-monitor calls.
    pub fn connect(
        &mut self,
        ssid: &str,
        password: &str,
        timeout_ms: u64,
        silent: bool,
    ) -> Result<()> {
        if !silent {
            info!("WiFi: connecting to '{}'", ssid);
        }

        self.driver.begin(ssid, password);

        let driver = &mut self.driver;
        Bounded::new(timeout_ms)
            .with_pause_ms(POLL_INTERVAL_MS)
            .run(&*self.clock, || driver.is_connected())
            .map_err(|e| e.at_stage("wifi associate"))?;

        if !silent {
            info!("WiFi: connected to '{}'", ssid);
        }
        Ok(())
    }

    /// Live driver status, never a cached flag.
    pub fn status(&mut self) -> bool {
        self.driver.is_connected()
    }

    pub fn end(&mut self) {
        self.driver.disconnect();
        info!("WiFi: disconnected");
    }
}
