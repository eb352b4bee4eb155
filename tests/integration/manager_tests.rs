//! Manager-level integration tests: bring-up, arbitration, failover
//! and change notification against fully scripted collaborators.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use netmux::manager::LinkKind;
use netmux::{NetConfig, NetMode};

use crate::mock_net::Rig;

#[test]
fn start_gsm_only_settles_on_gsm() {
    let rig = Rig::new();
    rig.begin(NetConfig::default()); // no SSID → downgraded to GsmOnly
    assert_eq!(rig.net.mode(), NetMode::GsmOnly);

    rig.net.start();

    assert_eq!(rig.net.kind(), LinkKind::Gsm);
    assert!(rig.net.connected());
    assert_eq!(rig.kinds_seen(), vec![LinkKind::Gsm]);
    // Full bring-up ran Reset + Init.
    assert!(rig.modem.init_calls.load(Ordering::SeqCst) >= 2);
}

#[test]
fn start_is_idempotent() {
    let rig = Rig::new();
    rig.begin(NetConfig::default());
    rig.net.start();
    let gprs_calls = rig.modem.gprs_calls.load(Ordering::SeqCst);

    rig.net.start();

    assert_eq!(rig.modem.gprs_calls.load(Ordering::SeqCst), gprs_calls);
    assert_eq!(rig.kinds_seen(), vec![LinkKind::Gsm]);
}

#[test]
fn start_wifi_only_never_touches_the_modem() {
    let rig = Rig::new();
    let mut cfg = Rig::config_with_ssid("HomeNet");
    cfg.mode = NetMode::WifiOnly;
    rig.link.set_join_allowed(true);
    rig.begin(cfg);

    rig.net.start();

    assert_eq!(rig.net.kind(), LinkKind::Wifi);
    assert_eq!(rig.modem.init_calls.load(Ordering::SeqCst), 0);
    assert_eq!(rig.modem.gprs_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn start_survives_failed_gsm_bring_up() {
    let rig = Rig::new();
    rig.link.set_join_allowed(true);
    rig.modem.network_up.store(false, Ordering::SeqCst);
    rig.begin(Rig::config_with_ssid("HomeNet"));

    rig.net.start();

    // GSM bring-up timed out, WiFi still came up.
    assert_eq!(rig.net.kind(), LinkKind::Wifi);
    assert!(rig.net.connected());
}

#[test]
fn wifi_monitor_restores_the_link() {
    let rig = Rig::new();
    rig.link.set_join_allowed(true);
    rig.begin(Rig::config_with_ssid("HomeNet"));
    rig.net.start();
    assert_eq!(rig.net.kind(), LinkKind::Wifi);

    // Drop the OS link; the monitor spawned by start() re-associates.
    rig.link.set_up(false);
    let deadline = Instant::now() + Duration::from_secs(5);
    while !rig.link.is_up() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(rig.link.is_up(), "monitor did not re-associate");
    assert_eq!(rig.net.kind(), LinkKind::Wifi);
}

#[test]
fn wifi_loss_fails_over_to_gsm() {
    let rig = Rig::new();
    rig.begin(Rig::config_with_ssid("HomeNet"));

    rig.bring_wifi_up();
    rig.bring_gsm_up();
    assert_eq!(rig.net.kind(), LinkKind::Wifi);

    rig.drop_wifi();

    assert_eq!(rig.net.kind(), LinkKind::Gsm);
    assert_eq!(rig.kinds_seen(), vec![LinkKind::Wifi, LinkKind::Gsm]);
}

#[test]
fn wifi_recovery_takes_back_priority() {
    let rig = Rig::new();
    rig.begin(Rig::config_with_ssid("HomeNet"));

    rig.bring_gsm_up();
    assert_eq!(rig.net.kind(), LinkKind::Gsm);

    rig.bring_wifi_up();

    assert_eq!(rig.net.kind(), LinkKind::Wifi);
    assert_eq!(rig.kinds_seen(), vec![LinkKind::Gsm, LinkKind::Wifi]);
}

#[test]
fn callback_is_silent_on_unchanged_recompute() {
    let rig = Rig::new();
    rig.begin(Rig::config_with_ssid("HomeNet"));

    rig.bring_wifi_up();
    rig.net.poll();
    rig.net.poll();

    assert_eq!(rig.kinds_seen(), vec![LinkKind::Wifi]);
}

#[test]
fn gsm_task_one_shot_reattaches_when_unregistered() {
    let rig = Rig::new();
    rig.begin(NetConfig::default());
    rig.modem.network_up.store(false, Ordering::SeqCst);

    rig.net.gsm_task(false);

    assert_eq!(rig.modem.gprs_calls.load(Ordering::SeqCst), 1);
    assert_eq!(rig.net.kind(), LinkKind::Gsm);
    assert!(rig.net.last_link_at_ms() > 0);
}

#[test]
fn gsm_task_idles_while_registered() {
    let rig = Rig::new();
    rig.begin(NetConfig::default());
    rig.modem.network_up.store(true, Ordering::SeqCst);

    rig.net.gsm_task(false);

    assert_eq!(rig.modem.gprs_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn monitors_respect_the_mode() {
    let rig = Rig::new();
    let mut cfg = Rig::config_with_ssid("HomeNet");
    cfg.mode = NetMode::WifiOnly;
    rig.begin(cfg);

    rig.net.gsm_task(false);
    assert_eq!(rig.modem.gprs_calls.load(Ordering::SeqCst), 0);

    let rig2 = Rig::new();
    rig2.begin(NetConfig::default()); // GsmOnly
    rig2.link.set_join_allowed(true);
    rig2.net.wifi_task(false);
    assert_eq!(rig2.net.kind(), LinkKind::None);
}

#[test]
fn end_tears_down_the_active_transport() {
    let rig = Rig::new();
    rig.begin(NetConfig::default());
    rig.net.start();
    assert_eq!(rig.net.kind(), LinkKind::Gsm);

    rig.net.end();

    assert_eq!(rig.net.kind(), LinkKind::None);
    assert!(rig.modem.detached.load(Ordering::SeqCst));
    assert_eq!(rig.kinds_seen(), vec![LinkKind::Gsm, LinkKind::None]);
    assert!(!rig.net.connected());
}

#[test]
fn connected_cross_checks_live_status() {
    let rig = Rig::new();
    rig.begin(NetConfig::default());
    rig.net.start();
    assert!(rig.net.connected());

    // Registration drops but no monitor pass has run: the kind is still
    // Gsm, yet the live cross-check must fail.
    rig.modem.network_up.store(false, Ordering::SeqCst);
    assert_eq!(rig.net.kind(), LinkKind::Gsm);
    assert!(!rig.net.connected());
}
