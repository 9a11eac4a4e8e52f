// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn system_clock_returns_increasing_time() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 > t1);
}

#[test]
fn system_clock_epoch_is_sane() {
    let clock = SystemClock;
    // Well past 2020-01-01 in milliseconds.
    assert!(clock.epoch_ms() > 1_577_836_800_000);
}

#[test]
fn fake_clock_can_be_advanced() {
    let clock = FakeClock::new();
    let e1 = clock.epoch_ms();
    clock.advance(Duration::from_secs(60));
    assert_eq!(clock.epoch_ms(), e1 + 60_000);
}

#[test]
fn fake_clock_advances_instant_too() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    clock.advance(Duration::from_secs(30));
    assert!(clock.now().duration_since(t1) >= Duration::from_secs(30));
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    clock2.set_epoch_ms(42);
    assert_eq!(clock1.epoch_ms(), 42);
}
