//! The CPU burn worker.
//!
//! A worker is the benchmark binary re-executed with [`WORKER_FLAG`]. It
//! spins a linear-congruential loop on one core until its stdin is closed,
//! which is the only signal the parent ever sends it.

use std::hint::black_box;
use std::io::{ErrorKind, Read};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Hidden command-line flag selecting worker mode.
pub const WORKER_FLAG: &str = "--burn-worker";

/// Iterations between stop-flag checks.
pub const BATCH_ITERATIONS: u32 = 100_000;

/// One LCG step, kept to 31 bits.
#[inline]
pub fn lcg_step(x: u32) -> u32 {
    x.wrapping_mul(1_103_515_245).wrapping_add(12_345) & 0x7FFF_FFFF
}

/// Run one batch starting from `x` and return the final state.
pub fn burn_batch(mut x: u32) -> u32 {
    for _ in 0..BATCH_ITERATIONS {
        x = lcg_step(black_box(x));
    }
    x
}

/// Burn batches until `stop` is set. The flag is checked between batches
/// only, so a stop takes effect within one batch.
pub fn burn_until(stop: &AtomicBool) -> u32 {
    let mut x = 1;
    while !stop.load(Ordering::Relaxed) {
        x = burn_batch(x);
    }
    x
}

/// Block until `input` reaches end of file or fails.
pub fn wait_for_eof(mut input: impl Read) {
    let mut buf = [0u8; 64];
    loop {
        match input.read(&mut buf) {
            Ok(0) => return,
            Ok(_) => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => return,
        }
    }
}

/// Worker process entry point.
pub fn run_worker() -> ExitCode {
    let stop = Arc::new(AtomicBool::new(false));

    let watcher = {
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            wait_for_eof(std::io::stdin().lock());
            stop.store(true, Ordering::Relaxed);
        })
    };

    black_box(burn_until(&stop));
    let _ = watcher.join();
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use super::*;

    #[test]
    fn lcg_matches_reference_values() {
        assert_eq!(lcg_step(1), 1_103_527_590);
        // Wrapping must agree with unbounded arithmetic masked to 31 bits.
        let x = 0x7FFF_FFFFu32;
        let wide = (u64::from(x) * 1_103_515_245 + 12_345) & 0x7FFF_FFFF;
        assert_eq!(u64::from(lcg_step(x)), wide);
    }

    #[test]
    fn preset_flag_stops_before_any_batch() {
        let stop = AtomicBool::new(true);
        assert_eq!(burn_until(&stop), 1);
    }

    #[test]
    fn flag_set_from_another_thread_stops_the_loop() {
        let stop = Arc::new(AtomicBool::new(false));
        let setter = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                stop.store(true, Ordering::Relaxed);
            })
        };

        burn_until(&stop);
        setter.join().unwrap();
        assert!(stop.load(Ordering::Relaxed));
    }

    #[test]
    fn eof_ends_the_wait() {
        wait_for_eof(Cursor::new(b"ignored input".to_vec()));
        wait_for_eof(std::io::empty());
    }
}
