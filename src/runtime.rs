//! Concurrency layer (SPEC_FULL.md section 3.5 / spec section 5): two
//! cooperating logical tasks, T_phys and T_guid, over one shared
//! `GuidanceCore` guarded by a single mutex. `tick_once` is the default,
//! single-thread driver the test suite and `main.rs` exercise;
//! `spawn_realtime` is the two-thread real-time variant.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::error::CoreError;
use crate::mission::GuidanceCore;

/// Run physics at `dt_sim` cadence and guidance every `guidance_ratio`
/// physics ticks, for `ticks` physics steps, single-threaded. This is
/// the interleaving the test suite uses: deterministic, no wall-clock
/// sleeps.
pub fn tick_once(core: &mut GuidanceCore, ticks: u32, guidance_ratio: u32) -> Result<(), CoreError> {
    for i in 0..ticks {
        if i % guidance_ratio.max(1) == 0 {
            core.advance_guidance()?;
        }
        core.advance_physics()?;
    }
    Ok(())
}

/// Cooperative cancellation signal shared between the two real-time
/// tasks; both check it at their own cadence boundary (spec section 5,
/// "Cancellation and timeouts").
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Spawn T_phys and T_guid as two real threads sharing `core` behind a
/// mutex, at wall-clock cadences `dt_sim/sim_speed` and
/// `dt_guidance/sim_speed`. Returns the join handles and a `CancelToken`
/// the caller can use to stop both tasks at their next cadence boundary.
/// Errors encountered by either task are forwarded on `error_tx` and the
/// task exits; it does not panic across the thread boundary.
pub fn spawn_realtime(
    core: Arc<Mutex<GuidanceCore>>,
    dt_sim: f64,
    dt_guidance: f64,
    sim_speed: f64,
) -> (CancelToken, mpsc::Receiver<CoreError>, thread::JoinHandle<()>, thread::JoinHandle<()>) {
    let cancel = CancelToken::new();
    let (error_tx, error_rx) = mpsc::channel();

    let phys_core = Arc::clone(&core);
    let phys_cancel = cancel.clone();
    let phys_tx = error_tx.clone();
    let phys_sleep = Duration::from_secs_f64((dt_sim / sim_speed).max(0.0));
    let phys_handle = thread::spawn(move || {
        while !phys_cancel.is_cancelled() {
            let result = {
                let mut guard = phys_core.lock().expect("guidance core mutex poisoned");
                guard.advance_physics()
            };
            if let Err(err) = result {
                let _ = phys_tx.send(err);
                break;
            }
            thread::sleep(phys_sleep);
        }
    });

    let guid_core = Arc::clone(&core);
    let guid_cancel = cancel.clone();
    let guid_tx = error_tx;
    let guid_sleep = Duration::from_secs_f64((dt_guidance / sim_speed).max(0.0));
    let guid_handle = thread::spawn(move || {
        while !guid_cancel.is_cancelled() {
            let result = {
                let mut guard = guid_core.lock().expect("guidance core mutex poisoned");
                guard.advance_guidance()
            };
            if let Err(err) = result {
                let _ = guid_tx.send(err);
                break;
            }
            thread::sleep(guid_sleep);
        }
    });

    (cancel, error_rx, phys_handle, guid_handle)
}
