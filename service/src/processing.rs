//! The background processing runner.
//!
//! A single long-running task drives [`OrderService::process_next_order`]
//! in a loop, sleeping for whatever wait hint each pass returns. The
//! sleep races against the shutdown channel so cancellation interrupts
//! a wait instead of draining it.

use tokio::sync::watch;

use pointmart_store::Ledger;

use crate::orders::OrderService;

/// Run the processing loop until the shutdown channel fires.
///
/// Each iteration performs one [`OrderService::process_next_order`] step
/// and then waits for the returned duration. Errors on individual
/// orders never stop the loop; only shutdown does.
pub async fn run<L: Ledger>(orders: OrderService<L>, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("order processing runner started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        let wait = orders.process_next_order().await;
        tokio::select! {
            changed = shutdown.changed() => {
                // A closed channel means the sender is gone; stop as well.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            () = tokio::time::sleep(wait) => {}
        }
    }
    tracing::info!("order processing runner stopped");
}
