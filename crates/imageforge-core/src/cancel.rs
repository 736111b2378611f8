use std::sync::atomic::{AtomicBool, Ordering};

static CANCEL_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl-C handler. The first interrupt requests an orderly
/// stop at the next step boundary; a second one aborts immediately,
/// leaking whatever the build had in flight.
pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        if CANCEL_REQUESTED.load(Ordering::SeqCst) {
            std::process::exit(1);
        }
        CANCEL_REQUESTED.store(true, Ordering::SeqCst);
        eprintln!("\ncancellation requested, cleaning up after the current step...");
    });
}

pub fn cancel_requested() -> bool {
    CANCEL_REQUESTED.load(Ordering::SeqCst)
}

/// Request cancellation programmatically, as the signal handler would.
pub fn request_cancel() {
    CANCEL_REQUESTED.store(true, Ordering::SeqCst);
}
