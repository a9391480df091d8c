//! OS-level process control: detachment and escalating termination.

pub mod detach;
pub mod terminate;

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

pub use detach::{DetachError, Detacher, ForkStage, StandardStream, SystemDetacher};
pub use terminate::{
    Delivery, ESCALATION_PAUSE, SignalOutcome, SignalSender, SignalTerminator, SystemSignalSender,
    TERMINATION_SEQUENCE, TerminateError,
};
