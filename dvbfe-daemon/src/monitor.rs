//! Periodic signal report for running adapters.

use dvbfe::{Adapter, TargetRef, TuningTarget};
use log::{debug, info};

/// An adapter and the muxes configured for it.
pub struct RunningAdapter {
    pub adapter: Adapter,
    pub muxes: Vec<TargetRef>,
}

/// One-line summary of a target's last poll.
pub fn describe(target: &TuningTarget) -> String {
    let Some(status) = target.status() else {
        return format!("\"{}\": waiting for first poll", target);
    };

    let histogram = target.fec_histogram();
    match histogram.mean() {
        Some(mean) => format!(
            "\"{}\": {}, uncorrected blocks avg {:.1} over {} samples",
            target,
            status,
            mean,
            histogram.len()
        ),
        None => format!("\"{}\": {}", target, status),
    }
}

pub fn report(adapters: &[RunningAdapter]) {
    for running in adapters {
        let adapter = &running.adapter;
        match adapter.current() {
            Some(target) => info!("\"{}\" {}", adapter.path(), describe(&target)),
            None => debug!(
                "\"{}\" idle ({} pending, {} muxes configured)",
                adapter.path(),
                adapter.pending(),
                running.muxes.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvbfe::{Polarisation, TuningParams};

    #[test]
    fn test_describe_before_first_poll() {
        let target = TuningTarget::new(TuningParams::qpsk(11_494_000, 22_000_000))
            .with_polarisation(Polarisation::Horizontal);
        assert_eq!(describe(&target), "\"11494000 H\": waiting for first poll");
    }
}
