//! Ephemeral port allocation.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use rand::Rng;

use crate::error::LifecycleError;

/// Ports handed to launched apps.
pub const EPHEMERAL_PORTS: RangeInclusive<u16> = 49152..=65535;

/// Draws attempted before giving up with `PortExhausted`.
pub const MAX_PORT_DRAWS: usize = 10;

/// Source of candidate ports.
pub trait PortSource: Send + Sync {
    fn draw(&self) -> u16;
}

/// Uniform draws over [`EPHEMERAL_PORTS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPorts;

impl PortSource for RandomPorts {
    fn draw(&self) -> u16 {
        rand::thread_rng().gen_range(EPHEMERAL_PORTS)
    }
}

/// Draw until a port is in range and not in `in_use`, at most `max_draws` times.
pub fn allocate(
    source: &dyn PortSource,
    in_use: &HashSet<u16>,
    max_draws: usize,
) -> Result<u16, LifecycleError> {
    for attempt in 1..=max_draws {
        let port = source.draw();
        if EPHEMERAL_PORTS.contains(&port) && !in_use.contains(&port) {
            return Ok(port);
        }
        tracing::debug!(port, attempt, "port draw rejected, redrawing");
    }
    Err(LifecycleError::PortExhausted {
        attempts: max_draws,
    })
}
