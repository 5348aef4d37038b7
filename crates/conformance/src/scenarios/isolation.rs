//! Re-initialization isolates sessions

use collector::SensorsSession;
use tracing::{instrument, warn};

use crate::context::ScenarioContext;
use crate::error::{ConformanceError, Result};
use crate::outcome::Outcome;

/// Reinitializes the main session on drop unless already done.
struct RestoreSession<'a> {
    session: &'a SensorsSession,
    restored: bool,
}

impl RestoreSession<'_> {
    fn restore(&mut self) -> Result<()> {
        self.restored = true;
        self.session.reinitialize()?;
        Ok(())
    }
}

impl Drop for RestoreSession<'_> {
    fn drop(&mut self) {
        if !self.restored {
            if let Err(e) = self.session.reinitialize() {
                warn!(error = %e, "failed to restore main session");
            }
        }
    }
}

/// Connect a second session, which must capture every event, then restore
/// the first one, which must receive events again.
#[instrument(name = "call_initialize_twice", skip(ctx))]
pub fn call_initialize_twice(ctx: &ScenarioContext<'_>) -> Result<Outcome> {
    if ctx.catalog.is_empty() {
        return Ok(Outcome::skipped("no sensors"));
    }
    let sensors = ctx.catalog.sensors();
    let window = ctx.config.timeouts.isolation_collection();
    let mut restore = RestoreSession {
        session: ctx.session,
        restored: false,
    };

    let fresh = SensorsSession::connect(ctx.hal.clone(), &ctx.config.session)?;
    {
        let mut guard = ctx.guard();
        guard.activate_all(sensors, true);

        let stale = ctx.session.collect_events(window, 1);
        if !stale.is_empty() {
            return Err(ConformanceError::StaleSessionReceived { count: stale.len() });
        }
        if fresh.collect_events(window, 1).is_empty() {
            return Err(ConformanceError::SessionStarved { session: "fresh" });
        }
        guard.activate_all(sensors, false);
    }
    fresh.tear_down();

    restore.restore()?;
    let mut guard = ctx.guard();
    guard.activate_all(sensors, true);
    let restored = ctx.session.collect_events(window, 1);
    guard.activate_all(sensors, false);
    if restored.is_empty() {
        return Err(ConformanceError::SessionStarved { session: "restored" });
    }
    Ok(Outcome::Passed)
}
