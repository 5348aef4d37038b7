//! Activate and batch status scenarios

use contracts::HalError;

use crate::context::ScenarioContext;
use crate::error::{log_status, require_status, Result};
use crate::outcome::Outcome;

/// Activation is idempotent; invalid handles are rejected both ways.
pub fn activate(ctx: &ScenarioContext<'_>) -> Result<Outcome> {
    if ctx.catalog.is_empty() {
        return Ok(Outcome::skipped("no sensors"));
    }
    let mut guard = ctx.guard();

    for sensor in ctx.catalog.sensors() {
        let handle = sensor.handle;
        log_status("batch", handle, guard.hal().batch(handle, sensor.min_delay_ns(), 0));
        for enabled in [true, true, false, false] {
            require_status("activate", handle, guard.activate(handle, enabled), None)?;
        }
    }

    let invalid = ctx.catalog.invalid_handle();
    for enabled in [true, false] {
        require_status(
            "activate",
            invalid,
            guard.activate(invalid, enabled),
            Some(HalError::BadValue),
        )?;
    }
    Ok(Outcome::Passed)
}

/// `batch` is accepted on inactive and active sensors and rejected for an
/// invalid handle.
pub fn batch(ctx: &ScenarioContext<'_>) -> Result<Outcome> {
    let Some(first) = ctx.catalog.sensors().first().cloned() else {
        return Ok(Outcome::skipped("no sensors"));
    };
    let mut guard = ctx.guard();
    guard.activate_all(ctx.catalog.sensors(), false);

    for sensor in ctx.catalog.sensors() {
        let handle = sensor.handle;
        require_status(
            "batch",
            handle,
            guard.hal().batch(handle, sensor.min_delay_ns(), 0),
            None,
        )?;
        log_status("activate", handle, guard.activate(handle, true));
        require_status(
            "batch",
            handle,
            guard.hal().batch(handle, sensor.max_delay_ns(), 0),
            None,
        )?;
    }
    guard.activate_all(ctx.catalog.sensors(), false);

    let invalid = ctx.catalog.invalid_handle();
    require_status(
        "batch",
        invalid,
        guard.hal().batch(invalid, first.min_delay_ns(), 0),
        Some(HalError::BadValue),
    )?;
    Ok(Outcome::Passed)
}
