//! Sensor list validity

use crate::context::ScenarioContext;
use crate::descriptor::validate_sensor_list;
use crate::error::Result;
use crate::outcome::Outcome;

pub fn sensor_list_valid(ctx: &ScenarioContext<'_>) -> Result<Outcome> {
    validate_sensor_list(ctx.catalog.sensors())?;
    Ok(Outcome::Passed)
}
