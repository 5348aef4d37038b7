//! Per-scenario context

use std::ops::Deref;
use std::sync::Arc;

use collector::{EventCollector, SensorsSession};
use contracts::{SensorsHal, SuiteConfig};

use crate::catalog::SensorCatalog;
use crate::guard::HalGuard;

/// Everything a scenario needs: the HAL, the session it delivers into, the
/// suite configuration and a fresh sensor list.
pub struct ScenarioContext<'a> {
    pub hal: &'a Arc<dyn SensorsHal>,
    pub session: &'a SensorsSession,
    pub config: &'a SuiteConfig,
    pub catalog: SensorCatalog,
}

impl<'a> ScenarioContext<'a> {
    pub fn new(
        hal: &'a Arc<dyn SensorsHal>,
        session: &'a SensorsSession,
        config: &'a SuiteConfig,
    ) -> Self {
        Self {
            hal,
            session,
            config,
            catalog: SensorCatalog::fetch(hal.as_ref()),
        }
    }

    pub fn guard(&self) -> HalGuard {
        HalGuard::new(self.hal.clone())
    }

    /// Register a fresh collector with the session until the returned value
    /// is dropped.
    pub fn subscribe(&self) -> Subscription<'a> {
        let collector = Arc::new(EventCollector::new());
        self.session.register_callback(collector.clone());
        Subscription {
            session: self.session,
            collector,
        }
    }
}

/// A collector registered with a session.
pub struct Subscription<'a> {
    session: &'a SensorsSession,
    collector: Arc<EventCollector>,
}

impl Deref for Subscription<'_> {
    type Target = EventCollector;

    fn deref(&self) -> &EventCollector {
        &self.collector
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.session.unregister_callback();
    }
}
