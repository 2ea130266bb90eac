//! Per-invocation wiring: config, scoped store and core components.

use std::sync::Arc;

use miqat_core::geo::GeoResolver;
use miqat_core::{
    AdjustmentStore, AladhanProvider, AlarmStore, CachingProvider, Config, CoreError, Database,
    KeyValueStore, PrayerSchedule, PrayerTimeProvider, SessionKeyScope,
};

use crate::platform;

pub struct App {
    pub config: Config,
    pub store: Arc<SessionKeyScope<Database>>,
}

impl App {
    pub fn open() -> Result<Self, CoreError> {
        let config = Config::load()?;
        let store = SessionKeyScope::restore(Database::open()?)?;
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    pub fn kv(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    pub fn provider(&self) -> Result<Arc<dyn PrayerTimeProvider>, CoreError> {
        let client = AladhanProvider::new(&self.config.provider)?;
        Ok(Arc::new(CachingProvider::new(client)))
    }

    pub fn schedule(&self) -> Result<PrayerSchedule, CoreError> {
        Ok(PrayerSchedule::new(self.provider()?, self.adjustments()))
    }

    pub fn resolver(&self) -> GeoResolver {
        GeoResolver::new(
            self.kv(),
            Arc::new(platform::EnvLocator),
            &self.config.location,
        )
    }

    pub fn adjustments(&self) -> AdjustmentStore {
        AdjustmentStore::new(self.kv())
    }

    pub fn alarms(&self) -> AlarmStore {
        AlarmStore::new(self.kv())
    }
}
