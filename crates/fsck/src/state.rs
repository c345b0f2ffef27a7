//! Replaces the original's `bool mEnabled` flag with an explicit state
//! machine and a single transition entry point (§9 DESIGN NOTES).

use std::sync::Mutex;
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsckState {
    Disabled,
    Enabled,
}

/// Shared config store `enabled`/`interval` are written through on every
/// transition (§4.5 "Persistence").
pub trait ConfigStore: Send + Sync {
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn get(&self, key: &str) -> Option<String>;
}

pub struct FsckController<C: ConfigStore> {
    state: Mutex<FsckState>,
    interval: Mutex<Duration>,
    config: C,
}

impl<C: ConfigStore> FsckController<C> {
    pub fn new(config: C, default_interval: Duration) -> Self {
        FsckController {
            state: Mutex::new(FsckState::Disabled),
            interval: Mutex::new(default_interval),
            config,
        }
    }

    pub fn state(&self) -> FsckState {
        *self.state.lock().expect("fsck state lock poisoned")
    }

    pub fn interval(&self) -> Duration {
        *self.interval.lock().expect("fsck interval lock poisoned")
    }

    pub fn enable(&self) -> Result<()> {
        *self.state.lock().expect("fsck state lock poisoned") = FsckState::Enabled;
        self.config.set("fsck.enabled", "true")?;
        log::info!("fsck enabled");
        Ok(())
    }

    pub fn disable(&self) -> Result<()> {
        *self.state.lock().expect("fsck state lock poisoned") = FsckState::Disabled;
        self.config.set("fsck.enabled", "false")?;
        log::info!("fsck disabled");
        Ok(())
    }

    pub fn set_interval(&self, interval: Duration) -> Result<()> {
        *self.interval.lock().expect("fsck interval lock poisoned") = interval;
        self.config
            .set("fsck.interval_secs", &interval.as_secs().to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    pub struct FakeConfigStore(StdMutex<HashMap<String, String>>);

    impl ConfigStore for FakeConfigStore {
        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn get(&self, key: &str) -> Option<String> {
            self.0.lock().unwrap().get(key).cloned()
        }
    }

    #[test]
    fn enable_disable_persists_through_config_store() {
        let controller = FsckController::new(FakeConfigStore::default(), Duration::from_secs(1800));
        assert_eq!(controller.state(), FsckState::Disabled);

        controller.enable().unwrap();
        assert_eq!(controller.state(), FsckState::Enabled);
        assert_eq!(controller.config.get("fsck.enabled"), Some("true".into()));

        controller.disable().unwrap();
        assert_eq!(controller.state(), FsckState::Disabled);
        assert_eq!(controller.config.get("fsck.enabled"), Some("false".into()));
    }
}
