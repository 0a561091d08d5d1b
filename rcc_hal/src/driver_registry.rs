//! Driver registry for ride I/O drivers.
//!
//! Maps configured driver names to factories. Built at startup and passed by
//! value; no global state.

use rcc_common::hal::driver::{DriverFactory, HalError, RideIo};
use std::collections::HashMap;

/// Registry of available drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in driver.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// Returns `false` and keeps the existing factory if `name` is taken.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) -> bool {
        if self.factories.contains_key(name) {
            return false;
        }
        self.factories.insert(name, factory);
        true
    }

    /// Create a driver instance by name.
    ///
    /// # Errors
    /// `HalError::DriverNotFound` if no driver with that name is registered.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn RideIo>, HalError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// Registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
