//! Device profiles and the immutable device registry.
//!
//! The registry is the static table of physical devices allowed to trigger an
//! actuation.  Configuration expresses it as two parallel mappings keyed by
//! device name:
//!
//! ```toml
//! [devices.hardware]
//! front_door = "aa:bb:cc:dd:ee:01"
//! garage     = "aa:bb:cc:dd:ee:02"
//!
//! [devices.targets]
//! front_door = "101"
//! garage     = "102"
//! ```
//!
//! [`DeviceRegistry::from_parallel_maps`] joins the two maps into a list of
//! [`DeviceProfile`]s and validates the result once, at startup.  After that
//! the registry is never mutated; restarting the process is the only way to
//! pick up a change.
//!
//! # Matching policy
//!
//! [`DeviceRegistry::match_field`] scans profiles in registry order and returns
//! the **first** profile whose canonical hardware identifier is contained in
//! the captured hardware field.  Scanning stops at the first hit, so an event
//! never yields more than one profile, even when a crafted field contains the
//! identifiers of several devices.

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

use crate::domain::event::CapturedEvent;
use crate::domain::hardware_id::{HardwareId, HardwareIdError};

/// Error raised while building a [`DeviceRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two profiles share the same name.
    #[error("device name '{0}' is registered more than once")]
    DuplicateName(String),

    /// Two profiles share the same hardware identifier.
    #[error("hardware identifier {hardware_id} is used by both '{first}' and '{second}'")]
    DuplicateHardwareId {
        hardware_id: HardwareId,
        first: String,
        second: String,
    },

    /// A device has a hardware identifier but no actuation target.
    #[error("device '{0}' has a hardware identifier but no actuation target id")]
    MissingTarget(String),

    /// A device has an actuation target but no hardware identifier.
    #[error("device '{0}' has an actuation target id but no hardware identifier")]
    MissingHardwareId(String),

    /// A device's actuation target id is blank.
    #[error("device '{0}' has an empty actuation target id")]
    EmptyTarget(String),

    /// A device's hardware identifier could not be parsed.
    #[error("device '{name}': {source}")]
    InvalidHardwareId {
        name: String,
        #[source]
        source: HardwareIdError,
    },
}

/// One physical device authorised to trigger an actuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Human-readable label, unique within the registry.
    pub name: String,
    /// Link-layer address used as the correlation key.
    pub hardware_id: HardwareId,
    /// Opaque identifier passed to the actuation endpoint.
    pub actuation_target_id: String,
}

impl DeviceProfile {
    pub fn new(
        name: impl Into<String>,
        hardware_id: HardwareId,
        actuation_target_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            hardware_id,
            actuation_target_id: actuation_target_id.into(),
        }
    }
}

/// Immutable, validated table of [`DeviceProfile`]s.
///
/// Shared across tasks as `Arc<DeviceRegistry>`; it has no interior
/// mutability and needs no locking.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    profiles: Vec<DeviceProfile>,
    /// Canonical text of each profile's hardware id, same order as `profiles`.
    match_keys: Vec<String>,
}

impl DeviceRegistry {
    /// Builds a registry from an ordered list of profiles.
    ///
    /// The order of `profiles` is the order the matching policy scans in.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] or
    /// [`RegistryError::DuplicateHardwareId`] when uniqueness is violated, and
    /// [`RegistryError::EmptyTarget`] for a blank target id.
    pub fn new(profiles: Vec<DeviceProfile>) -> Result<Self, RegistryError> {
        let mut names: HashSet<&str> = HashSet::with_capacity(profiles.len());
        let mut ids: HashMap<HardwareId, &str> = HashMap::with_capacity(profiles.len());

        for profile in &profiles {
            if !names.insert(profile.name.as_str()) {
                return Err(RegistryError::DuplicateName(profile.name.clone()));
            }
            if profile.actuation_target_id.trim().is_empty() {
                return Err(RegistryError::EmptyTarget(profile.name.clone()));
            }
            if let Some(first) = ids.insert(profile.hardware_id, profile.name.as_str()) {
                return Err(RegistryError::DuplicateHardwareId {
                    hardware_id: profile.hardware_id,
                    first: first.to_string(),
                    second: profile.name.clone(),
                });
            }
        }

        let match_keys = profiles
            .iter()
            .map(|p| p.hardware_id.to_string())
            .collect();

        Ok(Self {
            profiles,
            match_keys,
        })
    }

    /// Joins the name → hardware id and name → target id mappings.
    ///
    /// Profiles are ordered by device name, which makes the first-match
    /// policy deterministic for a given configuration file.
    ///
    /// # Errors
    ///
    /// Besides the errors of [`DeviceRegistry::new`], returns
    /// [`RegistryError::MissingTarget`] / [`RegistryError::MissingHardwareId`]
    /// when the two maps disagree on the set of device names, and
    /// [`RegistryError::InvalidHardwareId`] for unparseable addresses.
    pub fn from_parallel_maps(
        hardware: &BTreeMap<String, String>,
        targets: &BTreeMap<String, String>,
    ) -> Result<Self, RegistryError> {
        if let Some(orphan) = targets.keys().find(|name| !hardware.contains_key(*name)) {
            return Err(RegistryError::MissingHardwareId(orphan.clone()));
        }

        let mut profiles = Vec::with_capacity(hardware.len());
        for (name, raw_id) in hardware {
            let target = targets
                .get(name)
                .ok_or_else(|| RegistryError::MissingTarget(name.clone()))?;
            let hardware_id =
                raw_id
                    .parse::<HardwareId>()
                    .map_err(|source| RegistryError::InvalidHardwareId {
                        name: name.clone(),
                        source,
                    })?;
            profiles.push(DeviceProfile::new(name.clone(), hardware_id, target.trim()));
        }

        Self::new(profiles)
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns `true` when no devices are registered.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterates profiles in matching order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceProfile> {
        self.profiles.iter()
    }

    /// Looks up a profile by device name.
    pub fn get(&self, name: &str) -> Option<&DeviceProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Returns the first profile whose identifier occurs in `hardware_field`.
    ///
    /// The comparison is case-insensitive and uses the canonical
    /// colon-separated form of each identifier.
    pub fn match_field(&self, hardware_field: &str) -> Option<&DeviceProfile> {
        let field = hardware_field.to_ascii_lowercase();
        self.match_keys
            .iter()
            .position(|key| field.contains(key.as_str()))
            .map(|index| &self.profiles[index])
    }

    /// Applies [`DeviceRegistry::match_field`] to a captured event.
    pub fn match_event(&self, event: &CapturedEvent) -> Option<&DeviceProfile> {
        self.match_field(&event.hardware_field)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
