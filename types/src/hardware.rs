//! Catalog descriptors: hardware, gadgets, actions and site geolocation.

use serde::{Deserialize, Serialize};

/// A physical device reachable by the current sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hardware {
    pub id: String,
    pub name: String,
    pub product_id: String,
    pub revision_id: String,
    /// IDs of the sessions that have access to this hardware.
    #[serde(default)]
    pub sessions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GadgetAction {
    pub id: String,
    pub name: String,
}

/// A user-facing controllable unit (door, gate, locker) with its actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gadget {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub actions: Vec<GadgetAction>,
}

impl Gadget {
    #[must_use]
    pub fn action(&self, id: &str) -> Option<&GadgetAction> {
        self.actions.iter().find(|a| a.id == id)
    }
}

/// Geographic location, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// Geolocation restriction of a site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteGeo {
    pub location: Location,
    /// Max radius, in meters.
    pub radius: f64,
}
