use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One slot of a [`ServiceRegistry`](super::ServiceRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Rust type name of the service.
    pub service: String,
    pub name: Option<String>,
    pub bound: bool,
    /// Only known for services bound through the registry itself.
    pub bound_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStatus {
    pub slots: usize,
    pub bound: usize,
    pub factories: usize,
    pub services: Vec<ServiceStatus>,
}

impl RegistryStatus {
    /// Saturates for snapshots where `bound` exceeds `slots`.
    pub fn unbound(&self) -> usize {
        self.slots.saturating_sub(self.bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_json() {
        let status = RegistryStatus {
            slots: 2,
            bound: 1,
            factories: 0,
            services: vec![ServiceStatus {
                service: "demo::Clock".to_string(),
                name: None,
                bound: true,
                bound_at: Some(Utc::now()),
            }],
        };
        let json = serde_json::to_string(&status).unwrap();
        let back: RegistryStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
        assert_eq!(back.unbound(), 1);
    }

    #[test]
    fn empty_status_has_no_slots() {
        let json = serde_json::to_value(RegistryStatus::default()).unwrap();
        assert_eq!(json["slots"], 0);
        assert!(json["services"].as_array().unwrap().is_empty());
    }

    #[test]
    fn inconsistent_snapshot_reports_no_unbound_slots() {
        let status: RegistryStatus =
            serde_json::from_str(r#"{"slots":1,"bound":3,"factories":0,"services":[]}"#).unwrap();
        assert_eq!(status.unbound(), 0);
    }
}
