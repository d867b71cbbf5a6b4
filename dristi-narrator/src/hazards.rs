//! Hazard taxonomy

use dristi_core::{Detection, DistanceCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HazardCategory {
    Vehicle,
    Traffic,
    Obstacle,
    Animal,
}

const VEHICLES: &[&str] = &["car", "truck", "bus", "bicycle", "motorcycle"];
const TRAFFIC: &[&str] = &["traffic light", "stop sign"];
const OBSTACLES: &[&str] = &["bench", "fire hydrant", "parking meter"];
const ANIMALS: &[&str] = &["dog", "cat", "bird", "horse"];

impl HazardCategory {
    pub const ALL: [HazardCategory; 4] = [
        HazardCategory::Vehicle,
        HazardCategory::Traffic,
        HazardCategory::Obstacle,
        HazardCategory::Animal,
    ];

    pub fn members(self) -> &'static [&'static str] {
        match self {
            HazardCategory::Vehicle => VEHICLES,
            HazardCategory::Traffic => TRAFFIC,
            HazardCategory::Obstacle => OBSTACLES,
            HazardCategory::Animal => ANIMALS,
        }
    }

    /// Category of an object class name, if it is a hazard at all
    pub fn of(name: &str) -> Option<HazardCategory> {
        Self::ALL.into_iter().find(|c| c.members().contains(&name))
    }
}

/// Detection names grouped by hazard category, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HazardGroups {
    pub vehicles: Vec<String>,
    pub traffic: Vec<String>,
    pub obstacles: Vec<String>,
    pub animals: Vec<String>,
}

impl HazardGroups {
    pub fn from_detections<'a, I>(objects: I) -> Self
    where
        I: IntoIterator<Item = &'a Detection>,
    {
        let mut groups = HazardGroups::default();
        for obj in objects {
            let bucket = match HazardCategory::of(&obj.name) {
                Some(HazardCategory::Vehicle) => &mut groups.vehicles,
                Some(HazardCategory::Traffic) => &mut groups.traffic,
                Some(HazardCategory::Obstacle) => &mut groups.obstacles,
                Some(HazardCategory::Animal) => &mut groups.animals,
                None => continue,
            };
            bucket.push(obj.name.clone());
        }
        groups
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty() && self.traffic.is_empty() && self.obstacles.is_empty() && self.animals.is_empty()
    }
}

/// Sort key placing the closest objects first and unmeasured ones last
pub fn proximity_key(obj: &Detection) -> f32 {
    match obj.distance {
        Some(DistanceCategory::Unknown) | None => f32::INFINITY,
        Some(d) => d.proxy_value(),
    }
}

/// Detections ordered closest first. Ties keep their original order.
pub fn by_proximity(objects: &[Detection]) -> Vec<&Detection> {
    let mut sorted: Vec<&Detection> = objects.iter().collect();
    sorted.sort_by(|a, b| proximity_key(a).total_cmp(&proximity_key(b)));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use dristi_core::BoundingBox;

    fn det(name: &str) -> Detection {
        Detection::new(name, 0.9, BoundingBox::new(0.0, 0.0, 1.0, 1.0))
    }

    #[test]
    fn test_category_membership() {
        assert_eq!(HazardCategory::of("bus"), Some(HazardCategory::Vehicle));
        assert_eq!(HazardCategory::of("stop sign"), Some(HazardCategory::Traffic));
        assert_eq!(HazardCategory::of("fire hydrant"), Some(HazardCategory::Obstacle));
        assert_eq!(HazardCategory::of("horse"), Some(HazardCategory::Animal));
        assert_eq!(HazardCategory::of("person"), None);
        assert_eq!(HazardCategory::of("Car"), None);
    }

    #[test]
    fn test_grouping_keeps_order() {
        let objects = vec![det("dog"), det("car"), det("person"), det("bus"), det("car")];
        let groups = HazardGroups::from_detections(&objects);
        assert_eq!(groups.vehicles, vec!["car", "bus", "car"]);
        assert_eq!(groups.animals, vec!["dog"]);
        assert!(groups.obstacles.is_empty());
        assert!(!groups.is_empty());
    }

    #[test]
    fn test_proximity_order() {
        let objects = vec![
            det("far").with_distance(DistanceCategory::VeryFar),
            det("unmeasured"),
            det("close").with_distance(DistanceCategory::VeryClose),
            det("unknown").with_distance(DistanceCategory::Unknown),
            det("medium").with_distance(DistanceCategory::Medium),
        ];
        let names: Vec<&str> = by_proximity(&objects).iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["close", "medium", "far", "unmeasured", "unknown"]);
    }
}
