//! Narration policy
//!
//! `describe` is a pure function of the snapshot, the mode and the previous
//! description: the same inputs always produce the same sentence.

use crate::hazards::{by_proximity, HazardGroups};
use dristi_core::{Detection, NarrationConfig, PerceptionSnapshot};
use std::fmt;
use std::time::Instant;

pub const NO_HAZARDS: &str = "No immediate hazards detected. Path appears clear.";
pub const NO_OBJECTS_IN_VIEW: &str = "No objects detected in current view.";
pub const NO_OBJECTS_NEARBY: &str = "No objects detected in immediate area.";
pub const NO_PEOPLE: &str = "No people detected nearby.";
pub const ONE_PERSON: &str = "One person detected nearby.";
pub const NOTHING_TO_REPEAT: &str = "No previous description available";
pub const NOTHING_NOTABLE: &str = "Nothing notable about the surroundings yet.";

/// Objects called out by name in a full description. Named in the order
/// they first appear among the detections, not in list order.
pub const PRIORITY_OBJECTS: [&str; 5] = ["person", "door", "chair", "stairs", "bench"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NarrationMode {
    Full,
    Hazards,
    Location,
    Objects,
    People,
    Repeat,
    Surroundings,
}

impl NarrationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NarrationMode::Full => "full",
            NarrationMode::Hazards => "hazards",
            NarrationMode::Location => "location",
            NarrationMode::Objects => "objects",
            NarrationMode::People => "people",
            NarrationMode::Repeat => "repeat",
            NarrationMode::Surroundings => "surroundings",
        }
    }
}

impl fmt::Display for NarrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A narration request, consumed as soon as it is issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NarrationRequest {
    pub mode: NarrationMode,
    pub issued_at: Instant,
}

impl NarrationRequest {
    pub fn new(mode: NarrationMode, issued_at: Instant) -> Self {
        Self { mode, issued_at }
    }
}

/// "person" -> "people", "bus" -> "buses", "chair" -> "chairs"
fn plural_noun(name: &str) -> String {
    match name {
        "person" => "people".to_string(),
        "mouse" => "mice".to_string(),
        "knife" => "knives".to_string(),
        "sheep" => "sheep".to_string(),
        n if n.ends_with("ch") || n.ends_with("sh") || n.ends_with('s') || n.ends_with('x') => {
            format!("{}es", n)
        }
        n => format!("{}s", n),
    }
}

/// Name alone for a single item, count and plural otherwise
pub fn pluralize(name: &str, count: usize) -> String {
    if count == 1 {
        name.to_string()
    } else {
        format!("{} {}", count, plural_noun(name))
    }
}

/// Name counts in order of first appearance
fn count_names<'a, I>(names: I) -> Vec<(&'a str, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for name in names {
        match counts.iter_mut().find(|(n, _)| *n == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name, 1)),
        }
    }
    counts
}

/// Name counts, most frequent first; ties keep first-appearance order
fn most_common<'a>(objects: &'a [Detection]) -> Vec<(&'a str, usize)> {
    let mut counts = count_names(objects.iter().map(|o| o.name.as_str()));
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn join_counts(counts: &[(&str, usize)]) -> String {
    counts
        .iter()
        .map(|(name, count)| pluralize(name, *count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Thresholds that gate the scene-dependent clauses (0-100 scale)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NarrationPolicy {
    pub scene_threshold: f32,
    pub condition_threshold: f32,
    pub activity_threshold: f32,
}

impl Default for NarrationPolicy {
    fn default() -> Self {
        Self {
            scene_threshold: 25.0,
            condition_threshold: 30.0,
            activity_threshold: 35.0,
        }
    }
}

impl From<&NarrationConfig> for NarrationPolicy {
    fn from(config: &NarrationConfig) -> Self {
        Self {
            scene_threshold: config.scene_confidence_threshold,
            condition_threshold: config.condition_confidence_threshold,
            activity_threshold: config.activity_confidence_threshold,
        }
    }
}

impl NarrationPolicy {
    /// Describe `snapshot` in `mode`.
    ///
    /// Returns `None` when the mode needs a scene that has not been
    /// classified yet (Location, Surroundings); the caller picks the
    /// "please wait" wording.
    pub fn describe(
        &self,
        snapshot: &PerceptionSnapshot,
        mode: NarrationMode,
        last_description: Option<&str>,
    ) -> Option<String> {
        let objects = snapshot.objects.as_slice();

        match mode {
            NarrationMode::Full => Some(self.full(snapshot)),
            NarrationMode::Hazards => Some(hazards(objects)),
            NarrationMode::Location => snapshot
                .scene
                .as_ref()
                .map(|scene| format!("You appear to be in {}.", scene.scene_name())),
            NarrationMode::Objects => Some(objects_summary(objects)),
            NarrationMode::People => Some(people(objects)),
            NarrationMode::Repeat => Some(
                last_description
                    .filter(|d| !d.is_empty())
                    .unwrap_or(NOTHING_TO_REPEAT)
                    .to_string(),
            ),
            NarrationMode::Surroundings => self.surroundings(snapshot),
        }
    }

    fn full(&self, snapshot: &PerceptionSnapshot) -> String {
        let objects = snapshot.objects.as_slice();
        let mut parts = Vec::new();

        if let Some(scene) = &snapshot.scene {
            if scene.scene_confidence > self.scene_threshold {
                parts.push(format!("You are in {}.", scene.scene_name()));
            }
        }

        let vehicles = HazardGroups::from_detections(objects).vehicles.len();
        if vehicles > 0 {
            let noun = if vehicles > 1 { "vehicles" } else { "vehicle" };
            parts.push(format!("Warning! {} {} detected.", vehicles, noun));
        }

        if objects.is_empty() {
            parts.push(NO_OBJECTS_NEARBY.to_string());
        } else {
            let counts = count_names(objects.iter().map(|o| o.name.as_str()));
            let priority: Vec<(&str, usize)> = counts
                .iter()
                .copied()
                .filter(|(name, _)| PRIORITY_OBJECTS.contains(name))
                .collect();

            if !priority.is_empty() {
                let named = &priority[..priority.len().min(2)];
                parts.push(format!("Important: {} detected.", join_counts(named)));
            }

            if objects.len() > priority.len() {
                parts.push(format!("{} total objects in view.", objects.len()));
            }
        }

        parts.join(" ")
    }

    fn surroundings(&self, snapshot: &PerceptionSnapshot) -> Option<String> {
        let scene = snapshot.scene.as_ref()?;
        let mut parts = Vec::new();

        if scene.condition_confidence > self.condition_threshold {
            parts.push(format!("It appears to be {}.", scene.condition_name()));
        }

        if scene.activity_confidence > self.activity_threshold && !scene.activity.contains("no visible") {
            parts.push(format!("Activity: {}.", scene.activity));
        }

        if parts.is_empty() {
            Some(NOTHING_NOTABLE.to_string())
        } else {
            Some(parts.join(" "))
        }
    }
}

fn hazards(objects: &[Detection]) -> String {
    let groups = HazardGroups::from_detections(by_proximity(objects));
    let mut warnings = Vec::new();

    if !groups.vehicles.is_empty() {
        let counts = count_names(groups.vehicles.iter().map(String::as_str));
        warnings.push(format!("Warning! {} detected", join_counts(&counts)));
    }

    if !groups.obstacles.is_empty() {
        let n = groups.obstacles.len();
        let noun = if n == 1 { "obstacle" } else { "obstacles" };
        warnings.push(format!("{} {} in path", n, noun));
    }

    if !groups.animals.is_empty() {
        let names: Vec<&str> = count_names(groups.animals.iter().map(String::as_str))
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        warnings.push(format!("{} detected nearby", names.join(", ")));
    }

    if warnings.is_empty() {
        NO_HAZARDS.to_string()
    } else {
        format!("Hazard alert. {}. Please be careful.", warnings.join(". "))
    }
}

fn objects_summary(objects: &[Detection]) -> String {
    if objects.is_empty() {
        return NO_OBJECTS_IN_VIEW.to_string();
    }

    let counts = most_common(objects);
    if counts.len() <= 3 {
        format!("I see {}.", join_counts(&counts))
    } else {
        format!(
            "I see {} objects. Mainly {}. Plus {} other types.",
            objects.len(),
            join_counts(&counts[..3]),
            counts.len() - 3
        )
    }
}

fn people(objects: &[Detection]) -> String {
    match objects.iter().filter(|o| o.name == "person").count() {
        0 => NO_PEOPLE.to_string(),
        1 => ONE_PERSON.to_string(),
        n => format!("{} people detected in the area.", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dristi_core::{BoundingBox, DistanceCategory, SceneInfo};

    fn det(name: &str, confidence: f32) -> Detection {
        Detection::new(name, confidence, BoundingBox::new(0.0, 0.0, 10.0, 10.0))
    }

    fn snapshot(names: &[&str]) -> PerceptionSnapshot {
        PerceptionSnapshot::from_parts(names.iter().map(|n| det(n, 0.9)).collect(), None)
    }

    fn scene(confidence: f32) -> SceneInfo {
        SceneInfo {
            scene_type: "a street with buildings".to_string(),
            scene_confidence: confidence,
            scene_type_alt: "an outdoor area".to_string(),
            condition: "a crowded busy place with many people".to_string(),
            condition_confidence: 45.0,
            activity: "people walking or moving".to_string(),
            activity_confidence: 50.0,
        }
    }

    fn describe(snapshot: &PerceptionSnapshot, mode: NarrationMode) -> String {
        NarrationPolicy::default().describe(snapshot, mode, None).unwrap()
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("car", 1), "car");
        assert_eq!(pluralize("car", 2), "2 cars");
        assert_eq!(pluralize("person", 3), "3 people");
        assert_eq!(pluralize("bus", 2), "2 buses");
        assert_eq!(pluralize("bench", 2), "2 benches");
        assert_eq!(pluralize("traffic light", 2), "2 traffic lights");
    }

    #[test]
    fn test_hazards_cars_and_person() {
        let snap = PerceptionSnapshot::from_parts(
            vec![det("car", 0.9), det("car", 0.8), det("person", 0.95)],
            None,
        );
        let text = describe(&snap, NarrationMode::Hazards);
        assert_eq!(text, "Hazard alert. Warning! 2 cars detected. Please be careful.");
        assert_eq!(describe(&snap, NarrationMode::People), "One person detected nearby.");
    }

    #[test]
    fn test_hazards_all_clauses() {
        let snap = snapshot(&["bus", "dog", "bench", "car", "fire hydrant", "dog", "cat"]);
        assert_eq!(
            describe(&snap, NarrationMode::Hazards),
            "Hazard alert. Warning! bus, car detected. 2 obstacles in path. dog, cat detected nearby. Please be careful."
        );
    }

    #[test]
    fn test_hazards_closest_vehicle_first() {
        let snap = PerceptionSnapshot::from_parts(
            vec![
                det("truck", 0.9).with_distance(DistanceCategory::Far),
                det("bicycle", 0.9).with_distance(DistanceCategory::VeryClose),
            ],
            None,
        );
        assert_eq!(
            describe(&snap, NarrationMode::Hazards),
            "Hazard alert. Warning! bicycle, truck detected. Please be careful."
        );
    }

    #[test]
    fn test_hazards_traffic_only_is_clear() {
        let snap = snapshot(&["traffic light", "stop sign", "person"]);
        assert_eq!(describe(&snap, NarrationMode::Hazards), NO_HAZARDS);
        assert_eq!(describe(&snapshot(&[]), NarrationMode::Hazards), NO_HAZARDS);
    }

    #[test]
    fn test_single_obstacle_singular() {
        let snap = snapshot(&["parking meter"]);
        assert_eq!(
            describe(&snap, NarrationMode::Hazards),
            "Hazard alert. 1 obstacle in path. Please be careful."
        );
    }

    #[test]
    fn test_location() {
        let mut snap = snapshot(&[]);
        assert_eq!(NarrationPolicy::default().describe(&snap, NarrationMode::Location, None), None);

        snap.scene = Some(scene(10.0));
        assert_eq!(
            describe(&snap, NarrationMode::Location),
            "You appear to be in street with buildings."
        );
    }

    #[test]
    fn test_objects_boundaries() {
        assert_eq!(describe(&snapshot(&[]), NarrationMode::Objects), NO_OBJECTS_IN_VIEW);

        let three = snapshot(&["cup", "chair", "chair", "laptop"]);
        assert_eq!(describe(&three, NarrationMode::Objects), "I see 2 chairs, cup, laptop.");

        let four = snapshot(&["cup", "chair", "chair", "laptop", "book"]);
        assert_eq!(
            describe(&four, NarrationMode::Objects),
            "I see 5 objects. Mainly 2 chairs, cup, laptop. Plus 1 other types."
        );
    }

    #[test]
    fn test_people_boundaries() {
        assert_eq!(describe(&snapshot(&["cup"]), NarrationMode::People), NO_PEOPLE);
        assert_eq!(describe(&snapshot(&["person"]), NarrationMode::People), ONE_PERSON);
        assert_eq!(
            describe(&snapshot(&["person", "cup", "person"]), NarrationMode::People),
            "2 people detected in the area."
        );
    }

    #[test]
    fn test_full_low_confidence_empty() {
        let mut snap = snapshot(&[]);
        snap.scene = Some(scene(10.0));
        assert_eq!(describe(&snap, NarrationMode::Full), NO_OBJECTS_NEARBY);
    }

    #[test]
    fn test_full_all_clauses() {
        let mut snap = snapshot(&["chair", "car", "person", "person", "door", "cup"]);
        snap.scene = Some(scene(60.0));
        assert_eq!(
            describe(&snap, NarrationMode::Full),
            "You are in street with buildings. Warning! 1 vehicle detected. \
             Important: chair, 2 people detected. 6 total objects in view."
        );
    }

    #[test]
    fn test_full_total_clause_suppressed() {
        let snap = snapshot(&["person", "door"]);
        assert_eq!(describe(&snap, NarrationMode::Full), "Important: person, door detected.");

        let snap = snapshot(&["bus", "bus"]);
        assert_eq!(
            describe(&snap, NarrationMode::Full),
            "Warning! 2 vehicles detected. 2 total objects in view."
        );
    }

    #[test]
    fn test_repeat() {
        let policy = NarrationPolicy::default();
        let snap = snapshot(&["cup"]);
        assert_eq!(policy.describe(&snap, NarrationMode::Repeat, None).unwrap(), NOTHING_TO_REPEAT);
        assert_eq!(
            policy.describe(&snap, NarrationMode::Repeat, Some("I see cup.")).unwrap(),
            "I see cup."
        );
    }

    #[test]
    fn test_surroundings() {
        let policy = NarrationPolicy::default();
        let mut snap = snapshot(&[]);
        assert_eq!(policy.describe(&snap, NarrationMode::Surroundings, None), None);

        snap.scene = Some(scene(60.0));
        assert_eq!(
            describe(&snap, NarrationMode::Surroundings),
            "It appears to be crowded busy place with many people. Activity: people walking or moving."
        );

        let mut quiet = scene(60.0);
        quiet.condition_confidence = 20.0;
        quiet.activity = "no visible human activity".to_string();
        snap.scene = Some(quiet);
        assert_eq!(describe(&snap, NarrationMode::Surroundings), NOTHING_NOTABLE);
    }

    #[test]
    fn test_describe_is_deterministic() {
        let mut snap = snapshot(&["dog", "car", "person", "bench", "chair", "car"]);
        snap.scene = Some(scene(40.0));
        let policy = NarrationPolicy::default();

        for mode in [
            NarrationMode::Full,
            NarrationMode::Hazards,
            NarrationMode::Location,
            NarrationMode::Objects,
            NarrationMode::People,
            NarrationMode::Surroundings,
        ] {
            assert_eq!(policy.describe(&snap, mode, None), policy.describe(&snap, mode, None));
        }
    }
}
