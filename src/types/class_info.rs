//! Traffic sign class metadata

use std::borrow::Cow;
use std::collections::HashMap;

/// Description used when the model predicts an index with no entry
pub const PLACEHOLDER_DESCRIPTION: &str = "No description available.";

/// Human-readable metadata for one classifier output index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRecord {
    pub index: usize,
    pub title: Cow<'static, str>,
    pub description: Cow<'static, str>,
}

impl ClassRecord {
    /// Record synthesized for an index the registry does not know
    pub fn placeholder(index: usize) -> Self {
        Self {
            index,
            title: Cow::Owned(index.to_string()),
            description: Cow::Borrowed(PLACEHOLDER_DESCRIPTION),
        }
    }
}

/// Immutable index → metadata mapping, built once at startup
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    records: HashMap<usize, ClassRecord>,
}

impl ClassRegistry {
    /// Registry with the compiled-in traffic sign table
    pub fn builtin() -> Self {
        Self::from_table(TRAFFIC_SIGN_CLASSES)
    }

    /// Build a registry from `(title, description)` rows; the row position is the index
    pub fn from_table(table: &'static [(&'static str, &'static str)]) -> Self {
        let records = table
            .iter()
            .enumerate()
            .map(|(index, &(title, description))| {
                (
                    index,
                    ClassRecord {
                        index,
                        title: Cow::Borrowed(title),
                        description: Cow::Borrowed(description),
                    },
                )
            })
            .collect();

        Self { records }
    }

    /// Look up metadata for an index, synthesizing a placeholder for unknown ones
    pub fn lookup(&self, index: usize) -> ClassRecord {
        self.records
            .get(&index)
            .cloned()
            .unwrap_or_else(|| ClassRecord::placeholder(index))
    }

    /// Whether the index has a real entry
    pub fn contains(&self, index: usize) -> bool {
        self.records.contains_key(&index)
    }

    /// Number of known classes
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Traffic sign classes in model output order
pub static TRAFFIC_SIGN_CLASSES: &[(&str, &str)] = &[
    ("Speed limit (5km/h)", "Indicates that the maximum permitted driving speed in this zone is 5 kilometers per hour, typically used in very restricted or high-risk pedestrian areas."),
    ("Speed limit (15km/h)", "Indicates a maximum speed limit of 15 kilometers per hour, usually found in residential lanes, campuses, or highly congested zones."),
    ("Speed limit (30km/h)", "Marks a maximum speed of 30 kilometers per hour, commonly used in school zones or areas requiring slow and cautious driving."),
    ("Speed limit (40km/h)", "Shows that drivers must not exceed 40 kilometers per hour, often used in moderately busy roads or semi-urban areas."),
    ("Speed limit (50km/h)", "Indicates a maximum speed of 50 kilometers per hour, generally applied in urban zones with steady but controlled traffic flow."),
    ("Speed limit (60km/h)", "Sets the maximum speed at 60 kilometers per hour, frequently used on wider city roads or low-traffic urban connectors."),
    ("Speed limit (70km/h)", "Indicates that vehicles may travel up to 70 kilometers per hour, often seen on suburban or lightly developed roadways."),
    ("Speed limit (80km/h)", "Warns drivers that the maximum speed allowed is 80 kilometers per hour, typically on highways or major connecting routes."),
    ("Don't Go Straight or Left", "Prohibits vehicles from continuing straight or making a left turn, guiding drivers to choose an alternative legal direction."),
    ("Don't Go Straight or Right", "Indicates that drivers may not continue straight or turn right, restricting movement to permitted directions only."),
    ("Don't Go Straight", "Shows that continuing straight ahead is not allowed, usually directing drivers to turn left or right instead."),
    ("Don't Go Left", "Prohibits left turns at the intersection or junction ahead for safety or traffic flow control."),
    ("Don't Go Left or Right", "Restricts both left and right turns, commonly indicating a mandatory straight movement or a controlled path."),
    ("Don't Go Right", "Indicates that right turns are not allowed, guiding drivers to continue straight or turn left."),
    ("Don't Overtake from Left", "Warns drivers not to overtake another vehicle from the left side, promoting safe overtaking practices."),
    ("No U-turn", "Prohibits drivers from performing a U-turn at or beyond this sign, ensuring smoother traffic flow and preventing sudden reversals."),
    ("No Car", "Indicates that motor vehicles are not allowed beyond this point, usually for pedestrian or restricted zones."),
    ("No Horn", "Instructs drivers not to use horns in the area, typically near hospitals, schools, or silence zones."),
    ("Speed limit (40km/h)", "Sets the maximum speed to 40 kilometers per hour in this particular zone for safety and regulation."),
    ("Speed limit (50km/h)", "Restricts vehicle speed to a maximum of 50 kilometers per hour, promoting safe driving conditions."),
    ("Go Straight or Right", "Informs drivers that the allowed directions are straight ahead or a right turn."),
    ("Go Straight", "Indicates a mandatory straight movement, meaning drivers must continue forward only."),
    ("Go Left", "Instructs drivers to make a left turn as the only mandatory direction."),
    ("Go Left or Right", "Allows drivers to turn either left or right but not continue straight."),
    ("Go Right", "Indicates that the only allowed direction is a right turn."),
    ("Keep Left", "Directs drivers to stay to the left side of the road or divider for proper lane discipline."),
    ("Keep Right", "Directs drivers to remain on the right side of the road or divider for safer navigation."),
    ("Roundabout Mandatory", "Indicates the presence of a roundabout ahead and instructs vehicles to navigate through it in the mandated direction."),
    ("Watch Out for Cars", "Alerts pedestrians and drivers of potential sudden vehicle movement or busy vehicle crossings."),
    ("Horn", "Indicates that sounding the horn is either allowed or required for safety, typically in blind-spot areas."),
    ("Bicycles Crossing", "Warns drivers of a bicycle crossing ahead, urging reduced speed and extra caution."),
    ("U-turn", "Indicates that making a U-turn is allowed at this location."),
    ("Road Divider", "Alerts drivers about an approaching divider or median that separates lanes of traffic."),
    ("Traffic Signals", "Warns drivers of a signalized intersection ahead, encouraging them to prepare to stop or slow down."),
    ("Danger Ahead", "General warning sign indicating a potential hazard ahead that requires increased caution."),
    ("Zebra Crossing", "Indicates a pedestrian crossing zone requiring drivers to slow down and give way to walkers."),
    ("Bicycles Crossing", "Signals the presence of a bicycle crossing area where drivers must be alert for cyclists."),
    ("Children Crossing", "Alerts drivers to the presence of children, often near schools or playgrounds, requiring reduced speed and vigilance."),
    ("Dangerous Curve to the Left", "Warns of a sharp or potentially hazardous leftward bend ahead, requiring slower and controlled driving."),
    ("Dangerous Curve to the Right", "Alerts drivers to a risky rightward curve ahead, urging careful maneuvering."),
    ("Downhill Ahead", "Indicates a steep descending slope ahead, advising drivers to maintain low gear and exercise caution."),
    ("Uphill Ahead", "Warns of an ascending road section where vehicles may require more power and slower speeds."),
    ("Slow", "Instructs drivers to reduce speed immediately due to road conditions, hazards, or special areas ahead."),
    ("Go Right or Straight", "Indicates that drivers are permitted to proceed straight or make a right turn only."),
    ("Go Left or Straight", "Allows drivers to continue forward or turn left, restricting right turns."),
    ("Village Ahead", "Warns that a village area is approaching, requiring slower driving and increased awareness of pedestrians and animals."),
    ("ZigZag Curve", "Indicates a series of sharp alternating curves requiring cautious and reduced-speed navigation."),
    ("Train Crossing", "Warns drivers of an upcoming railway crossing, urging them to be ready to stop for passing trains."),
    ("Under Construction", "Alerts drivers that road construction or maintenance work is underway, requiring slower and careful movement."),
    ("Continuous Curves Ahead", "Indicates multiple curves ahead, requiring sustained caution and reduced speed."),
    ("Fences", "Warns of fenced or restricted areas near the roadway, often to protect livestock, property, or pedestrians."),
    ("Heavy Vehicle Accidents", "Alerts drivers to a zone with a high risk of heavy-vehicle related incidents or dangerous gradients."),
    ("Stop", "Instructs drivers to come to a complete stop and proceed only when it is safe to do so."),
    ("Give Way", "Indicates that drivers must yield to oncoming traffic before proceeding."),
    ("No Stopping", "Prohibits vehicles from stopping at any time along this stretch of road."),
    ("No Entry", "Indicates that entry into the road or lane ahead is not allowed for vehicles."),
    ("Yield", "Instructs drivers to slow down and yield the right-of-way to other vehicles or pedestrians."),
    ("Check", "Alerts drivers to perform necessary checks, such as inspection, documentation verification, or stopping for control posts."),
];
