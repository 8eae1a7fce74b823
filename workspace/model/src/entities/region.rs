use common::{ColorRule, Dataset, LatLng, NO_DATA_COLOR, Operator};
use serde::{Deserialize, Serialize};

/// A user-drawn polygon together with its threshold rules and the last
/// fetched measurement.
///
/// `color` always reflects the rule that applied to `fetched_value` when it was
/// last evaluated, or the no-data color while the value is absent or loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: String,
    pub name: String,
    /// Outer ring of the polygon; at least three vertices for a valid shape.
    #[serde(rename = "latlngs")]
    pub vertices: Vec<LatLng>,
    pub rules: Vec<ColorRule>,
    #[serde(alias = "fetchedTemp")]
    pub fetched_value: Option<f64>,
    pub is_loading: bool,
    pub color: String,
}

impl Region {
    /// Creates a freshly drawn region: default name, the dataset's default
    /// rules, no value yet and waiting for its first fetch.
    pub fn new(id: impl Into<String>, vertices: Vec<LatLng>, dataset: Dataset) -> Self {
        let id = id.into();
        Self {
            name: Self::default_name(&id),
            id,
            vertices,
            rules: dataset.default_rules(),
            fetched_value: None,
            is_loading: true,
            color: NO_DATA_COLOR.to_string(),
        }
    }

    /// `Region <first six characters of the id>`.
    pub fn default_name(id: &str) -> String {
        let prefix: String = id.chars().take(6).collect();
        format!("Region {}", prefix)
    }

    pub fn rule(&self, rule_id: &str) -> Option<&ColorRule> {
        self.rules.iter().find(|r| r.id == rule_id)
    }

    /// Waits for a new value: the old color no longer describes anything.
    pub fn mark_loading(&mut self) {
        self.is_loading = true;
        self.color = NO_DATA_COLOR.to_string();
    }

    /// Returns true if the shape is a closed polygon (three or more vertices).
    pub fn is_valid_polygon(&self) -> bool {
        self.vertices.len() >= 3
    }
}

/// Partial update of a rule; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulePatch {
    pub operator: Option<Operator>,
    pub value: Option<f64>,
    pub color: Option<String>,
}

impl RulePatch {
    pub fn is_empty(&self) -> bool {
        self.operator.is_none() && self.value.is_none() && self.color.is_none()
    }

    /// Applies the patch to `rule`, returning true if anything changed.
    ///
    /// A non-finite threshold is ignored; it would not survive the snapshot.
    pub fn apply(&self, rule: &mut ColorRule) -> bool {
        let before = rule.clone();
        if let Some(operator) = self.operator {
            rule.operator = operator;
        }
        if let Some(value) = self.value.filter(|v| v.is_finite()) {
            rule.value = value;
        }
        if let Some(color) = &self.color {
            rule.color = color.clone();
        }
        *rule != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<LatLng> {
        vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(1.0, 0.0),
            LatLng::new(1.0, 1.0),
            LatLng::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_new_region_defaults() {
        let region = Region::new("123456789", square(), Dataset::Temperature2m);
        assert_eq!(region.name, "Region 123456");
        assert!(region.is_loading);
        assert_eq!(region.fetched_value, None);
        assert_eq!(region.color, NO_DATA_COLOR);
        assert_eq!(region.rules, Dataset::Temperature2m.default_rules());
        assert!(region.is_valid_polygon());
    }

    #[test]
    fn test_default_name_of_short_id() {
        assert_eq!(Region::default_name("USA"), "Region USA");
    }

    #[test]
    fn test_rule_patch_applies_only_given_fields() {
        let mut rule = ColorRule::new("a", Operator::Eq, 0.0, "#ffffff");
        let patch = RulePatch {
            value: Some(12.5),
            ..Default::default()
        };
        assert!(patch.apply(&mut rule));
        assert_eq!(rule, ColorRule::new("a", Operator::Eq, 12.5, "#ffffff"));

        // Same value again is not a change
        assert!(!patch.apply(&mut rule));
    }

    #[test]
    fn test_rule_patch_ignores_non_finite_value() {
        let mut rule = ColorRule::new("a", Operator::Eq, 0.0, "#ffffff");
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let patch = RulePatch {
                value: Some(value),
                ..Default::default()
            };
            assert!(!patch.apply(&mut rule));
            assert_eq!(rule.value, 0.0);
        }
    }

    #[test]
    fn test_mark_loading_resets_color() {
        let mut region = Region::new("a", square(), Dataset::Temperature2m);
        region.is_loading = false;
        region.fetched_value = Some(30.0);
        region.color = "#ef4444".to_string();

        region.mark_loading();
        assert!(region.is_loading);
        assert_eq!(region.color, NO_DATA_COLOR);
    }

    #[test]
    fn test_region_reads_legacy_fetched_temp() {
        let json = r##"{
            "id": "India",
            "name": "Region India",
            "latlngs": [{"lat": 8.0, "lng": 68.0}],
            "rules": [],
            "fetchedTemp": 27.5,
            "isLoading": false,
            "color": "#ef4444"
        }"##;
        let region: Region = serde_json::from_str(json).unwrap();
        assert_eq!(region.fetched_value, Some(27.5));
        assert!(!region.is_valid_polygon());
    }
}
