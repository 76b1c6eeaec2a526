//! Risk presentation: maps free-form level strings to traffic-light indicators.
//!
//! Total over arbitrary input: anything that is not a recognised level renders gray.

use serde::Serialize;

use crate::wizard::models::RiskMap;

/// The four visual states of a hazard indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorColor {
    Green,
    Yellow,
    Red,
    Gray,
}

impl IndicatorColor {
    /// Classifies a level string. Case and surrounding whitespace are ignored.
    pub fn for_level(level: &str) -> Self {
        match level.trim().to_lowercase().as_str() {
            "bajo" => IndicatorColor::Green,
            "medio" => IndicatorColor::Yellow,
            "alto" => IndicatorColor::Red,
            _ => IndicatorColor::Gray,
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            IndicatorColor::Green => "#22c55e",
            IndicatorColor::Yellow => "#eab308",
            IndicatorColor::Red => "#ef4444",
            IndicatorColor::Gray => "#d1d5db",
        }
    }

    /// RGB components in 0.0..=1.0, as the PDF writer wants them.
    pub fn rgb(self) -> (f32, f32, f32) {
        match self {
            IndicatorColor::Green => (0.133, 0.773, 0.369),
            IndicatorColor::Yellow => (0.918, 0.702, 0.031),
            IndicatorColor::Red => (0.937, 0.267, 0.267),
            IndicatorColor::Gray => (0.612, 0.639, 0.686),
        }
    }
}

/// One rendered hazard indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskIndicator {
    pub hazard: String,
    /// The level as the model wrote it, or `N/A` when blank.
    pub label: String,
    pub color: IndicatorColor,
    pub hex: &'static str,
}

/// Builds indicators in the mapping's order.
pub fn indicators(risks: &RiskMap) -> Vec<RiskIndicator> {
    risks
        .iter()
        .map(|entry| {
            let color = IndicatorColor::for_level(&entry.level);
            let label = match entry.level.trim() {
                "" => "N/A".to_string(),
                level => level.to_uppercase(),
            };
            RiskIndicator {
                hazard: entry.hazard.clone(),
                label,
                color,
                hex: color.hex(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_levels() {
        assert_eq!(IndicatorColor::for_level("Bajo"), IndicatorColor::Green);
        assert_eq!(IndicatorColor::for_level("Medio"), IndicatorColor::Yellow);
        assert_eq!(IndicatorColor::for_level("Alto"), IndicatorColor::Red);
    }

    #[test]
    fn test_levels_are_case_and_space_insensitive() {
        assert_eq!(IndicatorColor::for_level("ALTO"), IndicatorColor::Red);
        assert_eq!(IndicatorColor::for_level("  bajo "), IndicatorColor::Green);
        assert_eq!(IndicatorColor::for_level("mEdIo"), IndicatorColor::Yellow);
    }

    #[test]
    fn test_everything_else_is_gray() {
        for level in ["", " ", "Crítico", "High", "Alta", "bajo-medio", "🔥", "\u{0}"] {
            assert_eq!(IndicatorColor::for_level(level), IndicatorColor::Gray, "{level:?}");
        }
    }

    #[test]
    fn test_indicators_follow_map_order_and_label_levels() {
        let mut risks = RiskMap::new();
        risks.insert("Olas de Calor", "Alto");
        risks.insert("Inundaciones", "Bajo");
        risks.insert("Sequías", "Medio");
        risks.insert("Viento", "raro");

        let rendered = indicators(&risks);
        let colors: Vec<IndicatorColor> = rendered.iter().map(|i| i.color).collect();
        assert_eq!(
            colors,
            vec![
                IndicatorColor::Red,
                IndicatorColor::Green,
                IndicatorColor::Yellow,
                IndicatorColor::Gray
            ]
        );
        assert_eq!(rendered[0].label, "ALTO");
        assert_eq!(rendered[0].hex, "#ef4444");
    }

    #[test]
    fn test_color_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&IndicatorColor::Yellow).unwrap(),
            r#""yellow""#
        );
    }
}
