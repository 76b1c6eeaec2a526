//! Wizard data model: the asset form, the parsed analysis result and their building blocks.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Asset typology offered in step 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetType {
    #[default]
    #[serde(rename = "Oficinas")]
    Offices,
    #[serde(rename = "Logística")]
    Logistics,
    #[serde(rename = "Retail")]
    Retail,
    #[serde(rename = "Residencial")]
    Residential,
    #[serde(rename = "Data Center")]
    DataCenter,
}

impl AssetType {
    pub const ALL: [AssetType; 5] = [
        AssetType::Offices,
        AssetType::Logistics,
        AssetType::Retail,
        AssetType::Residential,
        AssetType::DataCenter,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AssetType::Offices => "Oficinas",
            AssetType::Logistics => "Logística",
            AssetType::Retail => "Retail",
            AssetType::Residential => "Residencial",
            AssetType::DataCenter => "Data Center",
        }
    }
}

/// Study focus offered in step 2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisType {
    #[serde(rename = "Plan de Descarbonización (CRREM)")]
    DecarbonizationPlan,
    #[default]
    #[serde(rename = "Análisis de Resiliencia Climática")]
    ClimateResilience,
    #[serde(rename = "Evaluación de Riesgos ESG")]
    EsgRisk,
    #[serde(rename = "Análisis de Riesgo de Transición")]
    TransitionRisk,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 4] = [
        AnalysisType::DecarbonizationPlan,
        AnalysisType::ClimateResilience,
        AnalysisType::EsgRisk,
        AnalysisType::TransitionRisk,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AnalysisType::DecarbonizationPlan => "Plan de Descarbonización (CRREM)",
            AnalysisType::ClimateResilience => "Análisis de Resiliencia Climática",
            AnalysisType::EsgRisk => "Evaluación de Riesgos ESG",
            AnalysisType::TransitionRisk => "Análisis de Riesgo de Transición",
        }
    }
}

/// Everything the user types across steps 1 and 2.
///
/// Numeric fields stay strings, as typed; they are only checked for parseability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetForm {
    pub address: String,
    pub postal_code: String,
    pub asset_type: AssetType,
    pub analysis_type: AnalysisType,
    pub gla: String,
    pub build_year: String,
    pub pue: String,
}

impl Default for AssetForm {
    fn default() -> Self {
        Self {
            address: "Paseo de la Castellana, 93".to_string(),
            postal_code: "28046".to_string(),
            asset_type: AssetType::Offices,
            analysis_type: AnalysisType::ClimateResilience,
            gla: "15000".to_string(),
            build_year: "1995".to_string(),
            pue: "1.5".to_string(),
        }
    }
}

impl AssetForm {
    /// Address as sent to the model: street, postal code and country.
    pub fn full_address(&self) -> String {
        format!("{}, {}, España", self.address.trim(), self.postal_code.trim())
    }

    pub fn is_data_center(&self) -> bool {
        self.asset_type == AssetType::DataCenter
    }

    /// Step-1 completeness check run before advancing to step 2.
    pub fn validate_identification(&self) -> Result<(), AppError> {
        if self.address.trim().is_empty() {
            return Err(AppError::Validation("address cannot be empty".to_string()));
        }
        if self.postal_code.trim().is_empty() {
            return Err(AppError::Validation("postalCode cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Step-2 check: only the fields relevant to the asset type must parse.
    pub fn validate_configuration(&self) -> Result<(), AppError> {
        if self.is_data_center() {
            check_number("pue", &self.pue)?;
        } else {
            check_number("gla", &self.gla)?;
            let year = self.build_year.trim();
            if !year.is_empty() && year.parse::<u16>().is_err() {
                return Err(AppError::Validation(format!(
                    "buildYear must be a year, got '{year}'"
                )));
            }
        }
        Ok(())
    }
}

/// Empty is allowed (the field is optional); anything else must be a non-negative number.
fn check_number(field: &str, raw: &str) -> Result<(), AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(());
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(()),
        _ => Err(AppError::Validation(format!(
            "{field} must be a non-negative number, got '{raw}'"
        ))),
    }
}

/// A latitude/longitude pair, serialized the way the model's retrieval config expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A map place cited by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapsReference {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

/// One grounding citation. Only map citations are surfaced; other kinds deserialize with `maps: None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maps: Option<MapsReference>,
}

/// One hazard with the level string the model gave it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskEntry {
    pub hazard: String,
    pub level: String,
}

/// Insertion-ordered hazard → level mapping.
///
/// A repeated hazard keeps its first position and takes the latest level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskMap(Vec<RiskEntry>);

impl RiskMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hazard: impl Into<String>, level: impl Into<String>) {
        let hazard = hazard.into();
        let level = level.into();
        match self.0.iter_mut().find(|e| e.hazard == hazard) {
            Some(existing) => existing.level = level,
            None => self.0.push(RiskEntry { hazard, level }),
        }
    }

    pub fn get(&self, hazard: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.hazard == hazard)
            .map(|e| e.level.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RiskEntry> {
        self.0.iter()
    }
}

/// Result of one successful model call. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub analysis_text: String,
    pub risks: RiskMap,
    pub sources: Vec<GroundingSource>,
}

impl AnalysisResult {
    /// Map citations only, in the order the model returned them.
    pub fn map_references(&self) -> impl Iterator<Item = &MapsReference> {
        self.sources.iter().filter_map(|s| s.maps.as_ref())
    }

    /// The location badge is shown only when the FIRST citation is a map place.
    pub fn verified_location(&self) -> Option<&MapsReference> {
        self.sources.first().and_then(|s| s.maps.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_type_serde_uses_spanish_labels() {
        let json = serde_json::to_string(&AssetType::DataCenter).unwrap();
        assert_eq!(json, r#""Data Center""#);
        let parsed: AssetType = serde_json::from_str(r#""Logística""#).unwrap();
        assert_eq!(parsed, AssetType::Logistics);
    }

    #[test]
    fn test_analysis_type_labels_match_serde() {
        for kind in AnalysisType::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.label()));
        }
    }

    #[test]
    fn test_asset_form_camel_case_fields() {
        let json = serde_json::to_value(AssetForm::default()).unwrap();
        assert_eq!(json["postalCode"], "28046");
        assert_eq!(json["assetType"], "Oficinas");
        assert_eq!(json["buildYear"], "1995");
    }

    #[test]
    fn test_full_address_appends_country() {
        assert_eq!(
            AssetForm::default().full_address(),
            "Paseo de la Castellana, 93, 28046, España"
        );
    }

    #[test]
    fn test_identification_requires_address_and_postal_code() {
        let mut form = AssetForm::default();
        assert!(form.validate_identification().is_ok());
        form.address = "   ".to_string();
        assert!(form.validate_identification().is_err());
        form.address = "Gran Vía, 1".to_string();
        form.postal_code = String::new();
        assert!(form.validate_identification().is_err());
    }

    #[test]
    fn test_configuration_checks_only_relevant_fields() {
        let mut form = AssetForm {
            pue: "abc".to_string(),
            ..AssetForm::default()
        };
        // PUE is irrelevant for offices.
        assert!(form.validate_configuration().is_ok());

        form.asset_type = AssetType::DataCenter;
        assert!(form.validate_configuration().is_err());

        form.pue = "1.3".to_string();
        form.gla = "not a number".to_string();
        assert!(form.validate_configuration().is_ok());
    }

    #[test]
    fn test_configuration_rejects_bad_year_and_negative_gla() {
        let mut form = AssetForm {
            build_year: "mil novecientos".to_string(),
            ..AssetForm::default()
        };
        assert!(form.validate_configuration().is_err());
        form.build_year = "1995".to_string();
        form.gla = "-10".to_string();
        assert!(form.validate_configuration().is_err());
        form.gla = String::new();
        assert!(form.validate_configuration().is_ok());
    }

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint {
            latitude: 40.4,
            longitude: -3.7
        }
        .is_valid());
        assert!(!GeoPoint {
            latitude: 91.0,
            longitude: 0.0
        }
        .is_valid());
        assert!(!GeoPoint {
            latitude: f64::NAN,
            longitude: 0.0
        }
        .is_valid());
    }

    #[test]
    fn test_risk_map_keeps_first_position_and_last_value() {
        let mut risks = RiskMap::new();
        risks.insert("Olas de Calor", "Bajo");
        risks.insert("Inundaciones", "Medio");
        risks.insert("Olas de Calor", "Alto");
        let order: Vec<&str> = risks.iter().map(|e| e.hazard.as_str()).collect();
        assert_eq!(order, vec!["Olas de Calor", "Inundaciones"]);
        assert_eq!(risks.get("Olas de Calor"), Some("Alto"));
        assert_eq!(risks.len(), 2);
    }

    #[test]
    fn test_verified_location_requires_first_source_to_be_a_map() {
        let map = MapsReference {
            uri: "https://maps.google.com/?cid=7".to_string(),
            title: "Castellana 93".to_string(),
        };
        let mut result = AnalysisResult {
            analysis_text: String::new(),
            risks: RiskMap::new(),
            sources: vec![
                GroundingSource { maps: None },
                GroundingSource {
                    maps: Some(map.clone()),
                },
            ],
        };
        assert!(result.verified_location().is_none());
        assert_eq!(result.map_references().count(), 1);

        result.sources.reverse();
        assert_eq!(result.verified_location(), Some(&map));
    }
}
