// Prompt templates for the analysis wizard.
// Cross-cutting fragments (persona, risk line format) come from llm_client::prompts.

use serde::{Deserialize, Serialize};

use crate::llm_client::prompts::{risk_line_instruction, CONSULTANT_PERSONA};
use crate::wizard::models::AssetForm;

/// Length/register of the narrative the model is asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVariant {
    /// Full strategic brief, up to 200 words.
    #[default]
    StrategicBrief,
    /// Short executive summary, up to 100 words.
    ExecutiveSummary,
}

impl PromptVariant {
    pub const ALL: [PromptVariant; 2] =
        [PromptVariant::StrategicBrief, PromptVariant::ExecutiveSummary];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "strategic_brief" => Some(PromptVariant::StrategicBrief),
            "executive_summary" => Some(PromptVariant::ExecutiveSummary),
            _ => None,
        }
    }

    pub fn max_words(self) -> u32 {
        match self {
            PromptVariant::StrategicBrief => 200,
            PromptVariant::ExecutiveSummary => 100,
        }
    }

    fn title(self) -> &'static str {
        match self {
            PromptVariant::StrategicBrief => "Brief Estratégico de Resiliencia",
            PromptVariant::ExecutiveSummary => "Resumen Ejecutivo de Resiliencia",
        }
    }
}

/// Analysis prompt template.
/// Replace: {persona}, {asset_type}, {full_address}, {analysis_type}, {technical_profile},
///          {title}, {max_words}, {risk_line_instruction}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"{persona}

Analiza el activo:
Tipo: {asset_type}
Dirección: {full_address}
Contexto: {analysis_type}
Perfil técnico: {technical_profile}

Tarea:
1. Utiliza Google Maps para entender el entorno micro-climático y urbano real.
2. Redacta un "{title}" (máx {max_words} palabras). NO hagas una lista aburrida. Escribe una narrativa potente que explique cómo la ubicación específica y el tipo de activo presentan desafíos que pueden transformarse en ventajas competitivas usando la filosofía de "Sostenibilidad Esférica". Habla de oportunidades de inversión, reputación y longevidad del activo.
3. Evalúa los riesgos climáticos (Olas de Calor, Inundaciones, Sequías) basándote en la ubicación.

Formato de Salida Requerido:
Primero, el texto narrativo.
{risk_line_instruction}"#;

/// Builds the full analysis prompt for a form.
pub fn build_analysis_prompt(form: &AssetForm, variant: PromptVariant) -> String {
    ANALYSIS_PROMPT_TEMPLATE
        .replace("{persona}", CONSULTANT_PERSONA)
        .replace("{asset_type}", form.asset_type.label())
        .replace("{full_address}", &form.full_address())
        .replace("{analysis_type}", form.analysis_type.label())
        .replace("{technical_profile}", &technical_profile(form))
        .replace("{title}", variant.title())
        .replace("{max_words}", &variant.max_words().to_string())
        .replace("{risk_line_instruction}", &risk_line_instruction())
}

/// Type-dependent step-2 fields, in prose. Blank fields are reported as not provided.
fn technical_profile(form: &AssetForm) -> String {
    if form.is_data_center() {
        return match form.pue.trim() {
            "" => "PUE no indicado".to_string(),
            pue => format!("PUE {pue}"),
        };
    }
    let surface = match form.gla.trim() {
        "" => "Superficie no indicada".to_string(),
        gla => format!("Superficie {gla} m²"),
    };
    let year = match form.build_year.trim() {
        "" => "año de construcción no indicado".to_string(),
        year => format!("año de construcción {year}"),
    };
    format!("{surface}, {year}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::models::{AnalysisType, AssetType};

    #[test]
    fn test_prompt_embeds_asset_identification() {
        let prompt = build_analysis_prompt(&AssetForm::default(), PromptVariant::StrategicBrief);
        assert!(prompt.contains("Tipo: Oficinas"));
        assert!(prompt.contains("Dirección: Paseo de la Castellana, 93, 28046, España"));
        assert!(prompt.contains("Contexto: Análisis de Resiliencia Climática"));
        assert!(prompt.contains("Superficie 15000 m², año de construcción 1995"));
        assert!(prompt.contains("Smart Rem Solutions"));
    }

    #[test]
    fn test_prompt_requests_exact_risk_line() {
        let prompt = build_analysis_prompt(&AssetForm::default(), PromptVariant::StrategicBrief);
        assert!(prompt.contains(
            "SEMAFORO_RIESGOS:Olas de Calor=[NIVEL],Inundaciones=[NIVEL],Sequías=[NIVEL]"
        ));
        assert!(!prompt.contains('{'), "unreplaced placeholder in prompt");
    }

    #[test]
    fn test_variants_bound_the_narrative_length() {
        let form = AssetForm::default();
        let brief = build_analysis_prompt(&form, PromptVariant::StrategicBrief);
        let summary = build_analysis_prompt(&form, PromptVariant::ExecutiveSummary);
        assert!(brief.contains("(máx 200 palabras)"));
        assert!(summary.contains("(máx 100 palabras)"));
        assert!(summary.contains("Resumen Ejecutivo de Resiliencia"));
    }

    #[test]
    fn test_data_center_profile_uses_pue() {
        let form = AssetForm {
            asset_type: AssetType::DataCenter,
            analysis_type: AnalysisType::TransitionRisk,
            pue: "1.25".to_string(),
            ..AssetForm::default()
        };
        let prompt = build_analysis_prompt(&form, PromptVariant::StrategicBrief);
        assert!(prompt.contains("Perfil técnico: PUE 1.25"));
        assert!(!prompt.contains("Superficie"));
    }

    #[test]
    fn test_blank_fields_are_reported_as_missing() {
        let form = AssetForm {
            gla: String::new(),
            ..AssetForm::default()
        };
        let prompt = build_analysis_prompt(&form, PromptVariant::StrategicBrief);
        assert!(prompt.contains("Superficie no indicada, año de construcción 1995"));
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!(
            PromptVariant::parse("executive_summary"),
            Some(PromptVariant::ExecutiveSummary)
        );
        assert_eq!(PromptVariant::parse("long"), None);
    }
}
