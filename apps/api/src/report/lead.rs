//! Lead capture: the contact form that gates the PDF report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::wizard::models::{AnalysisResult, AssetForm};
use crate::wizard::risk::indicators;

/// Position of the person requesting the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Dirección General")]
    Executive,
    #[serde(rename = "Dirección Financiera")]
    Finance,
    #[serde(rename = "Responsable ESG / Sostenibilidad")]
    Sustainability,
    #[default]
    #[serde(rename = "Asset / Property Manager")]
    AssetManager,
    #[serde(rename = "Técnico / Ingeniería")]
    Engineering,
    #[serde(rename = "Otro")]
    Other,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Executive,
        Role::Finance,
        Role::Sustainability,
        Role::AssetManager,
        Role::Engineering,
        Role::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Role::Executive => "Dirección General",
            Role::Finance => "Dirección Financiera",
            Role::Sustainability => "Responsable ESG / Sostenibilidad",
            Role::AssetManager => "Asset / Property Manager",
            Role::Engineering => "Técnico / Ingeniería",
            Role::Other => "Otro",
        }
    }
}

/// What the lead wants to talk about next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interest {
    #[default]
    #[serde(rename = "Informe Completo de Riesgos Climáticos")]
    FullRiskReport,
    #[serde(rename = "Plan de Descarbonización (CRREM)")]
    Decarbonization,
    #[serde(rename = "Certificación Sostenible (LEED / BREEAM)")]
    Certification,
    #[serde(rename = "Eficiencia Energética en Data Centers")]
    DataCenterEfficiency,
    #[serde(rename = "Solo información")]
    JustInformation,
}

impl Interest {
    pub const ALL: [Interest; 5] = [
        Interest::FullRiskReport,
        Interest::Decarbonization,
        Interest::Certification,
        Interest::DataCenterEfficiency,
        Interest::JustInformation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Interest::FullRiskReport => "Informe Completo de Riesgos Climáticos",
            Interest::Decarbonization => "Plan de Descarbonización (CRREM)",
            Interest::Certification => "Certificación Sostenible (LEED / BREEAM)",
            Interest::DataCenterEfficiency => "Eficiencia Energética en Data Centers",
            Interest::JustInformation => "Solo información",
        }
    }
}

/// Contact details submitted with a report request. Relayed once, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadData {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub interest: Interest,
    #[serde(default)]
    pub consent: bool,
}

impl LeadData {
    /// Consent is checked first so that nothing downstream runs without it.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.consent {
            return Err(AppError::Validation(
                "consent is required to download the report".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation(format!(
                "email '{email}' is not a valid address"
            )));
        }
        Ok(())
    }

    /// "Name (Company)", or just the name when no company was given.
    pub fn display_name(&self) -> String {
        match self.company.trim() {
            "" => self.name.trim().to_string(),
            company => format!("{} ({company})", self.name.trim()),
        }
    }
}

/// Template parameters sent with every relayed lead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayMessage {
    pub title: String,
    pub name: String,
    pub email: String,
    pub time: String,
    pub message: String,
}

pub const RELAY_TITLE: &str = "Nuevo Lead: Informe de Resiliencia";
const ORIGIN_TAG: &str = "Origen: Análisis Estratégico (descarga de informe PDF)";

/// Builds the relayed message: lead fields followed by a summary of the analysis.
pub fn build_relay_message(
    lead: &LeadData,
    form: &AssetForm,
    result: &AnalysisResult,
    now: DateTime<Utc>,
) -> RelayMessage {
    let or_dash = |v: &str| match v.trim() {
        "" => "-".to_string(),
        v => v.to_string(),
    };

    let risks = indicators(&result.risks)
        .into_iter()
        .map(|i| format!("{}: {}", i.hazard, i.label))
        .collect::<Vec<_>>();
    let risk_summary = if risks.is_empty() {
        "Sin datos".to_string()
    } else {
        risks.join(", ")
    };

    let message = format!(
        "SOLICITUD DE INFORME DE RESILIENCIA\n\
         \n\
         DATOS DEL CONTACTO:\n\
         Nombre: {name}\n\
         Empresa: {company}\n\
         Email: {email}\n\
         Teléfono: {phone}\n\
         Cargo: {role}\n\
         Sector: {sector}\n\
         Interés: {interest}\n\
         \n\
         ACTIVO ANALIZADO:\n\
         Dirección: {address}\n\
         Tipo de activo: {asset_type}\n\
         Tipo de análisis: {analysis_type}\n\
         Semáforo de riesgos: {risk_summary}\n\
         \n\
         POLÍTICA DE PRIVACIDAD: Aceptada (RGPD)\n\
         --------------------------------\n\
         {ORIGIN_TAG}",
        name = lead.name.trim(),
        company = or_dash(&lead.company),
        email = lead.email.trim(),
        phone = or_dash(&lead.phone),
        role = lead.role.label(),
        sector = or_dash(&lead.sector),
        interest = lead.interest.label(),
        address = form.full_address(),
        asset_type = form.asset_type.label(),
        analysis_type = form.analysis_type.label(),
    );

    RelayMessage {
        title: RELAY_TITLE.to_string(),
        name: lead.name.trim().to_string(),
        email: lead.email.trim().to_string(),
        time: spanish_timestamp(now),
        message,
    }
}

/// Spanish-locale timestamp, e.g. `7/3/2025, 9:05:02`.
pub fn spanish_timestamp(at: DateTime<Utc>) -> String {
    at.format("%-d/%-m/%Y, %-H:%M:%S").to_string()
}
