// Shared prompt fragments.
// Feature prompts live next to the feature (see wizard::prompts); this file holds the
// pieces every analysis prompt must carry verbatim.

/// Literal prefix of the machine-readable risk line the model must append.
pub const RISK_LINE_PREFIX: &str = "SEMAFORO_RIESGOS:";

/// Hazards the model is asked to grade, in the order they appear on the risk line.
pub const HAZARDS: [&str; 3] = ["Olas de Calor", "Inundaciones", "Sequías"];

/// Persona every analysis prompt opens with.
pub const CONSULTANT_PERSONA: &str = "Actúa como un Consultor Senior de Estrategia de \
    Sostenibilidad en \"Smart Rem Solutions\". Tu tono es profesional, visionario y experto.";

/// Builds the closing instruction that pins the risk line format.
pub fn risk_line_instruction() -> String {
    let template: Vec<String> = HAZARDS.iter().map(|h| format!("{h}=[NIVEL]")).collect();
    format!(
        "Al final, añade EXACTAMENTE esta línea oculta, sola en su propia línea y sin formato adicional:\n\
         {RISK_LINE_PREFIX}{}\n\
         (Donde [NIVEL] es Bajo, Medio o Alto).",
        template.join(",")
    )
}
