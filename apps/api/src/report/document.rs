//! Report document builder: lays out the analysis as A4 pages and writes the PDF.
//!
//! # Architecture
//! - `compose` is pure layout: it turns a `ReportInput` into positioned text runs per page.
//!   All wrapping and pagination decisions are made here, against the static Helvetica
//!   metrics, so they can be tested without parsing PDF output.
//! - `render` hands the runs to `printpdf` using the two builtin Helvetica faces.
//! - `build_report` is CPU-bound; callers run it inside `tokio::task::spawn_blocking`.

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, Rgb};
use thiserror::Error;

use crate::report::font_metrics::{
    default_page_config, get_metrics, mm_to_pt, pt_to_mm, FontFamily, PageConfig,
};
use crate::wizard::models::{AnalysisResult, AssetForm};
use crate::wizard::risk::indicators;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("PDF writer error: {0}")]
    Pdf(#[from] printpdf::Error),
}

pub const REPORT_TITLE: &str = "Informe Estratégico de Resiliencia";

const BRAND: &str = "SMART REM SOLUTIONS";

const PROMO_HEADING: &str = "Del diagnóstico a la acción";
const PROMO_TEXT: &str = "Este informe preliminar es el primer paso. Nuestro equipo combina \
    ingeniería, datos climáticos y estrategia financiera para convertir cada riesgo en una \
    ventaja competitiva: planes de descarbonización alineados con CRREM, certificaciones \
    LEED y BREEAM, y optimización energética de centros de datos. Agende una Sesión \
    Estratégica gratuita y diseñemos juntos la hoja de ruta de su activo hacia la \
    Sostenibilidad Esférica.";
const PROMO_CONTACT: &str = "www.smartremsolutions.com  ·  info@smartremsolutions.com";

const DISCLAIMER: &str = "Aviso legal: este documento se ha generado automáticamente a partir \
    de un modelo de inteligencia artificial y de fuentes cartográficas públicas. Tiene carácter \
    meramente orientativo y no constituye asesoramiento técnico, financiero ni jurídico. Los \
    niveles de riesgo son estimaciones preliminares que deben validarse mediante un estudio \
    específico del activo. Smart Rem Solutions no se responsabiliza de las decisiones \
    adoptadas con base exclusivamente en su contenido.";

const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
const MUTED: (f32, f32, f32) = (0.42, 0.45, 0.50);
const ACCENT: (f32, f32, f32) = (0.02, 0.59, 0.41);

const TITLE_PT: f32 = 18.0;
const HEADING_PT: f32 = 12.5;
const SMALL_PT: f32 = 8.0;
/// Column where field values and risk levels start, measured from the left margin.
const VALUE_COLUMN_MM: f32 = 45.0;
/// Space kept free at the bottom of every page for the page number.
const FOOTER_RESERVE_MM: f32 = 10.0;

/// Everything the report shows. Owned so it can move into a blocking task.
#[derive(Debug, Clone)]
pub struct ReportInput {
    pub form: AssetForm,
    pub result: AnalysisResult,
    /// Lead display name printed under the title.
    pub prepared_for: String,
    pub generated_at: DateTime<Utc>,
}

/// One positioned piece of text. `y_mm` is measured from the bottom edge, as PDF does.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font: FontFamily,
    pub size_pt: f32,
    pub x_mm: f32,
    pub y_mm: f32,
    pub color: (f32, f32, f32),
}

/// Builds the PDF bytes for a report.
pub fn build_report(input: &ReportInput) -> Result<Vec<u8>, DocumentError> {
    let config = default_page_config();
    let pages = compose(input, &config);
    render(&pages, &config)
}

/// Deterministic download name: `informe-resiliencia-<postal code>-<address slug>.pdf`.
pub fn report_filename(form: &AssetForm) -> String {
    let mut parts = vec!["informe-resiliencia".to_string()];
    for raw in [form.postal_code.as_str(), form.address.as_str()] {
        let slug = slugify(raw);
        if !slug.is_empty() {
            parts.push(slug);
        }
    }
    format!("{}.pdf", parts.join("-"))
}

/// Lowercase ASCII slug: accents folded, every other run of non-alphanumerics becomes `-`.
fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.chars().flat_map(char::to_lowercase) {
        let c = match c {
            'á' | 'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        };
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

// ────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────

/// Lays out the whole report and stamps page numbers once the page count is known.
pub fn compose(input: &ReportInput, config: &PageConfig) -> Vec<Vec<TextRun>> {
    let body = config.body_font_size_pt;
    let mut c = Composer::new(config);

    c.line(BRAND, FontFamily::HelveticaBold, SMALL_PT, ACCENT);
    c.line(REPORT_TITLE, FontFamily::HelveticaBold, TITLE_PT, BLACK);
    c.line(
        &format!(
            "Preparado para {}  ·  {}",
            input.prepared_for,
            input.generated_at.format("%d/%m/%Y")
        ),
        FontFamily::Helvetica,
        SMALL_PT + 1.0,
        MUTED,
    );
    c.gap(6.0);

    c.heading("Datos del activo");
    let form = &input.form;
    c.field("Dirección", &form.full_address());
    c.field("Tipo de activo", form.asset_type.label());
    c.field("Tipo de análisis", form.analysis_type.label());
    if form.is_data_center() {
        c.field("PUE", or_not_provided(&form.pue));
    } else {
        let gla = match form.gla.trim() {
            "" => "No indicada".to_string(),
            gla => format!("{gla} m²"),
        };
        c.field("Superficie (SBA)", &gla);
        c.field("Año de construcción", or_not_provided(&form.build_year));
    }
    if let Some(place) = input.result.verified_location() {
        c.field("Ubicación verificada", &place.title);
    }
    c.gap(4.0);

    c.heading("Análisis estratégico");
    c.paragraph(&input.result.analysis_text, FontFamily::Helvetica, body, BLACK);
    c.gap(4.0);

    c.heading("Semáforo de riesgos climáticos");
    let risks = indicators(&input.result.risks);
    if risks.is_empty() {
        c.line(
            "Sin datos de riesgo disponibles para este activo.",
            FontFamily::Helvetica,
            body,
            MUTED,
        );
    }
    for risk in risks {
        c.columns(
            (risk.hazard.as_str(), FontFamily::Helvetica, BLACK),
            (risk.label.as_str(), FontFamily::HelveticaBold, risk.color.rgb()),
        );
    }

    let references: Vec<_> = input.result.map_references().collect();
    if !references.is_empty() {
        c.gap(4.0);
        c.heading("Fuentes cartográficas");
        for reference in references {
            let label = match reference.title.trim() {
                "" => reference.uri.clone(),
                title => format!("{title}: {}", reference.uri),
            };
            c.paragraph(&label, FontFamily::Helvetica, SMALL_PT + 1.0, MUTED);
        }
    }
    c.gap(8.0);

    c.keep_together(
        config.line_height_mm(HEADING_PT) + 4.0 * config.line_height_mm(body),
    );
    c.heading(PROMO_HEADING);
    c.paragraph(PROMO_TEXT, FontFamily::Helvetica, body, BLACK);
    c.line(PROMO_CONTACT, FontFamily::HelveticaBold, body, ACCENT);
    c.gap(8.0);

    c.paragraph(DISCLAIMER, FontFamily::Helvetica, SMALL_PT, MUTED);

    c.finish()
}

fn or_not_provided(raw: &str) -> &str {
    match raw.trim() {
        "" => "No indicado",
        value => value,
    }
}

/// Top-down cursor over a growing list of pages.
struct Composer<'a> {
    config: &'a PageConfig,
    pages: Vec<Vec<TextRun>>,
    /// Distance from the top edge to the last baseline written.
    cursor_mm: f32,
}

impl<'a> Composer<'a> {
    fn new(config: &'a PageConfig) -> Self {
        Self {
            config,
            pages: vec![Vec::new()],
            cursor_mm: config.margin_mm,
        }
    }

    fn bottom_limit_mm(&self) -> f32 {
        self.config.page_height_mm - self.config.margin_mm - FOOTER_RESERVE_MM
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor_mm = self.config.margin_mm;
    }

    /// Moves to the next baseline, breaking the page when it would not fit.
    fn advance(&mut self, size_pt: f32) -> f32 {
        let step = self.config.line_height_mm(size_pt);
        if self.cursor_mm + step > self.bottom_limit_mm() {
            self.new_page();
        }
        self.cursor_mm += step;
        self.config.page_height_mm - self.cursor_mm
    }

    fn push(&mut self, run: TextRun) {
        if let Some(page) = self.pages.last_mut() {
            page.push(run);
        }
    }

    fn gap(&mut self, mm: f32) {
        // A gap never starts a page.
        let top_of_page = self.pages.last().map_or(true, |p| p.is_empty());
        if !top_of_page {
            self.cursor_mm = (self.cursor_mm + mm).min(self.bottom_limit_mm());
        }
    }

    /// Breaks the page now unless `height_mm` still fits below the cursor.
    fn keep_together(&mut self, height_mm: f32) {
        if self.cursor_mm + height_mm > self.bottom_limit_mm() {
            self.new_page();
        }
    }

    fn line(&mut self, text: &str, font: FontFamily, size_pt: f32, color: (f32, f32, f32)) {
        let y_mm = self.advance(size_pt);
        self.push(TextRun {
            text: text.to_string(),
            font,
            size_pt,
            x_mm: self.config.margin_mm,
            y_mm,
            color,
        });
    }

    fn heading(&mut self, text: &str) {
        self.keep_together(self.config.line_height_mm(HEADING_PT) * 3.0);
        self.line(text, FontFamily::HelveticaBold, HEADING_PT, ACCENT);
        self.gap(1.5);
    }

    /// Word-wrapped text at full width; blank lines become half-line gaps.
    fn paragraph(&mut self, text: &str, font: FontFamily, size_pt: f32, color: (f32, f32, f32)) {
        let width_em = self.config.text_width_em(size_pt);
        for line in get_metrics(&font).wrap_text(text, width_em) {
            if line.is_empty() {
                self.gap(self.config.line_height_mm(size_pt) * 0.5);
            } else {
                self.line(&line, font, size_pt, color);
            }
        }
    }

    /// Bold label in the left column, wrapped value in the right one.
    fn field(&mut self, label: &str, value: &str) {
        self.columns(
            (label, FontFamily::HelveticaBold, BLACK),
            (value, FontFamily::Helvetica, BLACK),
        );
    }

    fn columns(
        &mut self,
        left: (&str, FontFamily, (f32, f32, f32)),
        right: (&str, FontFamily, (f32, f32, f32)),
    ) {
        let size_pt = self.config.body_font_size_pt;
        let value_width_em = mm_to_pt(self.config.text_width_mm() - VALUE_COLUMN_MM) / size_pt;
        let mut value_lines = get_metrics(&right.1).wrap_text(right.0, value_width_em);
        if value_lines.is_empty() {
            value_lines.push("-".to_string());
        }

        for (i, value) in value_lines.into_iter().filter(|l| !l.is_empty()).enumerate() {
            let y_mm = self.advance(size_pt);
            if i == 0 {
                self.push(TextRun {
                    text: left.0.to_string(),
                    font: left.1,
                    size_pt,
                    x_mm: self.config.margin_mm,
                    y_mm,
                    color: left.2,
                });
            }
            self.push(TextRun {
                text: value,
                font: right.1,
                size_pt,
                x_mm: self.config.margin_mm + VALUE_COLUMN_MM,
                y_mm,
                color: right.2,
            });
        }
    }

    fn finish(mut self) -> Vec<Vec<TextRun>> {
        let total = self.pages.len();
        let metrics = get_metrics(&FontFamily::Helvetica);
        for (i, page) in self.pages.iter_mut().enumerate() {
            let label = format!("Página {} de {}", i + 1, total);
            let width_mm = pt_to_mm(metrics.measure_str(&label) * SMALL_PT);
            page.push(TextRun {
                x_mm: self.config.page_width_mm - self.config.margin_mm - width_mm,
                y_mm: self.config.margin_mm / 2.0,
                text: label,
                font: FontFamily::Helvetica,
                size_pt: SMALL_PT,
                color: MUTED,
            });
        }
        self.pages
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PDF output
// ────────────────────────────────────────────────────────────────────────────

fn render(pages: &[Vec<TextRun>], config: &PageConfig) -> Result<Vec<u8>, DocumentError> {
    let width = Mm(config.page_width_mm);
    let height = Mm(config.page_height_mm);
    let (doc, first_page, first_layer) = PdfDocument::new(REPORT_TITLE, width, height, "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    for (i, runs) in pages.iter().enumerate() {
        let (page, layer) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, "Layer 1")
        };
        let layer = doc.get_page(page).get_layer(layer);
        for run in runs {
            let font: &IndirectFontRef = match run.font {
                FontFamily::Helvetica => &regular,
                FontFamily::HelveticaBold => &bold,
            };
            let (r, g, b) = run.color;
            layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
            layer.use_text(run.text.as_str(), run.size_pt, Mm(run.x_mm), Mm(run.y_mm), font);
        }
    }

    Ok(doc.save_to_bytes()?)
}
