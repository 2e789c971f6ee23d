//! Raw extraction data model.
//!
//! This is the shape the structured-extraction collaborator (the LLM)
//! returns for one SCOMP document. Every field is optional or defaulted:
//! the extractor works from noisy OCR text and legitimately omits whole
//! modalities, so deserialization must never fail on absent or null fields.
//! Offer tables keep their loosely-typed `serde_json::Value` rows here; the
//! transformers validate each row at construction time and skip the ones
//! that do not fit.

use crate::numeric::{clean_number, clean_str, format_uf};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An amount as the extractor delivers it: a plain number, a
/// locale-formatted string, or something malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
    Other(Value),
}

impl RawAmount {
    /// Normalizes to `f64`. Malformed input collapses to `0.0`, never fails.
    pub fn to_f64(&self) -> f64 {
        match self {
            RawAmount::Number(n) => *n,
            RawAmount::Text(s) => clean_str(s),
            RawAmount::Other(_) => 0.0,
        }
    }

    /// Display form for a UF column: extracted strings are kept verbatim,
    /// numbers are reformatted to locale form.
    pub fn uf_display(&self) -> String {
        match self {
            RawAmount::Text(s) => s.trim().to_string(),
            RawAmount::Number(n) => format_uf(*n),
            RawAmount::Other(_) => "0,00".to_string(),
        }
    }
}

fn amount(field: &Option<RawAmount>) -> f64 {
    field.as_ref().map_or(0.0, RawAmount::to_f64)
}

fn months(field: &Option<RawAmount>) -> u32 {
    amount(field).max(0.0) as u32
}

/// Affiliate identity block from the document cover page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Header {
    #[schemars(description = "Nombre del afiliado o consultante")]
    pub nombre: Option<String>,

    #[schemars(description = "RUT del afiliado o consultante")]
    pub rut: Option<String>,

    #[schemars(description = "Tipo de pensión de la portada, ej. 'PENSIÓN DE VEJEZ' o 'PENSIÓN DE SOBREVIVENCIA'")]
    pub tipo_pension: Option<String>,

    #[schemars(description = "Código de consulta del SCOMP")]
    pub n_scomp: Option<String>,

    #[schemars(description = "Saldo destinado a pensión, en UF")]
    pub saldo_uf: Option<RawAmount>,

    #[schemars(description = "Valor UF a fecha de emisión, como aparece en el documento")]
    pub valor_uf_str: Option<String>,

    #[schemars(description = "Valor UF a fecha de emisión, como número en pesos")]
    pub valor_uf_float: Option<RawAmount>,

    #[schemars(description = "AFP de origen del afiliado o causante")]
    pub afp_origen: Option<String>,
}

/// One survivorship beneficiary as listed in the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Beneficiario {
    #[serde(default)]
    #[schemars(description = "Nombre completo del beneficiario")]
    pub nombre: String,

    #[schemars(description = "RUT del beneficiario")]
    pub rut: Option<String>,

    #[serde(default)]
    #[schemars(description = "Parentesco legal, ej. 'Cónyuge con hijos con derecho a pensión'")]
    pub parentesco: String,
}

/// Best free-disposal-surplus (ELD) offer attached to a modality. Passed
/// through to renderers unmodified, never recomputed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EldOferta {
    pub compania: Option<String>,
    pub monto_uf: Option<RawAmount>,
    pub monto_pesos: Option<RawAmount>,
    pub pension_resultante_uf: Option<RawAmount>,
    pub pension_resultante_pesos: Option<RawAmount>,
}

/// Programmed-withdrawal block. Vejez documents carry a single pension for
/// the affiliate; Sobrevivencia documents carry a per-beneficiary breakdown
/// plus a stated total.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RetiroProgramado {
    #[schemars(description = "Pensión mensual en UF (vejez/invalidez)")]
    pub pension_uf: Option<RawAmount>,

    #[schemars(description = "Pensión mensual bruta en pesos (vejez/invalidez)")]
    pub pension_bruta: Option<RawAmount>,

    #[schemars(description = "Comisión de administración de la AFP, en porcentaje (ej. 1.25)")]
    pub comision_pct: Option<RawAmount>,

    #[schemars(description = "Pensión mensual total en UF (sobrevivencia)")]
    pub pension_total_uf: Option<RawAmount>,

    #[schemars(description = "Pensión mensual total en pesos (sobrevivencia)")]
    pub pension_total_pesos: Option<RawAmount>,

    #[serde(default)]
    #[schemars(description = "Filas [nombre, pensión UF, pensión $] por beneficiario (sobrevivencia)")]
    pub pensiones_beneficiarios: Vec<Value>,

    #[schemars(description = "Mejor oferta de excedente de libre disposición, si existe")]
    pub eld_oferta: Option<EldOferta>,
}

impl RetiroProgramado {
    /// Commission as a fraction of gross (`1.25` -> `0.0125`).
    pub fn comision_fraccion(&self) -> f64 {
        amount(&self.comision_pct) / 100.0
    }
}

/// One immediate life annuity modality (simple, percentage-increase, or
/// guaranteed-period) with its company offers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RentaVitalicia {
    #[schemars(description = "Título largo original de la modalidad")]
    pub titulo: Option<String>,

    #[schemars(description = "Porcentaje de aumento inicial, 0 si no aplica")]
    pub porcentaje_aumento: Option<RawAmount>,

    #[schemars(description = "Meses que dura el aumento, 0 si no aplica")]
    pub meses_aumento: Option<RawAmount>,

    #[schemars(description = "Meses de periodo garantizado, 0 si no aplica")]
    pub meses_garantizados: Option<RawAmount>,

    #[serde(default)]
    #[schemars(description = "Ofertas: filas [compañía, pensión UF, pensión $] en vejez, objetos por beneficiario en sobrevivencia")]
    pub ofertas: Vec<Value>,

    #[schemars(description = "Mejor oferta de excedente de libre disposición asociada, si existe")]
    pub eld_info: Option<EldOferta>,
}

impl RentaVitalicia {
    pub fn porcentaje_aumento(&self) -> f64 {
        amount(&self.porcentaje_aumento)
    }

    pub fn meses_aumento(&self) -> u32 {
        months(&self.meses_aumento)
    }

    pub fn meses_garantizados(&self) -> u32 {
        months(&self.meses_garantizados)
    }
}

/// One temporary-income-with-deferred-annuity modality.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RentaTemporal {
    #[schemars(description = "Título largo original de la modalidad")]
    pub titulo: Option<String>,

    #[schemars(description = "Meses del periodo diferido")]
    pub periodo_diferido_meses: Option<RawAmount>,

    #[schemars(description = "Factor de la renta temporal respecto de la renta vitalicia diferida")]
    pub factor_renta_temporal: Option<RawAmount>,

    #[schemars(description = "Meses de periodo garantizado, 0 si no aplica")]
    pub meses_garantizados: Option<RawAmount>,

    #[serde(default)]
    #[schemars(description = "Ofertas de la renta vitalicia diferida: filas [compañía, pensión UF, pensión $]")]
    pub ofertas_rvd: Vec<Value>,

    #[schemars(description = "Mejor oferta de excedente de libre disposición asociada, si existe")]
    pub eld_info: Option<EldOferta>,
}

impl RentaTemporal {
    pub fn periodo_diferido_meses(&self) -> u32 {
        months(&self.periodo_diferido_meses)
    }

    pub fn factor_renta_temporal(&self) -> f64 {
        self.factor_renta_temporal
            .as_ref()
            .map_or(1.0, RawAmount::to_f64)
    }

    pub fn meses_garantizados(&self) -> u32 {
        months(&self.meses_garantizados)
    }
}

/// The full nested structure returned by the extraction collaborator for
/// one SCOMP document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawExtraction {
    #[serde(default)]
    pub header: Header,

    #[serde(default)]
    #[schemars(description = "Beneficiarios, sólo en pensiones de sobrevivencia")]
    pub beneficiarios: Vec<Beneficiario>,

    #[serde(default)]
    #[schemars(description = "Tabla de pensión de referencia garantizada por ley")]
    pub pension_referencia: Vec<Value>,

    #[serde(default)]
    pub retiro_programado: RetiroProgramado,

    #[serde(default)]
    pub rentas_vitalicias: Vec<RentaVitalicia>,

    #[serde(default)]
    pub renta_temporal_rv_diferida: Vec<RentaTemporal>,
}

impl RawExtraction {
    /// Deserializes the collaborator's JSON response. A response that does
    /// not match the overall shape is a hard failure; individual missing or
    /// malformed fields are not.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RawExtraction)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

/// Enriched header context for one processing pass. Built once from the raw
/// header; the survivorship transformer augments it in place with the
/// ordered beneficiary list and the derived 100%-base pension.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeaderData {
    pub nombre: Option<String>,
    pub rut: Option<String>,
    pub tipo_pension: Option<String>,
    pub n_scomp: Option<String>,
    pub saldo_uf: Option<String>,
    /// UF unit value in pesos at emission date.
    pub valor_uf: f64,
    pub afp_origen: Option<String>,
    /// Filled by the survivorship transformer: legal-precedence order.
    pub beneficiarios_ordenados: Vec<Beneficiario>,
    /// Filled by the survivorship transformer: 100%-equivalent base pension
    /// in UF, 0 when it could not be derived.
    pub pension_base_100_uf: f64,
}

impl HeaderData {
    pub fn from_header(header: &Header) -> Self {
        Self {
            nombre: header.nombre.clone(),
            rut: header.rut.clone(),
            tipo_pension: header.tipo_pension.clone(),
            n_scomp: header.n_scomp.clone(),
            saldo_uf: header.saldo_uf.as_ref().map(RawAmount::uf_display),
            valor_uf: amount(&header.valor_uf_float),
            afp_origen: header.afp_origen.clone(),
            beneficiarios_ordenados: Vec::new(),
            pension_base_100_uf: 0.0,
        }
    }

    pub fn is_sobrevivencia(&self) -> bool {
        self.tipo_pension
            .as_deref()
            .is_some_and(|t| t.to_uppercase().contains("SOBREVIVENCIA"))
    }

    pub(crate) fn afp_origen_or(&self, default: &str) -> String {
        self.afp_origen
            .clone()
            .unwrap_or_else(|| default.to_string())
    }
}

/// Normalized gross value for a table cell: parsed and floored at zero so a
/// malformed extraction can never produce a negative pension.
pub(crate) fn gross_amount(value: &Value) -> f64 {
    clean_number(value).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_generation() {
        let schema_json = RawExtraction::schema_as_json().unwrap();
        assert!(schema_json.contains("retiro_programado"));
        assert!(schema_json.contains("rentas_vitalicias"));
        assert!(schema_json.contains("beneficiarios"));
    }

    #[test]
    fn test_tolerates_empty_object() {
        let raw = RawExtraction::from_json("{}").unwrap();
        assert!(raw.beneficiarios.is_empty());
        assert!(raw.rentas_vitalicias.is_empty());
        assert!(raw.retiro_programado.pension_bruta.is_none());
    }

    #[test]
    fn test_tolerates_nulls_and_mixed_types() {
        let raw = RawExtraction::from_json(
            r#"{
                "header": {"nombre": null, "valor_uf_float": "37.500,25", "afp_origen": "AFP MODELO"},
                "retiro_programado": {"pension_bruta": "350.000", "pension_uf": "10,00", "comision_pct": 1.25},
                "rentas_vitalicias": [{"titulo": null, "meses_garantizados": null, "ofertas": []}]
            }"#,
        )
        .unwrap();

        let header = HeaderData::from_header(&raw.header);
        assert_eq!(header.valor_uf, 37500.25);
        assert_eq!(header.afp_origen.as_deref(), Some("AFP MODELO"));

        let rp = &raw.retiro_programado;
        assert_eq!(rp.pension_bruta.as_ref().unwrap().to_f64(), 350000.0);
        assert_eq!(rp.comision_fraccion(), 0.0125);

        assert_eq!(raw.rentas_vitalicias[0].meses_garantizados(), 0);
    }

    #[test]
    fn test_raw_amount_display() {
        assert_eq!(RawAmount::Text(" 16,20 ".into()).uf_display(), "16,20");
        assert_eq!(RawAmount::Number(1234.5).uf_display(), "1.234,50");
        assert_eq!(
            RawAmount::Other(serde_json::Value::Null).uf_display(),
            "0,00"
        );
    }

    #[test]
    fn test_is_sobrevivencia() {
        let mut header = HeaderData::default();
        assert!(!header.is_sobrevivencia());
        header.tipo_pension = Some("Pensión de Sobrevivencia".into());
        assert!(header.is_sobrevivencia());
        header.tipo_pension = Some("PENSIÓN DE VEJEZ".into());
        assert!(!header.is_sobrevivencia());
    }
}
