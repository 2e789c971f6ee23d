//! Survivorship (Sobrevivencia) pipeline.
//!
//! Orders beneficiaries by legal precedence, derives the 100%-equivalent
//! base pension from the programmed-withdrawal breakdown and the legal-share
//! table, and builds the per-beneficiary comparison tables. Data-quality
//! problems surface as collected warnings, never as errors.

use crate::legal::porcentaje_legal;
use crate::numeric::{clean_number, format_uf, round_pesos};
use crate::schema::{gross_amount, Beneficiario, HeaderData, RawAmount, RawExtraction};
use crate::tables::{
    BeneficiaryAmount, BeneficiaryRow, ProcessedTable, SurvivorOfferRow, TableBody, TableIdGen,
    TableKind,
};
use crate::vejez::DESCUENTO_SALUD;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Flat net factor for the survivorship annuity "Total Líquido" column.
/// Intentionally a simplification of the per-row 7% formula used elsewhere;
/// changing it would change published numbers.
const FACTOR_LIQUIDO: f64 = 0.93;

const MAX_OFERTAS: usize = 4;

/// Non-fatal conditions collected during a survivorship pass. The caller
/// decides whether to surface or halt; the core only reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SobrevivenciaWarning {
    /// The document carries no beneficiary list.
    SinBeneficiarios,
    /// No beneficiary matched the legal-share table, so the 100% base
    /// pension stays at zero.
    PensionBaseNoCalculada,
}

impl fmt::Display for SobrevivenciaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SobrevivenciaWarning::SinBeneficiarios => {
                write!(f, "No se encontraron beneficiarios en el SCOMP.")
            }
            SobrevivenciaWarning::PensionBaseNoCalculada => write!(
                f,
                "No se pudo calcular la Pensión Base 100% desde Retiro Programado."
            ),
        }
    }
}

/// Output of one survivorship pass.
#[derive(Debug, Clone)]
pub struct SobrevivenciaResult {
    pub tables: Vec<ProcessedTable>,
    /// Beneficiaries in legal-precedence order (also written into the
    /// header context).
    pub beneficiarios: Vec<Beneficiario>,
    pub warnings: Vec<SobrevivenciaWarning>,
}

/// Transforms one raw survivorship extraction into the processed
/// (unordered) table collection, augmenting `header` in place with the
/// ordered beneficiary list and the derived base pension.
pub fn process_sobrevivencia(raw: &RawExtraction, header: &mut HeaderData) -> SobrevivenciaResult {
    log::info!(
        "procesando SCOMP sobrevivencia con {} beneficiarios",
        raw.beneficiarios.len()
    );

    let mut warnings = Vec::new();

    if raw.beneficiarios.is_empty() {
        log::warn!("documento de sobrevivencia sin beneficiarios");
        warnings.push(SobrevivenciaWarning::SinBeneficiarios);
        return SobrevivenciaResult {
            tables: Vec::new(),
            beneficiarios: Vec::new(),
            warnings,
        };
    }

    let beneficiarios = ordenar_beneficiarios(&raw.beneficiarios);
    header.beneficiarios_ordenados = beneficiarios.clone();

    let rp = &raw.retiro_programado;
    let afp_comision = rp.comision_fraccion();

    header.pension_base_100_uf = derivar_pension_base(&rp.pensiones_beneficiarios, &beneficiarios);
    if header.pension_base_100_uf == 0.0 {
        warnings.push(SobrevivenciaWarning::PensionBaseNoCalculada);
    }

    let mut ids = TableIdGen::default();
    let mut tables = Vec::new();

    if let Some(tabla_rp) = tabla_retiro_programado(raw, header, afp_comision, &mut ids) {
        tables.push(tabla_rp);
    }

    let columnas = columnas_sobrevivencia(beneficiarios.len());
    for modalidad in &raw.rentas_vitalicias {
        let garantizados = modalidad.meses_garantizados();
        let filas = parse_ofertas_sobrevivencia(&modalidad.ofertas, beneficiarios.len());
        if filas.is_empty() {
            log::debug!("modalidad de renta vitalicia sin ofertas válidas, se omite");
            continue;
        }

        tables.push(ProcessedTable {
            id: ids.next_id(),
            titulo: titulo_sobrevivencia(garantizados),
            kind: TableKind::RentaVitaliciaSobrevivencia {
                meses_garantizados: garantizados,
            },
            body: TableBody::OfertasSobrevivencia {
                columnas: columnas.clone(),
                filas,
            },
            col_pension_total: "Pensión".to_string(),
            eld_info: None,
            linked_to: None,
            sort_key: None,
        });
    }

    SobrevivenciaResult {
        tables,
        beneficiarios,
        warnings,
    }
}

/// Legal precedence: spouse/cohabitant/parent categories before children
/// and unclassified, stable within each partition.
pub fn ordenar_beneficiarios(beneficiarios: &[Beneficiario]) -> Vec<Beneficiario> {
    const PRIORITARIOS: [&str; 4] = ["cónyuge", "conviviente", "madre", "padre"];

    let mut ordenados = Vec::with_capacity(beneficiarios.len());
    let mut hijos = Vec::new();

    for b in beneficiarios {
        let parentesco = b.parentesco.to_lowercase();
        if PRIORITARIOS.iter().any(|marker| parentesco.contains(marker)) {
            ordenados.push(b.clone());
        } else {
            hijos.push(b.clone());
        }
    }

    ordenados.extend(hijos);
    ordenados
}

/// Derives the 100%-equivalent base pension in UF from the first
/// programmed-withdrawal beneficiary row whose name matches an ordered
/// beneficiary with a known nonzero legal share. Returns 0 when nothing
/// matches.
fn derivar_pension_base(filas_rp: &[Value], beneficiarios: &[Beneficiario]) -> f64 {
    for fila in filas_rp {
        let Some((nombre_rp, uf_rp, _)) = parse_fila_beneficiario(fila) else {
            continue;
        };

        let needle = nombre_rp.trim().to_uppercase();
        let parentesco = beneficiarios
            .iter()
            .find(|b| b.nombre.trim().to_uppercase().contains(&needle))
            .map(|b| b.parentesco.as_str())
            .unwrap_or("");

        if let Some(porcentaje) = porcentaje_legal(parentesco) {
            if porcentaje > 0.0 {
                return uf_rp / porcentaje;
            }
        }
    }
    0.0
}

/// Builds the programmed-withdrawal table: one row per beneficiary plus the
/// stated "Pensión mensual total" row.
fn tabla_retiro_programado(
    raw: &RawExtraction,
    header: &HeaderData,
    afp_comision: f64,
    ids: &mut TableIdGen,
) -> Option<ProcessedTable> {
    let rp = &raw.retiro_programado;

    let filas: Vec<BeneficiaryRow> = rp
        .pensiones_beneficiarios
        .iter()
        .filter_map(parse_fila_beneficiario)
        .map(|(nombre, uf, bruta)| {
            let salud = round_pesos(bruta * DESCUENTO_SALUD);
            let comision = round_pesos(bruta * afp_comision);
            BeneficiaryRow {
                beneficiario: nombre,
                pension_uf: format_uf(uf),
                pension_bruta: bruta,
                descuento_salud: salud,
                descuento_comision: comision,
                pension_liquida: bruta - salud - comision,
            }
        })
        .collect();

    if filas.is_empty() {
        return None;
    }

    // The UF total is the document's stated figure, not a recomputed sum.
    let total_uf = rp
        .pension_total_uf
        .as_ref()
        .map_or(0.0, RawAmount::to_f64);
    let total = BeneficiaryRow {
        beneficiario: "Pensión mensual total".to_string(),
        pension_uf: format_uf(total_uf),
        pension_bruta: filas.iter().map(|f| f.pension_bruta).sum(),
        descuento_salud: filas.iter().map(|f| f.descuento_salud).sum(),
        descuento_comision: filas.iter().map(|f| f.descuento_comision).sum(),
        pension_liquida: filas.iter().map(|f| f.pension_liquida).sum(),
    };

    Some(ProcessedTable {
        id: ids.next_id(),
        titulo: format!("Retiro Programado ({})", header.afp_origen_or("AFP")),
        kind: TableKind::RetiroProgramadoSobrevivencia,
        body: TableBody::Beneficiarios { filas, total },
        col_pension_total: "Pensión".to_string(),
        eld_info: None,
        linked_to: None,
        sort_key: None,
    })
}

/// Validates one `[nombre, pensión UF, pensión $]` row. The gross amount is
/// floored at zero like every other gross in the pipeline.
fn parse_fila_beneficiario(fila: &Value) -> Option<(String, f64, f64)> {
    let items = fila.as_array()?;
    let nombre = items.first()?.as_str()?.trim().to_string();
    if nombre.is_empty() {
        return None;
    }
    let uf = items.get(1).map_or(0.0, clean_number);
    let bruta = items.get(2).map_or(0.0, gross_amount);
    Some((nombre, uf, bruta))
}

/// Column headers for the survivorship annuity tables: one UF/pesos pair
/// per ordered beneficiary.
fn columnas_sobrevivencia(n_beneficiarios: usize) -> Vec<String> {
    let mut columnas = vec!["Compañía".to_string()];
    for i in 0..n_beneficiarios {
        columnas.push(format!("Benef. {} UF", i + 1));
        columnas.push(format!("Benef. {} $", i + 1));
    }
    columnas.push("Total Bruto".to_string());
    columnas.push("Total Líquido".to_string());
    columnas
}

fn titulo_sobrevivencia(garant_meses: u32) -> String {
    if garant_meses > 0 {
        format!("Renta Vitalicia Inmediata / Garantizado {}m", garant_meses)
    } else {
        "Renta Vitalicia Inmediata / Simple".to_string()
    }
}

/// Parses the survivorship offer objects for one modality and keeps the top
/// offers by gross total, descending, ties by input order. Offers with
/// fewer beneficiary pairs than expected are padded with `None`; extra
/// pairs are truncated.
fn parse_ofertas_sobrevivencia(ofertas: &[Value], n_beneficiarios: usize) -> Vec<SurvivorOfferRow> {
    let mut filas: Vec<SurvivorOfferRow> = ofertas
        .iter()
        .filter_map(|oferta| {
            let obj = oferta.as_object()?;
            let compania = obj.get("compania")?.as_str()?.trim().to_string();
            if compania.is_empty() {
                return None;
            }

            let total_bruto = obj.get("pension_total_pesos").map_or(0.0, gross_amount);

            let pares = obj
                .get("ofertas_beneficiarios")
                .and_then(Value::as_array)
                .map(|lista| {
                    lista
                        .iter()
                        .map(|par| {
                            let items = par.as_array()?;
                            let pension_uf = match items.first() {
                                Some(Value::String(s)) => s.trim().to_string(),
                                Some(Value::Number(n)) => format_uf(n.as_f64().unwrap_or(0.0)),
                                _ => "0,00".to_string(),
                            };
                            let pension_pesos = items.get(1).map_or(0.0, clean_number);
                            Some(BeneficiaryAmount {
                                pension_uf,
                                pension_pesos,
                            })
                        })
                        .collect::<Vec<Option<BeneficiaryAmount>>>()
                })
                .unwrap_or_default();

            let mut beneficiarios: Vec<Option<BeneficiaryAmount>> =
                pares.into_iter().take(n_beneficiarios).collect();
            beneficiarios.resize(n_beneficiarios, None);

            Some(SurvivorOfferRow {
                compania,
                beneficiarios,
                total_bruto,
                total_liquido: round_pesos(total_bruto * FACTOR_LIQUIDO),
            })
        })
        .collect();

    filas.sort_by(|a, b| {
        b.total_bruto
            .partial_cmp(&a.total_bruto)
            .unwrap_or(Ordering::Equal)
    });
    filas.truncate(MAX_OFERTAS);
    filas
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_from(value: serde_json::Value) -> RawExtraction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_spouse_precedes_children_regardless_of_input_order() {
        let beneficiarios = vec![
            Beneficiario {
                nombre: "HIJO UNO".into(),
                rut: None,
                parentesco: "Hijo".into(),
            },
            Beneficiario {
                nombre: "SOTO ISLA DORILA".into(),
                rut: None,
                parentesco: "Cónyuge con hijos con derecho a pensión".into(),
            },
        ];

        let ordenados = ordenar_beneficiarios(&beneficiarios);
        assert_eq!(ordenados[0].nombre, "SOTO ISLA DORILA");
        assert_eq!(ordenados[1].nombre, "HIJO UNO");
    }

    #[test]
    fn test_priority_partition_is_stable() {
        let beneficiarios = vec![
            Beneficiario {
                nombre: "H1".into(),
                rut: None,
                parentesco: "Hijo".into(),
            },
            Beneficiario {
                nombre: "MADRE".into(),
                rut: None,
                parentesco: "Madre o Padre de hijos de filiación no matrimonial".into(),
            },
            Beneficiario {
                nombre: "H2".into(),
                rut: None,
                parentesco: "Hijo".into(),
            },
            Beneficiario {
                nombre: "CONVIVIENTE".into(),
                rut: None,
                parentesco: "Conviviente civil".into(),
            },
        ];

        let nombres: Vec<String> = ordenar_beneficiarios(&beneficiarios)
            .into_iter()
            .map(|b| b.nombre)
            .collect();
        assert_eq!(nombres, vec!["MADRE", "CONVIVIENTE", "H1", "H2"]);
    }

    #[test]
    fn test_base_pension_derived_from_first_matching_beneficiary() {
        let raw = raw_from(json!({
            "beneficiarios": [
                {"nombre": "SOTO ISLA DORILA", "parentesco": "Cónyuge con hijos con derecho a pensión"},
                {"nombre": "SOTO PEREZ JUAN", "parentesco": "Hijo"}
            ],
            "retiro_programado": {
                "comision_pct": 1.25,
                "pension_total_uf": "21,06",
                "pensiones_beneficiarios": [
                    ["SOTO ISLA DORILA", "16,20", 590760],
                    ["SOTO PEREZ JUAN", "4,86", 177228]
                ]
            }
        }));
        let mut header = HeaderData::default();

        let result = process_sobrevivencia(&raw, &mut header);
        assert!(result.warnings.is_empty());
        assert!((header.pension_base_100_uf - 32.4).abs() < 1e-9);
        assert_eq!(header.beneficiarios_ordenados.len(), 2);
    }

    #[test]
    fn test_unresolvable_base_pension_warns_and_degrades() {
        let raw = raw_from(json!({
            "beneficiarios": [{"nombre": "ALGUIEN", "parentesco": "Sobrino"}],
            "retiro_programado": {
                "pensiones_beneficiarios": [["ALGUIEN", "10,00", 350000]]
            }
        }));
        let mut header = HeaderData::default();

        let result = process_sobrevivencia(&raw, &mut header);
        assert_eq!(header.pension_base_100_uf, 0.0);
        assert!(result
            .warnings
            .contains(&SobrevivenciaWarning::PensionBaseNoCalculada));
        // The RP table still comes out.
        assert_eq!(result.tables.len(), 1);
    }

    #[test]
    fn test_no_beneficiaries_yields_warning_and_empty_result() {
        let raw = raw_from(json!({"retiro_programado": {"pension_bruta": 100}}));
        let mut header = HeaderData::default();

        let result = process_sobrevivencia(&raw, &mut header);
        assert!(result.tables.is_empty());
        assert!(result.beneficiarios.is_empty());
        assert_eq!(result.warnings, vec![SobrevivenciaWarning::SinBeneficiarios]);
    }

    #[test]
    fn test_retiro_programado_table_rows_and_total() {
        let raw = raw_from(json!({
            "header": {"afp_origen": "AFP CAPITAL"},
            "beneficiarios": [
                {"nombre": "SOTO ISLA DORILA", "parentesco": "Cónyuge con hijos con derecho a pensión"}
            ],
            "retiro_programado": {
                "comision_pct": 1.25,
                "pension_total_uf": "21,06",
                "pension_total_pesos": 767988,
                "pensiones_beneficiarios": [
                    ["SOTO ISLA DORILA", "16,20", 590760],
                    ["SOTO PEREZ JUAN", "4,86", 177228]
                ]
            }
        }));
        let mut header = HeaderData::from_header(&raw.header);

        let result = process_sobrevivencia(&raw, &mut header);
        let rp = &result.tables[0];
        assert_eq!(rp.titulo, "Retiro Programado (AFP CAPITAL)");
        assert_eq!(rp.kind.tag(), "RP_SOBREVIVENCIA");

        let TableBody::Beneficiarios { filas, total } = &rp.body else {
            panic!("cuerpo inesperado");
        };
        assert_eq!(filas.len(), 2);

        let fila = &filas[0];
        assert_eq!(fila.beneficiario, "SOTO ISLA DORILA");
        assert_eq!(fila.pension_uf, "16,20");
        assert_eq!(fila.pension_bruta, 590760.0);
        assert_eq!(fila.descuento_salud, 41353.0);
        assert_eq!(fila.descuento_comision, 7385.0);
        assert_eq!(fila.pension_liquida, 590760.0 - 41353.0 - 7385.0);

        assert_eq!(total.beneficiario, "Pensión mensual total");
        assert_eq!(total.pension_uf, "21,06");
        assert_eq!(total.pension_bruta, 590760.0 + 177228.0);
        assert_eq!(
            total.pension_liquida,
            filas.iter().map(|f| f.pension_liquida).sum::<f64>()
        );
    }

    #[test]
    fn test_annuity_table_pads_and_truncates_beneficiary_pairs() {
        let raw = raw_from(json!({
            "beneficiarios": [
                {"nombre": "A", "parentesco": "Cónyuge sin hijos con derecho a pensión"},
                {"nombre": "B", "parentesco": "Hijo"}
            ],
            "retiro_programado": {
                "pensiones_beneficiarios": [["A", "12,00", 430000]]
            },
            "rentas_vitalicias": [{
                "meses_garantizados": 0,
                "ofertas": [
                    {"compania": "CORTA", "ofertas_beneficiarios": [["13,96", 509075]], "pension_total_pesos": 509075},
                    {"compania": "LARGA", "ofertas_beneficiarios": [["10,00", 360000], ["4,00", 150000], ["1,00", 9999]], "pension_total_pesos": 510000}
                ]
            }]
        }));
        let mut header = HeaderData::default();

        let result = process_sobrevivencia(&raw, &mut header);
        let rv = result
            .tables
            .iter()
            .find(|t| t.kind.tag() == "RV_SOBREVIVENCIA")
            .unwrap();
        assert_eq!(rv.titulo, "Renta Vitalicia Inmediata / Simple");

        let TableBody::OfertasSobrevivencia { columnas, filas } = &rv.body else {
            panic!("cuerpo inesperado");
        };
        assert_eq!(
            columnas,
            &vec![
                "Compañía".to_string(),
                "Benef. 1 UF".to_string(),
                "Benef. 1 $".to_string(),
                "Benef. 2 UF".to_string(),
                "Benef. 2 $".to_string(),
                "Total Bruto".to_string(),
                "Total Líquido".to_string()
            ]
        );

        // Sorted by Total Bruto descending: LARGA (510000) first.
        assert_eq!(filas[0].compania, "LARGA");
        assert_eq!(filas[0].beneficiarios.len(), 2);
        assert!(filas[0].beneficiarios[1].is_some());

        let corta = &filas[1];
        assert_eq!(corta.beneficiarios.len(), 2);
        assert!(corta.beneficiarios[0].is_some());
        assert!(corta.beneficiarios[1].is_none());
        assert_eq!(corta.total_liquido, round_pesos(509075.0 * 0.93));
    }

    #[test]
    fn test_annuity_table_keeps_top_four() {
        let ofertas: Vec<Value> = (0..6)
            .map(|i| {
                json!({
                    "compania": format!("C{}", i),
                    "ofertas_beneficiarios": [["10,00", 100000 + i]],
                    "pension_total_pesos": 100000 + i
                })
            })
            .collect();

        let filas = parse_ofertas_sobrevivencia(&ofertas, 1);
        assert_eq!(filas.len(), 4);
        assert_eq!(filas[0].compania, "C5");
        assert_eq!(filas[3].compania, "C2");
    }

    #[test]
    fn test_garantizado_title_and_kind() {
        assert_eq!(
            titulo_sobrevivencia(180),
            "Renta Vitalicia Inmediata / Garantizado 180m"
        );
        assert_eq!(titulo_sobrevivencia(0), "Renta Vitalicia Inmediata / Simple");
    }
}
