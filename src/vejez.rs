//! Old-age/disability (Vejez/Invalidez) pipeline.
//!
//! Normalizes each modality's raw offers into tabular form, keeps the top 4
//! offers per company table, applies the fixed discount policy and the
//! configured supplements, and splits multi-phase modalities (percentage
//! increase, temporary income with deferral) into linked base/phase tables.

use crate::legal::DEFAULT_PGU_AMOUNT;
use crate::numeric::{clean_str, format_uf, round_pesos};
use crate::schema::{gross_amount, EldOferta, HeaderData, RawAmount, RawExtraction};
use crate::tables::{OfferRow, ProcessedTable, TableBody, TableIdGen, TableKind};
use serde_json::Value;
use std::cmp::Ordering;

/// Health discount applied to every gross pension.
pub const DESCUENTO_SALUD: f64 = 0.07;

/// Offers retained per multi-company table.
const MAX_OFERTAS: usize = 4;

/// Options for one old-age/disability processing call.
#[derive(Debug, Clone, PartialEq)]
pub struct VejezOptions {
    /// Add the universal guaranteed-pension supplement to the total column.
    pub include_pgu: bool,
    /// PGU amount in pesos.
    pub pgu_amount: f64,
    /// Add a one-time bonus, expressed in UF, to the total column.
    pub include_bono: bool,
    /// Bonus magnitude in UF, converted with the header's UF value.
    pub bono_uf: f64,
}

impl Default for VejezOptions {
    fn default() -> Self {
        Self {
            include_pgu: true,
            pgu_amount: DEFAULT_PGU_AMOUNT,
            include_bono: false,
            bono_uf: 0.0,
        }
    }
}

impl VejezOptions {
    /// Display title for the pension-plus-supplements column.
    pub fn col_pension_total(&self) -> String {
        let mut parts = vec!["Pensión"];
        if self.include_pgu {
            parts.push("PGU");
        }
        if self.include_bono {
            parts.push("Bono");
        }
        parts.join(" + ")
    }

    fn suplemento(&self, valor_uf: f64) -> f64 {
        let pgu = if self.include_pgu { self.pgu_amount } else { 0.0 };
        let bono = if self.include_bono {
            self.bono_uf * valor_uf
        } else {
            0.0
        };
        pgu + bono
    }
}

/// One normalized offer, before discounts.
#[derive(Debug, Clone)]
struct RawOffer {
    entidad: String,
    pension_uf: String,
    pension_bruta: f64,
}

/// Staged modality: raw offers already normalized, discounts not yet
/// applied.
#[derive(Debug)]
enum Staged {
    Rp {
        titulo: String,
        oferta: RawOffer,
        comision: f64,
        eld: Option<EldOferta>,
    },
    Referencia {
        titulo: String,
        ofertas: Vec<RawOffer>,
    },
    RentaVitalicia {
        titulo: String,
        porcentaje_aumento: f64,
        meses_aumento: u32,
        meses_garantizados: u32,
        ofertas: Vec<RawOffer>,
        eld: Option<EldOferta>,
    },
    RentaTemporal {
        titulo: String,
        periodo_diferido_meses: u32,
        factor: f64,
        meses_garantizados: u32,
        ofertas: Vec<RawOffer>,
        eld: Option<EldOferta>,
    },
}

/// Transforms one raw extraction into the processed (unordered) table
/// collection. Pure: identical input and options yield identical output.
pub fn process_vejez(
    raw: &RawExtraction,
    header: &HeaderData,
    opts: &VejezOptions,
) -> Vec<ProcessedTable> {
    log::info!(
        "procesando SCOMP vejez/invalidez para {}",
        header.nombre.as_deref().unwrap_or("afiliado sin nombre")
    );

    let staged = stage_modalities(raw, header);

    let afp_comision = staged
        .iter()
        .find_map(|s| match s {
            Staged::Rp { comision, .. } => Some(*comision),
            _ => None,
        })
        .unwrap_or(0.0);

    let suplemento = opts.suplemento(header.valor_uf);
    let col_total = opts.col_pension_total();
    let mut ids = TableIdGen::default();
    let mut processed = Vec::new();

    for item in staged {
        match item {
            Staged::Rp {
                titulo,
                oferta,
                comision,
                eld,
            } => {
                let fila = computar_fila(oferta, Some(comision), suplemento);
                processed.push(ProcessedTable {
                    id: ids.next_id(),
                    titulo,
                    kind: TableKind::RetiroProgramado,
                    body: TableBody::Ofertas(vec![fila]),
                    col_pension_total: col_total.clone(),
                    eld_info: eld,
                    linked_to: None,
                    sort_key: None,
                });
            }

            Staged::Referencia { titulo, ofertas } => {
                let filas = top_ofertas(ofertas)
                    .into_iter()
                    .map(|o| computar_fila(o, None, suplemento))
                    .collect();
                processed.push(ProcessedTable {
                    id: ids.next_id(),
                    titulo,
                    kind: TableKind::Referencia,
                    body: TableBody::Ofertas(filas),
                    col_pension_total: col_total.clone(),
                    eld_info: None,
                    linked_to: None,
                    sort_key: None,
                });
            }

            Staged::RentaVitalicia {
                titulo,
                porcentaje_aumento,
                meses_aumento,
                meses_garantizados,
                ofertas,
                eld,
            } => {
                let ofertas = top_ofertas(ofertas);

                if porcentaje_aumento > 0.0 {
                    // Two linked tables: increased phase, then the base
                    // pension that resumes once the increase ends.
                    let factor = 1.0 + porcentaje_aumento / 100.0;
                    let filas_aumentadas = ofertas
                        .iter()
                        .cloned()
                        .map(|o| computar_fila(escalar(o, factor), None, suplemento))
                        .collect();
                    let filas_base = ofertas
                        .into_iter()
                        .map(|o| computar_fila(o, None, suplemento))
                        .collect();

                    let id_aumentada = ids.next_id();
                    processed.push(ProcessedTable {
                        id: id_aumentada,
                        titulo: titulo.clone(),
                        kind: TableKind::RentaVitaliciaAumentada {
                            meses_aumento,
                            meses_garantizados,
                        },
                        body: TableBody::Ofertas(filas_aumentadas),
                        col_pension_total: col_total.clone(),
                        eld_info: eld,
                        linked_to: None,
                        sort_key: None,
                    });
                    processed.push(ProcessedTable {
                        id: ids.next_id(),
                        titulo: format!("Pensión Base (desde mes {})", meses_aumento + 1),
                        kind: TableKind::RentaVitaliciaBase {
                            meses_aumento,
                            meses_garantizados,
                        },
                        body: TableBody::Ofertas(filas_base),
                        col_pension_total: col_total.clone(),
                        eld_info: None,
                        linked_to: Some(id_aumentada),
                        sort_key: None,
                    });
                } else {
                    let filas = ofertas
                        .into_iter()
                        .map(|o| computar_fila(o, None, suplemento))
                        .collect();
                    processed.push(ProcessedTable {
                        id: ids.next_id(),
                        titulo,
                        kind: TableKind::RentaVitalicia { meses_garantizados },
                        body: TableBody::Ofertas(filas),
                        col_pension_total: col_total.clone(),
                        eld_info: eld,
                        linked_to: None,
                        sort_key: None,
                    });
                }
            }

            Staged::RentaTemporal {
                titulo,
                periodo_diferido_meses,
                factor,
                meses_garantizados,
                ofertas,
                eld,
            } => {
                let ofertas = top_ofertas(ofertas);

                // Temporary phase: scaled, carries the AFP commission.
                let filas_temporal = ofertas
                    .iter()
                    .cloned()
                    .map(|o| computar_fila(escalar(o, factor), Some(afp_comision), suplemento))
                    .collect();
                // Deferred base phase: unscaled, no commission.
                let filas_base = ofertas
                    .into_iter()
                    .map(|o| computar_fila(o, None, suplemento))
                    .collect();

                let titulo_temporal = format!(
                    "{} - Renta Temporal (Mes 1-{}) / {}",
                    titulo,
                    periodo_diferido_meses,
                    header.afp_origen_or("AFP")
                );
                let titulo_base = format!(
                    "{} - Renta Vitalicia Diferida (desde mes {})",
                    titulo,
                    periodo_diferido_meses + 1
                );

                let id_temporal = ids.next_id();
                processed.push(ProcessedTable {
                    id: id_temporal,
                    titulo: titulo_temporal,
                    kind: TableKind::RentaTemporal {
                        periodo_diferido_meses,
                        meses_garantizados,
                    },
                    body: TableBody::Ofertas(filas_temporal),
                    col_pension_total: col_total.clone(),
                    eld_info: eld,
                    linked_to: None,
                    sort_key: None,
                });
                processed.push(ProcessedTable {
                    id: ids.next_id(),
                    titulo: titulo_base,
                    kind: TableKind::RentaVitaliciaDiferida {
                        periodo_diferido_meses,
                        meses_garantizados,
                    },
                    body: TableBody::Ofertas(filas_base),
                    col_pension_total: col_total.clone(),
                    eld_info: None,
                    linked_to: Some(id_temporal),
                    sort_key: None,
                });
            }
        }
    }

    processed
}

/// Stage 1: adapt every present modality into normalized offer rows.
/// Modalities that are absent or end up with no valid rows are dropped
/// silently; a SCOMP legitimately omits some of them.
fn stage_modalities(raw: &RawExtraction, header: &HeaderData) -> Vec<Staged> {
    let mut staged = Vec::new();

    let rp = &raw.retiro_programado;
    if rp.pension_bruta.is_some() {
        let afp = header.afp_origen_or("AFP No Encontrada");
        staged.push(Staged::Rp {
            titulo: format!("Retiro Programado ({})", afp),
            oferta: RawOffer {
                entidad: afp,
                pension_uf: rp
                    .pension_uf
                    .as_ref()
                    .map_or_else(|| "0,00".to_string(), RawAmount::uf_display),
                pension_bruta: rp
                    .pension_bruta
                    .as_ref()
                    .map_or(0.0, RawAmount::to_f64)
                    .max(0.0),
            },
            comision: rp.comision_fraccion(),
            eld: rp.eld_oferta.clone(),
        });
    }

    let ofertas_ref = parse_offer_rows(&raw.pension_referencia);
    if !ofertas_ref.is_empty() {
        staged.push(Staged::Referencia {
            titulo: "Pensión de Referencia (Garantizada por Ley)".to_string(),
            ofertas: ofertas_ref,
        });
    }

    for modalidad in &raw.rentas_vitalicias {
        let ofertas = parse_offer_rows(&modalidad.ofertas);
        if ofertas.is_empty() {
            log::debug!("modalidad de renta vitalicia sin ofertas válidas, se omite");
            continue;
        }
        staged.push(Staged::RentaVitalicia {
            titulo: titulo_renta_vitalicia(
                modalidad.porcentaje_aumento(),
                modalidad.meses_aumento(),
                modalidad.meses_garantizados(),
            ),
            porcentaje_aumento: modalidad.porcentaje_aumento(),
            meses_aumento: modalidad.meses_aumento(),
            meses_garantizados: modalidad.meses_garantizados(),
            ofertas,
            eld: modalidad.eld_info.clone(),
        });
    }

    for modalidad in &raw.renta_temporal_rv_diferida {
        let ofertas = parse_offer_rows(&modalidad.ofertas_rvd);
        if ofertas.is_empty() {
            log::debug!("modalidad de renta temporal sin ofertas válidas, se omite");
            continue;
        }
        staged.push(Staged::RentaTemporal {
            titulo: titulo_renta_temporal(
                modalidad.periodo_diferido_meses(),
                modalidad.meses_garantizados(),
            ),
            periodo_diferido_meses: modalidad.periodo_diferido_meses(),
            factor: modalidad.factor_renta_temporal(),
            meses_garantizados: modalidad.meses_garantizados(),
            ofertas,
            eld: modalidad.eld_info.clone(),
        });
    }

    staged
}

/// Validates one raw offer row `[entidad, pensión UF, pensión $]`. Rows
/// that are not arrays or lack a company name are skipped.
fn parse_offer_rows(rows: &[Value]) -> Vec<RawOffer> {
    rows.iter()
        .filter_map(|row| {
            let items = row.as_array()?;
            let entidad = items.first()?.as_str()?.trim().to_string();
            if entidad.is_empty() {
                return None;
            }
            let pension_uf = match items.get(1) {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Number(n)) => format_uf(n.as_f64().unwrap_or(0.0)),
                _ => "0,00".to_string(),
            };
            let pension_bruta = items.get(2).map_or(0.0, gross_amount);
            Some(RawOffer {
                entidad,
                pension_uf,
                pension_bruta,
            })
        })
        .collect()
}

/// Synthesized display title for an immediate annuity modality.
fn titulo_renta_vitalicia(aumento_pct: f64, aumento_meses: u32, garant_meses: u32) -> String {
    let mut parts = vec!["Renta Vitalicia Inmediata".to_string()];
    if aumento_pct > 0.0 && aumento_meses > 0 {
        parts.push(format!("Aumento {}% {}m", trim_pct(aumento_pct), aumento_meses));
    }
    if garant_meses > 0 {
        parts.push(format!("Garantizado {}m", garant_meses));
    }
    if parts.len() == 1 {
        parts.push("Simple".to_string());
    }
    parts.join(" / ")
}

/// Synthesized display title for a temporary-income modality.
fn titulo_renta_temporal(diferido_meses: u32, garant_meses: u32) -> String {
    let mut parts = vec!["Renta Temporal".to_string(), "RVD".to_string()];
    if garant_meses > 0 {
        parts.push(format!("Garantizado {}m", garant_meses));
    } else {
        parts.push("Simple".to_string());
    }
    if diferido_meses > 0 {
        parts.push(format!("({}m)", diferido_meses));
    }
    parts.join(" / ")
}

/// Percentages come as floats but the documents print them as integers when
/// whole ("10%" rather than "10.0%").
fn trim_pct(pct: f64) -> String {
    if pct.fract() == 0.0 {
        format!("{}", pct as i64)
    } else {
        format!("{}", pct)
    }
}

/// Top offers ranked by gross pension descending; the sort is stable so
/// ties keep input order.
fn top_ofertas(mut ofertas: Vec<RawOffer>) -> Vec<RawOffer> {
    ofertas.sort_by(|a, b| {
        b.pension_bruta
            .partial_cmp(&a.pension_bruta)
            .unwrap_or(Ordering::Equal)
    });
    ofertas.truncate(MAX_OFERTAS);
    ofertas
}

/// Scales an offer for a phase table: gross is rounded to whole pesos, the
/// UF display amount is scaled by the same factor and reformatted. A
/// malformed negative factor collapses to zero, keeping the floored-gross
/// invariant intact.
fn escalar(oferta: RawOffer, factor: f64) -> RawOffer {
    let factor = factor.max(0.0);
    RawOffer {
        entidad: oferta.entidad,
        pension_uf: format_uf(clean_str(&oferta.pension_uf) * factor),
        pension_bruta: round_pesos(oferta.pension_bruta * factor),
    }
}

/// Applies the fixed discount policy to one offer: health discount first,
/// commission only where one applies, net = gross - health - commission,
/// total = gross + supplements.
fn computar_fila(oferta: RawOffer, comision: Option<f64>, suplemento: f64) -> OfferRow {
    let bruta = oferta.pension_bruta;
    let salud = round_pesos(bruta * DESCUENTO_SALUD);
    let descuento_comision = comision.map(|pct| round_pesos(bruta * pct));
    let liquida = bruta - salud - descuento_comision.unwrap_or(0.0);
    OfferRow {
        entidad: oferta.entidad,
        pension_uf: oferta.pension_uf,
        pension_bruta: bruta,
        descuento_salud: salud,
        comision_pct: comision,
        descuento_comision,
        pension_liquida: liquida,
        pension_total: round_pesos(bruta + suplemento),
    }
}
