//! Plain-text rendering of quotes, assistant answers and the price table.

use std::fmt;

use crate::app::{AssistantReply, Quote, SourceStatus, Sourced};
use crate::domain::{AgitatorRecommendation, CostBreakdown, Material, PriceTable};
use crate::util::version::{version_label, APP_NAME};

const RULE: &str = "------------------------------------------------------------";

/// Full text report for one quote.
pub struct QuoteReport<'a>(pub &'a Quote);

/// Assistant answer with a line on where its data came from.
pub struct AnswerReport<'a>(pub &'a AssistantReply);

/// Current price table and process rates.
pub struct PriceReport<'a>(pub &'a PriceTable);

pub fn render_quote(quote: &Quote) -> String {
    QuoteReport(quote).to_string()
}

pub fn render_answer(reply: &AssistantReply) -> String {
    AnswerReport(reply).to_string()
}

pub fn render_prices(prices: &PriceTable) -> String {
    PriceReport(prices).to_string()
}

impl fmt::Display for QuoteReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quote = self.0;
        let spec = &quote.spec;
        let standard = quote.breakdown();

        writeln!(f, "{APP_NAME} {}  |  quote {}", version_label(), quote.id)?;
        writeln!(f, "Issued {}", quote.issued_at)?;
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "{} · {} m³ · {} · {:.2} MPa · {}",
            spec.kind.label(),
            spec.volume_m3,
            spec.material,
            spec.design_pressure_mpa,
            spec.medium
        )?;
        writeln!(
            f,
            "Heat exchange: {} · Nozzles: {} · Finish: {}",
            spec.heat_exchange.label(),
            spec.nozzle_count,
            spec.surface_finish.label()
        )?;

        writeln!(f, "\nSizing")?;
        write_sizing(f, standard)?;

        writeln!(f, "\nBill of materials")?;
        write_line_items(f, standard)?;

        if let Some(alt) = quote.study.cold_stretch.as_ref() {
            writeln!(f, "\nCold-stretch option")?;
            writeln!(
                f,
                "  {:<32}{:>10} mm -> {} mm",
                "Wall thickness", standard.wall_thickness_mm, alt.wall_thickness_mm
            )?;
            money_row(f, "Cold-stretch total", alt.total_cost)?;
            match quote.study.cold_stretch_savings() {
                Some(savings) => money_row(f, "Savings", savings)?,
                None => writeln!(f, "  No savings over the standard design.")?,
            }
        }

        if !quote.study.advisories.is_empty() {
            writeln!(f, "\nAdvisories")?;
            for advisory in &quote.study.advisories {
                writeln!(f, "  • {}", advisory.message())?;
            }
        }

        writeln!(
            f,
            "\nAgitator recommendation {}",
            status_tag(&quote.recommendation)
        )?;
        write_recommendation(f, &quote.recommendation.data)?;
        if let Some(note) = quote.recommendation.note.as_deref() {
            writeln!(f, "  ({note})")?;
        }
        Ok(())
    }
}

fn money_row(f: &mut fmt::Formatter<'_>, label: &str, amount: f64) -> fmt::Result {
    writeln!(f, "  {:<32}{:>16}", label, format_money(amount))
}

fn rate_row(f: &mut fmt::Formatter<'_>, label: &str, value: f64) -> fmt::Result {
    writeln!(f, "  {label:<32}{value:>10.2}")
}

fn write_sizing(f: &mut fmt::Formatter<'_>, breakdown: &CostBreakdown) -> fmt::Result {
    let rows = [
        ("Shell diameter", format!("{} mm", breakdown.diameter_mm)),
        ("Shell height", format!("{:.0} mm", breakdown.height_mm)),
        (
            "Calculation pressure",
            format!("{:.2} MPa", breakdown.calc_pressure_mpa),
        ),
        (
            "Allowable stress",
            format!("{:.0} MPa", breakdown.allowable_stress_mpa),
        ),
        (
            "Wall thickness",
            format!(
                "{} mm (calc {:.2} mm)",
                breakdown.wall_thickness_mm, breakdown.calc_thickness_mm
            ),
        ),
        (
            "Vessel weight",
            format!(
                "{:.0} kg @ {:.2}/kg",
                breakdown.vessel_weight_kg, breakdown.unit_price
            ),
        ),
    ];
    for (label, value) in rows {
        writeln!(f, "  {label:<32}{value}")?;
    }
    Ok(())
}

fn write_line_items(f: &mut fmt::Formatter<'_>, breakdown: &CostBreakdown) -> fmt::Result {
    for item in &breakdown.line_items {
        money_row(f, item.category.label(), item.amount)?;
    }
    writeln!(f, "  {:<32}{:>16}", "", "----------------")?;
    money_row(f, "Estimated total", breakdown.total_cost)
}

fn write_recommendation(f: &mut fmt::Formatter<'_>, rec: &AgitatorRecommendation) -> fmt::Result {
    writeln!(f, "  {:<32}{}", "Type", rec.agitator_type)?;
    writeln!(f, "  {:<32}{} kW", "Power", rec.power)?;
    writeln!(f, "  {:<32}{}", "Viscosity", rec.viscosity)?;
    writeln!(f, "  {:<32}{}", "Reason", rec.reason)
}

fn status_tag<T>(sourced: &Sourced<T>) -> &'static str {
    match sourced.status {
        SourceStatus::Live => "[live]",
        SourceStatus::Cached => "[cached]",
        SourceStatus::Stale => "[stale]",
        SourceStatus::Fallback => "[fallback]",
        SourceStatus::Unavailable => "[unavailable]",
    }
}

impl fmt::Display for AnswerReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reply = self.0;
        let tag = status_tag(&reply.dataset);
        match reply.dataset.data.as_ref() {
            Some(dataset) => writeln!(
                f,
                "Data: {} ({} rows) {tag}",
                dataset.source_name,
                dataset.rows.len()
            )?,
            None => writeln!(f, "Data: none {tag}")?,
        }
        if let Some(note) = reply.dataset.note.as_deref() {
            writeln!(f, "  ({note})")?;
        }
        writeln!(f, "{RULE}")?;
        writeln!(f, "{}", reply.answer.data.trim_end())
    }
}

impl fmt::Display for PriceReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prices = self.0;
        writeln!(f, "Material prices (currency/kg)")?;
        for material in Material::CATALOGUE.iter() {
            rate_row(f, material.code(), prices.unit_price(material))?;
        }
        if let (Some(name), Some(price)) = (
            prices.custom_material.name.as_deref(),
            prices.custom_material.price,
        ) {
            rate_row(f, &format!("{name} (custom)"), price)?;
        }

        let rates = &prices.rates;
        writeln!(f, "\nProcess rates")?;
        rate_row(f, "Fabrication per ton", rates.fabrication_per_ton)?;
        rate_row(f, "Half-pipe weld per m", rates.weld_per_meter)?;
        rate_row(f, "Polish per m²", rates.polish_per_m2)?;
        rate_row(f, "NDT per m", rates.ndt_per_meter)?;
        rate_row(f, "Cold stretch per m³", rates.cold_stretch_per_m3)?;

        if let Some(fee) = prices.active_custom_fee() {
            writeln!(f, "\nCustom fee")?;
            rate_row(f, &fee.name, fee.amount)?;
        }
        Ok(())
    }
}

/// Whole-currency amount with comma thousands separators, e.g. `¥12,345`.
pub fn format_money(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0 {
        format!("-¥{grouped}")
    } else {
        format!("¥{grouped}")
    }
}
