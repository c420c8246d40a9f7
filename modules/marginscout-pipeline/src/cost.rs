use marginscout_common::{config::CostConfig, CostBreakdown, RiskTier, ShippingMethod};
use tracing::warn;

/// Sale-price margin the `target_margin_price` field is solved for.
const DEFAULT_TARGET_MARGIN: f64 = 0.30;

/// Everything the landed-cost model needs about one unit.
#[derive(Debug, Clone)]
pub struct CostInput<'a> {
    /// Unit price in origin currency.
    pub unit_price: f64,
    pub weight_kg: f64,
    /// Box dimensions in cm: length, width, height.
    pub box_cm: (f64, f64, f64),
    pub category: &'a str,
    /// Proposed sale price in local currency.
    pub target_price: i64,
    pub marketplace: &'a str,
    pub shipping: ShippingMethod,
    pub include_advertising: bool,
}

#[derive(Debug, Clone)]
pub struct CostResult {
    pub breakdown: CostBreakdown,
    /// Invariant: equals `breakdown.total()`.
    pub total_cost: i64,
    pub target_price: i64,
    pub profit: i64,
    /// profit / target_price; defined as 0.0 when target_price is 0.
    pub margin_rate: f64,
    pub risk_tier: RiskTier,

    pub actual_weight_kg: f64,
    pub volumetric_weight_kg: f64,
    /// max(actual, volumetric) — what the carrier actually charges on.
    pub billable_weight_kg: f64,

    /// Minimum sale price at which profit is exactly zero, rounded up to
    /// the configured granularity. 0 only if variable rates sum to >= 1.
    pub breakeven_price: i64,
    /// Sale price achieving the default target margin; None when the
    /// margin is mathematically unreachable.
    pub target_margin_price: Option<i64>,

    /// Fallback rates were used for an unknown category/marketplace.
    pub used_default_tariff: bool,
    pub used_default_commission: bool,
}

/// Conservative landed-cost calculator: every hidden cost is charged, and
/// ambiguous inputs resolve toward the more expensive outcome. Pure
/// arithmetic over an explicit config — no I/O, no ambient state, and no
/// panics for any numeric input (degenerate inputs produce degenerate but
/// defined outputs; validation is the caller's job).
#[derive(Debug, Clone)]
pub struct LandedCostCalculator {
    config: CostConfig,
}

impl LandedCostCalculator {
    pub fn new(config: CostConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    /// Volumetric weight in kg: (L × W × H) / divisor, floored at zero.
    pub fn volumetric_weight(&self, box_cm: (f64, f64, f64)) -> f64 {
        let (l, w, h) = box_cm;
        ((l * w * h) / self.config.volumetric_divisor).max(0.0)
    }

    /// Billable weight: the greater of actual and volumetric. The single
    /// most consequential rule in the model — large-but-light items are
    /// charged on volume, not mass.
    pub fn billable_weight(&self, actual_kg: f64, volumetric_kg: f64) -> f64 {
        actual_kg.max(volumetric_kg).max(0.0)
    }

    /// Shipment volume in cubic meters, for sea freight.
    fn cbm(box_cm: (f64, f64, f64)) -> f64 {
        let (l, w, h) = box_cm;
        ((l * w * h) / 1_000_000.0).max(0.0)
    }

    pub fn calculate(&self, input: &CostInput) -> CostResult {
        let cfg = &self.config;

        // Origin-side costs
        let origin_cost = (input.unit_price * cfg.exchange_rate) as i64;
        let origin_shipping = cfg.origin_shipping;
        let agent_fee = ((origin_cost + origin_shipping) as f64 * cfg.agent_fee_rate) as i64;

        // Freight
        let volumetric = self.volumetric_weight(input.box_cm);
        let billable = self.billable_weight(input.weight_kg, volumetric);
        let international_shipping = match input.shipping {
            ShippingMethod::Air => (billable * cfg.air_rate_per_kg as f64) as i64,
            ShippingMethod::Sea => {
                let by_volume = (Self::cbm(input.box_cm) * cfg.sea_rate_per_cbm as f64) as i64;
                by_volume.max(cfg.sea_minimum_fee)
            }
        };

        // Import taxes. Taxable base covers everything spent getting the
        // unit to the border: goods, origin leg, agent, freight.
        let (tariff_rate, used_default_tariff) = match cfg.tariff_rate(input.category) {
            Some(rate) => (rate, false),
            None => {
                warn!(category = input.category, "Unknown category, using default tariff rate");
                (cfg.default_tariff_rate, true)
            }
        };
        let taxable = origin_cost + origin_shipping + agent_fee + international_shipping;
        let tariff = (taxable as f64 * tariff_rate) as i64;
        let vat = ((taxable + tariff) as f64 * cfg.vat_rate) as i64;

        // Price-dependent costs
        let (commission_rate, used_default_commission) =
            match cfg.commission_rate(input.marketplace) {
                Some(rate) => (rate, false),
                None => {
                    warn!(
                        marketplace = input.marketplace,
                        "Unknown marketplace, using default commission rate"
                    );
                    (cfg.default_commission_rate, true)
                }
            };
        let marketplace_commission = (input.target_price as f64 * commission_rate) as i64;
        let return_reserve = (input.target_price as f64 * cfg.return_reserve_rate) as i64;
        let advertising_reserve = if input.include_advertising {
            (input.target_price as f64 * cfg.advertising_reserve_rate) as i64
        } else {
            0
        };

        let breakdown = CostBreakdown {
            origin_cost,
            origin_shipping,
            agent_fee,
            tariff,
            vat,
            international_shipping,
            final_mile_shipping: cfg.final_mile_shipping,
            marketplace_commission,
            return_reserve,
            advertising_reserve,
            packaging: cfg.packaging_fee,
        };

        let total_cost = breakdown.total();
        let profit = input.target_price - total_cost;
        let margin_rate = if input.target_price > 0 {
            profit as f64 / input.target_price as f64
        } else {
            0.0
        };

        let risk_tier = self.tier_for_margin(margin_rate);

        // Price solving. Fixed costs F are everything independent of the
        // sale price; commission and reserves scale with it, so
        // target = F / (1 - variable_rate [- desired_margin]).
        let fixed_costs = origin_cost
            + origin_shipping
            + agent_fee
            + tariff
            + vat
            + international_shipping
            + cfg.final_mile_shipping
            + cfg.packaging_fee;
        let variable_rate = commission_rate
            + cfg.return_reserve_rate
            + if input.include_advertising {
                cfg.advertising_reserve_rate
            } else {
                0.0
            };

        let breakeven_price = self.solve_price(fixed_costs, variable_rate, 0.0).unwrap_or(0);
        let target_margin_price =
            self.solve_price(fixed_costs, variable_rate, DEFAULT_TARGET_MARGIN);

        CostResult {
            breakdown,
            total_cost,
            target_price: input.target_price,
            profit,
            margin_rate,
            risk_tier,
            actual_weight_kg: input.weight_kg,
            volumetric_weight_kg: volumetric,
            billable_weight_kg: billable,
            breakeven_price,
            target_margin_price,
            used_default_tariff,
            used_default_commission,
        }
    }

    pub fn tier_for_margin(&self, margin_rate: f64) -> RiskTier {
        if margin_rate >= self.config.warning_margin {
            RiskTier::Safe
        } else if margin_rate >= self.config.danger_margin {
            RiskTier::Warning
        } else {
            RiskTier::Danger
        }
    }

    /// Solve `price` such that profit at `price` equals `desired_margin × price`.
    /// None when `variable_rate + desired_margin >= 1` (unreachable).
    /// Rounded up to the configured granularity.
    fn solve_price(&self, fixed_costs: i64, variable_rate: f64, desired_margin: f64) -> Option<i64> {
        let denominator = 1.0 - variable_rate - desired_margin;
        if denominator <= 0.0 {
            return None;
        }
        let raw = fixed_costs as f64 / denominator;
        let granularity = self.config.price_granularity.max(1);
        Some(((raw / granularity as f64).ceil() as i64) * granularity)
    }
}
