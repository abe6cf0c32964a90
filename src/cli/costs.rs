use clap::Parser;

use crate::core::settings::Costs;

#[derive(Copy, Clone, Parser)]
pub struct CostArgs {
    /// Apply the fees, charges, grid costs and VAT to the trade prices.
    #[clap(long, env = "CALCULATE")]
    calculate: bool,

    /// Absolute provider fee, ct/kWh.
    #[clap(long, env = "FEE_ABSOLUTE", default_value = "0")]
    fee_absolute: f64,

    #[clap(long, env = "FEE_RELATIVE_PERCENT", default_value = "0")]
    fee_relative_percent: f64,

    #[clap(long, env = "VAT_PERCENT", default_value = "0")]
    vat_percent: f64,

    #[clap(long, env = "CHARGES_PERCENT", default_value = "0")]
    charges_percent: f64,

    /// Grid costs, ct/kWh.
    #[clap(long, env = "GRID_COSTS", default_value = "0")]
    grid_costs: f64,
}

impl CostArgs {
    pub fn costs(self) -> Option<Costs> {
        self.calculate.then(|| {
            Costs::builder()
                .fee_absolute(self.fee_absolute)
                .fee_relative(self.fee_relative_percent / 100.0)
                .vat(self.vat_percent / 100.0)
                .charges(self.charges_percent / 100.0)
                .grid_costs(self.grid_costs)
                .build()
        })
    }
}
