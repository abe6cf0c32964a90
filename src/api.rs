pub mod awattar;
pub mod energy_charts;
pub mod entsoe;
pub mod epex;
pub mod exaa;
pub mod peak_hours;
pub mod sources;
pub mod transport;
pub mod xml;
