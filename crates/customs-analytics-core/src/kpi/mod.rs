pub mod catalog;
pub mod evaluator;

pub use catalog::{Direction, KpiCatalog, KpiCategory, KpiDefinition, DEFAULT_CATALOG_VERSION};
pub use evaluator::{evaluate, kpi_status, tally, KpiInputs, KpiResult, KpiStatus, KpiTally};
