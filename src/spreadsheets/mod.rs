pub mod export_xlsx;

pub use export_xlsx::{activity_workbook, export_activity_xlsx};
