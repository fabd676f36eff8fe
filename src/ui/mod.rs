pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{banner, dim, error, header, info, muted, section, status, success, summary_row, warn};
pub use table::{audit_table, relations_table, stats_table, steps_table, usage_table, TableBuilder};
pub use theme::{theme, Theme};
