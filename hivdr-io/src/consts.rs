/// Date layouts accepted in the `collected_date` column.
pub const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d-%b-%Y"];

/// Rule column of simple score tables.
pub const SIMPLE_RULE_COLUMN: &str = "Rule";
/// Rule column of complex score tables.
pub const COMPLEX_RULE_COLUMN: &str = "Combination Rule";

/// Cells that mean "no penalty" in a score table.
pub const MISSING_CELLS: [&str; 3] = ["", "NA", "NaN"];

/// Lines before the first comment row: a title line and the column header.
pub const COMMENT_PREAMBLE_ROWS: usize = 2;
