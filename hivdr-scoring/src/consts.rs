/// Separator between tokens in a mutation list.
pub const TOKEN_SEPARATOR: char = ',';
/// Separator between clauses of a complex rule label.
pub const CLAUSE_SEPARATOR: char = '+';
/// Joins clause positions into a position-set label, e.g. `G118-E138`.
pub const POSITION_SET_SEPARATOR: &str = "-";
/// Comment type assigned when the comment table leaves it blank.
pub const DEFAULT_COMMENT_TYPE: &str = "Predicted";
