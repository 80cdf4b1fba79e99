//! Driver result-set type codes.

use std::borrow::Cow;

/// Type codes reported in cursor descriptions by the HANA client.
/// The numbering is sparse (57..=60 and 67..=70 are unassigned).
const TYPE_CODES: &[(u8, &str)] = &[
    (0, "NULL"),
    (1, "TINYINT"),
    (2, "SMALLINT"),
    (3, "INTEGER"),
    (4, "BIGINT"),
    (5, "DECIMAL"),
    (6, "REAL"),
    (7, "DOUBLE"),
    (8, "CHAR"),
    (9, "VARCHAR"),
    (10, "NCHAR"),
    (11, "NVARCHAR"),
    (12, "BINARY"),
    (13, "VARBINARY"),
    (14, "DATE"),
    (15, "TIME"),
    (16, "TIMESTAMP"),
    (17, "TIME_TZ"),
    (18, "TIME_LTZ"),
    (19, "TIMESTAMP_TZ"),
    (20, "TIMESTAMP_LTZ"),
    (21, "INTERVAL_YM"),
    (22, "INTERVAL_DS"),
    (23, "ROWID"),
    (24, "UROWID"),
    (25, "CLOB"),
    (26, "NCLOB"),
    (27, "BLOB"),
    (28, "BOOLEAN"),
    (29, "STRING"),
    (30, "NSTRING"),
    (31, "BLOCATOR"),
    (32, "NLOCATOR"),
    (33, "BSTRING"),
    (34, "DECIMAL_DIGIT_ARRAY"),
    (35, "VARCHAR2"),
    (36, "VARCHAR3"),
    (37, "NVARCHAR3"),
    (38, "VARBINARY3"),
    (39, "VARGROUP"),
    (40, "TINYINT_NOTNULL"),
    (41, "SMALLINT_NOTNULL"),
    (42, "INT_NOTNULL"),
    (43, "BIGINT_NOTNULL"),
    (44, "ARGUMENT"),
    (45, "TABLE"),
    (46, "CURSOR"),
    (47, "SMALLDECIMAL"),
    (48, "ABAPITAB"),
    (49, "ABAPSTRUCT"),
    (50, "ARRAY"),
    (51, "TEXT"),
    (52, "SHORTTEXT"),
    (53, "FIXEDSTRING"),
    (54, "FIXEDPOINTDECIMAL"),
    (55, "ALPHANUM"),
    (56, "TLOCATOR"),
    (61, "LONGDATE"),
    (62, "SECONDDATE"),
    (63, "DAYDATE"),
    (64, "SECONDTIME"),
    (65, "CSDATE"),
    (66, "CSTIME"),
    (71, "BLOB_DISK"),
    (72, "CLOB_DISK"),
    (73, "NCLOB_DISK"),
    (74, "GEOMETRY"),
    (75, "POINT"),
    (76, "FIXED16"),
    (77, "BLOB_HYBRID"),
    (78, "CLOB_HYBRID"),
    (79, "NCLOB_HYBRID"),
    (80, "POINTZ"),
];

/// Name for a driver type code; unknown codes render as `unknown type_code N`.
pub fn type_code_name(code: u32) -> Cow<'static, str> {
    match TYPE_CODES.iter().find(|(c, _)| u32::from(*c) == code) {
        Some((_, name)) => Cow::Borrowed(name),
        None => {
            tracing::warn!(type_code = code, "unknown driver type code");
            Cow::Owned(format!("unknown type_code {code}"))
        }
    }
}
