//! Pass records and the request/response models around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::validation::validate_phone;

// ======================================================================
// PASS RECORD
// ======================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PassKind {
    Single,
    Couple,
}

impl PassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "SINGLE",
            Self::Couple => "COUPLE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SINGLE" => Some(Self::Single),
            "COUPLE" => Some(Self::Couple),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMode {
    Cash,
    Online,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Online => "ONLINE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CASH" => Some(Self::Cash),
            "ONLINE" => Some(Self::Online),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holder {
    pub name: String,
    pub phone: String,
}

/// Holder pairs are tied to the pass kind by construction; a couple pass
/// cannot exist without its second holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassHolders {
    Single(Holder),
    Couple(Holder, Holder),
}

impl PassHolders {
    pub fn primary(&self) -> &Holder {
        match self {
            Self::Single(primary) => primary,
            Self::Couple(primary, _) => primary,
        }
    }

    pub fn second(&self) -> Option<&Holder> {
        match self {
            Self::Single(_) => None,
            Self::Couple(_, second) => Some(second),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub mode: PaymentMode,
    pub txn_info: Option<String>,
}

/// One-way redemption state: `Unredeemed` is the initial state, `Redeemed`
/// is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    Unredeemed,
    Redeemed { at: DateTime<Utc>, by: String },
}

impl Redemption {
    pub fn is_redeemed(&self) -> bool {
        matches!(self, Self::Redeemed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Pass {
    pub id: Uuid,
    pub holders: PassHolders,
    pub amount: i32,
    pub payment: Payment,
    pub timing: String,
    pub created_at: DateTime<Utc>,
    pub redemption: Redemption,
}

impl Pass {
    pub fn kind(&self) -> PassKind {
        match self.holders {
            PassHolders::Single(_) => PassKind::Single,
            PassHolders::Couple(_, _) => PassKind::Couple,
        }
    }

    /// Read-only projection shown to scanning stations. Carries no token
    /// material and no payment details.
    pub fn summary(&self) -> PassSummary {
        let primary = self.holders.primary();
        let second = self.holders.second();
        PassSummary {
            name1: primary.name.clone(),
            phone1: primary.phone.clone(),
            name2: second.map(|h| h.name.clone()),
            phone2: second.map(|h| h.phone.clone()),
            pass_type: self.kind(),
            timing: self.timing.clone(),
        }
    }
}

// ======================================================================
// ROW MAPPING
// ======================================================================

/// Raw `passes` row. Converted into [`Pass`] so the nullable column pairs
/// become proper variants.
#[derive(Debug, FromRow)]
pub(crate) struct PassRow {
    pub pass_id: Uuid,
    pub name1: String,
    pub phone1: String,
    pub name2: Option<String>,
    pub phone2: Option<String>,
    pub pass_type: String,
    pub amount: i32,
    pub payment_mode: String,
    pub txn_info: Option<String>,
    pub timing: String,
    pub created_at: DateTime<Utc>,
    pub scanned_at: Option<DateTime<Utc>>,
    pub scanned_by: Option<String>,
}

impl TryFrom<PassRow> for Pass {
    type Error = PassError;

    fn try_from(row: PassRow) -> Result<Self, Self::Error> {
        let kind = PassKind::parse(&row.pass_type).ok_or_else(|| {
            PassError::Internal(format!(
                "unknown pass_type {:?} on pass {}",
                row.pass_type, row.pass_id
            ))
        })?;
        let mode = PaymentMode::parse(&row.payment_mode).ok_or_else(|| {
            PassError::Internal(format!(
                "unknown payment_mode {:?} on pass {}",
                row.payment_mode, row.pass_id
            ))
        })?;

        let primary = Holder {
            name: row.name1,
            phone: row.phone1,
        };
        let holders = match kind {
            PassKind::Single => PassHolders::Single(primary),
            PassKind::Couple => {
                let (Some(name2), Some(phone2)) = (row.name2, row.phone2) else {
                    return Err(PassError::Internal(format!(
                        "couple pass {} is missing its second holder",
                        row.pass_id
                    )));
                };
                PassHolders::Couple(
                    primary,
                    Holder {
                        name: name2,
                        phone: phone2,
                    },
                )
            }
        };

        let redemption = match (row.scanned_at, row.scanned_by) {
            (Some(at), Some(by)) => Redemption::Redeemed { at, by },
            (None, None) => Redemption::Unredeemed,
            _ => {
                return Err(PassError::Internal(format!(
                    "pass {} has a partial redemption record",
                    row.pass_id
                )))
            }
        };

        Ok(Pass {
            id: row.pass_id,
            holders,
            amount: row.amount,
            payment: Payment {
                mode,
                txn_info: row.txn_info,
            },
            timing: row.timing,
            created_at: row.created_at,
            redemption,
        })
    }
}

// ======================================================================
// REQUESTS
// ======================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct IssuePassRequest {
    #[validate(length(min = 1, message = "Name 1 is required"))]
    pub name1: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone1: String,
    pub name2: Option<String>,
    pub phone2: Option<String>,
    pub pass_type: PassKind,
    pub payment_mode: PaymentMode,
    pub txn_info: Option<String>,
    #[validate(length(min = 1, message = "Timing is required"))]
    pub timing: String,
}

impl IssuePassRequest {
    /// Trim whitespace and treat blank optional fields as absent, the way
    /// HTML forms submit them.
    pub fn normalized(mut self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        }

        self.name1 = self.name1.trim().to_string();
        self.phone1 = self.phone1.trim().to_string();
        self.timing = self.timing.trim().to_string();
        self.name2 = blank_to_none(self.name2);
        self.phone2 = blank_to_none(self.phone2);
        self.txn_info = blank_to_none(self.txn_info);
        self
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PassListQuery {
    pub search: Option<String>,
    /// "scanned" | "unscanned"; anything else means no filter.
    pub scanned: Option<String>,
    pub pass_type: Option<PassKind>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

// ======================================================================
// OUTCOMES & PROJECTIONS
// ======================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub name1: String,
    pub phone1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone2: Option<String>,
    pub pass_type: PassKind,
    pub timing: String,
}

/// Result of a redemption attempt. `AlreadyRedeemed` is a normal outcome of
/// the state machine, not an error; it always carries the first redemption's
/// timestamp and operator, whether this caller lost a race or scanned an
/// old pass.
#[derive(Debug, Clone)]
pub enum RedeemOutcome {
    Success(PassSummary),
    AlreadyRedeemed {
        scanned_at: DateTime<Utc>,
        scanned_by: String,
        pass: PassSummary,
    },
    NotFound,
}

#[derive(Debug, Serialize)]
pub struct PassView {
    pub pass_id: Uuid,
    pub name1: String,
    pub phone1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone2: Option<String>,
    pub pass_type: PassKind,
    pub amount: i32,
    pub payment_mode: PaymentMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_info: Option<String>,
    pub timing: String,
    pub created_at: DateTime<Utc>,
    pub scanned_at: Option<DateTime<Utc>>,
    pub scanned_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_payload: Option<String>,
}

impl PassView {
    pub fn from_pass(pass: &Pass) -> Self {
        let primary = pass.holders.primary();
        let second = pass.holders.second();
        let (scanned_at, scanned_by) = match &pass.redemption {
            Redemption::Redeemed { at, by } => (Some(*at), Some(by.clone())),
            Redemption::Unredeemed => (None, None),
        };
        Self {
            pass_id: pass.id,
            name1: primary.name.clone(),
            phone1: primary.phone.clone(),
            name2: second.map(|h| h.name.clone()),
            phone2: second.map(|h| h.phone.clone()),
            pass_type: pass.kind(),
            amount: pass.amount,
            payment_mode: pass.payment.mode,
            txn_info: pass.payment.txn_info.clone(),
            timing: pass.timing.clone(),
            created_at: pass.created_at,
            scanned_at,
            scanned_by,
            qr_payload: None,
        }
    }

    pub fn with_token(pass: &Pass, qr_payload: String) -> Self {
        let mut view = Self::from_pass(pass);
        view.qr_payload = Some(qr_payload);
        view
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct PassStats {
    pub total_passes: i64,
    pub single_count: i64,
    pub couple_count: i64,
    pub cash_total: i64,
    pub online_total: i64,
    pub total_revenue: i64,
    pub scanned_count: i64,
    pub unscanned_count: i64,
}

// ======================================================================
// ERRORS
// ======================================================================

#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error("pass validation failed")]
    Validation(validator::ValidationErrors),

    #[error("a pass already exists for {name} with phone {phone}")]
    DuplicateHolder { name: String, phone: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for PassError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn couple_row() -> PassRow {
        PassRow {
            pass_id: Uuid::new_v4(),
            name1: "Asha".to_string(),
            phone1: "9876543210".to_string(),
            name2: Some("Ravi".to_string()),
            phone2: Some("9876543211".to_string()),
            pass_type: "COUPLE".to_string(),
            amount: 999,
            payment_mode: "ONLINE".to_string(),
            txn_info: Some("UPI-1234".to_string()),
            timing: "7pm".to_string(),
            created_at: Utc::now(),
            scanned_at: None,
            scanned_by: None,
        }
    }

    #[test]
    fn couple_row_maps_to_couple_holders() {
        let pass = Pass::try_from(couple_row()).expect("row should convert");
        assert_eq!(pass.kind(), PassKind::Couple);
        assert_eq!(pass.holders.primary().name, "Asha");
        assert_eq!(pass.holders.second().map(|h| h.name.as_str()), Some("Ravi"));
        assert!(!pass.redemption.is_redeemed());
    }

    #[test]
    fn couple_row_without_second_holder_is_rejected() {
        let mut row = couple_row();
        row.phone2 = None;
        assert!(Pass::try_from(row).is_err());
    }

    #[test]
    fn partial_redemption_columns_are_rejected() {
        let mut row = couple_row();
        row.scanned_at = Some(Utc::now());
        row.scanned_by = None;
        assert!(Pass::try_from(row).is_err());
    }

    #[test]
    fn redeemed_row_carries_operator_and_timestamp() {
        let mut row = couple_row();
        let at = Utc::now();
        row.scanned_at = Some(at);
        row.scanned_by = Some("admin1".to_string());
        let pass = Pass::try_from(row).expect("row should convert");
        assert_eq!(
            pass.redemption,
            Redemption::Redeemed {
                at,
                by: "admin1".to_string()
            }
        );
    }

    #[test]
    fn normalization_drops_blank_optional_fields() {
        let request = IssuePassRequest {
            name1: "  Alice  ".to_string(),
            phone1: " 9876543210 ".to_string(),
            name2: Some("   ".to_string()),
            phone2: Some(String::new()),
            pass_type: PassKind::Single,
            payment_mode: PaymentMode::Cash,
            txn_info: Some("  ".to_string()),
            timing: " 7pm ".to_string(),
        }
        .normalized();

        assert_eq!(request.name1, "Alice");
        assert_eq!(request.phone1, "9876543210");
        assert_eq!(request.timing, "7pm");
        assert_eq!(request.name2, None);
        assert_eq!(request.phone2, None);
        assert_eq!(request.txn_info, None);
    }
}
