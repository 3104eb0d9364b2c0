//! Authoritative pass storage.
//!
//! Owns every write to the `passes` table. The single-redemption guarantee
//! lives here: the unscanned→scanned transition is one conditional UPDATE,
//! and the outcome is decided by whether that statement changed a row.

use sqlx::PgPool;
use uuid::Uuid;

use super::models::{
    IssuePassRequest, Pass, PassError, PassListQuery, PassRow, PassStats, RedeemOutcome,
    Redemption,
};
use super::validation;

/// Name of the UNIQUE (name1, phone1) constraint in the schema; used to tell
/// a duplicate primary holder apart from other integrity failures.
const PRIMARY_HOLDER_CONSTRAINT: &str = "passes_primary_holder_key";

#[derive(Clone)]
pub struct PassStore {
    db: PgPool,
}

impl PassStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Issue a new pass. The uniqueness of the primary holder is enforced by
    /// the insert itself, so two concurrent submissions for the same holder
    /// produce exactly one pass.
    pub async fn create(&self, request: IssuePassRequest) -> Result<Pass, PassError> {
        let request = request.normalized();
        validation::validate_issue_request(&request).map_err(PassError::Validation)?;

        let amount = validation::price_for(request.pass_type);
        let pass_id = Uuid::new_v4();

        let inserted = sqlx::query_as::<_, PassRow>(
            r#"
            INSERT INTO passes
                (pass_id, name1, phone1, name2, phone2, pass_type, amount,
                 payment_mode, txn_info, timing)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(pass_id)
        .bind(&request.name1)
        .bind(&request.phone1)
        .bind(request.name2.as_deref())
        .bind(request.phone2.as_deref())
        .bind(request.pass_type.as_str())
        .bind(amount)
        .bind(request.payment_mode.as_str())
        .bind(request.txn_info.as_deref())
        .bind(&request.timing)
        .fetch_one(&self.db)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) => {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some("23505")
                        && db_err.constraint() == Some(PRIMARY_HOLDER_CONSTRAINT)
                    {
                        return Err(PassError::DuplicateHolder {
                            name: request.name1,
                            phone: request.phone1,
                        });
                    }
                }
                return Err(e.into());
            }
        };

        let pass = Pass::try_from(row)?;
        tracing::info!(
            pass_id = %pass.id,
            pass_type = %pass.kind().as_str(),
            amount = pass.amount,
            "pass issued"
        );
        Ok(pass)
    }

    /// Redeem a pass exactly once. The WHERE clause carries the state check,
    /// so any number of concurrent callers racing on one id see a single
    /// `Success`; a separate read-then-write would let two of them through.
    pub async fn redeem(
        &self,
        pass_id: Uuid,
        operator: &str,
    ) -> Result<RedeemOutcome, PassError> {
        let updated = sqlx::query_as::<_, PassRow>(
            r#"
            UPDATE passes
            SET scanned_at = NOW(), scanned_by = $1
            WHERE pass_id = $2 AND scanned_at IS NULL
            RETURNING *
            "#,
        )
        .bind(operator)
        .bind(pass_id)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = updated {
            let pass = Pass::try_from(row)?;
            tracing::info!(pass_id = %pass_id, scanned_by = %operator, "pass redeemed");
            return Ok(RedeemOutcome::Success(pass.summary()));
        }

        // The conditional write changed nothing: the pass either does not
        // exist or was already redeemed (possibly by a racing caller a
        // moment ago). Both "already" cases report the same outcome.
        match self.get(pass_id).await? {
            None => Ok(RedeemOutcome::NotFound),
            Some(pass) => match pass.redemption.clone() {
                Redemption::Redeemed { at, by } => Ok(RedeemOutcome::AlreadyRedeemed {
                    scanned_at: at,
                    scanned_by: by,
                    pass: pass.summary(),
                }),
                Redemption::Unredeemed => Err(PassError::Internal(format!(
                    "pass {pass_id} observed unredeemed after a missed conditional update"
                ))),
            },
        }
    }

    pub async fn get(&self, pass_id: Uuid) -> Result<Option<Pass>, PassError> {
        let row = sqlx::query_as::<_, PassRow>("SELECT * FROM passes WHERE pass_id = $1")
            .bind(pass_id)
            .fetch_optional(&self.db)
            .await?;
        row.map(Pass::try_from).transpose()
    }

    /// Paginated listing with free-text search over holder names and phones.
    pub async fn list(&self, query: &PassListQuery) -> Result<(Vec<Pass>, i64), PassError> {
        let mut where_clause = String::from("WHERE 1=1");
        let mut param_count = 0;
        let mut search_param: Option<String> = None;
        let mut kind_param: Option<&'static str> = None;

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            param_count += 1;
            where_clause.push_str(&format!(
                " AND (name1 ILIKE ${n} OR phone1 ILIKE ${n} OR name2 ILIKE ${n} OR phone2 ILIKE ${n})",
                n = param_count
            ));
            search_param = Some(format!("%{}%", search));
        }

        match query.scanned.as_deref() {
            Some("scanned") => where_clause.push_str(" AND scanned_at IS NOT NULL"),
            Some("unscanned") => where_clause.push_str(" AND scanned_at IS NULL"),
            _ => {}
        }

        if let Some(kind) = query.pass_type {
            param_count += 1;
            where_clause.push_str(&format!(" AND pass_type = ${}", param_count));
            kind_param = Some(kind.as_str());
        }

        let count_sql = format!("SELECT COUNT(*) FROM passes {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(ref search) = search_param {
            count_query = count_query.bind(search);
        }
        if let Some(kind) = kind_param {
            count_query = count_query.bind(kind);
        }
        let total_count = count_query.fetch_one(&self.db).await?;

        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let rows_sql = format!(
            "SELECT * FROM passes {} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            where_clause,
            param_count + 1,
            param_count + 2
        );
        let mut rows_query = sqlx::query_as::<_, PassRow>(&rows_sql);
        if let Some(ref search) = search_param {
            rows_query = rows_query.bind(search);
        }
        if let Some(kind) = kind_param {
            rows_query = rows_query.bind(kind);
        }
        let rows = rows_query
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.db)
            .await?;

        let passes = rows
            .into_iter()
            .map(Pass::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((passes, total_count))
    }

    /// Dashboard aggregates over the whole table.
    pub async fn stats(&self) -> Result<PassStats, PassError> {
        let stats = sqlx::query_as::<_, PassStats>(
            r#"
            SELECT
                COUNT(*) AS total_passes,
                COUNT(*) FILTER (WHERE pass_type = 'SINGLE') AS single_count,
                COUNT(*) FILTER (WHERE pass_type = 'COUPLE') AS couple_count,
                COALESCE(SUM(amount) FILTER (WHERE payment_mode = 'CASH'), 0)::bigint AS cash_total,
                COALESCE(SUM(amount) FILTER (WHERE payment_mode = 'ONLINE'), 0)::bigint AS online_total,
                COALESCE(SUM(amount), 0)::bigint AS total_revenue,
                COUNT(*) FILTER (WHERE scanned_at IS NOT NULL) AS scanned_count,
                COUNT(*) FILTER (WHERE scanned_at IS NULL) AS unscanned_count
            FROM passes
            "#,
        )
        .fetch_one(&self.db)
        .await?;
        Ok(stats)
    }

    /// Every pass, newest first, for the CSV export.
    pub async fn export_all(&self) -> Result<Vec<Pass>, PassError> {
        let rows =
            sqlx::query_as::<_, PassRow>("SELECT * FROM passes ORDER BY created_at DESC")
                .fetch_all(&self.db)
                .await?;
        rows.into_iter().map(Pass::try_from).collect()
    }
}
