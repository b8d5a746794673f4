use std::str::FromStr;

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

use crate::engine::transition::TransitionPlan;
use crate::error::EngineError;
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{
    Decision, DayPart, LeaveApproval, LeaveRequest, LeaveStatus, LeaveType,
};
use crate::store::{LeaveStore, NewRequest, RequestFilter};

/// MySQL backend. Transitions run inside a transaction with an optimistic
/// `WHERE version = ?` update, so a stale plan affects zero rows and
/// surfaces as `ConcurrencyConflict` instead of a double mutation.
pub struct MySqlStore {
    pool: MySqlPool,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

fn parse_col<T: FromStr>(value: &str, col: &str) -> Result<T, EngineError> {
    value
        .parse::<T>()
        .map_err(|_| EngineError::Storage(format!("bad {col} value `{value}`")))
}

fn row_to_request(row: &MySqlRow) -> Result<LeaveRequest, EngineError> {
    let id: String = row.try_get("id")?;
    let leave_type: String = row.try_get("leave_type")?;
    let start_part: String = row.try_get("start_part")?;
    let end_part: String = row.try_get("end_part")?;
    let status: String = row.try_get("status")?;
    Ok(LeaveRequest {
        id: parse_col::<Uuid>(&id, "id")?,
        request_no: row.try_get("request_no")?,
        person_id: row.try_get("person_id")?,
        unit_id: row.try_get("unit_id")?,
        leave_type: parse_col::<LeaveType>(&leave_type, "leave_type")?,
        start_date: row.try_get("start_date")?,
        start_part: parse_col::<DayPart>(&start_part, "start_part")?,
        end_date: row.try_get("end_date")?,
        end_part: parse_col::<DayPart>(&end_part, "end_part")?,
        total_days: row.try_get("total_days")?,
        description: row.try_get("description")?,
        attachment_url: row.try_get("attachment_url")?,
        status: parse_col::<LeaveStatus>(&status, "status")?,
        approvals: vec![],
        rejection_reason: row.try_get("rejection_reason")?,
        created_by_user_id: row.try_get("created_by_user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: row.try_get("version")?,
    })
}

fn row_to_approval(row: &MySqlRow) -> Result<LeaveApproval, EngineError> {
    let id: String = row.try_get("id")?;
    let request_id: String = row.try_get("request_id")?;
    let decision: String = row.try_get("decision")?;
    Ok(LeaveApproval {
        id: parse_col::<Uuid>(&id, "id")?,
        request_id: parse_col::<Uuid>(&request_id, "request_id")?,
        approver_user_id: row.try_get("approver_user_id")?,
        approver_name: row.try_get("approver_name")?,
        decision: parse_col::<Decision>(&decision, "decision")?,
        note: row.try_get("note")?,
        decided_at: row.try_get("decided_at")?,
    })
}

fn row_to_balance(row: &MySqlRow) -> Result<LeaveBalance, EngineError> {
    Ok(LeaveBalance {
        person_id: row.try_get("person_id")?,
        year: row.try_get("year")?,
        annual_entitled_days: row.try_get("annual_entitled_days")?,
        annual_used_days: row.try_get("annual_used_days")?,
        annual_reserved_days: row.try_get("annual_reserved_days")?,
        sick_used_days: row.try_get("sick_used_days")?,
        excuse_used_days: row.try_get("excuse_used_days")?,
        unpaid_used_days: row.try_get("unpaid_used_days")?,
        other_used_days: row.try_get("other_used_days")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const REQUEST_COLUMNS: &str = "id, request_no, person_id, unit_id, leave_type, start_date, \
     start_part, end_date, end_part, total_days, description, attachment_url, status, \
     rejection_reason, created_by_user_id, created_at, updated_at, version";

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlStore { pool }
    }

    /// Column holding the used counter for one leave type. Static names,
    /// safe to splice into SQL.
    fn used_column(leave_type: LeaveType) -> &'static str {
        match leave_type {
            LeaveType::Annual => "annual_used_days",
            LeaveType::Sick => "sick_used_days",
            LeaveType::Excuse => "excuse_used_days",
            LeaveType::Unpaid => "unpaid_used_days",
            LeaveType::Other => "other_used_days",
        }
    }

    async fn ensure_balance_row<'e, E>(
        executor: E,
        person_id: u64,
        year: i32,
        default_entitlement: Decimal,
    ) -> Result<(), EngineError>
    where
        E: sqlx::Executor<'e, Database = sqlx::MySql>,
    {
        sqlx::query(
            r#"
            INSERT INTO leave_balances (person_id, year, annual_entitled_days, updated_at)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE person_id = person_id
            "#,
        )
        .bind(person_id)
        .bind(year)
        .bind(default_entitlement)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(())
    }

    async fn fetch_balance(
        &self,
        person_id: u64,
        year: i32,
    ) -> Result<Option<LeaveBalance>, EngineError> {
        let row = sqlx::query(
            "SELECT person_id, year, annual_entitled_days, annual_used_days, \
             annual_reserved_days, sick_used_days, excuse_used_days, unpaid_used_days, \
             other_used_days, updated_at FROM leave_balances WHERE person_id = ? AND year = ?",
        )
        .bind(person_id)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_balance).transpose()
    }
}

impl LeaveStore for MySqlStore {
    async fn insert_request(
        &self,
        new: NewRequest,
        reserve_days: Decimal,
        default_entitlement: Decimal,
    ) -> Result<LeaveRequest, EngineError> {
        let mut tx = self.pool.begin().await?;
        let id = Uuid::new_v4();
        let now = Utc::now();
        let year = new.start_date.year();

        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (id, request_no, person_id, unit_id, leave_type, start_date, start_part,
                 end_date, end_part, total_days, description, attachment_url, status,
                 created_by_user_id, created_at, updated_at, version)
            VALUES (?, '', ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(id.to_string())
        .bind(new.person_id)
        .bind(new.unit_id)
        .bind(new.leave_type.to_string())
        .bind(new.start_date)
        .bind(new.start_part.to_string())
        .bind(new.end_date)
        .bind(new.end_part.to_string())
        .bind(new.total_days)
        .bind(&new.description)
        .bind(&new.attachment_url)
        .bind(LeaveStatus::Pending.to_string())
        .bind(new.created_by_user_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // The AUTO_INCREMENT seq column feeds the human-readable number.
        let request_no = format!("LR-{}-{:05}", year, result.last_insert_id());
        sqlx::query("UPDATE leave_requests SET request_no = ? WHERE id = ?")
            .bind(&request_no)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        Self::ensure_balance_row(&mut *tx, new.person_id, year, default_entitlement).await?;
        if reserve_days > Decimal::ZERO {
            sqlx::query(
                "UPDATE leave_balances SET annual_reserved_days = annual_reserved_days + ?, \
                 updated_at = ? WHERE person_id = ? AND year = ?",
            )
            .bind(reserve_days)
            .bind(now)
            .bind(new.person_id)
            .bind(year)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(LeaveRequest {
            id,
            request_no,
            person_id: new.person_id,
            unit_id: new.unit_id,
            leave_type: new.leave_type,
            start_date: new.start_date,
            start_part: new.start_part,
            end_date: new.end_date,
            end_part: new.end_part,
            total_days: new.total_days,
            description: new.description,
            attachment_url: new.attachment_url,
            status: LeaveStatus::Pending,
            approvals: vec![],
            rejection_reason: None,
            created_by_user_id: new.created_by_user_id,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    async fn get_request(&self, id: Uuid) -> Result<LeaveRequest, EngineError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("leave request {id}")))?;
        let mut request = row_to_request(&row)?;

        let approval_rows = sqlx::query(
            "SELECT id, request_id, approver_user_id, approver_name, decision, note, decided_at \
             FROM leave_approvals WHERE request_id = ? ORDER BY decided_at, id",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;
        request.approvals = approval_rows
            .iter()
            .map(row_to_approval)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(request)
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), EngineError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();
        let status;

        if let Some(person_id) = filter.person_id {
            where_sql.push_str(" AND person_id = ?");
            args.push(FilterValue::U64(person_id));
        }
        if let Some(unit_id) = filter.unit_id {
            where_sql.push_str(" AND unit_id = ?");
            args.push(FilterValue::U64(unit_id));
        }
        if let Some(s) = filter.status {
            where_sql.push_str(" AND status = ?");
            status = s.to_string();
            args.push(FilterValue::Str(&status));
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let mut data_sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests{where_sql} ORDER BY created_at DESC, seq DESC"
        );
        if filter.limit.is_some() {
            data_sql.push_str(" LIMIT ? OFFSET ?");
        }
        let mut data_q = sqlx::query(&data_sql);
        for arg in &args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(*v),
                FilterValue::Str(s) => data_q.bind(*s),
            };
        }
        if let Some(limit) = filter.limit {
            data_q = data_q.bind(limit).bind(filter.offset);
        }

        let rows = data_q.fetch_all(&self.pool).await?;
        // Approvals stay unhydrated on list reads; the detail read loads them.
        let requests = rows
            .iter()
            .map(row_to_request)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((requests, total))
    }

    async fn apply_transition(&self, plan: TransitionPlan) -> Result<LeaveRequest, EngineError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE leave_requests SET status = ?, \
             rejection_reason = COALESCE(?, rejection_reason), updated_at = ?, \
             version = version + 1 WHERE id = ? AND version = ?",
        )
        .bind(plan.new_status.to_string())
        .bind(&plan.rejection_reason)
        .bind(now)
        .bind(plan.request_id.to_string())
        .bind(plan.expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM leave_requests WHERE id = ?")
                    .bind(plan.request_id.to_string())
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if exists == 0 {
                EngineError::NotFound(format!("leave request {}", plan.request_id))
            } else {
                EngineError::ConcurrencyConflict
            });
        }

        sqlx::query(
            "INSERT INTO leave_approvals \
             (id, request_id, approver_user_id, approver_name, decision, note, decided_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(plan.approval.id.to_string())
        .bind(plan.approval.request_id.to_string())
        .bind(plan.approval.approver_user_id)
        .bind(&plan.approval.approver_name)
        .bind(plan.approval.decision.to_string())
        .bind(&plan.approval.note)
        .bind(plan.approval.decided_at)
        .execute(&mut *tx)
        .await?;

        if plan.reserved_delta != Decimal::ZERO || plan.used_delta != Decimal::ZERO {
            Self::ensure_balance_row(&mut *tx, plan.person_id, plan.year, Decimal::ZERO).await?;
            let used_column = Self::used_column(plan.leave_type);
            let sql = format!(
                "UPDATE leave_balances SET annual_reserved_days = annual_reserved_days + ?, \
                 {used_column} = {used_column} + ?, updated_at = ? \
                 WHERE person_id = ? AND year = ?"
            );
            sqlx::query(&sql)
                .bind(plan.reserved_delta)
                .bind(plan.used_delta)
                .bind(now)
                .bind(plan.person_id)
                .bind(plan.year)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.get_request(plan.request_id).await
    }

    async fn get_or_create_balance(
        &self,
        person_id: u64,
        year: i32,
        default_entitlement: Decimal,
    ) -> Result<LeaveBalance, EngineError> {
        Self::ensure_balance_row(&self.pool, person_id, year, default_entitlement).await?;
        self.fetch_balance(person_id, year).await?.ok_or_else(|| {
            EngineError::Storage(format!("balance {person_id}/{year} vanished after upsert"))
        })
    }

    async fn adjust_entitlement(
        &self,
        person_id: u64,
        year: i32,
        delta: Decimal,
        default_entitlement: Decimal,
    ) -> Result<LeaveBalance, EngineError> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_balance_row(&mut *tx, person_id, year, default_entitlement).await?;
        sqlx::query(
            "UPDATE leave_balances SET annual_entitled_days = annual_entitled_days + ?, \
             updated_at = ? WHERE person_id = ? AND year = ?",
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(person_id)
        .bind(year)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.fetch_balance(person_id, year).await?.ok_or_else(|| {
            EngineError::Storage(format!("balance {person_id}/{year} vanished after adjust"))
        })
    }

    async fn balances_for(
        &self,
        person_ids: &[u64],
        year: i32,
    ) -> Result<Vec<LeaveBalance>, EngineError> {
        let mut balances = Vec::with_capacity(person_ids.len());
        for person_id in person_ids {
            if let Some(balance) = self.fetch_balance(*person_id, year).await? {
                balances.push(balance);
            }
        }
        Ok(balances)
    }
}
