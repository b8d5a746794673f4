use anyhow::Result;
use sqlx::MySqlPool;

pub async fn init_db(database_url: &str) -> MySqlPool {
    MySqlPool::connect(database_url)
        .await
        .expect("Failed to connect to database")
}

const CREATE_LEAVE_REQUESTS: &str = r#"
CREATE TABLE IF NOT EXISTS leave_requests (
    id CHAR(36) NOT NULL PRIMARY KEY,
    seq BIGINT UNSIGNED NOT NULL AUTO_INCREMENT UNIQUE,
    request_no VARCHAR(32) NOT NULL DEFAULT '',
    person_id BIGINT UNSIGNED NOT NULL,
    unit_id BIGINT UNSIGNED NOT NULL,
    leave_type VARCHAR(16) NOT NULL,
    start_date DATE NOT NULL,
    start_part VARCHAR(8) NOT NULL,
    end_date DATE NOT NULL,
    end_part VARCHAR(8) NOT NULL,
    total_days DECIMAL(6,1) NOT NULL,
    description TEXT NOT NULL,
    attachment_url VARCHAR(512) NULL,
    status VARCHAR(16) NOT NULL,
    rejection_reason TEXT NULL,
    created_by_user_id BIGINT UNSIGNED NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    version BIGINT UNSIGNED NOT NULL DEFAULT 0,
    INDEX idx_leave_requests_person (person_id),
    INDEX idx_leave_requests_unit (unit_id),
    INDEX idx_leave_requests_status (status)
)
"#;

const CREATE_LEAVE_APPROVALS: &str = r#"
CREATE TABLE IF NOT EXISTS leave_approvals (
    id CHAR(36) NOT NULL PRIMARY KEY,
    request_id CHAR(36) NOT NULL,
    approver_user_id BIGINT UNSIGNED NOT NULL,
    approver_name VARCHAR(255) NOT NULL,
    decision VARCHAR(24) NOT NULL,
    note TEXT NULL,
    decided_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    INDEX idx_leave_approvals_request (request_id)
)
"#;

const CREATE_LEAVE_BALANCES: &str = r#"
CREATE TABLE IF NOT EXISTS leave_balances (
    person_id BIGINT UNSIGNED NOT NULL,
    year INT NOT NULL,
    annual_entitled_days DECIMAL(6,1) NOT NULL DEFAULT 0,
    annual_used_days DECIMAL(6,1) NOT NULL DEFAULT 0,
    annual_reserved_days DECIMAL(6,1) NOT NULL DEFAULT 0,
    sick_used_days DECIMAL(6,1) NOT NULL DEFAULT 0,
    excuse_used_days DECIMAL(6,1) NOT NULL DEFAULT 0,
    unpaid_used_days DECIMAL(6,1) NOT NULL DEFAULT 0,
    other_used_days DECIMAL(6,1) NOT NULL DEFAULT 0,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (person_id, year)
)
"#;

/// Idempotent schema bootstrap, run once at startup.
pub async fn ensure_schema(pool: &MySqlPool) -> Result<()> {
    for ddl in [
        CREATE_LEAVE_REQUESTS,
        CREATE_LEAVE_APPROVALS,
        CREATE_LEAVE_BALANCES,
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }
    log::info!("Leave schema ensured");
    Ok(())
}
