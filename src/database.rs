use chrono::{DateTime, Utc};
use mobc::{Manager, Pool};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::path::Path;
use tracing::{debug, info};

use crate::models::{BusinessRecord, Campaign, EmailStatus, Lead, PreviewStatus, Stage};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct SqliteManager {
    db_path: String,
}

impl SqliteManager {
    pub fn new(db_path: String) -> Self {
        debug!("Creating SqliteManager for path: {}", db_path);
        Self { db_path }
    }
}

#[async_trait::async_trait]
impl Manager for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        debug!("Opening database: {}", self.db_path);
        let conn = Connection::open(&self.db_path)?;

        // Some PRAGMA statements return a row, so execute() alone won't do.
        let exec_pragma = |conn: &Connection, pragma: &str| -> Result<(), rusqlite::Error> {
            match conn.execute(pragma, []) {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::ExecuteReturnedResults) => {
                    conn.query_row(pragma, [], |_| Ok(())).map(|_| ())
                }
                Err(e) => Err(e),
            }
        };

        exec_pragma(&conn, "PRAGMA journal_mode=WAL")?;
        exec_pragma(&conn, "PRAGMA synchronous=NORMAL")?;
        exec_pragma(&conn, "PRAGMA foreign_keys=ON")?;

        init_database(&conn)?;
        Ok(conn)
    }

    async fn check(&self, conn: Self::Connection) -> Result<Self::Connection, Self::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(conn)
    }
}

fn init_database(conn: &Connection) -> SqliteResult<()> {
    debug!("Initializing database schema...");
    create_campaigns_table(conn)?;
    create_leads_table(conn)?;
    create_indexes(conn)?;
    Ok(())
}

pub type DbPool = Pool<SqliteManager>;

pub async fn create_db_pool(db_path: &str) -> Result<DbPool, BoxError> {
    if let Some(parent) = Path::new(db_path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let manager = SqliteManager::new(db_path.to_string());
    let pool = Pool::builder().max_open(10).max_idle(5).build(manager);

    info!("✓ SQLite connection pool created: {}", db_path);
    Ok(pool)
}

fn create_campaigns_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS campaigns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            niche TEXT NOT NULL,
            location TEXT NOT NULL,
            total_scraped INTEGER NOT NULL DEFAULT 0,
            total_qualified INTEGER NOT NULL DEFAULT 0,
            total_emailed INTEGER NOT NULL DEFAULT 0,
            total_replied INTEGER NOT NULL DEFAULT 0,
            total_closed INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_leads_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            campaign_id INTEGER REFERENCES campaigns(id),

            business_name TEXT NOT NULL,
            business_type TEXT NOT NULL,
            address TEXT NOT NULL DEFAULT '',
            city TEXT NOT NULL DEFAULT '',
            phone TEXT,
            email TEXT,
            website_url TEXT,
            maps_url TEXT NOT NULL DEFAULT '',
            rating REAL,
            reviews_count INTEGER,

            screenshot_url TEXT,
            site_score INTEGER,
            site_issues TEXT,
            analysis_summary TEXT,

            preview_url TEXT,
            preview_prompt TEXT,
            preview_status TEXT NOT NULL DEFAULT 'pending',

            email_subject TEXT,
            email_body TEXT,
            email_status TEXT,
            email_sent_at TEXT,

            stage TEXT NOT NULL DEFAULT 'scraped',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_indexes(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_leads_campaign ON leads(campaign_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_leads_stage ON leads(stage)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_leads_email_status ON leads(email_status)",
        [],
    )?;
    Ok(())
}

// Issues travel as structured data through the pipeline; JSON text only
// lives at this storage boundary.
fn encode_issues(issues: &[String]) -> String {
    serde_json::to_string(issues).unwrap_or_else(|_| "[]".to_string())
}

fn decode_issues(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn parse_timestamp(raw: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_lead(row: &Row) -> SqliteResult<Lead> {
    let issues_raw: Option<String> = row.get("site_issues")?;
    let preview_status: String = row.get("preview_status")?;
    let email_status: Option<String> = row.get("email_status")?;
    let stage: String = row.get("stage")?;
    let sent_at: Option<String> = row.get("email_sent_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Lead {
        id: row.get("id")?,
        campaign_id: row.get("campaign_id")?,
        business_name: row.get("business_name")?,
        business_type: row.get("business_type")?,
        address: row.get("address")?,
        city: row.get("city")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        website_url: row.get("website_url")?,
        maps_url: row.get("maps_url")?,
        rating: row.get("rating")?,
        reviews_count: row.get("reviews_count")?,
        screenshot_url: row.get("screenshot_url")?,
        site_score: row.get("site_score")?,
        site_issues: decode_issues(issues_raw),
        analysis_summary: row.get("analysis_summary")?,
        preview_url: row.get("preview_url")?,
        preview_prompt: row.get("preview_prompt")?,
        preview_status: PreviewStatus::from_str(&preview_status).unwrap_or(PreviewStatus::Pending),
        email_subject: row.get("email_subject")?,
        email_body: row.get("email_body")?,
        email_status: email_status.as_deref().and_then(EmailStatus::from_str),
        email_sent_at: sent_at.map(parse_timestamp),
        stage: Stage::from_str(&stage).unwrap_or(Stage::Scraped),
        created_at: parse_timestamp(created_at),
        updated_at: parse_timestamp(updated_at),
    })
}

fn row_to_campaign(row: &Row) -> SqliteResult<Campaign> {
    let created_at: String = row.get("created_at")?;
    Ok(Campaign {
        id: row.get("id")?,
        name: row.get("name")?,
        niche: row.get("niche")?,
        location: row.get("location")?,
        total_scraped: row.get("total_scraped")?,
        total_qualified: row.get("total_qualified")?,
        total_emailed: row.get("total_emailed")?,
        total_replied: row.get("total_replied")?,
        total_closed: row.get("total_closed")?,
        status: row.get("status")?,
        created_at: parse_timestamp(created_at),
    })
}

pub async fn insert_campaign(
    pool: &DbPool,
    name: &str,
    niche: &str,
    location: &str,
) -> Result<i64, BoxError> {
    let conn = pool.get().await?;
    conn.execute(
        "INSERT INTO campaigns (name, niche, location, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![name, niche, location, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub async fn get_campaign(pool: &DbPool, id: i64) -> Result<Option<Campaign>, BoxError> {
    let conn = pool.get().await?;
    let mut stmt = conn.prepare("SELECT * FROM campaigns WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], row_to_campaign)?;
    match rows.next() {
        Some(campaign) => Ok(Some(campaign?)),
        None => Ok(None),
    }
}

/// Campaign counters are derived, never hand-maintained: recompute them from
/// the lead set after a batch run.
pub async fn recompute_campaign_totals(pool: &DbPool, campaign_id: i64) -> Result<(), BoxError> {
    let conn = pool.get().await?;
    conn.execute(
        r#"
        UPDATE campaigns SET
            total_scraped = (SELECT COUNT(*) FROM leads WHERE campaign_id = ?1),
            total_qualified = (SELECT COUNT(*) FROM leads WHERE campaign_id = ?1
                               AND site_score IS NOT NULL),
            total_emailed = (SELECT COUNT(*) FROM leads WHERE campaign_id = ?1
                             AND email_status IN ('sent', 'opened', 'clicked', 'replied')),
            total_replied = (SELECT COUNT(*) FROM leads WHERE campaign_id = ?1
                             AND email_status = 'replied'),
            total_closed = (SELECT COUNT(*) FROM leads WHERE campaign_id = ?1
                            AND stage = 'closed')
        WHERE id = ?1
        "#,
        params![campaign_id],
    )?;
    Ok(())
}

pub async fn insert_lead(
    pool: &DbPool,
    campaign_id: Option<i64>,
    record: &BusinessRecord,
) -> Result<i64, BoxError> {
    let conn = pool.get().await?;
    let now = Utc::now().to_rfc3339();
    conn.execute(
        r#"
        INSERT INTO leads (
            campaign_id, business_name, business_type, address, city,
            phone, email, website_url, maps_url, rating, reviews_count,
            stage, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'scraped', ?12, ?12)
        "#,
        params![
            campaign_id,
            record.business_name,
            record.business_type,
            record.address,
            record.city,
            record.phone,
            record.email,
            record.website_url,
            record.maps_url,
            record.rating,
            record.reviews_count,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!("Inserted lead {} ({})", id, record.business_name);
    Ok(id)
}

pub async fn get_lead(pool: &DbPool, id: i64) -> Result<Option<Lead>, BoxError> {
    let conn = pool.get().await?;
    let mut stmt = conn.prepare("SELECT * FROM leads WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], row_to_lead)?;
    match rows.next() {
        Some(lead) => Ok(Some(lead?)),
        None => Ok(None),
    }
}

pub async fn list_leads_for_campaign(
    pool: &DbPool,
    campaign_id: i64,
) -> Result<Vec<Lead>, BoxError> {
    let conn = pool.get().await?;
    let mut stmt = conn.prepare("SELECT * FROM leads WHERE campaign_id = ?1 ORDER BY id")?;
    let rows = stmt.query_map(params![campaign_id], row_to_lead)?;
    let mut leads = Vec::new();
    for lead in rows {
        leads.push(lead?);
    }
    Ok(leads)
}

pub async fn update_lead_analysis(
    pool: &DbPool,
    id: i64,
    score: Option<i64>,
    issues: &[String],
    summary: &str,
    screenshot_url: Option<&str>,
) -> Result<(), BoxError> {
    let conn = pool.get().await?;
    conn.execute(
        r#"
        UPDATE leads SET
            site_score = ?2,
            site_issues = ?3,
            analysis_summary = ?4,
            screenshot_url = COALESCE(?5, screenshot_url),
            stage = 'analyzed',
            updated_at = ?6
        WHERE id = ?1
        "#,
        params![
            id,
            score,
            encode_issues(issues),
            summary,
            screenshot_url,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub async fn update_lead_preview(
    pool: &DbPool,
    id: i64,
    url: Option<&str>,
    prompt: &str,
    status: PreviewStatus,
    stage: Stage,
) -> Result<(), BoxError> {
    let conn = pool.get().await?;
    conn.execute(
        r#"
        UPDATE leads SET
            preview_url = ?2,
            preview_prompt = ?3,
            preview_status = ?4,
            stage = ?5,
            updated_at = ?6
        WHERE id = ?1
        "#,
        params![
            id,
            url,
            prompt,
            status.as_str(),
            stage.as_str(),
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Persist a drafted email. Refuses to touch a lead whose email already left
/// draft status; use [`redraft_lead_email`] for an explicit re-draft.
pub async fn update_lead_email_draft(
    pool: &DbPool,
    id: i64,
    subject: &str,
    body: &str,
) -> Result<(), BoxError> {
    let conn = pool.get().await?;
    let changed = conn.execute(
        r#"
        UPDATE leads SET
            email_subject = ?2,
            email_body = ?3,
            email_status = 'draft',
            stage = 'email_drafted',
            updated_at = ?4
        WHERE id = ?1 AND (email_status IS NULL OR email_status = 'draft')
        "#,
        params![id, subject, body, Utc::now().to_rfc3339()],
    )?;
    if changed == 0 {
        return Err(format!("lead {} email is no longer a draft, refusing to overwrite", id).into());
    }
    Ok(())
}

/// Explicit re-draft: replaces subject/body regardless of email status and
/// resets the status to draft.
pub async fn redraft_lead_email(
    pool: &DbPool,
    id: i64,
    subject: &str,
    body: &str,
) -> Result<(), BoxError> {
    let conn = pool.get().await?;
    conn.execute(
        r#"
        UPDATE leads SET
            email_subject = ?2,
            email_body = ?3,
            email_status = 'draft',
            updated_at = ?4
        WHERE id = ?1
        "#,
        params![id, subject, body, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub async fn mark_lead_sent(
    pool: &DbPool,
    id: i64,
    sent_at: DateTime<Utc>,
) -> Result<(), BoxError> {
    let conn = pool.get().await?;
    conn.execute(
        r#"
        UPDATE leads SET
            email_status = 'sent',
            email_sent_at = ?2,
            stage = 'sent',
            updated_at = ?3
        WHERE id = ?1
        "#,
        params![id, sent_at.to_rfc3339(), Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub async fn set_lead_stage(pool: &DbPool, id: i64, stage: Stage) -> Result<(), BoxError> {
    let conn = pool.get().await?;
    conn.execute(
        "UPDATE leads SET stage = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, stage.as_str(), Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Everything the send sweep picks up: drafted with a non-empty body. The
/// sweep itself decides what to do with leads lacking an address.
pub async fn leads_with_drafted_emails(pool: &DbPool) -> Result<Vec<Lead>, BoxError> {
    let conn = pool.get().await?;
    let mut stmt = conn.prepare(
        r#"
        SELECT * FROM leads
        WHERE email_status = 'draft'
          AND email_body IS NOT NULL AND email_body != ''
        ORDER BY id
        "#,
    )?;
    let rows = stmt.query_map([], row_to_lead)?;
    let mut leads = Vec::new();
    for lead in rows {
        leads.push(lead?);
    }
    Ok(leads)
}

pub async fn lead_counts_by_stage(pool: &DbPool) -> Result<Vec<(String, i64)>, BoxError> {
    let conn = pool.get().await?;
    let mut stmt =
        conn.prepare("SELECT stage, COUNT(*) FROM leads GROUP BY stage ORDER BY COUNT(*) DESC")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    let mut counts = Vec::new();
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

pub async fn count_leads(pool: &DbPool) -> Result<i64, BoxError> {
    let conn = pool.get().await?;
    let count = conn.query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))?;
    Ok(count)
}

pub async fn count_campaigns(pool: &DbPool) -> Result<i64, BoxError> {
    let conn = pool.get().await?;
    let count = conn.query_row("SELECT COUNT(*) FROM campaigns", [], |row| row.get(0))?;
    Ok(count)
}
