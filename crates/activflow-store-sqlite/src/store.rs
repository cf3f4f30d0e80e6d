//! [`SqliteStore`]: the SQLite implementation of [`ActivityStore`].

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use activflow_core::{
  activity::{Activity, NewActivity, NewTeam, Team},
  dashboard::TimeWindow,
  form::{
    FieldDefinition, Form, NewField, NewSubmission, SessionSummary, SessionView,
    join_select_values,
  },
  kpi::{Kpi, KpiType, NewKpi, ObjectiveResultLink, TeamObjectiveKpi, TeamResultKpi},
  store::{ActivityStore, Overview},
  user::{NewUser, User},
};

use crate::{
  Result,
  encode::{
    ACTIVITY_COLUMNS, FIELD_COLUMNS, FORM_COLUMNS, KPI_COLUMNS, RawActivity, RawField, RawForm,
    RawKpi, RawUser, TEAM_COLUMNS, USER_COLUMNS, decode_dt, decode_uuid, encode_dt, encode_ids,
    encode_uuid, qualify, team_from_row,
  },
  schema::SCHEMA,
};

/// Current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// An activity store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All access
/// is serialised on the connection's thread, and every multi-row write runs
/// in an `IMMEDIATE` transaction.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Flag a row of `table` as deleted. Returns `false` if no live row
  /// matched.
  async fn soft_delete(&self, table: &'static str, key: &'static str, id: i64) -> Result<bool> {
    let sql = format!("UPDATE {table} SET is_deleted = 1 WHERE {key} = ?1 AND is_deleted = 0");
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, rusqlite::params![id])?))
      .await?;
    Ok(changed > 0)
  }

  async fn set_active(
    &self,
    table: &'static str,
    key: &'static str,
    id: i64,
    active: bool,
  ) -> Result<bool> {
    let sql = format!("UPDATE {table} SET is_active = ?2 WHERE {key} = ?1 AND is_deleted = 0");
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, rusqlite::params![id, active])?))
      .await?;
    Ok(changed > 0)
  }

  async fn query_user(&self, sql: String, param: rusqlite::types::Value) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![param], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn query_team(&self, sql: String, param: rusqlite::types::Value) -> Result<Option<Team>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(&sql, rusqlite::params![param], team_from_row)
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn query_teams(&self, sql: String, id: i64) -> Result<Vec<Team>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(rusqlite::params![id], team_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn query_kpi(&self, sql: String, params: Vec<rusqlite::types::Value>) -> Result<Option<Kpi>> {
    let raw: Option<RawKpi> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(params), RawKpi::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawKpi::into_kpi).transpose()
  }
}

// ─── ActivityStore impl ──────────────────────────────────────────────────────

impl ActivityStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let created_at = now();
    let at_str     = encode_dt(created_at);
    let profile    = input.profile.as_ref().to_owned();
    let email      = input.email.clone();
    let firstname  = input.firstname.clone();
    let lastname   = input.lastname.clone();
    let hash       = input.password_hash.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (email, firstname, lastname, profile, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![email, firstname, lastname, profile, hash, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(User {
      id,
      email: input.email,
      firstname: input.firstname,
      lastname: input.lastname,
      profile: input.profile,
      password_hash: input.password_hash,
      is_active: true,
      created_at,
    })
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM live_users WHERE user_id = ?1");
    self.query_user(sql, id.into()).await
  }

  async fn find_user_by_email(&self, email: String) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM live_users WHERE email = ?1");
    self.query_user(sql, email.into()).await
  }

  async fn set_user_active(&self, id: i64, active: bool) -> Result<bool> {
    self.set_active("users", "user_id", id, active).await
  }

  // ── Teams ─────────────────────────────────────────────────────────────────

  async fn create_team(&self, input: NewTeam) -> Result<Team> {
    let at_str = encode_dt(now());
    let code   = input.code.clone();
    let name   = input.name.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO teams (code, name, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![code, name, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Team { id, code: input.code, name: input.name, is_active: true })
  }

  async fn get_team(&self, id: i64) -> Result<Option<Team>> {
    let sql = format!("SELECT {TEAM_COLUMNS} FROM live_teams WHERE team_id = ?1");
    self.query_team(sql, id.into()).await
  }

  async fn find_team_by_code(&self, code: String) -> Result<Option<Team>> {
    let sql = format!("SELECT {TEAM_COLUMNS} FROM live_teams WHERE code = ?1");
    self.query_team(sql, code.into()).await
  }

  async fn add_team_member(&self, team_id: i64, user_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO team_members (team_id, user_id) VALUES (?1, ?2)",
          rusqlite::params![team_id, user_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn team_members(&self, team_id: i64) -> Result<Vec<User>> {
    let sql = format!(
      "SELECT {} FROM team_members m
       JOIN live_users u ON u.user_id = m.user_id
       WHERE m.team_id = ?1
       ORDER BY m.member_id",
      qualify("u", USER_COLUMNS)
    );
    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![team_id], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn teams_of_user(&self, user_id: i64) -> Result<Vec<Team>> {
    let sql = format!(
      "SELECT {} FROM team_members m
       JOIN live_teams t ON t.team_id = m.team_id
       WHERE m.user_id = ?1 AND t.is_active = 1
       ORDER BY m.member_id",
      qualify("t", TEAM_COLUMNS)
    );
    self.query_teams(sql, user_id).await
  }

  async fn set_team_active(&self, id: i64, active: bool) -> Result<bool> {
    self.set_active("teams", "team_id", id, active).await
  }

  async fn delete_team(&self, id: i64) -> Result<bool> {
    self.soft_delete("teams", "team_id", id).await
  }

  // ── Activities ────────────────────────────────────────────────────────────

  async fn create_activity(&self, input: NewActivity) -> Result<Activity> {
    let created_at  = now();
    let at_str      = encode_dt(created_at);
    let name        = input.name.clone();
    let description = input.description.clone();
    let form_id     = input.form_id;

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activities (name, description, form_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![name, description, form_id, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Activity {
      id,
      name: input.name,
      description: input.description,
      form_id: input.form_id,
      is_active: true,
      created_at,
    })
  }

  async fn get_activity(&self, id: i64) -> Result<Option<Activity>> {
    let sql = format!("SELECT {ACTIVITY_COLUMNS} FROM live_activities WHERE activity_id = ?1");
    let raw: Option<RawActivity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawActivity::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawActivity::into_activity).transpose()
  }

  async fn activity_teams(&self, activity_id: i64) -> Result<Vec<Team>> {
    let sql = format!(
      "SELECT {} FROM activity_teams a
       JOIN live_teams t ON t.team_id = a.team_id
       WHERE a.activity_id = ?1
       ORDER BY a.assignment_id",
      qualify("t", TEAM_COLUMNS)
    );
    self.query_teams(sql, activity_id).await
  }

  async fn replace_activity_teams(&self, activity_id: i64, team_ids: Vec<i64>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
          "DELETE FROM activity_teams WHERE activity_id = ?1",
          rusqlite::params![activity_id],
        )?;
        {
          let mut stmt =
            tx.prepare("INSERT INTO activity_teams (activity_id, team_id) VALUES (?1, ?2)")?;
          for team_id in &team_ids {
            stmt.execute(rusqlite::params![activity_id, team_id])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn activities_using_form(&self, form_id: i64) -> Result<Vec<Activity>> {
    let sql = format!(
      "SELECT {ACTIVITY_COLUMNS} FROM live_activities
       WHERE form_id = ?1 AND is_active = 1
       ORDER BY activity_id"
    );
    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![form_id], RawActivity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  async fn set_activity_active(&self, id: i64, active: bool) -> Result<bool> {
    self.set_active("activities", "activity_id", id, active).await
  }

  async fn delete_activity(&self, id: i64) -> Result<bool> {
    self.soft_delete("activities", "activity_id", id).await
  }

  // ── Forms ─────────────────────────────────────────────────────────────────

  async fn create_form(&self, name: String) -> Result<Form> {
    let created_at = now();
    let at_str     = encode_dt(created_at);
    let name_owned = name.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO forms (name, created_at) VALUES (?1, ?2)",
          rusqlite::params![name_owned, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Form { id, name, is_active: true, created_at })
  }

  async fn get_form(&self, id: i64) -> Result<Option<Form>> {
    let sql = format!("SELECT {FORM_COLUMNS} FROM live_forms WHERE form_id = ?1");
    let raw: Option<RawForm> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawForm::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawForm::into_form).transpose()
  }

  async fn set_form_active(&self, id: i64, active: bool) -> Result<bool> {
    self.set_active("forms", "form_id", id, active).await
  }

  async fn add_field(&self, input: NewField) -> Result<FieldDefinition> {
    let form_id       = input.form_id;
    let label         = input.label.clone();
    let slug          = input.slug.clone();
    let field_type    = input.field_type.as_ref().to_owned();
    let optional      = input.optional;
    let select_values = join_select_values(&input.select_values);

    let (id, rank) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let rank: i64 = tx.query_row(
          "SELECT COALESCE(MAX(rank), 0) + 1 FROM form_fields WHERE form_id = ?1",
          rusqlite::params![form_id],
          |r| r.get(0),
        )?;
        tx.execute(
          "INSERT INTO form_fields
             (form_id, label, slug, field_type, optional, select_values, rank)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![form_id, label, slug, field_type, optional, select_values, rank],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok((id, rank))
      })
      .await?;

    Ok(FieldDefinition {
      id,
      form_id,
      label: input.label,
      slug: input.slug,
      field_type: input.field_type,
      optional,
      select_values: input.select_values,
      rank,
    })
  }

  async fn list_fields(&self, form_id: i64) -> Result<Vec<FieldDefinition>> {
    let sql = format!(
      "SELECT {FIELD_COLUMNS} FROM live_form_fields
       WHERE form_id = ?1
       ORDER BY rank, field_id"
    );
    let raws: Vec<RawField> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![form_id], RawField::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawField::into_field).collect()
  }

  async fn delete_field(&self, id: i64) -> Result<bool> {
    self.soft_delete("form_fields", "field_id", id).await
  }

  // ── Submissions ───────────────────────────────────────────────────────────

  async fn insert_submission(&self, input: NewSubmission) -> Result<()> {
    let session_str = encode_uuid(input.session_id);
    let at_str      = encode_dt(input.submitted_at);
    let user_id     = input.user_id;
    let values      = input.values;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO submissions (session_id, field_id, user_id, value, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
          )?;
          for (field_id, value) in &values {
            stmt.execute(rusqlite::params![session_str, field_id, user_id, value, at_str])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_sessions(&self, form_id: i64, user_id: Option<i64>) -> Result<Vec<SessionSummary>> {
    let raws: Vec<(String, i64, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT s.session_id, s.user_id, MIN(s.created_at) AS submitted_at
           FROM submissions s
           JOIN form_fields f ON f.field_id = s.field_id
           WHERE f.form_id = ?1 AND (?2 IS NULL OR s.user_id = ?2)
           GROUP BY s.session_id, s.user_id
           ORDER BY submitted_at DESC, s.session_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![form_id, user_id], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(session_id, user_id, at)| {
        Ok(SessionSummary {
          session_id: decode_uuid(&session_id)?,
          user_id,
          submitted_at: decode_dt(&at)?,
        })
      })
      .collect()
  }

  async fn get_session(&self, form_id: i64, session_id: Uuid) -> Result<Option<SessionView>> {
    let session_str = encode_uuid(session_id);
    let raws: Vec<(i64, String, String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT s.user_id, s.created_at, f.slug, s.value
           FROM submissions s
           JOIN form_fields f ON f.field_id = s.field_id
           WHERE f.form_id = ?1 AND s.session_id = ?2
           ORDER BY f.rank, f.field_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![form_id, session_str], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let Some((user_id, at, _, _)) = raws.first() else {
      return Ok(None);
    };
    let user_id = *user_id;
    let submitted_at = decode_dt(at)?;
    let values: BTreeMap<String, String> =
      raws.into_iter().map(|(_, _, slug, value)| (slug, value)).collect();

    Ok(Some(SessionView { session_id, user_id, submitted_at, values }))
  }

  async fn count_sessions(&self, form_id: i64, user_ids: Vec<i64>, window: TimeWindow) -> Result<u64> {
    let users_json = encode_ids(&user_ids)?;
    let start_str  = encode_dt(window.start);
    let end_str    = encode_dt(window.end);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(DISTINCT s.session_id)
           FROM submissions s
           JOIN form_fields f ON f.field_id = s.field_id
           WHERE f.form_id = ?1
             AND s.user_id IN (SELECT value FROM json_each(?2))
             AND s.created_at >= ?3 AND s.created_at < ?4",
          rusqlite::params![form_id, users_json, start_str, end_str],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count.max(0) as u64)
  }

  // ── KPIs ──────────────────────────────────────────────────────────────────

  async fn create_kpi(&self, input: NewKpi) -> Result<Kpi> {
    let at_str      = encode_dt(now());
    let activity_id = input.activity_id;
    let name        = input.name.clone();
    let slug        = input.slug.clone();
    let kpi_type    = input.kpi_type.as_ref().to_owned();
    let description = input.description.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO kpis (activity_id, name, slug, kpi_type, description, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![activity_id, name, slug, kpi_type, description, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Kpi {
      id,
      activity_id,
      name: input.name,
      slug: input.slug,
      kpi_type: input.kpi_type,
      description: input.description,
      value: 0.0,
      is_active: true,
    })
  }

  async fn get_kpi(&self, id: i64) -> Result<Option<Kpi>> {
    let sql = format!("SELECT {KPI_COLUMNS} FROM live_kpis WHERE kpi_id = ?1");
    self.query_kpi(sql, vec![id.into()]).await
  }

  async fn find_kpi_by_slug(&self, activity_id: i64, slug: String) -> Result<Option<Kpi>> {
    let sql = format!("SELECT {KPI_COLUMNS} FROM live_kpis WHERE activity_id = ?1 AND slug = ?2");
    self.query_kpi(sql, vec![activity_id.into(), slug.into()]).await
  }

  async fn list_kpis(&self, activity_id: i64, kpi_type: Option<KpiType>) -> Result<Vec<Kpi>> {
    let sql = format!(
      "SELECT {KPI_COLUMNS} FROM live_kpis
       WHERE activity_id = ?1 AND (?2 IS NULL OR kpi_type = ?2)
       ORDER BY kpi_id"
    );
    let type_str = kpi_type.map(|t| t.as_ref().to_owned());
    let raws: Vec<RawKpi> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![activity_id, type_str], RawKpi::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawKpi::into_kpi).collect()
  }

  async fn set_kpi_values(&self, values: Vec<(i64, f64)>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
          let mut stmt =
            tx.prepare("UPDATE kpis SET value = ?2 WHERE kpi_id = ?1 AND is_deleted = 0")?;
          for (kpi_id, value) in &values {
            stmt.execute(rusqlite::params![kpi_id, value])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn set_kpi_active(&self, id: i64, active: bool) -> Result<bool> {
    self.set_active("kpis", "kpi_id", id, active).await
  }

  async fn delete_kpi(&self, id: i64) -> Result<bool> {
    self.soft_delete("kpis", "kpi_id", id).await
  }

  // ── Objective shares and results ──────────────────────────────────────────

  async fn replace_team_objectives(
    &self,
    team_ids: Vec<i64>,
    kpi_ids: Vec<i64>,
    rows: Vec<TeamObjectiveKpi>,
  ) -> Result<()> {
    let teams_json = encode_ids(&team_ids)?;
    let kpis_json  = encode_ids(&kpi_ids)?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
          "DELETE FROM team_objective_kpis
           WHERE team_id IN (SELECT value FROM json_each(?1))
             AND kpi_id  IN (SELECT value FROM json_each(?2))",
          rusqlite::params![teams_json, kpis_json],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO team_objective_kpis (team_id, kpi_id, value)
             VALUES (?1, ?2, ?3)",
          )?;
          for row in &rows {
            stmt.execute(rusqlite::params![row.team_id, row.kpi_id, row.value])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn team_objectives(&self, kpi_ids: Vec<i64>, team_ids: Vec<i64>) -> Result<Vec<TeamObjectiveKpi>> {
    let kpis_json  = encode_ids(&kpi_ids)?;
    let teams_json = encode_ids(&team_ids)?;

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT team_id, kpi_id, value FROM team_objective_kpis
             WHERE kpi_id  IN (SELECT value FROM json_each(?1))
               AND team_id IN (SELECT value FROM json_each(?2))
             ORDER BY team_id, kpi_id",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![kpis_json, teams_json], |r| {
              Ok(TeamObjectiveKpi {
                team_id: r.get(0)?,
                kpi_id:  r.get(1)?,
                value:   r.get(2)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn append_team_results(&self, rows: Vec<TeamResultKpi>) -> Result<()> {
    let encoded: Vec<(i64, i64, f64, String)> = rows
      .iter()
      .map(|r| (r.team_id, r.kpi_id, r.value, encode_dt(r.recorded_at)))
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO team_result_kpis (team_id, kpi_id, value, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for (team_id, kpi_id, value, at) in &encoded {
            stmt.execute(rusqlite::params![team_id, kpi_id, value, at])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn team_results(
    &self,
    kpi_ids: Vec<i64>,
    team_ids: Vec<i64>,
    window: TimeWindow,
  ) -> Result<Vec<TeamResultKpi>> {
    let kpis_json  = encode_ids(&kpi_ids)?;
    let teams_json = encode_ids(&team_ids)?;
    let start_str  = encode_dt(window.start);
    let end_str    = encode_dt(window.end);

    let raws: Vec<(i64, i64, f64, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT team_id, kpi_id, value, recorded_at FROM team_result_kpis
           WHERE kpi_id  IN (SELECT value FROM json_each(?1))
             AND team_id IN (SELECT value FROM json_each(?2))
             AND recorded_at >= ?3 AND recorded_at < ?4
           ORDER BY recorded_at, row_id",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![kpis_json, teams_json, start_str, end_str],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(team_id, kpi_id, value, at)| {
        Ok(TeamResultKpi { team_id, kpi_id, value, recorded_at: decode_dt(&at)? })
      })
      .collect()
  }

  // ── Links ─────────────────────────────────────────────────────────────────

  async fn replace_link(&self, link: ObjectiveResultLink) -> Result<()> {
    let at_str = encode_dt(now());
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
          "DELETE FROM objective_result_links WHERE result_id = ?1",
          rusqlite::params![link.result_id],
        )?;
        tx.execute(
          "INSERT INTO objective_result_links (result_id, objective_id, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![link.result_id, link.objective_id, at_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn links(&self, result_ids: Vec<i64>) -> Result<Vec<ObjectiveResultLink>> {
    let results_json = encode_ids(&result_ids)?;
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT objective_id, result_id FROM objective_result_links
             WHERE result_id IN (SELECT value FROM json_each(?1))
             ORDER BY result_id",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![results_json], |r| {
              Ok(ObjectiveResultLink { objective_id: r.get(0)?, result_id: r.get(1)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  // ── Administration ────────────────────────────────────────────────────────

  async fn overview(&self) -> Result<Overview> {
    let counts: [i64; 6] = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM live_activities),
             (SELECT COUNT(*) FROM live_kpis),
             (SELECT COUNT(*) FROM live_forms),
             (SELECT COUNT(*) FROM live_teams),
             (SELECT COUNT(*) FROM live_users WHERE profile != 'viewer'),
             (SELECT COUNT(DISTINCT session_id) FROM submissions)",
          [],
          |r| Ok([r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?]),
        )?)
      })
      .await?;

    let [activities, kpis, forms, teams, users, sessions] = counts.map(|c| c.max(0) as u64);
    Ok(Overview { activities, kpis, forms, teams, users, sessions })
  }
}
