use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::database::models::person::PERSON_COLUMNS;
use crate::database::models::{Person, PersonWithPresence};
use crate::database::{is_unique_violation, DatabaseManager};
use crate::types::{CheckpointCategory, Gender, PersonType, Role};

/// Full registration from the staff app
#[derive(Debug, Clone, Default)]
pub struct NewPerson {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub person_type: PersonType,
    pub department: Option<String>,
    pub church: Option<String>,
    pub gender: Option<Gender>,
    pub marketing_source: Option<String>,
    pub age: Option<i32>,
    pub is_staff: bool,
}

/// Fast registration at the altar or the kids room
#[derive(Debug, Clone, Default)]
pub struct QuickRegistration {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub decision: Option<String>,
    pub department: Option<String>,
}

/// Fields the front desk completes later; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct PersonUpdate {
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub marketing_source: Option<String>,
    pub age: Option<i32>,
    pub church: Option<String>,
}

/// Store customer, matched by email
#[derive(Debug, Clone, Default)]
pub struct Buyer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub age: Option<i32>,
    pub church: Option<String>,
    pub gender: Option<Gender>,
}

pub struct PersonService {
    pool: PgPool,
}

impl PersonService {
    pub async fn new() -> ServiceResult<Self> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Staff account for a back-office login
    pub async fn find_staff_by_email(&self, email: &str) -> ServiceResult<Option<Person>> {
        let sql = format!(
            "SELECT {} FROM people WHERE lower(email) = lower($1) AND role = 'STAFF' LIMIT 1",
            PERSON_COLUMNS
        );
        let person = sqlx::query_as::<_, Person>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(person)
    }

    pub async fn find_by_email(&self, email: &str) -> ServiceResult<Option<Person>> {
        let sql = format!(
            "SELECT {} FROM people WHERE lower(email) = lower($1) LIMIT 1",
            PERSON_COLUMNS
        );
        let person = sqlx::query_as::<_, Person>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(person)
    }

    pub async fn find(&self, id: Uuid) -> ServiceResult<Option<Person>> {
        let sql = format!("SELECT {} FROM people WHERE id = $1", PERSON_COLUMNS);
        let person = sqlx::query_as::<_, Person>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(person)
    }

    pub async fn register(&self, new: NewPerson) -> ServiceResult<Person> {
        let role = if new.is_staff { Role::Staff } else { Role::Participant };
        let sql = format!(
            "INSERT INTO people (name, email, phone, age, type, role, department, church, gender, marketing_source) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            PERSON_COLUMNS
        );
        sqlx::query_as::<_, Person>(&sql)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.phone)
            .bind(new.age)
            .bind(new.person_type)
            .bind(role)
            .bind(&new.department)
            .bind(&new.church)
            .bind(new.gender)
            .bind(&new.marketing_source)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::Conflict("Email already registered".to_string())
                } else {
                    e.into()
                }
            })
    }

    /// Grant back-office access to an existing person
    pub async fn promote_staff(&self, email: &str) -> ServiceResult<Person> {
        let sql = format!(
            "UPDATE people SET role = 'STAFF', updated_at = now() WHERE lower(email) = lower($1) RETURNING {}",
            PERSON_COLUMNS
        );
        sqlx::query_as::<_, Person>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Person not found".to_string()))
    }

    /// Register (or refresh) a person and count them at their department's checkpoint
    pub async fn quick_register(&self, reg: QuickRegistration) -> ServiceResult<Person> {
        let mut tx = self.pool.begin().await?;

        let person = match &reg.email {
            Some(email) => {
                let sql = format!(
                    "INSERT INTO people (name, email, phone, age, type, marketing_source) \
                     VALUES ($1, $2, $3, $4, 'VISITOR', $5) \
                     ON CONFLICT ((lower(email))) DO UPDATE SET \
                       name = EXCLUDED.name, \
                       phone = EXCLUDED.phone, \
                       marketing_source = COALESCE($5, people.marketing_source), \
                       updated_at = now() \
                     RETURNING {}",
                    PERSON_COLUMNS
                );
                sqlx::query_as::<_, Person>(&sql)
                    .bind(&reg.name)
                    .bind(email)
                    .bind(&reg.phone)
                    .bind(reg.age)
                    .bind(&reg.decision)
                    .fetch_one(&mut *tx)
                    .await?
            }
            None => {
                let sql = format!(
                    "INSERT INTO people (name, phone, age, type, marketing_source) \
                     VALUES ($1, $2, $3, 'VISITOR', $4) RETURNING {}",
                    PERSON_COLUMNS
                );
                sqlx::query_as::<_, Person>(&sql)
                    .bind(&reg.name)
                    .bind(&reg.phone)
                    .bind(reg.age)
                    .bind(&reg.decision)
                    .fetch_one(&mut *tx)
                    .await?
            }
        };

        if let Some(department) = &reg.department {
            let category = CheckpointCategory::for_department(department);
            let checkpoint: Option<(Uuid,)> = sqlx::query_as(
                "SELECT id FROM checkpoints WHERE category = $1 ORDER BY created_at, name LIMIT 1",
            )
            .bind(category)
            .fetch_optional(&mut *tx)
            .await?;

            match checkpoint {
                Some((checkpoint_id,)) => {
                    sqlx::query("INSERT INTO movements (person_id, checkpoint_id) VALUES ($1, $2)")
                        .bind(person.id)
                        .bind(checkpoint_id)
                        .execute(&mut *tx)
                        .await?;
                }
                None => tracing::warn!("No {:?} checkpoint to record quick registration", category),
            }
        }

        tx.commit().await?;
        Ok(person)
    }

    /// Name or phone contains `q`, for the kids check-in
    pub async fn search(&self, q: &str) -> ServiceResult<Vec<Person>> {
        let sql = format!(
            "SELECT {} FROM people \
             WHERE name ILIKE '%' || $1 || '%' OR phone LIKE '%' || $1 || '%' \
             ORDER BY name LIMIT 5",
            PERSON_COLUMNS
        );
        let people = sqlx::query_as::<_, Person>(&sql)
            .bind(escape_like(q))
            .fetch_all(&self.pool)
            .await?;
        Ok(people)
    }

    /// Name search flagging who already has a movement in `[day_start, day_end)`
    pub async fn search_with_presence(
        &self,
        q: &str,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> ServiceResult<Vec<PersonWithPresence>> {
        let columns = PERSON_COLUMNS
            .split(", ")
            .map(|c| format!("p.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {}, EXISTS ( \
               SELECT 1 FROM movements m \
               WHERE m.person_id = p.id AND m.recorded_at >= $2 AND m.recorded_at < $3 \
             ) AS has_entered \
             FROM people p WHERE p.name ILIKE '%' || $1 || '%' \
             ORDER BY p.name LIMIT 10",
            columns
        );
        let people = sqlx::query_as::<_, PersonWithPresence>(&sql)
            .bind(escape_like(q))
            .bind(day_start)
            .bind(day_end)
            .fetch_all(&self.pool)
            .await?;
        Ok(people)
    }

    /// People the front desk still has to complete
    pub async fn incomplete(&self) -> ServiceResult<Vec<Person>> {
        let sql = format!(
            "SELECT {} FROM people \
             WHERE gender IS NULL OR phone IS NULL OR marketing_source IS NULL OR age IS NULL \
             ORDER BY name LIMIT 50",
            PERSON_COLUMNS
        );
        let people = sqlx::query_as::<_, Person>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(people)
    }

    pub async fn update(&self, id: Uuid, update: PersonUpdate) -> ServiceResult<Person> {
        let sql = format!(
            "UPDATE people SET \
               gender = COALESCE($2, gender), \
               phone = COALESCE($3, phone), \
               marketing_source = COALESCE($4, marketing_source), \
               age = COALESCE($5, age), \
               church = COALESCE($6, church), \
               updated_at = now() \
             WHERE id = $1 RETURNING {}",
            PERSON_COLUMNS
        );
        sqlx::query_as::<_, Person>(&sql)
            .bind(id)
            .bind(update.gender)
            .bind(&update.phone)
            .bind(&update.marketing_source)
            .bind(update.age)
            .bind(&update.church)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Person not found".to_string()))
    }

    /// Everyone, newest first, for the CSV report
    pub async fn list_for_export(&self) -> ServiceResult<Vec<Person>> {
        let sql = format!("SELECT {} FROM people ORDER BY created_at DESC", PERSON_COLUMNS);
        let people = sqlx::query_as::<_, Person>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(people)
    }

    /// Consolidation card filled in after an altar call
    pub async fn save_consolidation(
        &self,
        name: &str,
        phone: Option<&str>,
        decision: &str,
        observer: Option<&str>,
    ) -> ServiceResult<Person> {
        let sql = format!(
            "INSERT INTO people (name, phone, type, role, marketing_source, church, department) \
             VALUES ($1, $2, 'VISITOR', 'PARTICIPANT', $3, 'Consolidação', $4) RETURNING {}",
            PERSON_COLUMNS
        );
        let person = sqlx::query_as::<_, Person>(&sql)
            .bind(name)
            .bind(phone)
            .bind(format!("Decisão: {}", decision))
            .bind(observer)
            .fetch_one(&self.pool)
            .await?;
        Ok(person)
    }

    /// Insert or refresh a store customer by email; new buyers are visitors
    pub async fn upsert_buyer(&self, buyer: &Buyer) -> ServiceResult<Person> {
        let sql = format!(
            "INSERT INTO people (name, email, phone, age, church, gender, type, role) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'M'::gender), 'VISITOR', 'PARTICIPANT') \
             ON CONFLICT ((lower(email))) DO UPDATE SET \
               name = EXCLUDED.name, \
               phone = EXCLUDED.phone, \
               age = COALESCE($4, people.age), \
               church = COALESCE($5, people.church), \
               gender = COALESCE($6, people.gender), \
               updated_at = now() \
             RETURNING {}",
            PERSON_COLUMNS
        );
        let person = sqlx::query_as::<_, Person>(&sql)
            .bind(&buyer.name)
            .bind(&buyer.email)
            .bind(&buyer.phone)
            .bind(buyer.age)
            .bind(&buyer.church)
            .bind(buyer.gender)
            .fetch_one(&self.pool)
            .await?;
        Ok(person)
    }
}

/// Treat `%` and `_` in user input as literals
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like(" ana "), "ana");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
