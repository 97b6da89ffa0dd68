//! Profile repository implementation

use crate::error::{Error, Result};
use crate::models::{
    Credentials, DatedAge, Location, NationalId, PersonName, Pictures, Profile, ProfileId,
    Provenance,
};
use libsql::{params_from_iter, Connection, Row, Value};

/// Column order shared by inserts, updates and row parsing
const COLUMNS: [&str; 37] = [
    "id",
    "gender",
    "email",
    "phone",
    "cell",
    "nat",
    "name_title",
    "name_first",
    "name_last",
    "location_street_number",
    "location_street_name",
    "location_city",
    "location_state",
    "location_country",
    "location_postcode",
    "location_latitude",
    "location_longitude",
    "location_timezone_offset",
    "location_timezone_description",
    "dob_date",
    "dob_age",
    "registered_date",
    "registered_age",
    "login_uuid",
    "login_username",
    "login_password",
    "login_salt",
    "login_md5",
    "login_sha1",
    "login_sha256",
    "id_name",
    "id_value",
    "picture_large",
    "picture_medium",
    "picture_thumbnail",
    "created_at",
    "from_remote",
];

/// Columns a whole-record update may touch: everything but id, created_at, from_remote
const UPDATABLE: std::ops::Range<usize> = 1..35;

const RECENT_ORDER: &str = "ORDER BY created_at DESC, id ASC";
const NAME_ORDER: &str = "ORDER BY name_first ASC, name_last ASC, id ASC";
const LOCATION_ORDER: &str = "ORDER BY location_country ASC, location_city ASC, id ASC";

/// How an insert treats an identifier that is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Reject the row with [`Error::Conflict`]
    #[default]
    Abort,
    /// Overwrite the stored row (idempotent re-fetch)
    Replace,
}

/// Ordered read views over the profiles table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreView {
    /// Newest created first
    Recent,
    /// First name, then last name, ascending
    ByName,
    /// Country, then city, ascending
    ByLocation,
    /// Profiles whose first name, last name or email contain the text, ordered like `ByName`
    Search(String),
    /// Profiles of one provenance, newest first
    BySource(Provenance),
}

/// Trait for profile storage operations (async)
#[allow(async_fn_in_trait)]
pub trait ProfileRepository {
    /// Insert a profile, returning its identifier
    async fn insert(&self, profile: &Profile, policy: ConflictPolicy) -> Result<ProfileId>;

    /// Insert several profiles in one transaction.
    ///
    /// Under [`ConflictPolicy::Abort`] conflicting rows are skipped and the rest are
    /// written. Returns the identifiers actually written.
    async fn insert_many(
        &self,
        profiles: &[Profile],
        policy: ConflictPolicy,
    ) -> Result<Vec<ProfileId>>;

    /// Get a profile by ID
    async fn get(&self, id: &ProfileId) -> Result<Option<Profile>>;

    /// Replace every mutable field of a stored profile. Returns rows affected.
    async fn update(&self, profile: &Profile) -> Result<u64>;

    /// Update only email, phone and cell. Returns rows affected.
    async fn update_contact(
        &self,
        id: &ProfileId,
        email: &str,
        phone: &str,
        cell: &str,
    ) -> Result<u64>;

    /// Delete one profile. Returns rows affected.
    async fn delete(&self, id: &ProfileId) -> Result<u64>;

    /// Delete every profile. Returns rows affected.
    async fn delete_all(&self) -> Result<u64>;

    /// Delete all profiles of one provenance. Returns rows affected.
    async fn delete_by_provenance(&self, provenance: Provenance) -> Result<u64>;

    /// Count stored profiles
    async fn count(&self) -> Result<u64>;

    /// Read a full ordered snapshot of a view
    async fn list(&self, view: &StoreView) -> Result<Vec<Profile>>;
}

/// libSQL implementation of `ProfileRepository`
pub struct LibSqlProfileRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlProfileRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn insert_sql(policy: ConflictPolicy) -> String {
        let placeholders = vec!["?"; COLUMNS.len()].join(", ");
        match policy {
            ConflictPolicy::Abort => format!(
                "INSERT INTO profiles ({}) VALUES ({placeholders}) ON CONFLICT(id) DO NOTHING",
                COLUMNS.join(", ")
            ),
            ConflictPolicy::Replace => format!(
                "INSERT OR REPLACE INTO profiles ({}) VALUES ({placeholders})",
                COLUMNS.join(", ")
            ),
        }
    }

    fn select_sql(tail: &str) -> String {
        format!("SELECT {} FROM profiles {tail}", COLUMNS.join(", "))
    }

    /// Write one row; `false` means the id was already taken under `Abort`
    async fn insert_row(&self, sql: &str, profile: &Profile) -> Result<bool> {
        let rows = self
            .conn
            .execute(sql, params_from_iter(profile_values(profile)))
            .await?;
        Ok(rows > 0)
    }

    async fn query_profiles(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Profile>> {
        let mut rows = self.conn.query(sql, params_from_iter(params)).await?;
        let mut profiles = Vec::new();
        while let Some(row) = rows.next().await? {
            profiles.push(parse_profile(&row)?);
        }
        Ok(profiles)
    }
}

impl ProfileRepository for LibSqlProfileRepository<'_> {
    async fn insert(&self, profile: &Profile, policy: ConflictPolicy) -> Result<ProfileId> {
        let sql = Self::insert_sql(policy);
        if self.insert_row(&sql, profile).await? {
            Ok(profile.id.clone())
        } else {
            Err(Error::Conflict(profile.id.to_string()))
        }
    }

    async fn insert_many(
        &self,
        profiles: &[Profile],
        policy: ConflictPolicy,
    ) -> Result<Vec<ProfileId>> {
        let sql = Self::insert_sql(policy);
        let mut written = Vec::with_capacity(profiles.len());

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        for profile in profiles {
            match self.insert_row(&sql, profile).await {
                Ok(true) => written.push(profile.id.clone()),
                Ok(false) => {
                    tracing::debug!("Skipping existing profile {}", profile.id);
                }
                Err(e) => {
                    self.conn.execute("ROLLBACK", ()).await.ok();
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        Ok(written)
    }

    async fn get(&self, id: &ProfileId) -> Result<Option<Profile>> {
        let sql = Self::select_sql("WHERE id = ?");
        let mut profiles = self
            .query_profiles(&sql, vec![Value::Text(id.to_string())])
            .await?;
        Ok(profiles.pop())
    }

    async fn update(&self, profile: &Profile) -> Result<u64> {
        let assignments = COLUMNS[UPDATABLE]
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE profiles SET {assignments} WHERE id = ?");

        let mut values = profile_values(profile);
        let mut params: Vec<Value> = values.drain(UPDATABLE).collect();
        params.push(Value::Text(profile.id.to_string()));

        Ok(self.conn.execute(&sql, params_from_iter(params)).await?)
    }

    async fn update_contact(
        &self,
        id: &ProfileId,
        email: &str,
        phone: &str,
        cell: &str,
    ) -> Result<u64> {
        let rows = self
            .conn
            .execute(
                "UPDATE profiles SET email = ?, phone = ?, cell = ? WHERE id = ?",
                params_from_iter([
                    Value::Text(email.to_string()),
                    Value::Text(phone.to_string()),
                    Value::Text(cell.to_string()),
                    Value::Text(id.to_string()),
                ]),
            )
            .await?;
        Ok(rows)
    }

    async fn delete(&self, id: &ProfileId) -> Result<u64> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM profiles WHERE id = ?",
                params_from_iter([Value::Text(id.to_string())]),
            )
            .await?;
        Ok(rows)
    }

    async fn delete_all(&self) -> Result<u64> {
        Ok(self.conn.execute("DELETE FROM profiles", ()).await?)
    }

    async fn delete_by_provenance(&self, provenance: Provenance) -> Result<u64> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM profiles WHERE from_remote = ?",
                params_from_iter([Value::Integer(i64::from(provenance.is_remote()))]),
            )
            .await?;
        Ok(rows)
    }

    async fn count(&self) -> Result<u64> {
        let mut rows = self.conn.query("SELECT COUNT(*) FROM profiles", ()).await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        u64::try_from(count).map_err(|_| Error::Database(format!("invalid row count {count}")))
    }

    async fn list(&self, view: &StoreView) -> Result<Vec<Profile>> {
        match view {
            StoreView::Recent => {
                let sql = Self::select_sql(RECENT_ORDER);
                self.query_profiles(&sql, Vec::new()).await
            }
            StoreView::ByName => {
                let sql = Self::select_sql(NAME_ORDER);
                self.query_profiles(&sql, Vec::new()).await
            }
            StoreView::ByLocation => {
                let sql = Self::select_sql(LOCATION_ORDER);
                self.query_profiles(&sql, Vec::new()).await
            }
            StoreView::Search(query) => {
                // LIKE folds ASCII only and treats % and _ as wildcards, so match in Rust
                let sql = Self::select_sql(NAME_ORDER);
                let mut profiles = self.query_profiles(&sql, Vec::new()).await?;
                profiles.retain(|profile| profile.matches_search(query));
                Ok(profiles)
            }
            StoreView::BySource(provenance) => {
                let sql = Self::select_sql(&format!("WHERE from_remote = ? {RECENT_ORDER}"));
                self.query_profiles(
                    &sql,
                    vec![Value::Integer(i64::from(provenance.is_remote()))],
                )
                .await
            }
        }
    }
}

/// Flatten a profile into column values, in `COLUMNS` order
fn profile_values(profile: &Profile) -> Vec<Value> {
    let text = |value: &str| Value::Text(value.to_string());
    let optional = |value: &Option<String>| value.clone().map_or(Value::Null, Value::Text);

    vec![
        text(profile.id.as_str()),
        text(&profile.gender),
        text(&profile.email),
        text(&profile.phone),
        text(&profile.cell),
        text(&profile.nationality),
        text(&profile.name.title),
        text(&profile.name.first),
        text(&profile.name.last),
        Value::Integer(profile.location.street_number),
        text(&profile.location.street_name),
        text(&profile.location.city),
        text(&profile.location.state),
        text(&profile.location.country),
        text(&profile.location.postcode),
        text(&profile.location.latitude),
        text(&profile.location.longitude),
        text(&profile.location.timezone_offset),
        text(&profile.location.timezone_description),
        text(&profile.date_of_birth.date),
        Value::Integer(profile.date_of_birth.age),
        text(&profile.registered.date),
        Value::Integer(profile.registered.age),
        text(&profile.login.uuid),
        text(&profile.login.username),
        text(&profile.login.password),
        text(&profile.login.salt),
        text(&profile.login.md5),
        text(&profile.login.sha1),
        text(&profile.login.sha256),
        optional(&profile.national_id.name),
        optional(&profile.national_id.value),
        text(&profile.picture.large),
        text(&profile.picture.medium),
        text(&profile.picture.thumbnail),
        Value::Integer(profile.created_at),
        Value::Integer(i64::from(profile.provenance.is_remote())),
    ]
}

/// Parse a profile from a database row selected with `COLUMNS`
fn parse_profile(row: &Row) -> Result<Profile> {
    let text = |idx: i32| row.get::<String>(idx);
    let optional = |idx: i32| -> Result<Option<String>> {
        match row.get_value(idx)? {
            Value::Null => Ok(None),
            Value::Text(value) => Ok(Some(value)),
            other => Err(Error::Database(format!(
                "unexpected value in column {idx}: {other:?}"
            ))),
        }
    };

    let id: String = text(0)?;
    Ok(Profile {
        id: id.parse()?,
        gender: text(1)?,
        email: text(2)?,
        phone: text(3)?,
        cell: text(4)?,
        nationality: text(5)?,
        name: PersonName {
            title: text(6)?,
            first: text(7)?,
            last: text(8)?,
        },
        location: Location {
            street_number: row.get(9)?,
            street_name: text(10)?,
            city: text(11)?,
            state: text(12)?,
            country: text(13)?,
            postcode: text(14)?,
            latitude: text(15)?,
            longitude: text(16)?,
            timezone_offset: text(17)?,
            timezone_description: text(18)?,
        },
        date_of_birth: DatedAge {
            date: text(19)?,
            age: row.get(20)?,
        },
        registered: DatedAge {
            date: text(21)?,
            age: row.get(22)?,
        },
        login: Credentials {
            uuid: text(23)?,
            username: text(24)?,
            password: text(25)?,
            salt: text(26)?,
            md5: text(27)?,
            sha1: text(28)?,
            sha256: text(29)?,
        },
        national_id: NationalId {
            name: optional(30)?,
            value: optional(31)?,
        },
        picture: Pictures {
            large: text(32)?,
            medium: text(33)?,
            thumbnail: text(34)?,
        },
        created_at: row.get(35)?,
        provenance: Provenance::from_remote_flag(row.get::<i64>(36)? != 0),
    })
}
