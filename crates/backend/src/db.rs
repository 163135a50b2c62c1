use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager, ManagerConfig},
    AsyncPgConnection, RunQueryDsl,
};
use shared_types::{ProviderProfile, User};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewSession, NewUser};

pub type DbPool = Pool<AsyncPgConnection>;

const SCHEMA_SQL: &str =
    include_str!("../migrations/2024-06-01-000000_create_users_and_sessions/up.sql");

async fn establish_tls_connection(config: String) -> diesel::ConnectionResult<AsyncPgConnection> {
    // Set up rustls TLS configuration
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

    let (client, connection) = tokio_postgres::connect(&config, tls)
        .await
        .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    AsyncPgConnection::try_from(client).await
}

/// Whether the connection string asks for an encrypted connection.
fn wants_tls(database_url: &str) -> bool {
    database_url.contains("sslmode=require") || database_url.contains("sslmode=verify-full")
}

pub fn establish_connection_pool(database_url: &str, max_size: usize) -> anyhow::Result<DbPool> {
    let config = if wants_tls(database_url) {
        let mut manager_config = ManagerConfig::default();
        manager_config.custom_setup =
            Box::new(|url| Box::pin(establish_tls_connection(url.to_string())));
        AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
            database_url,
            manager_config,
        )
    } else {
        AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url)
    };

    let pool = Pool::builder(config).max_size(max_size).build()?;

    Ok(pool)
}

/// Create the `users` and `sessions` tables if they do not exist yet.
pub async fn ensure_schema(pool: &DbPool) -> Result<(), StoreError> {
    let mut conn = pool.get().await?;
    apply_schema(&mut conn).await
}

async fn apply_schema(conn: &mut AsyncPgConnection) -> Result<(), StoreError> {
    for statement in SCHEMA_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        diesel::sql_query(statement).execute(conn).await?;
    }

    Ok(())
}

// User database operations
pub mod users {
    use super::*;

    pub async fn get_by_id(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Option<User>, StoreError> {
        use crate::schema::users::dsl::*;

        let user = users
            .filter(id.eq(user_id))
            .first::<User>(conn)
            .await
            .optional()?;

        Ok(user)
    }

    pub async fn get_by_provider_id(
        conn: &mut AsyncPgConnection,
        provider: &str,
    ) -> Result<Option<User>, StoreError> {
        use crate::schema::users::dsl::*;

        let user = users
            .filter(provider_id.eq(provider))
            .first::<User>(conn)
            .await
            .optional()?;

        Ok(user)
    }

    /// Insert a user for `profile` unless one with the same provider id
    /// already exists. Returns the stored row and whether it was inserted.
    ///
    /// Relies on the UNIQUE constraint on `provider_id`, so two concurrent
    /// first logins end up with the same row.
    pub async fn insert_if_absent(
        conn: &mut AsyncPgConnection,
        profile: &ProviderProfile,
    ) -> Result<(User, bool), StoreError> {
        use crate::schema::users::dsl::*;

        let inserted = diesel::insert_into(users)
            .values(NewUser::from(profile))
            .on_conflict(provider_id)
            .do_nothing()
            .get_result::<User>(conn)
            .await
            .optional()?;

        if let Some(user) = inserted {
            return Ok((user, true));
        }

        let existing = users
            .filter(provider_id.eq(&profile.provider_id))
            .first::<User>(conn)
            .await?;

        Ok((existing, false))
    }
}

// Session database operations
pub mod sessions {
    use super::*;

    pub async fn create(
        conn: &mut AsyncPgConnection,
        session_id: &str,
        owner: Uuid,
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        use crate::schema::sessions::dsl::*;

        diesel::insert_into(sessions)
            .values(NewSession {
                id: session_id,
                user_id: owner,
                expires_at: expiry,
            })
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Look up the user id of an unexpired session.
    pub async fn get_user_id(
        conn: &mut AsyncPgConnection,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, StoreError> {
        use crate::schema::sessions::dsl::*;

        let owner = sessions
            .filter(id.eq(session_id))
            .filter(expires_at.gt(now))
            .select(user_id)
            .first::<Uuid>(conn)
            .await
            .optional()?;

        Ok(owner)
    }

    pub async fn delete(conn: &mut AsyncPgConnection, session_id: &str) -> Result<(), StoreError> {
        use crate::schema::sessions::dsl::*;

        diesel::delete(sessions.filter(id.eq(session_id)))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn delete_expired(
        conn: &mut AsyncPgConnection,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        use crate::schema::sessions::dsl::*;

        let removed = diesel::delete(sessions.filter(expires_at.le(now)))
            .execute(conn)
            .await?;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_tls() {
        assert!(wants_tls("postgres://u:p@db.example.com/app?sslmode=require"));
        assert!(!wants_tls("postgres://localhost/app"));
    }

    #[test]
    fn test_schema_statements() {
        let statements: Vec<_> = SCHEMA_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("provider_id VARCHAR NOT NULL UNIQUE"));
        assert!(statements[1].contains("ON DELETE CASCADE"));
    }

    /// Needs a scratch PostgreSQL database:
    /// `DATABASE_URL=postgres://... cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_concurrent_insert_if_absent_converges() {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = establish_connection_pool(&database_url, 4).unwrap();
        ensure_schema(&pool).await.unwrap();

        let profile = ProviderProfile {
            provider_id: format!("g-{}", Uuid::new_v4()),
            display_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            image_url: None,
        };

        let insert = |pool: DbPool, profile: ProviderProfile| async move {
            let mut conn = pool.get().await.unwrap();
            users::insert_if_absent(&mut conn, &profile).await.unwrap()
        };
        let (first, second) = tokio::join!(
            insert(pool.clone(), profile.clone()),
            insert(pool.clone(), profile.clone()),
        );

        assert_eq!(first.0, second.0);
        assert!(first.1 ^ second.1, "exactly one call should insert");

        let mut conn = pool.get().await.unwrap();
        let (again, created) = users::insert_if_absent(&mut conn, &profile).await.unwrap();
        assert_eq!(again, first.0);
        assert!(!created);

        {
            use crate::schema::users::dsl::*;
            diesel::delete(users.filter(provider_id.eq(&profile.provider_id)))
                .execute(&mut conn)
                .await
                .unwrap();
        }
    }
}
