use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::anyhow;
use sqlx::{MySql, Pool};
use std::sync::Arc;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub task_service: Arc<dyn TaskService>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        // A missing key must stop the process before anything is served.
        let signing_key = settings.auth.resolve_signing_key()?;
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(
            JwtConfig {
                issuer: settings.auth.issuer.clone(),
                audience: settings.auth.audience.clone(),
                access_ttl: settings.auth.access_ttl(),
                refresh_ttl: settings.auth.refresh_ttl(),
                signing_key,
            },
            clock.clone(),
        ));
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher {});

        let revocation_store: Option<Arc<dyn RevocationStore>> =
            match settings.auth.revocation.as_str() {
                "none" => None,
                "memory" => Some(Arc::new(MemoryRevocationStore::new(clock.clone()))),
                "redis" => {
                    let dsn = settings
                        .auth
                        .redis_dsn
                        .as_deref()
                        .ok_or_else(|| anyhow!("auth.redis_dsn is required for redis revocation"))?;
                    let redis_client = redis::Client::open(dsn)?;
                    let redis_manager = redis_client.get_connection_manager().await?;
                    Some(Arc::new(RedisRevocationStore::new(
                        redis_manager,
                        "tasklane:revoked",
                    )))
                }
                other => return Err(anyhow!("Unknown revocation backend: {}", other)),
            };

        let (user_repo, task_repo, pool): (Arc<dyn UserRepo>, Arc<dyn TaskRepo>, _) =
            match settings.storage.backend.as_str() {
                "memory" => (
                    Arc::new(MemoryUserRepo::new()),
                    Arc::new(MemoryTaskRepo::new()),
                    None,
                ),
                "mysql" => {
                    let dsn = settings
                        .storage
                        .mysql_dsn
                        .as_deref()
                        .ok_or_else(|| anyhow!("storage.mysql_dsn is required for mysql"))?;
                    let pool = Pool::<MySql>::connect(dsn).await?;
                    (
                        Arc::new(MySqlUserRepo::new(pool.clone())),
                        Arc::new(MySqlTaskRepo::new(pool.clone())),
                        Some(pool),
                    )
                }
                other => return Err(anyhow!("Unknown storage backend: {}", other)),
            };

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo,
            credential_hasher,
            token_codec,
            revocation_store,
            clock.clone(),
        ));
        let task_service: Arc<dyn TaskService> = Arc::new(RealTaskService::new(task_repo, clock));

        info!(
            storage = %settings.storage.backend,
            revocation = %settings.auth.revocation,
            "server started"
        );

        Ok(Self {
            auth_service,
            task_service,
            pool,
        })
    }

    /// Everything in memory, with a caller-chosen clock. Used by tests and demos.
    pub fn in_memory(jwt: JwtConfig, clock: Arc<dyn Clock>, revocation: bool) -> Self {
        let revocation_store: Option<Arc<dyn RevocationStore>> = if revocation {
            Some(Arc::new(MemoryRevocationStore::new(clock.clone())))
        } else {
            None
        };
        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            Arc::new(MemoryUserRepo::new()),
            Arc::new(Argon2PasswordHasher {}),
            Arc::new(JwtHs256Codec::new(jwt, clock.clone())),
            revocation_store,
            clock.clone(),
        ));
        let task_service: Arc<dyn TaskService> =
            Arc::new(RealTaskService::new(Arc::new(MemoryTaskRepo::new()), clock));

        Self {
            auth_service,
            task_service,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
