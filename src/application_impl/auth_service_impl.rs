use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let argon2 = argon2::Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!("verify error: {e}"))),
        }
    }
}

pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

impl JwtConfig {
    /// Default issuer/audience and TTLs (15 minutes / 7 days) around a key.
    pub fn with_key(signing_key: impl Into<Vec<u8>>) -> Self {
        JwtConfig {
            issuer: "tasklane.auth".to_string(),
            audience: "tasklane-client".to_string(),
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
            signing_key: signing_key.into(),
        }
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user id as string
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String,
    typ: TokenKind,
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
    clock: Arc<dyn Clock>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let encoding_key = EncodingKey::from_secret(&cfg.signing_key);
        let decoding_key = DecodingKey::from_secret(&cfg.signing_key);
        JwtHs256Codec {
            cfg,
            clock,
            encoding_key,
            decoding_key,
        }
    }

    #[inline]
    fn gen_jti() -> String {
        Uuid::new_v4().to_string()
    }

    #[inline]
    fn parse_user_id(sub: &str) -> Result<UserId, AuthError> {
        sub.parse::<UserId>().map_err(|_| AuthError::InvalidToken)
    }

    fn encode(&self, uid: UserId, kind: TokenKind) -> Result<(String, DateTime<Utc>), AuthError> {
        let ttl = match kind {
            TokenKind::Access => self.cfg.access_ttl,
            TokenKind::Refresh => self.cfg.refresh_ttl,
        };
        let iat_dt = self.clock.now();
        let exp_dt = iat_dt + ttl;
        let claims = Claims {
            sub: uid.to_string(),
            exp: exp_dt.timestamp(),
            iat: iat_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            jti: Self::gen_jti(),
            typ: kind,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        let exp_dt = DateTime::from_timestamp(claims.exp, 0).unwrap_or(exp_dt);
        Ok((token, exp_dt))
    }

    /// Signature, issuer and audience are checked by `jsonwebtoken`; expiry
    /// is checked here against the injected clock with no leeway.
    fn decode(&self, token: &str, kind: TokenKind) -> Result<TokenVerifyResult, AuthError> {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = false;
        v.leeway = 0;
        v.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        v.set_audience(&[self.cfg.audience.clone()]);
        v.set_issuer(&[self.cfg.issuer.clone()]);
        let claims = decode::<Claims>(token, &self.decoding_key, &v)
            .map_err(|_| AuthError::InvalidToken)?
            .claims;

        if claims.typ != kind {
            return Err(AuthError::InvalidToken);
        }
        if self.clock.now().timestamp() >= claims.exp {
            return Err(AuthError::ExpiredToken);
        }

        let user_id = Self::parse_user_id(&claims.sub)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::InvalidToken)?;
        Ok(TokenVerifyResult {
            user_id,
            jti: claims.jti,
            expires_at,
        })
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access_token(
        &self,
        user: UserId,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = self.encode(user, TokenKind::Access)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn issue_refresh_token(
        &self,
        user: UserId,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = self.encode(user, TokenKind::Refresh)?;
        Ok((RefreshToken(token), exp_dt))
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        self.decode(&token.0, TokenKind::Access)
    }

    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        self.decode(&token.0, TokenKind::Refresh)
    }
}

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    revocation_store: Option<Arc<dyn RevocationStore>>,
    clock: Arc<dyn Clock>,
    min_password_len: usize,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        revocation_store: Option<Arc<dyn RevocationStore>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_codec,
            revocation_store,
            clock,
            min_password_len: 6,
        }
    }

    fn validate_register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let valid_email = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !email.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !valid_email {
            return Err(AuthError::Validation("invalid email".to_string()));
        }
        if password.chars().count() < self.min_password_len {
            return Err(AuthError::Validation("password too short".to_string()));
        }
        Ok(())
    }

    fn ttl_secs(&self, until: DateTime<Utc>) -> u64 {
        let secs = (until - self.clock.now()).num_seconds();
        if secs <= 0 { 1 } else { secs as u64 }
    }

    async fn check_not_revoked(&self, jti: &str) -> Result<(), AuthError> {
        if let Some(store) = &self.revocation_store {
            if store.is_revoked(jti).await? {
                return Err(AuthError::RefreshRejected);
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, request: RegisterInput) -> Result<UserId, AuthError> {
        let RegisterInput {
            email,
            password,
            name,
        } = request;

        self.validate_register(&email, &password)?;

        if self.user_repo.email_exists(&email).await? {
            return Err(AuthError::UserExists);
        }

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        let user = User {
            id: UserId::new(),
            email,
            name,
            password_hash,
            created_at: self.clock.now(),
        };
        self.user_repo.create(&user).await?;

        info!(user_id = %user.id, "user registered");
        Ok(user.id)
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { email, password } = request;

        let user = self
            .user_repo
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &user.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.token_codec.issue(user.id).await?;
        debug!(user_id = %user.id, "issued token pair");

        Ok(LoginResult {
            user: PublicUser::from(&user),
            tokens,
        })
    }

    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Unauthenticated);
        }
        let verify_result = self
            .token_codec
            .verify_access_token(&AccessToken(token.to_string()))
            .await?;
        Ok(verify_result.user_id)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResult, AuthError> {
        let verify_result = self
            .token_codec
            .verify_refresh_token(&RefreshToken(refresh_token.to_string()))
            .await
            .map_err(|e| {
                debug!("refresh token rejected: {}", e);
                AuthError::RefreshRejected
            })?;

        self.check_not_revoked(&verify_result.jti).await?;

        let (access_token, access_token_expires_at) = self
            .token_codec
            .issue_access_token(verify_result.user_id)
            .await?;

        Ok(RefreshResult {
            user_id: verify_result.user_id,
            access_token,
            access_token_expires_at,
        })
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let Some(store) = &self.revocation_store else {
            return Ok(());
        };
        // Tokens that no longer verify cannot be used anyway.
        let Ok(verify_result) = self
            .token_codec
            .verify_refresh_token(&RefreshToken(refresh_token.to_string()))
            .await
        else {
            return Ok(());
        };

        let ttl_secs = self.ttl_secs(verify_result.expires_at);
        store
            .revoke_refresh_jti(&verify_result.jti, ttl_secs)
            .await?;
        info!(user_id = %verify_result.user_id, "refresh token revoked");
        Ok(())
    }
}
