// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{
        Actor, AuthResponse, Claims, LoginPayload, Profile, RegisterRetailerPayload,
        RegisterWholesalerPayload, Role,
    },
    services::gst::GstService,
};

/// Hash bcrypt fora do runtime assíncrono.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password_clone = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password_clone = password.to_owned();
    let password_hash_clone = password_hash.to_owned();

    // Executa a verificação em um thread separado
    let is_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(is_valid)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    gst_service: GstService,
    jwt_secret: String,
    token_ttl_days: i64,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        gst_service: GstService,
        jwt_secret: String,
        token_ttl_days: i64,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            gst_service,
            jwt_secret,
            token_ttl_days,
            pool,
        }
    }

    /// Verifica o GSTIN (quando informado). Só uma rejeição explícita bloqueia;
    /// indisponibilidade vira um aviso.
    async fn check_gst(&self, gst_number: Option<&str>) -> Result<Option<String>, AppError> {
        let Some(gst) = gst_number else {
            return Ok(None);
        };
        let verification = self.gst_service.verify(gst).await;
        if !verification.is_valid {
            return Err(AppError::InvalidGstNumber);
        }
        Ok(verification.message)
    }

    pub async fn register_wholesaler(&self, payload: &RegisterWholesalerPayload) -> Result<AuthResponse, AppError> {
        let advisory = self.check_gst(payload.gst_number.as_deref()).await?;
        let hashed_password = hash_password(&payload.password).await?;

        let wholesaler = self
            .user_repo
            .create_wholesaler(&self.pool, payload, &hashed_password)
            .await?;

        tracing::info!("🏭 Atacadista {} cadastrado.", wholesaler.id);
        Ok(AuthResponse {
            token: self.create_token(wholesaler.id, Role::Wholesaler)?,
            role: Role::Wholesaler,
            advisory,
        })
    }

    pub async fn register_retailer(&self, payload: &RegisterRetailerPayload) -> Result<AuthResponse, AppError> {
        let advisory = self.check_gst(payload.gst_number.as_deref()).await?;
        let hashed_password = hash_password(&payload.password).await?;

        let retailer = self
            .user_repo
            .create_retailer(&self.pool, payload, &hashed_password)
            .await?;

        tracing::info!("🏪 Varejista {} cadastrado.", retailer.id);
        Ok(AuthResponse {
            token: self.create_token(retailer.id, Role::Retailer)?,
            role: Role::Retailer,
            advisory,
        })
    }

    pub async fn login(&self, payload: &LoginPayload) -> Result<AuthResponse, AppError> {
        // (id, hash, ativo) da tabela certa para o papel
        let identity = match payload.role {
            Role::Wholesaler => self
                .user_repo
                .find_wholesaler_by_email(&payload.email)
                .await?
                .map(|w| (w.id, w.password_hash, w.is_active)),
            Role::Retailer => self
                .user_repo
                .find_retailer_by_email(&payload.email)
                .await?
                .map(|r| (r.id, r.password_hash, r.is_active)),
            Role::Salesman => self
                .user_repo
                .find_salesman_by_email(&payload.email)
                .await?
                .map(|s| (s.id, s.password_hash, s.is_active)),
        };

        let (id, password_hash, is_active) = identity.ok_or(AppError::InvalidCredentials)?;

        if !verify_password(&payload.password, &password_hash).await? || !is_active {
            return Err(AppError::InvalidCredentials);
        }

        Ok(AuthResponse {
            token: self.create_token(id, payload.role)?,
            role: payload.role,
            advisory: None,
        })
    }

    /// Valida o JWT e resolve o `Actor` efetivo (uma vez por requisição).
    pub async fn resolve_actor(&self, token: &str) -> Result<Actor, AppError> {
        let claims = self.decode_token(token)?;
        let pool = &self.pool;

        let actor = match claims.role {
            Role::Wholesaler => self
                .user_repo
                .find_wholesaler_by_id(pool, claims.sub)
                .await?
                .filter(|w| w.is_active)
                .map(|w| Actor::Wholesaler { id: w.id }),
            Role::Retailer => self
                .user_repo
                .find_retailer_by_id(pool, claims.sub)
                .await?
                .filter(|r| r.is_active)
                .map(|r| Actor::Retailer { id: r.id }),
            Role::Salesman => self
                .user_repo
                .find_salesman_by_id(pool, claims.sub)
                .await?
                .filter(|s| s.is_active)
                .map(|s| Actor::Salesman {
                    id: s.id,
                    delegate_of: s.wholesaler_id,
                    permissions: s.permissions,
                }),
        };

        actor.ok_or(AppError::InvalidToken)
    }

    pub async fn profile(&self, actor: &Actor) -> Result<Profile, AppError> {
        let pool = &self.pool;
        let profile = match actor {
            Actor::Wholesaler { id } => self
                .user_repo
                .find_wholesaler_by_id(pool, *id)
                .await?
                .map(Profile::Wholesaler),
            Actor::Retailer { id } => self
                .user_repo
                .find_retailer_by_id(pool, *id)
                .await?
                .map(Profile::Retailer),
            Actor::Salesman { id, .. } => self
                .user_repo
                .find_salesman_by_id(pool, *id)
                .await?
                .map(Profile::Salesman),
        };
        profile.ok_or(AppError::NotFound("User"))
    }

    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    pub fn create_token(&self, id: Uuid, role: Role) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(self.token_ttl_days);

        let claims = Claims {
            sub: id,
            role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gst::GstService;
    use sqlx::postgres::PgPoolOptions;

    fn service(secret: &str) -> AuthService {
        // Pool preguiçosa: nenhum teste aqui toca o banco.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        AuthService::new(
            UserRepository::new(pool.clone()),
            GstService::new(None),
            secret.into(),
            7,
            pool,
        )
    }

    #[tokio::test]
    async fn token_round_trip_keeps_role_and_subject() {
        let auth = service("segredo");
        let id = Uuid::new_v4();
        let token = auth.create_token(id, Role::Salesman).unwrap();
        let claims = auth.decode_token(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Salesman);
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_rejected() {
        let token = service("a").create_token(Uuid::new_v4(), Role::Retailer).unwrap();
        assert!(matches!(
            service("b").decode_token(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hashed = hash_password("senha-forte").await.unwrap();
        assert!(verify_password("senha-forte", &hashed).await.unwrap());
        assert!(!verify_password("outra", &hashed).await.unwrap());
    }
}
