// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{CartRepository, CatalogRepository, ConnectionRepository, OrderRepository, UserRepository},
    services::{
        account_service::AccountService,
        auth::AuthService,
        cart_service::CartService,
        catalog_service::CatalogService,
        connection_service::ConnectionService,
        gst::{GstService, GstVerifier, HttpGstVerifier},
        order_service::OrderService,
        visibility::Visibility,
    },
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub database_max_connections: u32,
    pub jwt_ttl_days: i64,
    pub gst_api_url: Option<String>,
    pub gst_api_key: Option<String>,
    pub gst_timeout: Duration,
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{key} tem um valor inválido: '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL deve ser definida"))?;
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET deve ser definido"))?;

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_ttl_days: parsed_or("JWT_TTL_DAYS", 7)?,
            gst_api_url: env::var("GST_API_URL").ok().filter(|v| !v.is_empty()),
            gst_api_key: env::var("GST_API_KEY").ok().filter(|v| !v.is_empty()),
            gst_timeout: Duration::from_secs(parsed_or("GST_TIMEOUT_SECS", 5)?),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: AppConfig,
    pub auth_service: AuthService,
    pub account_service: AccountService,
    pub connection_service: ConnectionService,
    pub catalog_service: CatalogService,
    pub cart_service: CartService,
    pub order_service: OrderService,
    pub gst_service: GstService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::build(db_pool, config)
    }

    /// Monta o gráfico de dependências sobre um pool já aberto.
    pub fn build(db_pool: PgPool, config: AppConfig) -> anyhow::Result<Self> {
        let verifier: Option<Arc<dyn GstVerifier>> = match &config.gst_api_url {
            Some(url) => Some(Arc::new(HttpGstVerifier::new(
                url.clone(),
                config.gst_api_key.clone(),
                config.gst_timeout,
            )?)),
            None => {
                tracing::warn!("⚠️ GST_API_URL não definida: verificação de GST em modo manual.");
                None
            }
        };
        let gst_service = GstService::new(verifier);

        // --- Repositórios ---
        let user_repo = UserRepository::new(db_pool.clone());
        let connection_repo = ConnectionRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let cart_repo = CartRepository::new(db_pool.clone());
        let order_repo = OrderRepository::new(db_pool.clone());

        // --- Serviços ---
        let visibility = Visibility::new(connection_repo.clone(), db_pool.clone());
        let auth_service = AuthService::new(
            user_repo.clone(),
            gst_service.clone(),
            config.jwt_secret.clone(),
            config.jwt_ttl_days,
            db_pool.clone(),
        );
        let account_service = AccountService::new(user_repo.clone(), connection_repo.clone(), db_pool.clone());
        let connection_service = ConnectionService::new(connection_repo, user_repo, db_pool.clone());
        let catalog_service = CatalogService::new(catalog_repo.clone(), visibility.clone(), db_pool.clone());
        let cart_service = CartService::new(cart_repo.clone(), catalog_repo.clone(), visibility.clone());
        let order_service = OrderService::new(
            order_repo,
            cart_repo,
            catalog_repo,
            cart_service.clone(),
            visibility,
            db_pool.clone(),
        );

        Ok(Self {
            db_pool,
            config,
            auth_service,
            account_service,
            connection_service,
            catalog_service,
            cart_service,
            order_service,
            gst_service,
        })
    }
}
