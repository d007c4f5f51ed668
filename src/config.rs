use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

use crate::imports::RowPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// Settings for CSV uploads.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub campaign_policy: RowPolicy,
    pub invoice_policy: RowPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub imports: ImportConfig,
    /// Footer text stamped on every invoice.
    pub invoice_contact_info: String,
}

pub const DEFAULT_CONTACT_INFO: &str = "Contact us at support@netwit.ca";

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "campaign-desk".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "campaign-desk-users".into()),
        };
        let imports = ImportConfig {
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(10 * 1024 * 1024),
            campaign_policy: policy_from_env("CAMPAIGN_IMPORT_POLICY", RowPolicy::Abort)?,
            invoice_policy: policy_from_env("INVOICE_IMPORT_POLICY", RowPolicy::Skip)?,
        };
        let invoice_contact_info = std::env::var("INVOICE_CONTACT_INFO")
            .unwrap_or_else(|_| DEFAULT_CONTACT_INFO.into());
        Ok(Self {
            database_url,
            jwt,
            imports,
            invoice_contact_info,
        })
    }
}

fn policy_from_env(key: &str, default: RowPolicy) -> anyhow::Result<RowPolicy> {
    match std::env::var(key) {
        Ok(v) => v
            .parse::<RowPolicy>()
            .map_err(|e| anyhow::anyhow!("{key}: {e}")),
        Err(_) => Ok(default),
    }
}
