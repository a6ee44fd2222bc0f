use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{Context, Result, bail};
use pn_core::RecipientId;

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Clone)]
pub struct RelayConfig {
    pub discord_token: String,
    pub recipient: RecipientId,
    pub webhook_secret: Option<String>,
    pub addr: SocketAddr,
    pub discord_api_base: String,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = non_empty("DISCORD_TOKEN").context("DISCORD_TOKEN is required")?;
        let recipient = non_empty("DISCORD_USER_ID").context("DISCORD_USER_ID is required")?;
        let recipient = recipient.trim();
        if !recipient.chars().all(|c| c.is_ascii_digit()) {
            bail!("DISCORD_USER_ID must be a numeric Discord user id, got {recipient:?}");
        }

        let port = non_empty("PORT")
            .map(|raw| {
                raw.trim()
                    .parse::<u16>()
                    .with_context(|| format!("invalid PORT {raw:?}"))
            })
            .transpose()?
            .unwrap_or(DEFAULT_PORT);
        let ip = non_empty("BIND_ADDR")
            .map(|raw| {
                raw.trim()
                    .parse::<IpAddr>()
                    .with_context(|| format!("invalid BIND_ADDR {raw:?}"))
            })
            .transpose()?
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        Ok(Self {
            discord_token,
            recipient: RecipientId::new(recipient),
            webhook_secret: non_empty("GITHUB_SECRET"),
            addr: SocketAddr::new(ip, port),
            discord_api_base: non_empty("DISCORD_API_BASE")
                .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string()),
        })
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("discord_token", &"<redacted>")
            .field("recipient", &self.recipient)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("addr", &self.addr)
            .field("discord_api_base", &self.discord_api_base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<RelayConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RelayConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = load(&[("DISCORD_TOKEN", "tok"), ("DISCORD_USER_ID", "1234")]).unwrap();
        assert_eq!(cfg.recipient.as_str(), "1234");
        assert_eq!(cfg.addr, "0.0.0.0:10000".parse().unwrap());
        assert_eq!(cfg.discord_api_base, DEFAULT_DISCORD_API_BASE);
        assert!(cfg.webhook_secret.is_none());
    }

    #[test]
    fn empty_secret_means_open_mode() {
        let cfg = load(&[
            ("DISCORD_TOKEN", "tok"),
            ("DISCORD_USER_ID", "1234"),
            ("GITHUB_SECRET", ""),
        ])
        .unwrap();
        assert!(cfg.webhook_secret.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = load(&[
            ("DISCORD_TOKEN", "tok"),
            ("DISCORD_USER_ID", " 99 "),
            ("GITHUB_SECRET", "s3cr3t"),
            ("PORT", "8088"),
            ("BIND_ADDR", "127.0.0.1"),
            ("DISCORD_API_BASE", "mock://discord"),
        ])
        .unwrap();
        assert_eq!(cfg.recipient.as_str(), "99");
        assert_eq!(cfg.webhook_secret.as_deref(), Some("s3cr3t"));
        assert_eq!(cfg.addr, "127.0.0.1:8088".parse().unwrap());
        assert_eq!(cfg.discord_api_base, "mock://discord");
    }

    #[test]
    fn missing_or_invalid_values_fail() {
        let err = load(&[("DISCORD_USER_ID", "1")]).unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"));

        let err = load(&[("DISCORD_TOKEN", "tok")]).unwrap_err();
        assert!(err.to_string().contains("DISCORD_USER_ID"));

        let err = load(&[("DISCORD_TOKEN", "tok"), ("DISCORD_USER_ID", "someone")]).unwrap_err();
        assert!(err.to_string().contains("numeric"));

        let err = load(&[
            ("DISCORD_TOKEN", "tok"),
            ("DISCORD_USER_ID", "1"),
            ("PORT", "http"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let cfg = load(&[
            ("DISCORD_TOKEN", "very-secret-token"),
            ("DISCORD_USER_ID", "1"),
            ("GITHUB_SECRET", "hook-secret"),
        ])
        .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("very-secret-token"));
        assert!(!rendered.contains("hook-secret"));
    }
}
