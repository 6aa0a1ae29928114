use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Which persistence backend the API wires its stores to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StoreBackend::Supabase),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub store_backend: StoreBackend,
    pub server_port: u16,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_base_url: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_base_url: String,
    pub currency: String,
    pub frontend_url: String,
    pub payment_timeout_secs: u64,
    pub accept_redirect_confirmations: bool,
    pub require_payment_before_completion: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_service_role_key: String::new(),
            supabase_jwt_secret: String::new(),
            store_backend: StoreBackend::Supabase,
            server_port: 3000,
            razorpay_key_id: String::new(),
            razorpay_key_secret: String::new(),
            razorpay_base_url: "https://api.razorpay.com".to_string(),
            stripe_secret_key: String::new(),
            stripe_webhook_secret: String::new(),
            stripe_base_url: "https://api.stripe.com".to_string(),
            currency: "INR".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            payment_timeout_secs: 10,
            accept_redirect_confirmations: true,
            require_payment_before_completion: false,
        }
    }
}

fn string_var(name: &str, fallback: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        if fallback.is_empty() {
            warn!("{} not set, using empty value", name);
        } else {
            warn!("{} not set, using default", name);
        }
        fallback.to_string()
    })
}

fn parsed_var<T: FromStr>(name: &str, fallback: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value ({}), using default", name, raw);
            fallback
        }),
        Err(_) => fallback,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}, falling back to supabase", e);
                StoreBackend::Supabase
            }),
            Err(_) => defaults.store_backend,
        };

        let config = Self {
            supabase_url: string_var("SUPABASE_URL", ""),
            supabase_service_role_key: string_var("SUPABASE_SERVICE_ROLE_KEY", ""),
            supabase_jwt_secret: string_var("SUPABASE_JWT_SECRET", ""),
            store_backend,
            server_port: parsed_var("SERVER_PORT", defaults.server_port),
            razorpay_key_id: string_var("RAZORPAY_KEY_ID", ""),
            razorpay_key_secret: string_var("RAZORPAY_KEY_SECRET", ""),
            razorpay_base_url: string_var("RAZORPAY_BASE_URL", &defaults.razorpay_base_url),
            stripe_secret_key: string_var("STRIPE_SECRET_KEY", ""),
            stripe_webhook_secret: string_var("STRIPE_WEBHOOK_SECRET", ""),
            stripe_base_url: string_var("STRIPE_BASE_URL", &defaults.stripe_base_url),
            currency: string_var("CURRENCY", &defaults.currency),
            frontend_url: string_var("FRONTEND_URL", &defaults.frontend_url),
            payment_timeout_secs: parsed_var("PAYMENT_TIMEOUT_SECS", defaults.payment_timeout_secs),
            accept_redirect_confirmations: parsed_var(
                "ACCEPT_REDIRECT_CONFIRMATIONS",
                defaults.accept_redirect_confirmations,
            ),
            require_payment_before_completion: parsed_var(
                "REQUIRE_PAYMENT_BEFORE_COMPLETION",
                defaults.require_payment_before_completion,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        let store_ready = match self.store_backend {
            StoreBackend::Supabase => {
                !self.supabase_url.is_empty() && !self.supabase_service_role_key.is_empty()
            }
            StoreBackend::Memory => true,
        };

        store_ready && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_razorpay_configured(&self) -> bool {
        !self.razorpay_key_id.is_empty()
            && !self.razorpay_key_secret.is_empty()
            && !self.razorpay_base_url.is_empty()
    }

    pub fn is_stripe_configured(&self) -> bool {
        !self.stripe_secret_key.is_empty() && !self.stripe_base_url.is_empty()
    }

    pub fn is_stripe_webhook_configured(&self) -> bool {
        !self.stripe_webhook_secret.is_empty()
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_backend() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!(" Supabase ".parse::<StoreBackend>(), Ok(StoreBackend::Supabase));
        assert!("mongo".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn memory_backend_only_needs_jwt_secret() {
        let config = AppConfig {
            store_backend: StoreBackend::Memory,
            supabase_jwt_secret: "secret".to_string(),
            ..AppConfig::default()
        };
        assert!(config.is_configured());
        assert!(!config.is_razorpay_configured());
    }

    #[test]
    fn payment_timeout_never_zero() {
        let config = AppConfig {
            payment_timeout_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.payment_timeout(), Duration::from_secs(1));
    }
}
