use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::config::EnvironmentConfig;
use crate::models::auth::JwtClaims;
use crate::models::user::User;
use crate::services::session_registry::Session;
use crate::utils::errors::{AppError, AppResult};

/// Servicio JWT
#[derive(Clone)]
pub struct JwtService {
    algorithm: Algorithm,
    expiration: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: &EnvironmentConfig) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            expiration: Duration::seconds(config.jwt_expiration as i64),
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }

    /// Vigencia del token en segundos
    pub fn expires_in(&self) -> u64 {
        self.expiration.num_seconds().max(0) as u64
    }

    /// Genera el token de acceso ligado a la sesión abierta
    pub fn generate_token(
        &self,
        user: &User,
        modules: &[i32],
        session: &Session,
    ) -> AppResult<String> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user.id,
            name: user.full_name.clone(),
            email: user.email.clone(),
            role: user.role_id,
            modules: modules.to_vec(),
            jti: session.session_id.clone(),
            exp: (now + self.expiration).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::Jwt(format!("Error generating token: {}", e)))
    }

    /// Valida firma y expiración
    pub fn validate_token(&self, token: &str) -> AppResult<JwtClaims> {
        let validation = Validation::new(self.algorithm);
        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::auth::Module;
    use crate::models::user::UserStatus;

    pub(crate) fn user(id: i32) -> User {
        User {
            id,
            employee_id: Some(40),
            full_name: "Ana Pérez".to_string(),
            email: "ana@empresa.com".to_string(),
            password_hash: String::new(),
            role_id: 2,
            status: UserStatus::Active,
            failed_attempts: 0,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn session(user_id: i32) -> Session {
        Session {
            session_id: "jti-1".to_string(),
            user_id,
            email: "ana@empresa.com".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn token_round_trip_keeps_modules_and_session() {
        let jwt = JwtService::new(&EnvironmentConfig::for_tests());
        let token = jwt
            .generate_token(&user(3), &[Module::Fleet.id(), Module::Rooms.id()], &session(3))
            .unwrap();

        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.sub, 3);
        assert_eq!(claims.jti, "jti-1");
        assert!(claims.has_module(Module::Rooms));
        assert!(!claims.has_module(Module::Administration));
    }

    #[test]
    fn foreign_signature_is_unauthorized() {
        let jwt = JwtService::new(&EnvironmentConfig::for_tests());
        let mut other_config = EnvironmentConfig::for_tests();
        other_config.jwt_secret = "otro-secreto".to_string();
        let token = JwtService::new(&other_config)
            .generate_token(&user(3), &[], &session(3))
            .unwrap();

        assert!(matches!(jwt.validate_token(&token), Err(AppError::Unauthorized(_))));
    }
}
