use serde::{Deserialize, Serialize};
use std::fmt;

/// Módulos funcionales que un usuario puede tener asignados
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Module {
    Fleet,
    Reservations,
    Rooms,
    Administration,
}

impl Module {
    pub const fn id(self) -> i32 {
        match self {
            Module::Fleet => 1,
            Module::Reservations => 2,
            Module::Rooms => 3,
            Module::Administration => 4,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Module::Fleet),
            2 => Some(Module::Reservations),
            3 => Some(Module::Rooms),
            4 => Some(Module::Administration),
            _ => None,
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Module::Fleet => "fleet",
            Module::Reservations => "reservations",
            Module::Rooms => "rooms",
            Module::Administration => "administration",
        };
        f.write_str(name)
    }
}

/// Claims del JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: i32, // user_id
    pub name: String,
    pub email: String,
    pub role: i32,
    pub modules: Vec<i32>,
    pub jti: String, // id de sesión
    pub exp: i64,
    pub iat: i64,
}

impl JwtClaims {
    pub fn has_module(&self, module: Module) -> bool {
        self.modules.contains(&module.id())
    }
}

/// Usuario autenticado que se inyecta en las requests
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub role: i32,
    pub modules: Vec<i32>,
    pub session_id: String,
}

impl From<JwtClaims> for AuthenticatedUser {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            role: claims.role,
            modules: claims.modules,
            session_id: claims.jti,
        }
    }
}

impl AuthenticatedUser {
    /// Nombre que queda registrado como autor de los cambios
    pub fn actor(&self) -> String {
        self.email.clone()
    }

    pub fn has_module(&self, module: Module) -> bool {
        self.modules.contains(&module.id())
    }
}
