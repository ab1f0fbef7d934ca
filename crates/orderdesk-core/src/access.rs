//! # Access Control Gate
//!
//! Decides whether the signed-in user may open a screen, and where to send
//! them when they may not.
//!
//! ## Decision Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  authorize(role, resource, is_authenticated)                            │
//! │                                                                         │
//! │  not authenticated ─────────────────────────────► Deny → login         │
//! │  role unrecognized ─────────────────────────────► Deny → login         │
//! │  Admin ─────────────────────────────────────────► Allow                │
//! │  Standard ──┬── resource == "pedidos" ──────────► Allow                │
//! │             └── anything else ──────────────────► Deny → pedidos       │
//! │  Advanced ──┬── resource == "usuarios" ─────────► Deny → dashboard     │
//! │             └── anything else ──────────────────► Allow                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gate is a pure function. The web layer reads the session, calls in,
//! and performs the redirect and flash notice itself.
//!
//! ## Example
//! ```rust
//! use orderdesk_core::access::{authorize, Decision, Resource, Role};
//!
//! let decision = authorize(Some(Role::Standard), &Resource::new("Usuarios"), true);
//! assert_eq!(decision.redirect_target(), Some(&Resource::orders()));
//! assert!(authorize(Some(Role::Admin), &Resource::users(), true).is_allowed());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Role
// =============================================================================

/// A user profile.
///
/// Stored as the legacy numeric profile id (1, 2, 3). Any other stored value
/// is a corrupt session and maps to `None` in [`Role::from_profile_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access.
    Admin,
    /// Order entry only.
    Standard,
    /// Everything except user administration.
    Advanced,
}

impl Role {
    /// Every role, in profile id order.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Standard, Role::Advanced];

    /// Maps a stored profile id to a role.
    pub const fn from_profile_id(id: i64) -> Option<Role> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Standard),
            3 => Some(Role::Advanced),
            _ => None,
        }
    }

    /// The profile id persisted for this role.
    pub const fn profile_id(&self) -> i64 {
        match self {
            Role::Admin => 1,
            Role::Standard => 2,
            Role::Advanced => 3,
        }
    }

    /// Where this role lands when it is turned away from a screen.
    pub fn safe_landing(&self) -> Resource {
        match self {
            Role::Standard => Resource::orders(),
            Role::Admin | Role::Advanced => Resource::dashboard(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Standard => "standard",
            Role::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "standard" => Ok(Role::Standard),
            "advanced" => Ok(Role::Advanced),
            _ => Err(ValidationError::InvalidFormat {
                field: "role".to_string(),
                reason: "must be admin, standard or advanced".to_string(),
            }),
        }
    }
}

// =============================================================================
// Resource
// =============================================================================

/// A protected screen, identified by a normalized name.
///
/// ## Normalization
/// Names are trimmed, lower-cased and stripped of Portuguese diacritics, so
/// `" Usuários "`, `"USUARIOS"` and `"usuarios"` are the same resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Resource(String);

impl Resource {
    /// Login screen.
    pub const LOGIN: &'static str = "login";
    /// Order list and order entry.
    pub const ORDERS: &'static str = "pedidos";
    /// Reporting dashboard.
    pub const DASHBOARD: &'static str = "dashboard";
    /// User administration.
    pub const USERS: &'static str = "usuarios";

    /// Screens known to the application, used to build admin sessions.
    pub const KNOWN: [&'static str; 7] = [
        Self::DASHBOARD,
        Self::ORDERS,
        "clientes",
        "produtos",
        "relatorios",
        "empresa",
        Self::USERS,
    ];

    /// Creates a resource from any spelling of its name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Resource(normalize(name.as_ref()))
    }

    pub fn login() -> Self {
        Resource(Self::LOGIN.to_string())
    }

    pub fn orders() -> Self {
        Resource(Self::ORDERS.to_string())
    }

    pub fn dashboard() -> Self {
        Resource(Self::DASHBOARD.to_string())
    }

    pub fn users() -> Self {
        Resource(Self::USERS.to_string())
    }

    /// The normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares against a name that is already in normalized form.
    fn is(&self, normalized: &str) -> bool {
        self.0 == normalized
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().chars().map(fold_diacritic).collect()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        other => other,
    }
}

impl From<String> for Resource {
    fn from(name: String) -> Self {
        Resource::new(name)
    }
}

impl From<&str> for Resource {
    fn from(name: &str) -> Self {
        Resource::new(name)
    }
}

impl From<Resource> for String {
    fn from(resource: Resource) -> Self {
        resource.0
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Decision
// =============================================================================

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No signed-in user.
    NotAuthenticated,
    /// The session carries a profile id we do not know.
    InvalidProfile,
    /// The role may not open this screen.
    Forbidden,
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny {
        redirect_to: Resource,
        reason: DenyReason,
    },
}

impl Decision {
    fn deny(redirect_to: Resource, reason: DenyReason) -> Self {
        Decision::Deny {
            redirect_to,
            reason,
        }
    }

    /// True for [`Decision::Allow`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Where to redirect on deny; `None` when allowed.
    pub fn redirect_target(&self) -> Option<&Resource> {
        match self {
            Decision::Allow => None,
            Decision::Deny { redirect_to, .. } => Some(redirect_to),
        }
    }

    /// Notice the web layer flashes when it performs the redirect.
    pub fn deny_message(&self) -> Option<&'static str> {
        match self {
            Decision::Allow => None,
            Decision::Deny { reason, .. } => Some(match reason {
                DenyReason::NotAuthenticated => "You need to be logged in to access this page.",
                DenyReason::InvalidProfile => "Invalid user profile.",
                DenyReason::Forbidden => "You do not have access to this screen.",
            }),
        }
    }
}

// =============================================================================
// The Gate
// =============================================================================

/// Decides access for one request.
///
/// `role` is `None` when the session's profile id is not a known role.
/// Never fails and never performs I/O.
pub fn authorize(role: Option<Role>, resource: &Resource, is_authenticated: bool) -> Decision {
    if !is_authenticated {
        return Decision::deny(Resource::login(), DenyReason::NotAuthenticated);
    }

    let Some(role) = role else {
        return Decision::deny(Resource::login(), DenyReason::InvalidProfile);
    };

    match role {
        Role::Admin => Decision::Allow,
        Role::Standard if resource.is(Resource::ORDERS) => Decision::Allow,
        Role::Advanced if !resource.is(Resource::USERS) => Decision::Allow,
        Role::Standard | Role::Advanced => {
            Decision::deny(role.safe_landing(), DenyReason::Forbidden)
        }
    }
}

// =============================================================================
// Session Context
// =============================================================================

/// Read-only view of the web layer's session, passed to the gate explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Signed-in user's id; `None` means anonymous.
    pub user_id: Option<String>,
    /// Display name for the header.
    pub user_name: Option<String>,
    /// Raw profile id as stored in the session.
    pub profile_id: Option<i64>,
    /// Screens shown in navigation for this profile.
    pub screens: Vec<Resource>,
}

impl SessionContext {
    /// A session with nobody signed in.
    pub fn anonymous() -> Self {
        SessionContext::default()
    }

    /// A session for a signed-in user.
    pub fn signed_in(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        profile_id: i64,
        screens: Vec<Resource>,
    ) -> Self {
        SessionContext {
            user_id: Some(user_id.into()),
            user_name: Some(user_name.into()),
            profile_id: Some(profile_id),
            screens,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Role for the stored profile id, if it is a known one.
    pub fn role(&self) -> Option<Role> {
        self.profile_id.and_then(Role::from_profile_id)
    }

    /// Runs the gate with this session's fields.
    pub fn authorize(&self, resource: &Resource) -> Decision {
        authorize(self.role(), resource, self.is_authenticated())
    }

    /// Whether `resource` should appear in navigation.
    ///
    /// Admins see everything; other profiles see their allow-list.
    pub fn can_view(&self, resource: &Resource) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        if self.role() == Some(Role::Admin) {
            return true;
        }
        self.screens.contains(resource)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
