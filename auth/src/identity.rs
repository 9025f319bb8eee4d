//! The identity service: registration, login, session resolution and
//! principal administration.

use crate::config::AuthConfig;
use crate::credentials::{generate_secret, hash_secret, verify_secret};
use crate::error::{AuthError, Result};
use crate::metrics;
use crate::providers::{SessionStore, UserRepository};
use crate::state::{
    IssuedSession, LoginIdentifier, Principal, ProfileUpdate, Role, SecretHash, Session,
    SessionKey, SessionToken,
};
use crate::stores::{InMemorySessionStore, InMemoryUserRepository};
use crate::utils::{validate_address, validate_handle, validate_secret};
use async_trait::async_trait;
use bazaar_core::directory::DirectoryError;
use bazaar_core::{Actor, Clock, OwnerCleanup, PrincipalDirectory, PrincipalId, SystemClock};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Secret hashed once per service and verified against when a login names an
/// unknown principal, so both failure paths cost one bcrypt verification.
const DUMMY_SECRET: &str = "bazaar-dummy-secret";

/// What [`IdentityService::bootstrap_admin`] did.
#[derive(Debug, Clone)]
pub enum BootstrapOutcome {
    /// An administrator already exists; nothing changed.
    AlreadyPresent {
        /// The existing administrator.
        principal_id: PrincipalId,
    },
    /// The administrator was created.
    Created {
        /// The new administrator.
        principal: Principal,
        /// Set when no secret was configured. Shown to the operator once.
        generated_secret: Option<String>,
    },
}

/// Identity & Session component.
///
/// Cheap to clone; all state lives behind the injected stores.
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
    dummy_hash: Arc<OnceCell<SecretHash>>,
}

impl IdentityService {
    /// Create a service over explicit stores.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            clock,
            config,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// In-memory stores and the system clock.
    #[must_use]
    pub fn in_memory(config: AuthConfig) -> Self {
        Self::in_memory_with_clock(config, Arc::new(SystemClock))
    }

    /// In-memory stores and a caller-supplied clock.
    #[must_use]
    pub fn in_memory_with_clock(config: AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemorySessionStore::new()),
            clock,
            config,
        )
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════
    // Registration & Login
    // ═══════════════════════════════════════════════════════════════════

    /// Register a new member.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingField`] for a blank handle, address or secret
    /// - [`AuthError::InvalidAddressFormat`], [`AuthError::WeakSecret`]
    /// - [`AuthError::DuplicateHandle`], [`AuthError::DuplicateAddress`]
    #[tracing::instrument(skip(self, address, secret))]
    pub async fn register(&self, handle: &str, address: &str, secret: &str) -> Result<Principal> {
        let principal = self.create_principal(handle, address, secret, Role::Member).await?;
        metrics::record_registration();
        tracing::info!(principal_id = %principal.id, "Principal registered");
        Ok(principal)
    }

    async fn create_principal(
        &self,
        handle: &str,
        address: &str,
        secret: &str,
        role: Role,
    ) -> Result<Principal> {
        let handle = validate_handle(handle)?;
        let address = validate_address(address)?;
        validate_secret(secret, self.config.min_secret_length)?;

        // Cheap pre-check so duplicates don't pay for a hash; the store
        // re-checks atomically on insert.
        if self.users.find_by_handle(&handle).await?.is_some() {
            return Err(AuthError::DuplicateHandle);
        }
        if self.users.find_by_address(&address).await?.is_some() {
            return Err(AuthError::DuplicateAddress);
        }

        let now = self.clock.now();
        let principal = Principal {
            id: PrincipalId::new(),
            handle,
            address,
            secret_hash: hash_secret(secret, self.config.hash_cost).await?,
            role,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(&principal).await?;
        Ok(principal)
    }

    /// Verify credentials and issue a session.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] for an unknown identifier or a wrong
    /// secret, without saying which.
    #[tracing::instrument(skip(self, identifier, secret))]
    pub async fn authenticate(
        &self,
        identifier: LoginIdentifier,
        secret: &str,
    ) -> Result<IssuedSession> {
        let found = match &identifier {
            LoginIdentifier::Handle(handle) => self.users.find_by_handle(handle.trim()).await?,
            LoginIdentifier::Address(address) => {
                self.users
                    .find_by_address(&crate::utils::normalize_address(address))
                    .await?
            }
        };

        let Some(principal) = found else {
            let dummy = self.dummy_hash().await?;
            let _ = verify_secret(secret, dummy).await?;
            metrics::record_login(false);
            tracing::warn!("Login failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_secret(secret, &principal.secret_hash).await? {
            metrics::record_login(false);
            tracing::warn!(principal_id = %principal.id, "Login failed");
            return Err(AuthError::InvalidCredentials);
        }

        let token = SessionToken::generate();
        let now = self.clock.now();
        let session = Session {
            key: token.key(),
            principal_id: principal.id,
            issued_at: now,
            expires_at: now + self.config.session_ttl,
        };
        self.sessions.insert(&session).await?;

        metrics::record_login(true);
        tracing::info!(principal_id = %principal.id, "Session issued");

        Ok(IssuedSession {
            token,
            principal,
            expires_at: session.expires_at,
        })
    }

    async fn dummy_hash(&self) -> Result<&SecretHash> {
        self.dummy_hash
            .get_or_try_init(|| hash_secret(DUMMY_SECRET, self.config.hash_cost))
            .await
    }

    /// Revoke the session behind `token`. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns error if the session store fails.
    pub async fn logout(&self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Ok(());
        }
        self.sessions.remove(&SessionKey::of(token)).await?;
        tracing::debug!("Session revoked");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Session Resolution
    // ═══════════════════════════════════════════════════════════════════

    /// Resolve a bearer token to its principal.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] for missing, malformed, unknown or
    /// expired tokens, and for tokens whose principal was deleted.
    pub async fn current_principal(&self, token: &str) -> Result<Principal> {
        if token.is_empty() {
            return Err(AuthError::Unauthenticated);
        }
        let key = SessionKey::of(token);
        let Some(session) = self.sessions.get(&key).await? else {
            return Err(AuthError::Unauthenticated);
        };
        if session.is_expired(self.clock.now()) {
            self.sessions.remove(&key).await?;
            return Err(AuthError::Unauthenticated);
        }
        self.users
            .find_by_id(session.principal_id)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    /// Resolve a bearer token to the [`Actor`] it acts as.
    ///
    /// # Errors
    ///
    /// Same as [`Self::current_principal`].
    pub async fn actor(&self, token: &str) -> Result<Actor> {
        Ok(self.current_principal(token).await?.actor())
    }

    /// `true` only for a live session of an administrator. Never fails.
    pub async fn is_admin(&self, token: &str) -> bool {
        self.current_principal(token)
            .await
            .is_ok_and(|principal| principal.is_admin())
    }

    async fn require_admin(&self, acting_token: &str) -> Result<Principal> {
        let acting = self.current_principal(acting_token).await?;
        if !acting.is_admin() {
            tracing::warn!(principal_id = %acting.id, "Admin operation refused");
            return Err(AuthError::Forbidden);
        }
        Ok(acting)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Profile & Administration
    // ═══════════════════════════════════════════════════════════════════

    /// Change the caller's own handle, address or secret.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`], plus the registration validation and
    /// uniqueness errors for each field supplied.
    #[tracing::instrument(skip(self, token, update))]
    pub async fn update_profile(&self, token: &str, update: ProfileUpdate) -> Result<Principal> {
        let mut principal = self.current_principal(token).await?;
        if update.is_empty() {
            return Ok(principal);
        }

        if let Some(handle) = update.handle.as_deref() {
            principal.handle = validate_handle(handle)?;
        }
        if let Some(address) = update.address.as_deref() {
            principal.address = validate_address(address)?;
        }
        if let Some(secret) = update.secret.as_deref() {
            validate_secret(secret, self.config.min_secret_length)?;
            principal.secret_hash = hash_secret(secret, self.config.hash_cost).await?;
        }
        principal.updated_at = self.clock.now();

        self.users.update(&principal).await?;
        tracing::info!(principal_id = %principal.id, "Profile updated");
        Ok(principal)
    }

    /// Look up a principal by id.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotFound`] if no such principal exists.
    pub async fn get_principal(&self, id: PrincipalId) -> Result<Principal> {
        self.users.find_by_id(id).await?.ok_or(AuthError::NotFound)
    }

    /// All principals (admin only).
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] or [`AuthError::Forbidden`].
    pub async fn list_principals(&self, acting_token: &str) -> Result<Vec<Principal>> {
        self.require_admin(acting_token).await?;
        self.users.list().await
    }

    /// Delete a principal and revoke their sessions (admin only).
    ///
    /// Resources the principal owns elsewhere are left alone; use
    /// [`IdentityService::remove_principal`] to release them as well.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unauthenticated`] / [`AuthError::Forbidden`] for the caller
    /// - [`AuthError::SelfDeletion`] when the target is the caller
    /// - [`AuthError::NotFound`] when the target does not exist
    #[tracing::instrument(skip(self, acting_token))]
    pub async fn delete_principal(&self, acting_token: &str, target: PrincipalId) -> Result<()> {
        let acting = self.authorize_deletion(acting_token, target).await?;
        self.finish_deletion(&acting, target).await
    }

    /// Delete a principal together with everything `owned` holds for them
    /// (admin only).
    ///
    /// The target's sessions are revoked first so they cannot create new
    /// resources, then `owned` is purged, then the principal is deleted. A
    /// failed purge leaves the principal in place.
    ///
    /// # Returns
    ///
    /// The number of owned resources released.
    ///
    /// # Errors
    ///
    /// As [`IdentityService::delete_principal`], plus
    /// [`AuthError::Infrastructure`] if the purge fails.
    #[tracing::instrument(skip(self, acting_token, owned))]
    pub async fn remove_principal(
        &self,
        acting_token: &str,
        target: PrincipalId,
        owned: &dyn OwnerCleanup,
    ) -> Result<usize> {
        let acting = self.authorize_deletion(acting_token, target).await?;
        self.sessions.remove_for_principal(target).await?;

        let released = owned.purge_owner(target).await.map_err(|e| {
            tracing::error!(principal_id = %target, error = %e, "Owned resources not released");
            AuthError::Infrastructure(e.to_string())
        })?;

        self.finish_deletion(&acting, target).await?;
        Ok(released)
    }

    async fn authorize_deletion(
        &self,
        acting_token: &str,
        target: PrincipalId,
    ) -> Result<Principal> {
        let acting = self.require_admin(acting_token).await?;
        if acting.id == target {
            return Err(AuthError::SelfDeletion);
        }
        if self.users.find_by_id(target).await?.is_none() {
            return Err(AuthError::NotFound);
        }
        Ok(acting)
    }

    async fn finish_deletion(&self, acting: &Principal, target: PrincipalId) -> Result<()> {
        if !self.users.delete(target).await? {
            return Err(AuthError::NotFound);
        }
        let revoked = self.sessions.remove_for_principal(target).await?;
        tracing::info!(
            principal_id = %target,
            admin_id = %acting.id,
            revoked,
            "Principal deleted"
        );
        Ok(())
    }

    /// Create the administrator unless one already exists.
    ///
    /// Idempotent by role: any existing [`Role::Admin`] principal counts as
    /// the bootstrap administrator, whatever its current handle or address.
    ///
    /// # Errors
    ///
    /// - Validation errors if the configured admin identity or secret
    ///   violates policy
    /// - [`AuthError::DuplicateHandle`] / [`AuthError::DuplicateAddress`] if
    ///   no administrator exists and a member holds the configured identity
    pub async fn bootstrap_admin(&self) -> Result<BootstrapOutcome> {
        if let Some(existing) = self.existing_admin().await? {
            tracing::debug!(principal_id = %existing.id, "Administrator already present");
            return Ok(BootstrapOutcome::AlreadyPresent {
                principal_id: existing.id,
            });
        }

        let admin = &self.config.admin;
        let (secret, generated_secret) = match &admin.secret {
            Some(secret) => (secret.clone(), None),
            None => {
                let secret = generate_secret();
                (secret.clone(), Some(secret))
            }
        };

        match self
            .create_principal(&admin.handle, &admin.address, &secret, Role::Admin)
            .await
        {
            Ok(principal) => {
                tracing::info!(principal_id = %principal.id, "Administrator created");
                Ok(BootstrapOutcome::Created {
                    principal,
                    generated_secret,
                })
            }
            // Lost a race with another bootstrap, or a member holds the
            // configured identity.
            Err(e @ (AuthError::DuplicateHandle | AuthError::DuplicateAddress)) => {
                match self.existing_admin().await? {
                    Some(existing) => Ok(BootstrapOutcome::AlreadyPresent {
                        principal_id: existing.id,
                    }),
                    None => {
                        tracing::error!(
                            handle = %admin.handle,
                            "Configured administrator identity is held by a member"
                        );
                        Err(e)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn existing_admin(&self) -> Result<Option<Principal>> {
        Ok(self
            .users
            .list()
            .await?
            .into_iter()
            .find(|p| p.role == Role::Admin))
    }

    /// Drop expired sessions from the store.
    ///
    /// # Errors
    ///
    /// Returns error if the session store fails.
    pub async fn purge_expired_sessions(&self) -> Result<usize> {
        let purged = self.sessions.purge_expired(self.clock.now()).await?;
        if purged > 0 {
            tracing::debug!(purged, "Expired sessions purged");
        }
        Ok(purged)
    }
}

#[async_trait]
impl PrincipalDirectory for IdentityService {
    async fn principal_exists(
        &self,
        principal_id: PrincipalId,
    ) -> std::result::Result<bool, DirectoryError> {
        self.users
            .find_by_id(principal_id)
            .await
            .map(|found| found.is_some())
            .map_err(|e| DirectoryError(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_testing::ManualClock;
    use chrono::Duration;

    fn service() -> (IdentityService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at_test_epoch());
        let config = AuthConfig::default().with_hash_cost(4);
        (IdentityService::in_memory_with_clock(config, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_register_validates_before_storing() {
        let (identity, _) = service();

        assert_eq!(
            identity.register("alice", "not-an-email", "secret1").await,
            Err(AuthError::InvalidAddressFormat)
        );
        assert_eq!(
            identity.register("alice", "alice@x.com", "abc").await,
            Err(AuthError::WeakSecret { min_length: 6 })
        );
        assert_eq!(
            identity.register("  ", "alice@x.com", "secret1").await,
            Err(AuthError::MissingField { field: "handle" })
        );
        assert!(identity.users.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_by_either_identifier() {
        let (identity, _) = service();
        let alice = identity.register("alice", "Alice@X.com", "secret1").await.unwrap();
        assert_eq!(alice.address, "alice@x.com");

        for id in ["alice", "alice@x.com", "ALICE@x.com"] {
            let session = identity
                .authenticate(LoginIdentifier::infer(id), "secret1")
                .await
                .unwrap();
            assert_eq!(session.principal.id, alice.id);
        }
    }

    #[tokio::test]
    async fn test_session_expires_after_ttl() {
        let (identity, clock) = service();
        identity.register("alice", "alice@x.com", "secret1").await.unwrap();
        let session = identity
            .authenticate(LoginIdentifier::infer("alice"), "secret1")
            .await
            .unwrap();

        clock.advance(Duration::minutes(59));
        assert!(identity.current_principal(session.token.as_str()).await.is_ok());

        clock.advance(Duration::minutes(1));
        assert_eq!(
            identity.current_principal(session.token.as_str()).await,
            Err(AuthError::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn test_delete_principal_rules() {
        let (identity, _) = service();
        let outcome = identity.bootstrap_admin().await.unwrap();
        let BootstrapOutcome::Created { principal: admin, generated_secret: Some(secret) } = outcome
        else {
            unreachable!("fresh store creates the admin with a generated secret");
        };
        let admin_session = identity
            .authenticate(LoginIdentifier::Handle("admin".into()), &secret)
            .await
            .unwrap();
        let admin_token = admin_session.token.as_str();

        let bob = identity.register("bob", "bob@x.com", "secret1").await.unwrap();
        let bob_session = identity
            .authenticate(LoginIdentifier::infer("bob"), "secret1")
            .await
            .unwrap();

        assert_eq!(
            identity.delete_principal(bob_session.token.as_str(), admin.id).await,
            Err(AuthError::Forbidden)
        );
        assert_eq!(
            identity.delete_principal(admin_token, admin.id).await,
            Err(AuthError::SelfDeletion)
        );
        assert_eq!(
            identity.delete_principal(admin_token, PrincipalId::new()).await,
            Err(AuthError::NotFound)
        );

        identity.delete_principal(admin_token, bob.id).await.unwrap();
        assert_eq!(
            identity.current_principal(bob_session.token.as_str()).await,
            Err(AuthError::Unauthenticated)
        );
        assert!(!identity.principal_exists(bob.id).await.unwrap());
    }
}
