//! Sign-in and device integrity seams used before talking to the store

use crate::errors::CapsError;
use std::sync::RwLock;
use uuid::Uuid;

pub trait Authenticator: Send + Sync + 'static {
    /// Id of the signed-in user, if any
    fn current_user(&self) -> Option<String>;

    fn sign_in_anonymously(&self) -> Result<String, CapsError>;
}

/// Reuse the current user, signing in anonymously when there is none
pub fn sign_in_if_needed<A: Authenticator + ?Sized>(auth: &A) -> Result<String, CapsError> {
    if let Some(user) = auth.current_user() {
        return Ok(user);
    }
    let user = auth.sign_in_anonymously()?;
    log::info!("Signed in anonymously as {}", user);
    Ok(user)
}

/// Issues a random user id on first sign-in
#[derive(Debug, Default)]
pub struct AnonymousAuthenticator {
    user: RwLock<Option<String>>,
    failure: Option<String>,
}

impl AnonymousAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            user: RwLock::new(None),
            failure: Some(message.into()),
        }
    }
}

impl Authenticator for AnonymousAuthenticator {
    fn current_user(&self) -> Option<String> {
        self.user.read().ok().and_then(|user| user.clone())
    }

    fn sign_in_anonymously(&self) -> Result<String, CapsError> {
        if let Some(message) = &self.failure {
            return Err(CapsError::auth(message.clone()));
        }

        let mut slot = self
            .user
            .write()
            .map_err(|_| CapsError::auth("user lock poisoned"))?;
        let user = slot.get_or_insert_with(|| Uuid::new_v4().to_string()).clone();
        Ok(user)
    }
}

/// Attests that the running build may submit reports
pub trait IntegrityVerifier: Send + Sync + 'static {
    /// `Ok(false)` means the check ran and the device was rejected
    fn verify(&self) -> Result<bool, CapsError>;
}

impl<F> IntegrityVerifier for F
where
    F: Fn() -> Result<bool, CapsError> + Send + Sync + 'static,
{
    fn verify(&self) -> Result<bool, CapsError> {
        self()
    }
}

/// Accepts every device; used for local stores
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustingVerifier;

impl IntegrityVerifier for TrustingVerifier {
    fn verify(&self) -> Result<bool, CapsError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_reuses_user() {
        let auth = AnonymousAuthenticator::new();
        assert!(auth.current_user().is_none());

        let first = sign_in_if_needed(&auth).unwrap();
        let second = sign_in_if_needed(&auth).unwrap();
        assert_eq!(first, second);
        assert_eq!(auth.current_user(), Some(first));
    }

    #[test]
    fn test_failing_sign_in() {
        let auth = AnonymousAuthenticator::failing("no network");
        let err = sign_in_if_needed(&auth).unwrap_err();
        assert!(matches!(err, CapsError::Auth(ref m) if m == "no network"));
    }

    #[test]
    fn test_closure_verifier() {
        let reject = || -> Result<bool, CapsError> { Ok(false) };
        assert!(!reject.verify().unwrap());
        assert!(TrustingVerifier.verify().unwrap());
    }
}
