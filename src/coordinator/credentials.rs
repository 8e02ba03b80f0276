//! Credential flows: login, signup, logout, federated login.
//!
//! Login, signup and logout raise the busy flag for their whole duration and
//! always lower it afterwards; federated login leaves it alone. Logout
//! commits the signed-out state itself before navigating instead of waiting
//! for the provider's event round trip.

use std::future::Future;

use tracing::info;

use super::{Coordinator, CoordinatorError, Inner};

const LOGIN_FAILED: &str = "Login failed";
const SIGNUP_FAILED: &str = "Signup failed";
const LOGOUT_FAILED: &str = "Logout failed";
const FEDERATED_FAILED: &str = "Could not start sign-in";

impl Coordinator {
    /// Sign in with email and password.
    pub async fn login(&self, email: &str, password: &str) {
        self.with_loading(async {
            match self.inner.identity.sign_in(email, password).await {
                Ok(session) => {
                    info!(user_id = session.as_ref().map(|s| s.identity.id.as_str()), "login succeeded");
                    let home = &self.inner.config.routes.home;
                    self.inner.success("Logged in successfully", home);
                }
                Err(e) => self.inner.report("login", &CoordinatorError::from(e), LOGIN_FAILED),
            }
        })
        .await;
    }

    /// Create an account and sign in.
    pub async fn signup(&self, email: &str, password: &str, name: &str) {
        self.with_loading(async {
            match self.inner.identity.sign_up(email, password, name).await {
                Ok(session) => {
                    info!(user_id = session.as_ref().map(|s| s.identity.id.as_str()), "signup succeeded");
                    let home = &self.inner.config.routes.home;
                    self.inner.success("Account created successfully", home);
                }
                Err(e) => self.inner.report("signup", &CoordinatorError::from(e), SIGNUP_FAILED),
            }
        })
        .await;
    }

    /// Sign out. The local user is cleared before navigation fires.
    pub async fn logout(&self) {
        self.with_loading(async {
            match self.inner.identity.sign_out().await {
                Ok(()) => {
                    self.inner.commit_user(None);
                    info!("logout succeeded");
                    let home = &self.inner.config.routes.home;
                    self.inner.success("Logged out successfully", home);
                }
                Err(e) => self.inner.report("logout", &CoordinatorError::from(e), LOGOUT_FAILED),
            }
        })
        .await;
    }

    /// Begin a federated sign-in. The provider redirects away; the signed-in
    /// state arrives later through the session event stream.
    pub async fn login_federated(&self) {
        let redirect_to = &self.inner.config.federated_redirect;
        match self.inner.identity.sign_in_federated(redirect_to).await {
            Ok(()) => info!(%redirect_to, "federated sign-in initiated"),
            Err(e) => self.inner.report("login_federated", &CoordinatorError::from(e), FEDERATED_FAILED),
        }
    }

    async fn with_loading<F: Future<Output = ()>>(&self, operation: F) {
        self.inner.set_loading(true);
        let _reset = LoadingReset(&self.inner);
        operation.await;
    }
}

/// Lowers the busy flag on drop, including when the operation is abandoned.
struct LoadingReset<'a>(&'a Inner);

impl Drop for LoadingReset<'_> {
    fn drop(&mut self) {
        self.0.set_loading(false);
    }
}
