//! Remote callbacks for network-bound engine calls
//!
//! Credentials come from the SSH agent, default SSH keys, the repository's
//! configured git credential helper, or libgit2 defaults. Transfer progress
//! doubles as the cancellation checkpoint for task workers.

use git2::{Cred, CredentialType, RemoteCallbacks};

use super::cancellation::CancellationToken;

/// Credentials helper that provides git2 remote callbacks with authentication support
pub struct CredentialsHelper {
    try_ssh_agent: bool,
    try_ssh_key: bool,
    config: Option<git2::Config>,
}

impl Default for CredentialsHelper {
    fn default() -> Self {
        Self {
            try_ssh_agent: true,
            try_ssh_key: true,
            config: git2::Config::open_default().ok(),
        }
    }
}

impl CredentialsHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a repository's config (and so its credential helper)
    pub fn for_repo(repo: &git2::Repository) -> Self {
        Self {
            config: repo.config().ok(),
            ..Self::default()
        }
    }

    /// Get remote callbacks configured with credential support
    pub fn get_callbacks(self) -> RemoteCallbacks<'static> {
        let CredentialsHelper {
            try_ssh_agent,
            try_ssh_key,
            config,
        } = self;
        let mut tried_ssh_agent = false;
        let mut tried_ssh_key = false;
        let mut tried_helper = false;

        let mut callbacks = RemoteCallbacks::new();

        callbacks.credentials(move |url, username_from_url, allowed_types| {
            tracing::debug!(
                "Credential callback: url={}, username={:?}, allowed={:?}",
                url,
                username_from_url,
                allowed_types
            );
            let username = username_from_url.unwrap_or("git");

            if allowed_types.contains(CredentialType::SSH_KEY) && try_ssh_agent && !tried_ssh_agent
            {
                tried_ssh_agent = true;
                if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }
            }

            if allowed_types.contains(CredentialType::SSH_KEY) && try_ssh_key && !tried_ssh_key {
                tried_ssh_key = true;
                if let Some(home) = dirs::home_dir() {
                    for key_name in &["id_ed25519", "id_rsa", "id_ecdsa"] {
                        let private_key = home.join(".ssh").join(key_name);
                        let public_key = home.join(".ssh").join(format!("{}.pub", key_name));

                        if private_key.exists() {
                            tracing::debug!("Trying SSH key: {:?}", private_key);
                            if let Ok(cred) =
                                Cred::ssh_key(username, Some(&public_key), &private_key, None)
                            {
                                return Ok(cred);
                            }
                        }
                    }
                }
            }

            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) && !tried_helper {
                tried_helper = true;
                if let Some(ref config) = config {
                    if let Ok(cred) = Cred::credential_helper(config, url, username_from_url) {
                        return Ok(cred);
                    }
                }
            }

            if allowed_types.contains(CredentialType::DEFAULT) {
                return Cred::default();
            }

            Err(git2::Error::new(
                git2::ErrorCode::Auth,
                git2::ErrorClass::Net,
                "no valid credentials available",
            ))
        });

        callbacks
    }
}

/// Remote callbacks with credentials, progress logging and cancellation
pub fn callbacks_with_cancel(
    helper: CredentialsHelper,
    token: &CancellationToken,
) -> RemoteCallbacks<'static> {
    let mut callbacks = helper.get_callbacks();

    let transfer_token = token.clone();
    callbacks.transfer_progress(move |stats| {
        if stats.total_objects() > 0 {
            tracing::debug!(
                "Transfer progress: {}/{} objects, {} bytes",
                stats.received_objects(),
                stats.total_objects(),
                stats.received_bytes()
            );
        }
        transfer_token.keep_going()
    });

    let sideband_token = token.clone();
    callbacks.sideband_progress(move |data| {
        if let Ok(msg) = std::str::from_utf8(data) {
            let msg = msg.trim();
            if !msg.is_empty() {
                tracing::info!("Remote: {}", msg);
            }
        }
        sideband_token.keep_going()
    });

    callbacks
}
