use std::fmt;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Environment variable carrying the SSH key passphrase to the askpass helper.
///
/// When set, the binary prints its value and exits instead of running a batch.
pub const ASKPASS_ENV: &str = "REPOSITORY_MAPPER_ASKPASS";

/// Credentials used for every network operation of a batch.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthCredential {
    /// HTTPS basic auth.
    Token { username: String, token: String },
    /// SSH public key auth.
    SshKey {
        key_path: PathBuf,
        passphrase: Option<String>,
    },
}

impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token { username, .. } => f
                .debug_struct("Token")
                .field("username", username)
                .field("token", &"<redacted>")
                .finish(),
            Self::SshKey { key_path, .. } => f
                .debug_struct("SshKey")
                .field("key_path", key_path)
                .field("passphrase", &"<redacted>")
                .finish(),
        }
    }
}

impl AuthCredential {
    /// Pick token auth when both halves are given, otherwise fall back to the SSH key.
    pub fn resolve(
        username: Option<String>,
        token: Option<String>,
        key_path: PathBuf,
        passphrase: Option<String>,
    ) -> Result<Self> {
        match (username, token) {
            (Some(username), Some(token)) if !username.is_empty() && !token.is_empty() => {
                Ok(Self::Token { username, token })
            }
            _ => {
                if !key_path.is_file() {
                    anyhow::bail!("Could not find ssh key: '{}'", key_path.display());
                }
                Ok(Self::SshKey {
                    key_path,
                    passphrase: passphrase.filter(|p| !p.is_empty()),
                })
            }
        }
    }

    /// Remote URL for `org/repo`.
    ///
    /// `remote_base` replaces the protocol-specific host prefix, e.g. a
    /// `file://` directory holding mirrors.
    pub fn remote_url(&self, host: &str, remote_base: Option<&str>, org: &str, repo: &str) -> String {
        if let Some(base) = remote_base {
            return format!("{}/{}/{}", base.trim_end_matches('/'), org, repo);
        }
        match self {
            Self::Token { .. } => format!("https://{}/{}/{}", host, org, repo),
            Self::SshKey { .. } => format!("git@{}:{}/{}", host, org, repo),
        }
    }

    /// `git -c` settings for commands that talk to the remote.
    pub fn git_config_args(&self) -> Vec<String> {
        match self {
            Self::Token { username, token } => {
                let basic = STANDARD.encode(format!("{}:{}", username, token));
                vec![
                    "-c".to_string(),
                    format!("http.extraHeader=Authorization: Basic {}", basic),
                ]
            }
            Self::SshKey { .. } => vec![],
        }
    }

    /// Environment for commands that talk to the remote.
    pub fn git_env(&self) -> Result<Vec<(String, String)>> {
        let Self::SshKey {
            key_path,
            passphrase,
        } = self
        else {
            return Ok(vec![]);
        };

        let key = key_path.to_string_lossy().replace('\'', r"'\''");
        let mut env = vec![(
            "GIT_SSH_COMMAND".to_string(),
            format!("ssh -i '{}' -o IdentitiesOnly=yes", key),
        )];

        if let Some(passphrase) = passphrase {
            let exe = std::env::current_exe().context("Failed to locate askpass helper")?;
            env.push((
                "SSH_ASKPASS".to_string(),
                exe.to_string_lossy().into_owned(),
            ));
            env.push(("SSH_ASKPASS_REQUIRE".to_string(), "force".to_string()));
            env.push((ASKPASS_ENV.to_string(), passphrase.clone()));
        }

        Ok(env)
    }
}
