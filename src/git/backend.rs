use std::path::{Path, PathBuf};

use git2::{
    build::RepoBuilder, cert::Cert, CertificateCheckStatus, Config, Cred, CredentialType,
    FetchOptions, RemoteCallbacks, Repository,
};
use home::home_dir;
use log::{debug, trace};
use regex_lite::Regex;
use ssh_key::{known_hosts::HostPatterns, KnownHosts};

use super::{repository::Git2Repository, GitBackend, GitError};

const GLOBAL_KNOWN_HOSTS: &str = "/etc/ssh/ssh_known_hosts";

/// [`GitBackend`] on top of libgit2.
pub struct Git2Backend {
    git_config: Config,
    known_hosts: Vec<PathBuf>,
}

impl Git2Backend {
    pub fn new(git_config: Config) -> Self {
        let mut known_hosts = Vec::new();
        if let Some(home) = home_dir() {
            known_hosts.push(home.join(".ssh").join("known_hosts"));
        }
        known_hosts.push(PathBuf::from(GLOBAL_KNOWN_HOSTS));
        Git2Backend {
            git_config,
            known_hosts,
        }
    }

    pub fn open_default() -> Result<Self, GitError> {
        Ok(Self::new(Config::open_default()?))
    }

    pub(super) fn fetch_options(&self) -> FetchOptions<'_> {
        let mut callbacks = RemoteCallbacks::new();
        // Consider using https://crates.io/crates/git2_credentials that supports
        // more authentication options
        callbacks.credentials(move |url, username, allowed_types| {
            trace!(
                "Requested credentials for {}, username {:?}, allowed types {:?}",
                url,
                username,
                allowed_types
            );
            // Asking for ssh username
            if allowed_types.contains(CredentialType::USERNAME) {
                return Cred::username("git");
            }
            // SSH auth
            if allowed_types.contains(CredentialType::SSH_KEY) {
                return Cred::ssh_key_from_agent(username.unwrap_or("git"));
            }
            // HTTP auth
            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                return Cred::credential_helper(&self.git_config, url, username);
            }
            Err(git2::Error::from_str("no valid authentication available"))
        });

        callbacks.certificate_check(|certificate, host| self.check_certificate(certificate, host));

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);
        fetch_options
    }

    fn check_certificate(
        &self,
        certificate: &Cert<'_>,
        host: &str,
    ) -> Result<CertificateCheckStatus, git2::Error> {
        if let Some(hostkey) = certificate.as_hostkey().and_then(|h| h.hostkey()) {
            for file in &self.known_hosts {
                trace!("Loading {}", file.display());
                match KnownHosts::read_file(file) {
                    Ok(entries) => {
                        for entry in entries {
                            if host_matches_patterns(host, entry.host_patterns()) {
                                trace!(
                                    "Found known host entry for {} ({})",
                                    host,
                                    entry.public_key().algorithm()
                                );
                                if entry.public_key().to_bytes().as_deref() == Ok(hostkey) {
                                    trace!("Known host entry matches the host key");
                                    return Ok(CertificateCheckStatus::CertificateOk);
                                }
                            }
                        }
                    }
                    Err(error) => trace!("Could not load {}: {}", file.display(), error),
                }
            }
            trace!("No known host entry matched the host key");
        }
        Ok(CertificateCheckStatus::CertificatePassthrough)
    }
}

impl GitBackend for Git2Backend {
    type Repository<'a> = Git2Repository<'a>;

    fn clone_into<'a>(&'a self, url: &str, path: &Path) -> Result<Git2Repository<'a>, GitError> {
        debug!("Cloning {} into {}", url, path.display());
        let repo = RepoBuilder::new()
            .fetch_options(self.fetch_options())
            .clone(url, path)?;
        Ok(Git2Repository::new(self, repo))
    }

    fn open<'a>(&'a self, path: &Path) -> Result<Git2Repository<'a>, GitError> {
        trace!("Opening existing repository at {}", path.display());
        let repo = Repository::open(path)?;
        Ok(Git2Repository::new(self, repo))
    }
}

/// Matches `host` against a known_hosts pattern list. `*` and `?` are wildcards
/// and a `!` prefix rejects the host even if another pattern accepts it.
fn host_matches_patterns(host: &str, patterns: &HostPatterns) -> bool {
    match patterns {
        HostPatterns::Patterns(patterns) => {
            let host = host.to_lowercase();
            let mut match_found = false;
            for pattern in patterns {
                let pattern = pattern.to_lowercase();
                if let Some(pattern) = pattern.strip_prefix('!') {
                    if wildcard_matches(pattern, &host) {
                        return false;
                    }
                } else {
                    match_found |= wildcard_matches(&pattern, &host);
                }
            }
            match_found
        }
        // Hashed entries need HMAC-SHA1 over the host name.
        HostPatterns::HashedName { .. } => false,
    }
}

fn wildcard_matches(pattern: &str, host: &str) -> bool {
    if !pattern.contains(['*', '?']) {
        return pattern == host;
    }
    let expression = regex_lite::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    match Regex::new(&format!("^{expression}$")) {
        Ok(regex) => regex.is_match(host),
        Err(error) => {
            trace!("Ignoring known host pattern {}: {}", pattern, error);
            false
        }
    }
}
