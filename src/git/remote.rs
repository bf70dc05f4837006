use std::path::PathBuf;

use git2::{
    cert::Cert, AutotagOption, CertificateCheckStatus, Config, Cred, CredentialType, FetchOptions,
    RemoteCallbacks,
};
use log::trace;
use ssh_key::{
    known_hosts::{Entry, HostPatterns},
    KnownHosts,
};

use crate::cancel::Cancellation;

const GLOBAL_KNOWN_HOSTS: &str = "/etc/ssh/ssh_known_hosts";

/// Credential and host key handling shared by every connection to a remote.
#[derive(Debug, Clone)]
pub struct RemoteAccess {
    known_hosts: PathBuf,
}

impl Default for RemoteAccess {
    fn default() -> Self {
        RemoteAccess {
            known_hosts: PathBuf::from(GLOBAL_KNOWN_HOSTS),
        }
    }
}

impl RemoteAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known hosts file consulted for SSH host keys.
    ///
    /// Defaults to `/etc/ssh/ssh_known_hosts`.
    pub fn known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts = path.into();
        self
    }

    /// Callbacks for a connection. Transfers abort as soon as `cancel` trips.
    pub fn callbacks<'a>(&'a self, cancel: &'a Cancellation) -> RemoteCallbacks<'a> {
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
                let git_config = Config::open_default()?;
                return Cred::credential_helper(&git_config, url, username);
            }
            Err(git2::Error::from_str("no valid authentication available"))
        });

        // Parsed on the first host key check of this connection.
        let mut known_hosts = None;
        callbacks.certificate_check(move |certificate, host| {
            let entries = known_hosts.get_or_insert_with(|| self.load_known_hosts());
            Ok(check_certificate(entries, certificate, host))
        });
        callbacks.transfer_progress(move |_| !cancel.is_cancelled());
        callbacks.sideband_progress(move |_| !cancel.is_cancelled());

        callbacks
    }

    pub fn fetch_options<'a>(&'a self, cancel: &'a Cancellation) -> FetchOptions<'a> {
        let mut fetch_options = FetchOptions::new();
        fetch_options
            .remote_callbacks(self.callbacks(cancel))
            .download_tags(AutotagOption::All);
        fetch_options
    }

    fn load_known_hosts(&self) -> Vec<Entry> {
        trace!("Loading {}", self.known_hosts.display());
        KnownHosts::read_file(&self.known_hosts).unwrap_or_else(|error| {
            trace!("Could not load {}: {}", self.known_hosts.display(), error);
            Vec::new()
        })
    }
}

fn check_certificate(
    entries: &[Entry],
    certificate: &Cert<'_>,
    host: &str,
) -> CertificateCheckStatus {
    match certificate.as_hostkey().and_then(|h| h.hostkey()) {
        Some(hostkey) if known_host_matches(entries, host, hostkey) => {
            CertificateCheckStatus::CertificateOk
        }
        _ => CertificateCheckStatus::CertificatePassthrough,
    }
}

fn known_host_matches(entries: &[Entry], host: &str, hostkey: &[u8]) -> bool {
    let found = entries
        .iter()
        .filter(|entry| host_matches_patterns(host, entry.host_patterns()))
        .any(|entry| {
            entry
                .public_key()
                .to_bytes()
                .is_ok_and(|bytes| bytes == hostkey)
        });
    trace!("Host key of {} known: {}", host, found);
    found
}

/// Plain and negated (`!host`) patterns. Wildcards and hashed names never
/// match.
fn host_matches_patterns(host: &str, patterns: &HostPatterns) -> bool {
    let HostPatterns::Patterns(patterns) = patterns else {
        return false;
    };
    let mut matched = false;
    for pattern in patterns.iter().map(|pattern| pattern.to_lowercase()) {
        match pattern.strip_prefix('!') {
            Some(negated) if negated == host => return false,
            Some(_) => {}
            None => matched |= pattern == host,
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_patterns() {
        let patterns = HostPatterns::Patterns(vec![
            "github.com".to_owned(),
            "!gitlab.com".to_owned(),
            "Example.COM".to_owned(),
        ]);
        assert!(host_matches_patterns("github.com", &patterns));
        assert!(host_matches_patterns("example.com", &patterns));
        assert!(!host_matches_patterns("gitlab.com", &patterns));
        assert!(!host_matches_patterns("bitbucket.org", &patterns));
    }

    const GITHUB_ED25519: &str = "github.com ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl";

    #[test]
    fn known_host_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_hosts");
        std::fs::write(&path, format!("# comment\n{GITHUB_ED25519}\n")).unwrap();

        let entries = RemoteAccess::new().known_hosts(&path).load_known_hosts();
        assert_eq!(entries.len(), 1);
        let hostkey = entries[0].public_key().to_bytes().unwrap();

        assert!(known_host_matches(&entries, "github.com", &hostkey));
        assert!(!known_host_matches(&entries, "gitlab.com", &hostkey));
        assert!(!known_host_matches(&entries, "github.com", b"other key"));
    }

    #[test]
    fn missing_known_hosts_file() {
        let dir = tempfile::tempdir().unwrap();
        let entries = RemoteAccess::new()
            .known_hosts(dir.path().join("known_hosts"))
            .load_known_hosts();
        assert!(entries.is_empty());
        assert!(!known_host_matches(&entries, "github.com", b"key"));
    }
}
