//! Local configuration store for the Microcks CLI
//!
//! The configuration lives in a single YAML file (by default
//! `~/.config/microcks/config`) holding servers, users, auth records,
//! locally-managed instances and the named contexts tying them together.
//! The file is read lazily on each command invocation and written back
//! whole; it is the sole source of truth between invocations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MicrocksError, Result};

/// Root of the local configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Name of the context used when none is given on the command line
    #[serde(rename = "current-context", default)]
    pub current_context: String,
    #[serde(default)]
    pub contexts: Vec<ContextRef>,
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub auths: Vec<Auth>,
}

/// A named binding of a server address, a user and an optional instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextRef {
    #[serde(default)]
    pub name: String,
    /// Address of the referenced [`Server`]
    #[serde(default)]
    pub server: String,
    /// Name of the referenced [`User`]
    #[serde(default)]
    pub user: String,
    /// Name of the referenced [`Instance`], may be empty
    #[serde(default)]
    pub instance: String,
}

/// A Microcks server known to this CLI, keyed by its address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    #[serde(default)]
    pub name: String,
    /// Base address of the server, e.g. `http://localhost:8080`
    #[serde(default)]
    pub server: String,
    #[serde(rename = "insecureTLS", default)]
    pub insecure_tls: bool,
    /// Whether the server delegates authentication to Keycloak
    #[serde(rename = "keycloakEnable", default)]
    pub keycloak_enable: bool,
}

/// Credentials stored for a server. The name matches the server address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "auth-token", default)]
    pub auth_token: String,
    #[serde(rename = "refresh-token", default)]
    pub refresh_token: String,
}

/// OAuth client credentials used to redeem refresh tokens for a server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Auth {
    #[serde(default)]
    pub server: String,
    #[serde(rename = "clientid", default)]
    pub client_id: String,
    #[serde(rename = "clientsecret", default)]
    pub client_secret: String,
}

/// A locally-started Microcks container tracked for start/stop lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub status: InstanceStatus,
    /// Host port the container maps 8080/tcp onto
    #[serde(default)]
    pub port: String,
    #[serde(rename = "containerID", default)]
    pub container_id: String,
    /// Remove the container (and its records) once it stops
    #[serde(rename = "autoRemove", default)]
    pub auto_remove: bool,
    /// Container runtime, `docker` or `podman`
    #[serde(default)]
    pub driver: String,
}

/// Lifecycle state of a managed container instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    #[serde(rename = "")]
    #[default]
    None,
    Created,
    Running,
    Stopped,
    Exited,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceStatus::None => "",
            InstanceStatus::Created => "Created",
            InstanceStatus::Running => "Running",
            InstanceStatus::Stopped => "Stopped",
            InstanceStatus::Exited => "Exited",
        };
        f.write_str(s)
    }
}

/// A context with its server, user and instance references joined in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContext {
    pub name: String,
    pub server: Server,
    pub user: User,
    pub instance: Instance,
}

impl LocalConfig {
    /// Loads the configuration file. Returns `Ok(None)` when the file does
    /// not exist. Fails before parsing if the file permissions are too open,
    /// and after parsing if the current-context points nowhere.
    pub fn read(path: impl AsRef<Path>) -> Result<Option<LocalConfig>> {
        let path = path.as_ref();
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        check_file_permission(path, &metadata)?;

        let contents = std::fs::read_to_string(path)?;
        let config: LocalConfig = if contents.trim().is_empty() {
            LocalConfig::default()
        } else {
            serde_yaml::from_str(&contents)?
        };
        config.validate()?;
        Ok(Some(config))
    }

    /// Writes the configuration back, creating parent directories and
    /// restricting the file mode to `0600`. A config whose current-context
    /// is dangling is rejected rather than persisted.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_yaml::to_string(self)?;
        write_restricted(path, contents.as_bytes())
    }

    /// Removes the configuration file from disk.
    pub fn delete(path: impl AsRef<Path>) -> Result<()> {
        std::fs::remove_file(path.as_ref())?;
        Ok(())
    }

    /// Ensures the current-context, when set, resolves to existing records.
    pub fn validate(&self) -> Result<()> {
        if self.current_context.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.resolve_context(&self.current_context) {
            return Err(MicrocksError::Validation(format!(
                "local config invalid: {e}"
            )));
        }
        Ok(())
    }

    /// Resolves the named context, or the current one when `name` is empty.
    /// Server and user references must exist; an unresolved instance
    /// reference yields a default [`Instance`] instead of failing.
    pub fn resolve_context(&self, name: &str) -> Result<ResolvedContext> {
        let name = if name.is_empty() {
            if self.current_context.is_empty() {
                return Err(MicrocksError::NotFound(
                    "local config: current-context unset".into(),
                ));
            }
            self.current_context.as_str()
        } else {
            name
        };

        let ctx = self
            .contexts
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| MicrocksError::NotFound(format!("context '{name}' undefined")))?;

        let server = self.get_server(&ctx.server)?.clone();
        let user = self.get_user(&ctx.user)?.clone();
        let instance = self
            .get_instance(&ctx.instance)
            .map(Clone::clone)
            .unwrap_or_default();

        Ok(ResolvedContext {
            name: ctx.name.clone(),
            server,
            user,
            instance,
        })
    }

    pub fn get_context(&self, name: &str) -> Result<&ContextRef> {
        self.contexts
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| MicrocksError::NotFound(format!("context '{name}' undefined")))
    }

    pub fn upsert_context(&mut self, context: ContextRef) {
        match self.contexts.iter_mut().find(|c| c.name == context.name) {
            Some(existing) => *existing = context,
            None => self.contexts.push(context),
        }
    }

    /// Removes the named context and returns it, so callers can cascade to
    /// the server and user it referenced.
    pub fn remove_context(&mut self, name: &str) -> Option<ContextRef> {
        let i = self.contexts.iter().position(|c| c.name == name)?;
        Some(self.contexts.remove(i))
    }

    pub fn get_server(&self, address: &str) -> Result<&Server> {
        self.servers
            .iter()
            .find(|s| s.server == address)
            .ok_or_else(|| MicrocksError::NotFound(format!("server '{address}' undefined")))
    }

    pub fn upsert_server(&mut self, server: Server) {
        match self.servers.iter_mut().find(|s| s.server == server.server) {
            Some(existing) => *existing = server,
            None => self.servers.push(server),
        }
    }

    pub fn remove_server(&mut self, address: &str) -> bool {
        match self.servers.iter().position(|s| s.server == address) {
            Some(i) => {
                self.servers.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn get_user(&self, name: &str) -> Result<&User> {
        self.users
            .iter()
            .find(|u| u.name == name)
            .ok_or_else(|| MicrocksError::NotFound(format!("user '{name}' undefined")))
    }

    pub fn upsert_user(&mut self, user: User) {
        match self.users.iter_mut().find(|u| u.name == user.name) {
            Some(existing) => *existing = user,
            None => self.users.push(user),
        }
    }

    pub fn remove_user(&mut self, name: &str) -> bool {
        match self.users.iter().position(|u| u.name == name) {
            Some(i) => {
                self.users.remove(i);
                true
            }
            None => false,
        }
    }

    /// Clears both tokens of the named user while keeping the record, so a
    /// later login can reuse it. Returns false when the user is unknown.
    pub fn clear_user_tokens(&mut self, name: &str) -> bool {
        match self.users.iter_mut().find(|u| u.name == name) {
            Some(user) => {
                user.auth_token.clear();
                user.refresh_token.clear();
                true
            }
            None => false,
        }
    }

    pub fn get_auth(&self, server: &str) -> Result<&Auth> {
        self.auths
            .iter()
            .find(|a| a.server == server)
            .ok_or_else(|| MicrocksError::NotFound(format!("auth for '{server}' undefined")))
    }

    pub fn upsert_auth(&mut self, auth: Auth) {
        match self.auths.iter_mut().find(|a| a.server == auth.server) {
            Some(existing) => *existing = auth,
            None => self.auths.push(auth),
        }
    }

    pub fn remove_auth(&mut self, server: &str) -> bool {
        match self.auths.iter().position(|a| a.server == server) {
            Some(i) => {
                self.auths.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn get_instance(&self, name: &str) -> Result<&Instance> {
        self.instances
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| MicrocksError::NotFound(format!("instance '{name}' undefined")))
    }

    /// Instances are keyed by container id, so renaming a container keeps a
    /// single record.
    pub fn upsert_instance(&mut self, instance: Instance) {
        match self
            .instances
            .iter_mut()
            .find(|i| i.container_id == instance.container_id)
        {
            Some(existing) => *existing = instance,
            None => self.instances.push(instance),
        }
    }

    /// Removes the named instance. An empty name counts as already removed.
    pub fn remove_instance(&mut self, name: &str) -> bool {
        if name.is_empty() {
            return true;
        }
        match self.instances.iter().position(|i| i.name == name) {
            Some(i) => {
                self.instances.remove(i);
                true
            }
            None => false,
        }
    }

    /// True once no servers remain; the config file can then be deleted.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

/// Resolves the configuration directory, honouring `MICROCKS_CONFIG_DIR`.
pub fn default_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("MICROCKS_CONFIG_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let base = directories::BaseDirs::new()
        .ok_or_else(|| MicrocksError::Config("cannot determine home directory".into()))?;
    Ok(base.home_dir().join(".config").join("microcks"))
}

/// Default path of the configuration file.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(default_config_dir()?.join("config"))
}

/// Default path of the watch registry file.
pub fn default_watch_path() -> Result<PathBuf> {
    Ok(default_config_dir()?.join("watch"))
}

#[cfg(unix)]
pub(crate) fn check_file_permission(path: &Path, metadata: &std::fs::Metadata) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode() & 0o777;
    if mode != 0o600 && mode != 0o400 {
        return Err(MicrocksError::Validation(format!(
            "config file {} has incorrect permission flags {:o}, change the file permission either to 0400 or 0600",
            path.display(),
            mode
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn check_file_permission(_path: &Path, _metadata: &std::fs::Metadata) -> Result<()> {
    Ok(())
}

pub(crate) fn write_restricted(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config() -> LocalConfig {
        let mut config = LocalConfig::default();
        config.upsert_server(Server {
            name: String::new(),
            server: "http://localhost:8080".to_string(),
            insecure_tls: false,
            keycloak_enable: true,
        });
        config.upsert_user(User {
            name: "http://localhost:8080".to_string(),
            auth_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
        });
        config.upsert_context(ContextRef {
            name: "local".to_string(),
            server: "http://localhost:8080".to_string(),
            user: "http://localhost:8080".to_string(),
            instance: String::new(),
        });
        config.current_context = "local".to_string();
        config
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        let result = LocalConfig::read(dir.path().join("config")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config");

        let config = sample_config();
        config.write(&path).unwrap();

        let loaded = LocalConfig::read(&path).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[cfg(unix)]
    #[test]
    fn write_restricts_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        sample_config().write(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn read_rejects_open_permissions_before_parsing() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        // Not even valid YAML: the permission gate must fire first.
        std::fs::write(&path, "{{{ not yaml").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = LocalConfig::read(&path).unwrap_err();
        assert!(matches!(err, MicrocksError::Validation(_)), "got {err:?}");
        assert!(err.to_string().contains("permission"));
    }

    #[test]
    fn read_rejects_dangling_current_context() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        write_restricted(&path, b"current-context: gone\n").unwrap();

        let err = LocalConfig::read(&path).unwrap_err();
        assert!(matches!(err, MicrocksError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn read_empty_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        write_restricted(&path, b"").unwrap();

        let loaded = LocalConfig::read(&path).unwrap().unwrap();
        assert_eq!(loaded, LocalConfig::default());
    }

    #[test]
    fn write_rejects_dangling_current_context() {
        let dir = TempDir::new().unwrap();
        let mut config = sample_config();
        config.current_context = "gone".to_string();

        let err = config.write(dir.path().join("config")).unwrap_err();
        assert!(matches!(err, MicrocksError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn resolve_empty_name_uses_current_context() {
        let config = sample_config();
        let by_empty = config.resolve_context("").unwrap();
        let by_name = config.resolve_context("local").unwrap();
        assert_eq!(by_empty, by_name);
        assert_eq!(by_empty.server.server, "http://localhost:8080");
    }

    #[test]
    fn resolve_without_current_context_fails() {
        let mut config = sample_config();
        config.current_context = String::new();

        let err = config.resolve_context("").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("current-context unset"));
    }

    #[test]
    fn resolve_unknown_context_fails() {
        let config = sample_config();
        let err = config.resolve_context("nope").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "context 'nope' undefined");
    }

    #[test]
    fn resolve_dangling_server_fails() {
        let mut config = sample_config();
        config.current_context = String::new();
        config.servers.clear();

        let err = config.resolve_context("local").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "server 'http://localhost:8080' undefined");
    }

    #[test]
    fn resolve_missing_instance_defaults() {
        let mut config = sample_config();
        config.contexts[0].instance = "no-such-instance".to_string();
        config.current_context = String::new();

        let resolved = config.resolve_context("local").unwrap();
        assert_eq!(resolved.instance, Instance::default());
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut config = sample_config();
        config.upsert_server(Server {
            server: "http://other:8080".to_string(),
            ..Default::default()
        });
        config.upsert_server(Server {
            server: "http://localhost:8080".to_string(),
            insecure_tls: true,
            ..Default::default()
        });

        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].server, "http://localhost:8080");
        assert!(config.servers[0].insecure_tls);
    }

    #[test]
    fn remove_preserves_order_of_remaining() {
        let mut config = LocalConfig::default();
        for addr in ["a", "b", "c"] {
            config.upsert_server(Server {
                server: addr.to_string(),
                ..Default::default()
            });
        }

        assert!(config.remove_server("b"));
        assert!(!config.remove_server("b"));
        let order: Vec<&str> = config.servers.iter().map(|s| s.server.as_str()).collect();
        assert_eq!(order, vec!["a", "c"]);
    }

    #[test]
    fn remove_context_returns_removed_ref() {
        let mut config = sample_config();
        config.current_context = String::new();

        let removed = config.remove_context("local").unwrap();
        assert_eq!(removed.server, "http://localhost:8080");
        assert!(config.remove_context("local").is_none());
    }

    #[test]
    fn remove_instance_with_empty_name_is_true() {
        let mut config = LocalConfig::default();
        assert!(config.remove_instance(""));
        assert!(!config.remove_instance("unknown"));
    }

    #[test]
    fn upsert_instance_keyed_by_container_id() {
        let mut config = LocalConfig::default();
        config.upsert_instance(Instance {
            name: "microcks".to_string(),
            container_id: "abc123".to_string(),
            status: InstanceStatus::Created,
            ..Default::default()
        });
        config.upsert_instance(Instance {
            name: "renamed".to_string(),
            container_id: "abc123".to_string(),
            status: InstanceStatus::Running,
            ..Default::default()
        });

        assert_eq!(config.instances.len(), 1);
        assert_eq!(config.instances[0].name, "renamed");
        assert_eq!(config.instances[0].status, InstanceStatus::Running);
    }

    #[test]
    fn clear_user_tokens_keeps_record() {
        let mut config = sample_config();
        assert!(config.clear_user_tokens("http://localhost:8080"));
        assert!(!config.clear_user_tokens("nobody"));

        let user = config.get_user("http://localhost:8080").unwrap();
        assert!(user.auth_token.is_empty());
        assert!(user.refresh_token.is_empty());
    }

    #[test]
    fn is_empty_tracks_servers_only() {
        let mut config = sample_config();
        assert!(!config.is_empty());
        config.remove_server("http://localhost:8080");
        assert!(config.is_empty());
        assert!(!config.contexts.is_empty());
    }

    #[test]
    fn config_dir_honours_environment_override() {
        // No other test in this crate reads MICROCKS_CONFIG_DIR, so setting
        // process environment here is safe.
        std::env::set_var("MICROCKS_CONFIG_DIR", "/tmp/microcks-cli-test");
        let dir = default_config_dir().unwrap();
        std::env::remove_var("MICROCKS_CONFIG_DIR");
        assert_eq!(dir, PathBuf::from("/tmp/microcks-cli-test"));
    }

    #[test]
    fn yaml_field_names_are_stable() {
        let config = sample_config();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("current-context: local"));
        assert!(yaml.contains("keycloakEnable: true"));
        assert!(yaml.contains("auth-token: token"));
        assert!(yaml.contains("refresh-token: refresh"));
    }
}
