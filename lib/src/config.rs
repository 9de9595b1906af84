use std::{fmt, fs, io, path::Path, time::Duration};

use zeroize::Zeroizing;

/// Configuration for a [`Connection`](crate::Connection).
///
/// A zero timeout disables the corresponding deadline.
#[derive(Clone, Default)]
pub struct Config {
    secret: Zeroizing<Vec<u8>>,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the shared secret. Leave empty for instances that do not ask for
    /// authentication.
    #[must_use]
    pub fn with_secret(mut self, secret: impl AsRef<[u8]>) -> Self {
        self.secret = Zeroizing::new(secret.as_ref().to_vec());
        self
    }

    /// Loads the secret from a varnishd `-S` secret file. The contents are
    /// used verbatim, trailing newline included.
    ///
    /// # Errors
    ///
    /// Returns the error from reading the file.
    pub fn with_secret_file(mut self, path: impl AsRef<Path>) -> io::Result<Self> {
        self.secret = Zeroizing::new(fs::read(path)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    #[must_use]
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    #[must_use]
    pub const fn write_timeout(&self) -> Duration {
        self.write_timeout
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("secret", &if self.secret.is_empty() { "" } else { "<redacted>" })
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use super::Config;

    #[test]
    fn defaults_disable_auth_and_deadlines() {
        let config = Config::new();
        assert!(config.secret().is_empty());
        assert_eq!(config.read_timeout(), Duration::ZERO);
        assert_eq!(config.write_timeout(), Duration::ZERO);
    }

    #[test]
    fn debug_redacts_secret() {
        let config = Config::new()
            .with_secret("supersecret\n")
            .with_read_timeout(Duration::from_secs(2));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("supersecret"));
        assert!(rendered.contains("<redacted>"));
        assert_eq!(config.secret(), b"supersecret\n");
    }

    #[test]
    fn secret_file_is_read_verbatim() {
        let path = std::env::temp_dir().join(format!("vasc-secret-{}", std::process::id()));
        fs::write(&path, b"foo\n").expect("write secret file");

        let config = Config::new().with_secret_file(&path).expect("read secret file");
        let _ = fs::remove_file(&path);
        assert_eq!(config.secret(), b"foo\n");
    }

    #[test]
    fn missing_secret_file_is_an_error() {
        assert!(Config::new()
            .with_secret_file("/nonexistent/vasc/secret")
            .is_err());
    }
}
