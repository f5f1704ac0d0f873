use std::time::Duration;

/// Default bound on how long a call waits for its response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `None` waits forever. Applies to blocking and suspending calls;
    /// callback calls wait until answered, cancelled or shut down.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }
}

/// What the server does with a request naming an unregistered method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownMethod {
    /// Answer with a method-not-found error.
    #[default]
    Reply,
    /// Log and drop; the caller sees its own timeout.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub unknown_method: UnknownMethod,
    /// Turn handler panics into error responses instead of unwinding
    /// through the channel's delivery thread.
    pub catch_panics: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            unknown_method: UnknownMethod::Reply,
            catch_panics: true,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unknown_method(mut self, policy: UnknownMethod) -> Self {
        self.unknown_method = policy;
        self
    }

    pub fn catch_panics(mut self, catch: bool) -> Self {
        self.catch_panics = catch;
        self
    }
}
