use crate::triggers::Trigger;

/// Where the current render runs. Decides the starting value of new triggers and whether
/// watched queries keep listening after their first result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Server,
    Client
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Server
    }
}

impl Environment {
    /// Server renders start at 0 so the first response registers dependencies. Client renders
    /// start at 1 to subscribe right away.
    pub fn initial_trigger_value(self) -> u64 {
        match self {
            Environment::Server => 0,
            Environment::Client => 1
        }
    }
}

/// Options shared by all queries of a render context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Whether queries are watched unless they say otherwise.
    pub watch: bool,
    pub environment: Environment
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            watch: true,
            environment: Environment::default()
        }
    }
}

/// Marks an operation as watched. Add it to the operation's extensions to have the
/// [`WatchExchange`](./struct.WatchExchange.html) track it.
#[derive(Clone, Debug)]
pub struct WatchExtension {
    pub trigger: Trigger
}
